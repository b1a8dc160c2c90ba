pub mod contours;
pub mod geometry;
pub mod ocr;
pub mod preprocessing;
pub mod steps;

use image::{DynamicImage, GrayImage};
use std::sync::Arc;
use tracing::debug;

use crate::error::PlateError;
use crate::models::{Contour, PlateCandidate};
use crate::pipeline::{BoundingBox, DebugConfig, Pipeline};
use steps::{
    BilateralFilterStep, CANDIDATE_RANK_KEY, CONTOUR_AREA_KEY, EdgeDetectionStep, GrayscaleStep, PlateCropStep,
};

/// Only the largest contours are considered plate candidates
pub const MAX_CANDIDATES: usize = 10;

/// Polygon approximation tolerance, as a fraction of the contour perimeter
pub const APPROX_TOLERANCE_RATIO: f64 = 0.018;

/// A quadrilateral accepted as the plate boundary
#[derive(Debug, Clone)]
pub struct RegionMatch {
    pub region: BoundingBox,
    /// Position in the area ranking (0 = largest contour)
    pub rank: usize,
    pub contour_area: f64,
}

/// Scan the largest contours of an edge map and return the bounding box of the
/// first one that simplifies to exactly four vertices.
///
/// First match in area order wins; later candidates are never looked at, even
/// if they would fit a rectangle better.
pub fn find_plate_region(
    edges: &GrayImage,
    img_width: u32,
    img_height: u32,
    max_candidates: usize,
    tolerance_ratio: f64,
) -> Option<RegionMatch> {
    let all = contours::find_contours(edges);
    let total = all.len();
    let ranked = contours::largest_by_area(all, max_candidates);
    debug!(total, candidates = ranked.len(), "ranked contours by area");

    first_quadrilateral(&ranked, img_width, img_height, tolerance_ratio)
}

/// Walk already-ranked contours in order and stop at the first quadrilateral.
/// Degenerate contours are skipped, never fatal.
pub fn first_quadrilateral(
    ranked: &[Contour],
    img_width: u32,
    img_height: u32,
    tolerance_ratio: f64,
) -> Option<RegionMatch> {
    for (rank, contour) in ranked.iter().enumerate() {
        let Some(polygon) = contour.approximate_polygon(tolerance_ratio) else {
            debug!(rank, "skipping degenerate contour");
            continue;
        };
        debug!(
            rank,
            area = contour.area(),
            perimeter = contour.perimeter(),
            vertices = polygon.len(),
            "candidate contour"
        );
        if polygon.len() != 4 {
            continue;
        }

        let Some((x, y, w, h)) = geometry::bounding_rect(&polygon) else {
            continue;
        };
        let Some(region) = BoundingBox::clipped(x, y, w, h, img_width, img_height) else {
            continue;
        };
        debug!(rank, ?region, "accepted quadrilateral");
        return Some(RegionMatch {
            region,
            rank,
            contour_area: contour.area(),
        });
    }

    None
}

/// Grayscale, bilateral smoothing and Canny edges as a composable pipeline
pub fn build_preprocessing_pipeline(debug: Option<DebugConfig>) -> Pipeline {
    Pipeline::new()
        .with_debug(debug)
        .add_step(Arc::new(GrayscaleStep))
        .add_step(Arc::new(BilateralFilterStep::default()))
        .add_step(Arc::new(EdgeDetectionStep::default()))
}

/// Preprocessing followed by the plate crop
pub fn build_localization_pipeline(debug: Option<DebugConfig>) -> Pipeline {
    build_preprocessing_pipeline(debug).add_step(Arc::new(PlateCropStep::default()))
}

/// Finds the most plate-like quadrilateral in a photograph
#[derive(Default)]
pub struct PlateLocalizer {
    debug: Option<DebugConfig>,
}

impl PlateLocalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save every stage image under `debug` on each call
    pub fn with_debug(mut self, debug: Option<DebugConfig>) -> Self {
        self.debug = debug;
        self
    }

    /// Locate the plate and crop it from the original image.
    /// `Ok(None)` means no plate-shaped region was found.
    pub fn localize(&self, img: &DynamicImage) -> Result<Option<PlateCandidate>, PlateError> {
        self.localize_with_debug(img, self.debug.clone())
    }

    /// Like [`Self::localize`], with debug images written to `debug` instead of
    /// the localizer's own directory
    pub fn localize_with_debug(
        &self,
        img: &DynamicImage,
        debug: Option<DebugConfig>,
    ) -> Result<Option<PlateCandidate>, PlateError> {
        preprocessing::validate_image(img)?;

        let mut results = build_localization_pipeline(debug).run(img.clone())?;
        let Some(plate) = results.pop() else {
            debug!("no plate-shaped region found");
            return Ok(None);
        };
        let Some(region) = plate.bbox else {
            return Err(PlateError::Processing(anyhow::anyhow!("plate crop without a region")));
        };

        let rank = plate.get_int(CANDIDATE_RANK_KEY).unwrap_or_default() as usize;
        let contour_area = plate.get_float(CONTOUR_AREA_KEY).unwrap_or_default() as f64;
        debug!(?region, rank, contour_area, "plate localized");

        Ok(Some(PlateCandidate {
            region,
            image: plate.image,
            rank,
            contour_area,
        }))
    }
}
