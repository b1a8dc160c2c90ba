use anyhow::Result;
use image::DynamicImage;

use crate::detection::{find_plate_region, preprocessing};
use crate::pipeline::{MetadataValue, PipelineContext, PipelineData, PipelineStep};

/// Metadata keys attached to each plate crop
pub const CONTOUR_AREA_KEY: &str = "contour_area";
pub const CANDIDATE_RANK_KEY: &str = "candidate_rank";

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .iter()
            .map(|item| {
                let gray = preprocessing::to_grayscale(&item.image);
                item.derive(DynamicImage::ImageLuma8(gray))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Edge-preserving bilateral smoothing
pub struct BilateralFilterStep {
    pub diameter: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
}

impl Default for BilateralFilterStep {
    fn default() -> Self {
        Self {
            diameter: preprocessing::BILATERAL_DIAMETER,
            sigma_color: preprocessing::BILATERAL_SIGMA_COLOR,
            sigma_space: preprocessing::BILATERAL_SIGMA_SPACE,
        }
    }
}

impl PipelineStep for BilateralFilterStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .iter()
            .map(|item| {
                let gray = item.image.to_luma8();
                let smoothed = preprocessing::apply_bilateral(&gray, self.diameter, self.sigma_color, self.sigma_space);
                item.derive(DynamicImage::ImageLuma8(smoothed))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Bilateral Filter"
    }
}

/// Detect edges using Canny
pub struct EdgeDetectionStep {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for EdgeDetectionStep {
    fn default() -> Self {
        Self {
            low_threshold: preprocessing::CANNY_LOW_THRESHOLD,
            high_threshold: preprocessing::CANNY_HIGH_THRESHOLD,
        }
    }
}

impl PipelineStep for EdgeDetectionStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .iter()
            .map(|item| {
                let gray = item.image.to_luma8();
                let edges = preprocessing::detect_edges(&gray, self.low_threshold, self.high_threshold);
                item.derive(DynamicImage::ImageLuma8(edges))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Edge Detection"
    }
}

/// Pick the plate quadrilateral in an edge map and crop it from the original.
/// Emits at most one item per input; none when no quadrilateral is found.
pub struct PlateCropStep {
    pub max_candidates: usize,
    pub tolerance_ratio: f64,
}

impl Default for PlateCropStep {
    fn default() -> Self {
        Self {
            max_candidates: super::MAX_CANDIDATES,
            tolerance_ratio: super::APPROX_TOLERANCE_RATIO,
        }
    }
}

impl PipelineStep for PlateCropStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let edges = item.image.to_luma8();
            let Some(found) = find_plate_region(
                &edges,
                item.original.width(),
                item.original.height(),
                self.max_candidates,
                self.tolerance_ratio,
            ) else {
                continue;
            };

            let bbox = found.region;
            let cropped = item.original.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);
            let plate = PipelineData::from_region(cropped, item.original.clone(), bbox)
                .with_metadata(CONTOUR_AREA_KEY, MetadataValue::Float(found.contour_area as f32))
                .with_metadata(CANDIDATE_RANK_KEY, MetadataValue::Int(found.rank as i32));
            result.push(plate);
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Plate Crop"
    }
}
