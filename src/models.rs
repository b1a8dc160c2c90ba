use image::DynamicImage;
use imageproc::geometry::{arc_length, contour_area};
use imageproc::point::Point;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::detection::geometry;
use crate::pipeline::BoundingBox;

/// A closed boundary traced in an edge map
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
    /// Whether this is a hole border (nested inside another contour)
    pub is_hole: bool,
    area: f64,
    perimeter: f64,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>, is_hole: bool) -> Self {
        let area = contour_area(&points);
        let perimeter = arc_length(&points, true);
        Self {
            points,
            is_hole,
            area,
            perimeter,
        }
    }

    /// Enclosed area (shoelace over the boundary points)
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Closed perimeter length
    pub fn perimeter(&self) -> f64 {
        self.perimeter
    }

    /// Simplify the boundary with a tolerance proportional to its perimeter.
    /// Returns `None` for degenerate contours (zero perimeter).
    pub fn approximate_polygon(&self, tolerance_ratio: f64) -> Option<Vec<Point<i32>>> {
        if self.perimeter <= 0.0 {
            return None;
        }
        Some(geometry::approximate_closed_polygon(
            &self.points,
            tolerance_ratio * self.perimeter,
        ))
    }
}

/// The localized plate: where it is and the crop of the original image
#[derive(Debug, Clone)]
pub struct PlateCandidate {
    pub region: BoundingBox,
    pub image: DynamicImage,
    /// Position of the accepted contour in the area ranking (0 = largest)
    pub rank: usize,
    pub contour_area: f64,
}

/// Canonical plate identifier: OCR fragments joined with all whitespace removed.
/// May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PlateText(String);

impl PlateText {
    /// Concatenate fragments in order and strip every whitespace character
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = fragments.into_iter().fold(String::new(), |mut acc, fragment| {
            acc.extend(fragment.as_ref().chars().filter(|c| !c.is_whitespace()));
            acc
        });
        Self(text)
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `None` when nothing was recognized
    pub fn as_option(&self) -> Option<&str> {
        if self.0.is_empty() { None } else { Some(&self.0) }
    }
}

impl From<&str> for PlateText {
    fn from(value: &str) -> Self {
        Self::from_fragments([value])
    }
}

impl fmt::Display for PlateText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_option().unwrap_or("none"))
    }
}

impl Serialize for PlateText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}
