use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use imageproc::filter::bilateral_filter;

use crate::error::PlateError;

/// Bilateral neighbourhood diameter
pub const BILATERAL_DIAMETER: u32 = 11;
pub const BILATERAL_SIGMA_COLOR: f32 = 17.0;
pub const BILATERAL_SIGMA_SPACE: f32 = 17.0;

pub const CANNY_LOW_THRESHOLD: f32 = 30.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 200.0;

/// Reject images the pipeline cannot handle: zero area, or a channel layout
/// other than luma, RGB or RGBA
pub fn validate_image(img: &DynamicImage) -> Result<(), PlateError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(PlateError::InvalidImage(format!(
            "image has zero area ({}x{})",
            img.width(),
            img.height()
        )));
    }
    match img.color().channel_count() {
        1 | 3 | 4 => Ok(()),
        n => Err(PlateError::InvalidImage(format!(
            "unsupported channel count: {}",
            n
        ))),
    }
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Edge-preserving bilateral smoothing; flat areas are averaged while
/// strong steps (plate borders) stay sharp
pub fn apply_bilateral(img: &GrayImage, diameter: u32, sigma_color: f32, sigma_space: f32) -> GrayImage {
    bilateral_filter(img, diameter, sigma_color, sigma_space)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Full preprocessing chain: grayscale, bilateral smoothing, Canny edges.
///
/// Runs the same steps the localizer runs before its crop stage. The returned
/// edge map has the dimensions of the input.
pub fn preprocess(img: &DynamicImage) -> Result<GrayImage, PlateError> {
    validate_image(img)?;
    let mut stages = super::build_preprocessing_pipeline(None).run(img.clone())?;
    stages
        .pop()
        .map(|edges| edges.image.to_luma8())
        .ok_or_else(|| PlateError::Processing(anyhow::anyhow!("preprocessing produced no edge map")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, LumaA, Rgb};

    #[test]
    fn zero_area_is_invalid() {
        let img = DynamicImage::new_rgb8(0, 10);
        assert!(matches!(
            validate_image(&img),
            Err(PlateError::InvalidImage(_))
        ));
    }

    #[test]
    fn luma_alpha_is_unsupported() {
        let img = DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(4, 4, LumaA([10u8, 255u8])));
        assert!(matches!(preprocess(&img), Err(PlateError::InvalidImage(_))));
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(64, 48, Rgb([120u8, 90, 60])));
        let edges = preprocess(&img).unwrap();
        assert_eq!(edges.dimensions(), (64, 48));
        assert!(edges.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn bilateral_keeps_hard_step() {
        let img = GrayImage::from_fn(40, 20, |x, _| if x < 20 { Luma([20u8]) } else { Luma([230u8]) });
        let out = apply_bilateral(&img, BILATERAL_DIAMETER, BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPACE);
        assert_eq!(out.get_pixel(19, 10)[0], 20);
        assert_eq!(out.get_pixel(20, 10)[0], 230);
    }

    #[test]
    fn edges_found_around_bright_rectangle() {
        let img = GrayImage::from_fn(80, 60, |x, y| {
            if (20..60).contains(&x) && (15..45).contains(&y) {
                Luma([240u8])
            } else {
                Luma([30u8])
            }
        });
        let edges = preprocess(&DynamicImage::ImageLuma8(img)).unwrap();
        assert!(edges.pixels().any(|p| p[0] > 0));
        assert_eq!(edges.get_pixel(40, 30)[0], 0);
    }
}
