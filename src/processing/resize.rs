//! Image scaling

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use crate::config::validate_ratio;
use crate::error::{Result, ThumbgenError};
use tracing::debug;

/// Available resize filters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Nearest neighbor (fastest, lowest quality)
    Nearest,
    /// Triangle (linear interpolation)
    #[default]
    Triangle,
    /// Catmull-Rom cubic spline
    CatmullRom,
    /// Gaussian blur
    Gaussian,
    /// Lanczos with radius 3
    Lanczos3,
}

impl From<FilterType> for image::imageops::FilterType {
    fn from(filter: FilterType) -> Self {
        match filter {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Triangle => image::imageops::FilterType::Triangle,
            FilterType::CatmullRom => image::imageops::FilterType::CatmullRom,
            FilterType::Gaussian => image::imageops::FilterType::Gaussian,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Compute `floor(width * ratio) x floor(height * ratio)`
///
/// Fails with `DegenerateOutputSize` when either side would be zero.
pub fn scaled_dimensions(width: u32, height: u32, ratio: f64) -> Result<(u32, u32)> {
    validate_ratio(ratio)?;

    let target_width = (f64::from(width) * ratio).floor() as u32;
    let target_height = (f64::from(height) * ratio).floor() as u32;

    if target_width == 0 || target_height == 0 {
        return Err(ThumbgenError::degenerate(width, height, ratio));
    }

    Ok((target_width, target_height))
}

/// Scale a decoded image by `ratio`
///
/// Pure: no I/O, the input is left untouched. The result keeps the input's
/// color type, so scaling a thumbnail again yields the same kind of image.
pub fn transform(image: &DynamicImage, ratio: f64, filter: FilterType) -> Result<DynamicImage> {
    let (target_width, target_height) = scaled_dimensions(image.width(), image.height(), ratio)?;

    debug!(
        "Scaling {}x{} -> {}x{} using {:?}",
        image.width(),
        image.height(),
        target_width,
        target_height,
        filter
    );

    if target_width == image.width() && target_height == image.height() {
        return Ok(image.clone());
    }

    Ok(image.resize_exact(target_width, target_height, filter.into()))
}
