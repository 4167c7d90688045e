//! Scale settings shared by every worker

use serde::{Deserialize, Serialize};
use crate::config::ImageFormat;
use crate::error::{Result, ThumbgenError};
use crate::processing::resize::FilterType;

/// Default thumbnail size relative to the source
pub const DEFAULT_SCALE_RATIO: f64 = 0.08;

/// Default JPEG quality
pub const DEFAULT_QUALITY: u8 = 90;

/// Describes how every image in a run is scaled and encoded
///
/// Never mutated after startup; workers read it through a shared reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleSpec {
    /// Scale ratio, 0 < ratio <= 1
    pub ratio: f64,

    /// Output encoding
    pub format: ImageFormat,

    /// Resampling filter
    pub filter: FilterType,

    /// Output quality (1-100), used by lossy encoders
    pub quality: u8,

    /// Keep the source file name verbatim; when false the extension is
    /// replaced with the output encoding's extension
    pub preserve_file_name: bool,
}

impl Default for ScaleSpec {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_SCALE_RATIO,
            format: ImageFormat::Jpeg,
            filter: FilterType::default(),
            quality: DEFAULT_QUALITY,
            preserve_file_name: true,
        }
    }
}

impl ScaleSpec {
    /// Create a spec with the given ratio and output format
    pub fn new(ratio: f64, format: ImageFormat) -> Self {
        Self {
            ratio,
            format,
            ..Default::default()
        }
    }

    /// Set the resampling filter
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Set output quality
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Replace the source extension with the output format's extension
    pub fn rename_extension(mut self) -> Self {
        self.preserve_file_name = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_ratio(self.ratio)?;

        if self.quality == 0 || self.quality > 100 {
            return Err(ThumbgenError::config("Quality must be between 1 and 100"));
        }

        Ok(())
    }
}

/// Check that a ratio lies in (0, 1]
pub fn validate_ratio(ratio: f64) -> Result<()> {
    if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
        return Err(ThumbgenError::config(format!(
            "Scale ratio must be in (0, 1], got {}",
            ratio
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_is_valid() {
        let spec = ScaleSpec::default();
        assert!(spec.validate().is_ok());
        assert!(spec.preserve_file_name);
        assert!(matches!(spec.filter, FilterType::Triangle));
    }

    #[test]
    fn test_builder() {
        let spec = ScaleSpec::new(0.5, ImageFormat::Png)
            .filter(FilterType::Nearest)
            .quality(70)
            .rename_extension();
        assert_eq!(spec.format, ImageFormat::Png);
        assert_eq!(spec.quality, 70);
        assert!(!spec.preserve_file_name);
        assert!(matches!(spec.filter, FilterType::Nearest));
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(validate_ratio(1.0).is_ok());
        assert!(validate_ratio(0.01).is_ok());
        assert!(validate_ratio(0.0).is_err());
        assert!(validate_ratio(-0.5).is_err());
        assert!(validate_ratio(1.01).is_err());
        assert!(validate_ratio(f64::NAN).is_err());
    }

    #[test]
    fn test_quality_bounds() {
        assert!(ScaleSpec::default().quality(0).validate().is_err());
        assert!(ScaleSpec::default().quality(101).validate().is_err());
        assert!(ScaleSpec::default().quality(100).validate().is_ok());
    }
}
