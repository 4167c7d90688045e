//! Image format detection and handling

use std::path::Path;
use crate::config::ImageFormat;
use crate::error::{Result, ThumbgenError};

/// Map a bare extension (no dot, any case) to a known format
pub fn detect_format_from_extension(extension: &str) -> Result<ImageFormat> {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        "bmp" => Ok(ImageFormat::Bmp),
        _ => Err(ThumbgenError::unsupported_format(extension, None)),
    }
}

/// Detect image format from file extension
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<ImageFormat> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            ThumbgenError::unsupported_format("Unknown", Some(path.to_path_buf()))
        })?;

    detect_format_from_extension(extension).map_err(|_| {
        ThumbgenError::unsupported_format(extension, Some(path.to_path_buf()))
    })
}

/// Detect image format from file header (magic bytes)
pub fn detect_format_from_header(data: &[u8]) -> Result<ImageFormat> {
    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Ok(ImageFormat::Jpeg);
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Ok(ImageFormat::Png);
    }

    // BMP: BM
    if data.starts_with(b"BM") {
        return Ok(ImageFormat::Bmp);
    }

    Err(ThumbgenError::decode("Unrecognized image header", None))
}

/// Convert our ImageFormat to image crate format
impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// Case-insensitive allow-list of source extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    pub fn new<'a, I>(extensions: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut extensions: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        extensions.sort();
        extensions.dedup();
        Self { extensions }
    }

    /// Check a bare extension against the list
    pub fn allows(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    /// Check a path's extension against the list
    pub fn matches<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.allows(ext))
    }

    /// Resolve the format of an allowed path, or fail with `UnsupportedFormat`
    pub fn check<P: AsRef<Path>>(&self, path: P) -> Result<ImageFormat> {
        let path = path.as_ref();
        if !self.matches(path) {
            let extension = path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Unknown".to_string());
            return Err(ThumbgenError::unsupported_format(
                extension,
                Some(path.to_path_buf()),
            ));
        }
        detect_format_from_path(path)
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SOURCE_EXTENSIONS)
    }
}
