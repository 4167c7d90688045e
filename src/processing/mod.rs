//! Per-image pipeline: allow-list check, decode, scale, encode, write

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use image::{DynamicImage, ImageOutputFormat};
use tracing::debug;

use crate::config::{Config, ImageFormat, ScaleSpec};
use crate::error::{ErrorContext, Result, ThumbgenError};

pub mod formats;
pub mod resize;

pub use formats::*;
pub use resize::*;

/// Files larger than this are memory-mapped instead of read into a buffer
const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;

/// One input file discovered in the source directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub path: PathBuf,
    /// Format implied by the extension, `None` if it is not an image extension
    pub format: Option<ImageFormat>,
}

impl SourceImage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let format = detect_format_from_path(&path).ok();
        Self { path, format }
    }

    pub fn file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }
}

/// Turns source files into thumbnails according to a fixed [`ScaleSpec`]
///
/// Holds only immutable settings, so one processor is shared by reference
/// across all workers.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    spec: ScaleSpec,
    filter: ExtensionFilter,
}

impl ImageProcessor {
    pub fn new(spec: ScaleSpec, filter: ExtensionFilter) -> Self {
        Self { spec, filter }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.scale.clone(), config.processing.extension_filter())
    }

    /// Produce the thumbnail for one source image inside `output_dir`
    pub fn process(&self, source: &SourceImage, output_dir: &Path) -> Result<ProcessedImage> {
        let start_time = Instant::now();
        let input_path = source.path.as_path();

        self.filter.check(input_path)?;

        let (image, original_info) = self.load_image(input_path)?;

        let scaled = transform(&image, self.spec.ratio, self.spec.filter)
            .with_file_context(input_path.to_path_buf())?;

        let output_path = self.output_path(source, output_dir)?;
        debug!("Processing file: {:?} -> {:?}", input_path, output_path);

        let output_info = self.save_image(&scaled, &output_path)?;

        Ok(ProcessedImage {
            input_path: input_path.to_path_buf(),
            output_path,
            original_info,
            output_info,
            processing_time: start_time.elapsed(),
        })
    }

    /// Where the thumbnail for `source` is written
    pub fn output_path(&self, source: &SourceImage, output_dir: &Path) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            ThumbgenError::encode("Source path has no file name", Some(source.path.clone()))
        })?;

        let mut output_path = output_dir.join(file_name);
        if !self.spec.preserve_file_name {
            output_path.set_extension(self.spec.format.extension());
        }

        Ok(output_path)
    }

    /// Load an image from file
    fn load_image(&self, path: &Path) -> Result<(DynamicImage, ImageInfo)> {
        let metadata = std::fs::metadata(path).map_err(|e| read_error(path, e))?;

        if !metadata.is_file() {
            return Err(ThumbgenError::decode(
                "Path is not a regular file",
                Some(path.to_path_buf()),
            ));
        }

        let file_size = metadata.len();
        if file_size == 0 {
            return Err(ThumbgenError::decode("File is empty", Some(path.to_path_buf())));
        }

        let (image, format) = if file_size > MMAP_THRESHOLD {
            self.load_image_mmap(path)?
        } else {
            let data = std::fs::read(path).map_err(|e| read_error(path, e))?;
            decode_bytes(&data, path)?
        };

        let info = ImageInfo {
            path: path.to_path_buf(),
            width: image.width(),
            height: image.height(),
            format,
            file_size,
        };

        debug!(
            "Loaded image: {}x{} ({:.2}MB)",
            info.width,
            info.height,
            info.file_size as f64 / 1024.0 / 1024.0
        );

        Ok((image, info))
    }

    /// Load image using memory mapping (for large files)
    fn load_image_mmap(&self, path: &Path) -> Result<(DynamicImage, ImageFormat)> {
        use memmap2::MmapOptions;

        debug!("Using memory mapping for large file: {:?}", path);

        let file = File::open(path).map_err(|e| read_error(path, e))?;

        // SAFETY: the map is read-only and lives only for the decode below.
        // Truncating the file underneath it is outside what a thumbnail run
        // supports, as with any other reader of the source tree.
        let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| read_error(path, e))?;

        decode_bytes(&mmap, path)
    }

    /// Encode and write an image in the configured output format
    fn save_image(&self, image: &DynamicImage, output_path: &Path) -> Result<ImageInfo> {
        let encode_error = |message: String| ThumbgenError::encode(message, Some(output_path.to_path_buf()));

        let file = File::create(output_path)
            .map_err(|e| encode_error(format!("Cannot create output file: {}", e)))?;
        let mut writer = BufWriter::new(file);

        let format = self.spec.format;
        let encoded = match format {
            // JPEG has no alpha channel and only 8-bit samples
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
                .write_to(&mut writer, ImageOutputFormat::Jpeg(self.spec.quality)),
            ImageFormat::Png => image.write_to(&mut writer, ImageOutputFormat::Png),
            ImageFormat::Bmp => {
                let bmp = if image.color().has_alpha() {
                    DynamicImage::ImageRgba8(image.to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(image.to_rgb8())
                };
                bmp.write_to(&mut writer, ImageOutputFormat::Bmp)
            }
        };
        encoded.map_err(|e| encode_error(e.to_string()))?;

        writer
            .flush()
            .map_err(|e| encode_error(format!("Cannot flush output file: {}", e)))?;
        drop(writer);

        let file_size = std::fs::metadata(output_path)
            .map_err(|e| encode_error(e.to_string()))?
            .len();

        debug!(
            "Saved image: {}x{} as {:?} ({} bytes)",
            image.width(),
            image.height(),
            format,
            file_size
        );

        Ok(ImageInfo {
            path: output_path.to_path_buf(),
            width: image.width(),
            height: image.height(),
            format,
            file_size,
        })
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(ScaleSpec::default(), ExtensionFilter::default())
    }
}

/// Decode in-memory file contents, trusting the header over the extension
fn decode_bytes(data: &[u8], path: &Path) -> Result<(DynamicImage, ImageFormat)> {
    let format = detect_format_from_header(data).with_file_context(path.to_path_buf())?;

    let image = image::load_from_memory_with_format(data, format.into())
        .map_err(|e| ThumbgenError::decode(e.to_string(), Some(path.to_path_buf())))?;

    Ok((image, format))
}

fn read_error(path: &Path, err: std::io::Error) -> ThumbgenError {
    ThumbgenError::decode(format!("Cannot read file: {}", err), Some(path.to_path_buf()))
}

/// Information about an image file
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub file_size: u64,
}

/// Result of processing one image
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub original_info: ImageInfo,
    pub output_info: ImageInfo,
    pub processing_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
            .save(&path)
            .unwrap();
        path
    }

    fn decode_output(path: &Path) -> DynamicImage {
        image::load_from_memory(&std::fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn test_source_image_infers_format() {
        assert_eq!(SourceImage::new("a/b.JPEG").format, Some(ImageFormat::Jpeg));
        assert_eq!(SourceImage::new("a/b.gif").format, None);
        assert_eq!(SourceImage::new("a/b.png").file_name().unwrap(), "b.png");
    }

    #[test]
    fn test_process_writes_scaled_thumbnail() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let input = write_image(src.path(), "photo.jpg", 500, 250);

        let processor = ImageProcessor::default();
        let result = processor.process(&SourceImage::new(&input), out.path()).unwrap();

        assert_eq!(result.output_path, out.path().join("photo.jpg"));
        assert_eq!((result.original_info.width, result.original_info.height), (500, 250));
        assert_eq!((result.output_info.width, result.output_info.height), (40, 20));
        assert!(result.output_info.file_size > 0);
        assert_eq!(decode_output(&result.output_path).dimensions(), (40, 20));
    }

    #[test]
    fn test_output_keeps_name_but_uses_configured_encoding() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let input = write_image(src.path(), "diagram.png", 100, 100);

        let processor = ImageProcessor::new(ScaleSpec::new(0.5, ImageFormat::Jpeg), ExtensionFilter::default());
        let result = processor.process(&SourceImage::new(&input), out.path()).unwrap();

        assert_eq!(result.output_path.file_name().unwrap(), "diagram.png");
        let bytes = std::fs::read(&result.output_path).unwrap();
        assert_eq!(detect_format_from_header(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_rename_extension() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let input = write_image(src.path(), "diagram.jpg", 64, 64);

        let spec = ScaleSpec::new(0.25, ImageFormat::Png).rename_extension();
        let processor = ImageProcessor::new(spec, ExtensionFilter::default());
        let result = processor.process(&SourceImage::new(&input), out.path()).unwrap();

        assert_eq!(result.output_path, out.path().join("diagram.png"));
        assert_eq!(decode_output(&result.output_path).dimensions(), (16, 16));
    }

    #[test]
    fn test_bmp_output() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let input = write_image(src.path(), "scan.bmp", 80, 40);

        let processor = ImageProcessor::new(ScaleSpec::new(0.5, ImageFormat::Bmp), ExtensionFilter::default());
        let result = processor.process(&SourceImage::new(&input), out.path()).unwrap();

        let bytes = std::fs::read(&result.output_path).unwrap();
        assert_eq!(detect_format_from_header(&bytes).unwrap(), ImageFormat::Bmp);
        assert_eq!(decode_output(&result.output_path).dimensions(), (40, 20));
    }

    #[test]
    fn test_corrupt_file_is_decode_error() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let garbage = src.path().join("garbage.jpg");
        std::fs::write(&garbage, b"definitely not a jpeg").unwrap();
        let err = ImageProcessor::default()
            .process(&SourceImage::new(&garbage), out.path())
            .unwrap_err();
        assert!(matches!(err, ThumbgenError::DecodeError { .. }));
        assert_eq!(err.file_path(), Some(&garbage));

        // Valid JPEG header, truncated body
        let truncated = src.path().join("truncated.jpg");
        std::fs::write(&truncated, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46]).unwrap();
        let err = ImageProcessor::default()
            .process(&SourceImage::new(&truncated), out.path())
            .unwrap_err();
        assert!(matches!(err, ThumbgenError::DecodeError { .. }));

        assert!(!out.path().join("garbage.jpg").exists());
    }

    #[test]
    fn test_empty_and_missing_files() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let empty = src.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();
        let err = ImageProcessor::default()
            .process(&SourceImage::new(&empty), out.path())
            .unwrap_err();
        assert!(matches!(err, ThumbgenError::DecodeError { .. }));

        let missing = src.path().join("missing.png");
        let err = ImageProcessor::default()
            .process(&SourceImage::new(&missing), out.path())
            .unwrap_err();
        assert!(matches!(err, ThumbgenError::DecodeError { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let input = write_image(src.path(), "anim.png", 50, 50);
        let renamed = src.path().join("anim.gif");
        std::fs::rename(&input, &renamed).unwrap();

        let err = ImageProcessor::default()
            .process(&SourceImage::new(&renamed), out.path())
            .unwrap_err();
        assert!(matches!(err, ThumbgenError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_degenerate_size_carries_path() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let input = write_image(src.path(), "icon.png", 6, 6);

        let err = ImageProcessor::default()
            .process(&SourceImage::new(&input), out.path())
            .unwrap_err();
        assert!(matches!(err, ThumbgenError::DegenerateOutputSize { .. }));
        assert_eq!(err.file_path(), Some(&input));
    }

    #[test]
    fn test_missing_output_dir_is_encode_error() {
        let src = TempDir::new().unwrap();
        let input = write_image(src.path(), "photo.jpg", 100, 100);

        let err = ImageProcessor::default()
            .process(&SourceImage::new(&input), &src.path().join("no/such/dir"))
            .unwrap_err();
        assert!(matches!(err, ThumbgenError::EncodeError { .. }));
    }
}
