//! Error types and handling for thumbgen

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for thumbgen operations
pub type Result<T> = std::result::Result<T, ThumbgenError>;

/// Main error type for thumbgen operations
#[derive(Debug, Error)]
pub enum ThumbgenError {
    /// Bad thread count, scale ratio, or other settings
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Source directory does not exist or is not a directory
    #[error("Source directory not found: {path:?}")]
    SourceNotFound { path: PathBuf },

    /// Output directory cannot be prepared
    #[error("Output directory error: {message} (path: {path:?})")]
    OutputDirError { path: PathBuf, message: String },

    /// Extension not in the configured allow-list
    #[error("Unsupported image format: {extension} (file: {file:?})")]
    UnsupportedFormat {
        extension: String,
        file: Option<PathBuf>,
    },

    /// File unreadable, empty or corrupt
    #[error("Failed to decode image: {message} (file: {file:?})")]
    DecodeError {
        message: String,
        file: Option<PathBuf>,
    },

    /// Scaling would produce an image with a zero-pixel side
    #[error("Degenerate output size: {width}x{height} at ratio {ratio} (file: {file:?})")]
    DegenerateOutputSize {
        width: u32,
        height: u32,
        ratio: f64,
        file: Option<PathBuf>,
    },

    /// Scaled image could not be encoded or written
    #[error("Failed to encode image: {message} (file: {file:?})")]
    EncodeError {
        message: String,
        file: Option<PathBuf>,
    },

    /// Worker pool could not be created or a worker faulted during the join
    #[error("Execution interrupted: {message}")]
    ExecutionInterrupted { message: String },

    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl ThumbgenError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub fn source_not_found<P: Into<PathBuf>>(path: P) -> Self {
        Self::SourceNotFound { path: path.into() }
    }

    pub fn output_dir<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::OutputDirError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(extension: S, file: Option<PathBuf>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
            file,
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(message: S, file: Option<PathBuf>) -> Self {
        Self::DecodeError {
            message: message.into(),
            file,
        }
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(message: S, file: Option<PathBuf>) -> Self {
        Self::EncodeError {
            message: message.into(),
            file,
        }
    }

    pub fn degenerate(width: u32, height: u32, ratio: f64) -> Self {
        Self::DegenerateOutputSize {
            width,
            height,
            ratio,
            file: None,
        }
    }

    /// Create a new execution interrupted error
    pub fn interrupted<S: Into<String>>(message: S) -> Self {
        Self::ExecutionInterrupted {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the batch can continue)
    ///
    /// Recoverable errors belong to a single image and are recorded in the
    /// owning task's result. Everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::UnsupportedFormat { .. }
            | Self::DecodeError { .. }
            | Self::DegenerateOutputSize { .. }
            | Self::EncodeError { .. } => true,

            Self::InvalidConfiguration { .. }
            | Self::SourceNotFound { .. }
            | Self::OutputDirError { .. }
            | Self::ExecutionInterrupted { .. }
            | Self::Io(_)
            | Self::SerdeError(_) => false,
        }
    }

    /// Get the associated file path if available
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            Self::UnsupportedFormat { file, .. }
            | Self::DecodeError { file, .. }
            | Self::DegenerateOutputSize { file, .. }
            | Self::EncodeError { file, .. } => file.as_ref(),

            Self::SourceNotFound { path } | Self::OutputDirError { path, .. } => Some(path),

            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedFormat { extension, .. } => format!(
                "Unsupported image format: {}. Supported formats: JPG, JPEG, PNG, BMP",
                extension
            ),
            Self::DegenerateOutputSize { width, height, ratio, .. } => format!(
                "Image is too small ({}x{}) to scale by {}; the result would have no pixels",
                width, height, ratio
            ),
            Self::SourceNotFound { path } => {
                format!("Source directory does not exist: {}", path.display())
            }
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for ThumbgenError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for ThumbgenError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

/// Error context extension for adding file path information
pub trait ErrorContext<T> {
    /// Add file context to an error
    fn with_file_context(self, file: PathBuf) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ThumbgenError>,
{
    fn with_file_context(self, file: PathBuf) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();

            match &mut error {
                ThumbgenError::UnsupportedFormat { file: f, .. }
                | ThumbgenError::DecodeError { file: f, .. }
                | ThumbgenError::DegenerateOutputSize { file: f, .. }
                | ThumbgenError::EncodeError { file: f, .. } => {
                    if f.is_none() {
                        *f = Some(file);
                    }
                }
                _ => {}
            }

            error
        })
    }
}
