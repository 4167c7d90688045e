//! Configuration management for thumbgen

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::error::{Result, ThumbgenError};
use crate::processing::formats::{detect_format_from_extension, ExtensionFilter};

pub mod scale;
pub use scale::*;

/// Worker count used when neither the CLI nor a config file sets one
pub const DEFAULT_THREAD_COUNT: usize = 3;

/// Source extensions accepted when none are configured
pub const DEFAULT_SOURCE_EXTENSIONS: [&str; 4] = ["jpg", "png", "jpeg", "bmp"];

/// Main configuration structure
///
/// Built once at startup and handed to the core read-only. Every section
/// falls back to its defaults, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool and source selection settings
    pub processing: ProcessingConfig,

    /// How each image is scaled and encoded
    pub scale: ScaleSpec,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Global processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of worker threads
    pub threads: usize,

    /// Source file extensions to pick up (case-insensitive)
    pub allowed_extensions: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREAD_COUNT,
            allowed_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
        }
    }
}

impl ProcessingConfig {
    /// Build the extension filter used by the lister and the workers
    pub fn extension_filter(&self) -> ExtensionFilter {
        ExtensionFilter::new(self.allowed_extensions.iter().map(String::as_str))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Supported output encodings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Bmp,
}

impl ImageFormat {
    /// Get file extension for this format
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Bmp => "bmp",
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ThumbgenError::config(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(ThumbgenError::config(
                "Unsupported config file format. Use .toml or .yaml",
            )),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.processing.threads == 0 {
            return Err(ThumbgenError::config("Thread count must be greater than 0"));
        }

        let logical_cpus = num_cpus::get();
        if self.processing.threads > logical_cpus {
            warn!(
                "Requested {} worker threads but only {} logical CPUs are available",
                self.processing.threads, logical_cpus
            );
        }

        if self.processing.allowed_extensions.is_empty() {
            return Err(ThumbgenError::config(
                "At least one source extension must be allowed",
            ));
        }

        for extension in &self.processing.allowed_extensions {
            detect_format_from_extension(extension).map_err(|_| {
                ThumbgenError::config(format!(
                    "Allowed extension '{}' is not a supported image format",
                    extension
                ))
            })?;
        }

        self.scale.validate()?;

        Ok(())
    }
}

/// A fully resolved run: where to read, where to write, and how
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub settings: Config,
}

impl RunConfig {
    pub fn new(source_dir: PathBuf, output_dir: PathBuf, settings: Config) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            source_dir,
            output_dir,
            settings,
        })
    }

    pub fn threads(&self) -> usize {
        self.settings.processing.threads
    }
}
