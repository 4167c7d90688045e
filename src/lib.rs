//! thumbgen - Parallel Batch Thumbnail Generator
//!
//! Scales every image in a source directory by a fixed ratio and writes the
//! results to an output directory, spreading the work over a fixed number of
//! worker threads.
//!
//! # How a run works
//!
//! 1. The source directory is listed (non-recursive, allow-listed
//!    extensions, sorted by path).
//! 2. The list is split into at most `threads` contiguous partitions whose
//!    sizes differ by at most one.
//! 3. The output directory is emptied (or created).
//! 4. Each partition runs as one task on a fixed-size pool; a failing image
//!    is recorded and never stops the rest of its partition.
//! 5. All workers are joined and an [`ExecutionSummary`] is returned.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use thumbgen::{Config, RunConfig};
//!
//! let run = RunConfig::new(
//!     PathBuf::from("photos"),
//!     PathBuf::from("thumbs"),
//!     Config::default(),
//! )?;
//!
//! let summary = thumbgen::run(&run)?;
//! println!("{} of {} thumbnails written", summary.succeeded, summary.attempted);
//! # Ok::<(), thumbgen::ThumbgenError>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{Config, ImageFormat, LoggingConfig, RunConfig, ScaleSpec};
pub use error::{Result, ThumbgenError};
pub use parallel::{ExecutionEngine, ExecutionSummary, Partition, SummaryReport};
pub use processing::{ImageProcessor, SourceImage};

use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.level` when it is set. Log lines
/// go to stderr so stdout stays free for reports. Calling this more than once
/// is harmless; only the first subscriber is kept.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            ThumbgenError::config(format!("Invalid log level '{}': {}", config.level, e))
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.json_format {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if installed.is_ok() {
        debug!("thumbgen v{} logging initialized", VERSION);
    }

    Ok(())
}

/// List the source directory and split it into partitions
///
/// Touches nothing on disk, so it doubles as a dry run.
pub fn plan(config: &RunConfig) -> Result<Vec<Partition>> {
    let filter = config.settings.processing.extension_filter();
    let images = discovery::list_images(&config.source_dir, &filter)?;
    parallel::partition(images, config.threads(), &config.output_dir)
}

/// Prepare the output directory and run a plan to completion
///
/// An empty plan returns an all-zero summary and leaves the output directory
/// alone.
pub fn execute_plan(config: &RunConfig, partitions: Vec<Partition>) -> Result<ExecutionSummary> {
    if partitions.is_empty() {
        info!("No images to process in {:?}", config.source_dir);
        return Ok(ExecutionSummary::default());
    }

    ensure_distinct(&config.source_dir, &config.output_dir)?;
    discovery::prepare_output_dir(&config.output_dir)?;

    let processor = ImageProcessor::from_config(&config.settings);
    let engine = ExecutionEngine::new(config.threads(), processor)?;
    engine.execute(partitions)
}

/// Plan and execute in one call
pub fn run(config: &RunConfig) -> Result<ExecutionSummary> {
    let partitions = plan(config)?;
    execute_plan(config, partitions)
}

/// Clearing the output directory must never wipe the sources
///
/// Rejects an output directory that is the source directory or one of its
/// ancestors. An output directory nested inside the source is fine, since
/// listing never descends into subdirectories.
fn ensure_distinct(source_dir: &Path, output_dir: &Path) -> Result<()> {
    if let (Ok(source), Ok(output)) = (source_dir.canonicalize(), output_dir.canonicalize()) {
        if source.starts_with(&output) {
            return Err(ThumbgenError::output_dir(
                output_dir,
                "Output directory must not be the source directory or contain it",
            ));
        }
    }
    Ok(())
}
