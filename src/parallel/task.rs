//! Worker task: one partition, processed image by image

use std::time::{Duration, Instant};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ThumbgenError;
use crate::parallel::Partition;
use crate::processing::{ImageProcessor, SourceImage};

/// One image that could not be turned into a thumbnail
#[derive(Debug)]
pub struct ImageFailure {
    pub image: SourceImage,
    pub error: ThumbgenError,
}

/// Outcome of running one partition
#[derive(Debug)]
pub struct TaskResult {
    pub partition_index: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<ImageFailure>,
    pub elapsed: Duration,
}

impl TaskResult {
    /// True when every image in the partition was written
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Serializable view of a failure, used for reports
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub file: String,
    pub error: String,
}

impl From<&ImageFailure> for FailureReport {
    fn from(failure: &ImageFailure) -> Self {
        Self {
            file: failure.image.path.display().to_string(),
            error: failure.error.user_message(),
        }
    }
}

/// Drives the image processor over one partition
///
/// A failing image is recorded and the task moves on; it never aborts the
/// rest of the partition.
pub struct WorkerTask<'a> {
    partition: Partition,
    processor: &'a ImageProcessor,
}

impl<'a> WorkerTask<'a> {
    pub fn new(partition: Partition, processor: &'a ImageProcessor) -> Self {
        Self {
            partition,
            processor,
        }
    }

    /// Process every image in stored order
    pub fn run(self) -> TaskResult {
        let start_time = Instant::now();
        let index = self.partition.index();
        let output_dir = self.partition.output_dir().to_path_buf();
        let images = self.partition.into_images();
        let attempted = images.len();

        debug!("Partition {} started with {} images", index, attempted);

        let mut succeeded = 0;
        let mut failures = Vec::new();

        for image in images {
            match self.processor.process(&image, &output_dir) {
                Ok(result) => {
                    succeeded += 1;
                    debug!(
                        "Partition {}: {:?} -> {:?} in {:.1}ms",
                        index,
                        result.input_path,
                        result.output_path,
                        result.processing_time.as_secs_f64() * 1000.0
                    );
                }
                Err(error) => {
                    warn!("Partition {}: failed to process {:?}: {}", index, image.path, error);
                    failures.push(ImageFailure { image, error });
                }
            }
        }

        let elapsed = start_time.elapsed();
        debug!(
            "Partition {} finished: {}/{} succeeded in {:.2}s",
            index,
            succeeded,
            attempted,
            elapsed.as_secs_f64()
        );

        TaskResult {
            partition_index: index,
            attempted,
            succeeded,
            failures,
            elapsed,
        }
    }
}
