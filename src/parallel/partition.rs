//! Splitting the source list into per-worker partitions

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, ThumbgenError};
use crate::processing::SourceImage;

/// A contiguous slice of the source list owned by exactly one worker task
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    index: usize,
    images: Vec<SourceImage>,
    output_dir: Arc<Path>,
}

impl Partition {
    /// Position of this partition in partition order
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn images(&self) -> &[SourceImage] {
        &self.images
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn into_images(self) -> Vec<SourceImage> {
        self.images
    }
}

/// Split `images` into at most `thread_count` contiguous partitions
///
/// Produces `min(thread_count, images.len())` partitions whose sizes differ
/// by at most one; the leading partitions take the remainder. Concatenating
/// the partitions in order gives back the input. An empty input yields no
/// partitions.
pub fn partition(
    images: Vec<SourceImage>,
    thread_count: usize,
    output_dir: &Path,
) -> Result<Vec<Partition>> {
    if thread_count == 0 {
        return Err(ThumbgenError::config("Thread count must be at least 1"));
    }

    let total = images.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let output_dir: Arc<Path> = Arc::from(output_dir);
    let sizes = partition_sizes(total, thread_count);

    let mut remaining = images.into_iter();
    let partitions: Vec<Partition> = sizes
        .iter()
        .enumerate()
        .map(|(index, &size)| Partition {
            index,
            images: remaining.by_ref().take(size).collect(),
            output_dir: Arc::clone(&output_dir),
        })
        .collect();

    debug!(
        "Split {} images into {} partitions of sizes {:?}",
        total,
        partitions.len(),
        sizes
    );

    Ok(partitions)
}

/// Sizes of the partitions `partition` would produce for `total` items
pub fn partition_sizes(total: usize, thread_count: usize) -> Vec<usize> {
    if thread_count == 0 || total == 0 {
        return Vec::new();
    }

    let count = thread_count.min(total);
    let base = total / count;
    let extra = total % count;

    (0..count)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}
