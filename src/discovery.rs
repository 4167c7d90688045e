//! Filesystem glue: listing source images and preparing the output directory

use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, ThumbgenError};
use crate::processing::{ExtensionFilter, SourceImage};

/// List the images directly inside `dir`, sorted by path
///
/// Only regular files whose extension passes `filter` are returned;
/// subdirectories are not descended into. An existing directory with no
/// matching files gives an empty list.
pub fn list_images(dir: &Path, filter: &ExtensionFilter) -> Result<Vec<SourceImage>> {
    if !dir.is_dir() {
        return Err(ThumbgenError::source_not_found(dir));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ThumbgenError::Io(e.into()))?;

        if entry.file_type().is_file() && filter.matches(entry.path()) {
            paths.push(entry.into_path());
        } else {
            debug!("Skipping {:?}", entry.path());
        }
    }

    paths.sort();
    info!("Found {} images in {:?}", paths.len(), dir);

    Ok(paths.into_iter().map(SourceImage::new).collect())
}

/// Make `dir` an empty, writable directory
///
/// A missing directory is created. Existing contents are removed
/// recursively.
pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(ThumbgenError::output_dir(dir, "Path exists and is not a directory"));
            }
            if metadata.permissions().readonly() {
                return Err(ThumbgenError::output_dir(dir, "Directory is read-only"));
            }
            clear_directory(dir)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| {
                ThumbgenError::output_dir(dir, format!("Failed to create directory: {}", e))
            })?;
            info!("Created output directory {:?}", dir);
        }
        Err(e) => {
            return Err(ThumbgenError::output_dir(dir, e.to_string()));
        }
    }

    Ok(())
}

fn clear_directory(dir: &Path) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| ThumbgenError::output_dir(dir, e.to_string()))?;

    let mut removed = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| ThumbgenError::output_dir(dir, e.to_string()))?;
        let path = entry.path();

        // Symlinks are removed, never followed
        let is_dir = fs::symlink_metadata(&path)
            .map(|m| m.is_dir())
            .map_err(|e| ThumbgenError::output_dir(&path, e.to_string()))?;

        let outcome = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        outcome.map_err(|e| {
            ThumbgenError::output_dir(&path, format!("Failed to remove: {}", e))
        })?;
        removed += 1;
    }

    debug!("Removed {} entries from {:?}", removed, dir);
    Ok(())
}
