use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{BgRemoveError, Result};

pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "tif", "tiff", "bmp"];

pub fn is_supported_image_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Regular files directly inside `dir` with a supported extension.
///
/// Subdirectories are not entered. The order is whatever the directory
/// listing yields.
pub fn collect_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            // broken links and the like are not image files
            Err(err) if err.depth() > 0 => {
                debug!(error = %err, "skipping unreadable directory entry");
                continue;
            }
            Err(err) => {
                return Err(BgRemoveError::FileSystem {
                    path: dir.to_path_buf(),
                    operation: "directory listing".to_string(),
                    source: err.into(),
                })
            }
        };
        if entry.file_type().is_file() && is_supported_image_format(entry.path()) {
            image_files.push(entry.into_path());
        }
    }

    Ok(image_files)
}
