//! Collects image files from command-line inputs.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

const DEFAULT_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

/// Options controlling directory scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional maximum recursion depth. `None` or `Some(0)` means unlimited.
    pub max_depth: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: None,
        }
    }
}

/// Return `true` if `path` has a decodable image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            DEFAULT_EXTS.iter().any(|e| *e == ext)
        })
}

/// Expands `inputs` into a sorted list of image files.
///
/// Files are taken as given (the decoder decides whether they are images);
/// directories are walked, skipping hidden subdirectories.
///
/// # Errors
/// Returns [`Error::BadDir`] naming every input that does not exist.
pub fn collect_images(inputs: &[PathBuf], opts: &ScanOptions) -> Result<Vec<PathBuf>, Error> {
    let bad: Vec<_> = inputs
        .iter()
        .filter(|p| !p.exists())
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    if !bad.is_empty() {
        return Err(Error::BadDir(bad.join(", ")));
    }

    let mut out = Vec::new();
    for root in inputs {
        if root.is_file() {
            out.push(root.clone());
            continue;
        }
        let mut wd = WalkDir::new(root).sort_by_file_name();
        if !opts.recursive {
            wd = wd.max_depth(1);
        } else if let Some(d) = opts.max_depth
            && d > 0
        {
            wd = wd.max_depth(d);
        }
        for entry in wd
            .into_iter()
            .filter_entry(|e| !should_skip_dir(e))
            .flatten()
        {
            let path = entry.path();
            if entry.file_type().is_file() && is_supported_image(path) {
                out.push(path.to_path_buf());
            }
        }
    }
    Ok(out)
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
