//! Directory scanner for discovering input files of a line shape

use crate::classifier::LineShape;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Output names of previous runs, never merged back in implicitly
const KNOWN_OUTPUTS: &[&str] = &["mdata_pv_db.txt", "mod_str_array.toml"];

/// Options controlling file discovery
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Walk subdirectories instead of only the top level of each root
    pub recursive: bool,
    /// Output file of the current run, excluded from the inputs
    pub exclude: Option<PathBuf>,
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Input files, sorted by path
    pub files: Vec<PathBuf>,
    /// Files that matched the extension but were excluded as outputs
    pub excluded: Vec<PathBuf>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Scan one or more directories for files of the given shape
pub fn scan_inputs<P: AsRef<Path>>(
    roots: &[P],
    shape: LineShape,
    options: &ScanOptions,
) -> Result<ScanResult> {
    let mut files = Vec::new();
    let mut excluded = Vec::new();

    let exclude_name = options
        .exclude
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_os_string());

    for root in roots {
        let root = root.as_ref();
        let mut walker = WalkDir::new(root).follow_links(true);
        if !options.recursive {
            walker = walker.max_depth(1);
        }

        for entry in walker.into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                // The root itself could not be opened
                Err(e) if e.depth() == 0 => return Err(Error::WalkDir(e)),
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !has_extension(path, shape.extensions()) {
                continue;
            }

            if is_output_file(path, exclude_name.as_deref(), options.exclude.as_deref()) {
                excluded.push(path.to_path_buf());
                continue;
            }

            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files.dedup();
    excluded.sort();
    excluded.dedup();

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        files,
        excluded,
    })
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Check whether a file is the run's own output or a well-known output name
fn is_output_file(
    path: &Path,
    exclude_name: Option<&std::ffi::OsStr>,
    exclude_path: Option<&Path>,
) -> bool {
    let Some(file_name) = path.file_name() else {
        return false;
    };

    if KNOWN_OUTPUTS.iter().any(|known| file_name == *known) {
        return true;
    }

    match (exclude_path, exclude_name) {
        // A bare file name excludes that name in every root
        (Some(exclude), Some(name)) if exclude.parent().map_or(true, |p| p.as_os_str().is_empty()) => {
            file_name == name
        }
        (Some(exclude), _) => same_file(path, exclude),
        _ => false,
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
