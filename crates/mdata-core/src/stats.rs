//! Per-file and run-wide statistics for a merge
//!
//! Counts are for reporting only; the merge result never depends on them.

use crate::classifier::LineShape;
use crate::error::{Error, Result};
use crate::store::Slot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Statistics for one input file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStats {
    /// Source file (or in-memory source name)
    pub path: PathBuf,
    /// Distinct (group, entry) slots in this file
    pub entries: usize,
    /// Smallest integer id seen
    pub min_id: Option<u64>,
    /// Largest integer id seen
    pub max_id: Option<u64>,
    /// Categories seen, sorted
    pub categories: Vec<String>,
}

impl FileStats {
    /// "min - max" or "No IDs"
    pub fn range_label(&self) -> String {
        match (self.min_id, self.max_id) {
            (Some(min), Some(max)) => format!("{} - {}", min, max),
            _ => "No IDs".to_string(),
        }
    }

    /// Comma-separated categories, shortened to `width` characters
    pub fn categories_label(&self, width: usize) -> String {
        if self.categories.is_empty() {
            return "None".to_string();
        }
        let joined = self.categories.join(", ");
        if joined.chars().count() > width && width > 3 {
            let head: String = joined.chars().take(width - 3).collect();
            format!("{}...", head)
        } else {
            joined
        }
    }
}

/// A file that could not be read and was skipped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Summary of a whole merge run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub generated_at: DateTime<Utc>,
    pub shape: LineShape,
    /// Per-file statistics, in processing order
    pub files: Vec<FileStats>,
    pub failed: Vec<FailedFile>,
    /// Sum of per-file distinct entries
    pub total_found: usize,
    /// Distinct entries across the run
    pub total_unique: usize,
    pub orphan_lines: usize,
}

impl MergeReport {
    /// Entries that appeared in more than one file
    pub fn duplicates(&self) -> usize {
        self.total_found.saturating_sub(self.total_unique)
    }

    /// Save the report as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load a previously saved report
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }
}

#[derive(Debug)]
struct FileTally {
    path: PathBuf,
    slots: BTreeSet<Slot>,
}

/// Observes the slots written during a merge
#[derive(Debug, Default)]
pub struct StatsCollector {
    current: Option<FileTally>,
    files: Vec<FileStats>,
    failed: Vec<FailedFile>,
    seen: BTreeSet<Slot>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tallying a new file, closing any file left open
    pub fn begin_file(&mut self, path: impl Into<PathBuf>) {
        self.end_file();
        self.current = Some(FileTally {
            path: path.into(),
            slots: BTreeSet::new(),
        });
    }

    /// Record a slot written by a key line
    pub fn record(&mut self, slot: &Slot) {
        if let Some(tally) = self.current.as_mut() {
            tally.slots.insert(slot.clone());
        }
        self.seen.insert(slot.clone());
    }

    pub fn end_file(&mut self) {
        let Some(tally) = self.current.take() else {
            return;
        };

        let ids = tally.slots.iter().filter_map(|s| s.entry.as_id());
        let min_id = ids.clone().min();
        let max_id = ids.max();

        let categories: BTreeSet<String> = tally
            .slots
            .iter()
            .map(|s| {
                if s.group.is_root() {
                    "root".to_string()
                } else {
                    s.group.category().to_string()
                }
            })
            .collect();

        self.files.push(FileStats {
            path: tally.path,
            entries: tally.slots.len(),
            min_id,
            max_id,
            categories: categories.into_iter().collect(),
        });
    }

    /// Record a file that was skipped
    pub fn record_failure(&mut self, path: impl Into<PathBuf>, error: impl ToString) {
        self.failed.push(FailedFile {
            path: path.into(),
            error: error.to_string(),
        });
    }

    /// Statistics of the files closed so far
    pub fn files(&self) -> &[FileStats] {
        &self.files
    }

    /// Close out and build the run report
    pub fn finish(mut self, shape: LineShape, orphan_lines: usize) -> MergeReport {
        self.end_file();
        let total_found = self.files.iter().map(|f| f.entries).sum();

        MergeReport {
            generated_at: Utc::now(),
            shape,
            files: self.files,
            failed: self.failed,
            total_found,
            total_unique: self.seen.len(),
            orphan_lines,
        }
    }
}
