//! mdata-core: Core library for merging DIVA mod data tables
//!
//! This library provides functionality to:
//! - Classify pv_db and str_array lines into key lines and pending lines
//! - Merge many mod files into one store with last-file-wins override
//! - Emit the merged store in a stable, curated order
//! - Scan directories for input files and collect merge statistics
//! - Fix chart text files for builds without sustain/W notes

pub mod chart;
pub mod classifier;
pub mod error;
pub mod key;
pub mod merger;
pub mod plan;
pub mod scanner;
pub mod stats;
pub mod store;

pub use chart::{fix_chart_file, fix_chart_line, fix_chart_text, ChartFixReport, ChartLine};
pub use classifier::{ClassifiedLine, Classifier, KeyLine, LineShape, SameFilePolicy, DEFAULT_LANGUAGE};
pub use error::{Error, Result};
pub use key::{split_full_key, EntryKey, GroupKey};
pub use merger::{merge_files, merge_sources, read_lossy, MergeOptions, MergeOutcome, Merger};
pub use plan::MergePlan;
pub use scanner::{scan_inputs, ScanOptions, ScanResult};
pub use stats::{FileStats, MergeReport, StatsCollector};
pub use store::{EntryBody, LineEnding, MergeStore, Slot};
