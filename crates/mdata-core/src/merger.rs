//! Merge pipeline: classify every file's lines into one store
//!
//! Files are merged in the order given; on a key collision the file merged
//! last wins. A file that cannot be read is logged and skipped, and whatever
//! was merged before it stays in place.

use crate::classifier::{Classifier, LineShape, DEFAULT_LANGUAGE};
use crate::error::{Error, Result};
use crate::stats::{MergeReport, StatsCollector};
use crate::store::{LineEnding, MergeStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Settings for one merge run
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub shape: LineShape,
    /// Language whose explicit prefix is stripped; empty disables it
    pub default_language: String,
    pub line_ending: LineEnding,
}

impl MergeOptions {
    pub fn new(shape: LineShape) -> Self {
        Self {
            shape,
            default_language: DEFAULT_LANGUAGE.to_string(),
            line_ending: LineEnding::default(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }
}

/// Finished merge: the populated store and its report
#[derive(Debug)]
pub struct MergeOutcome {
    pub store: MergeStore,
    pub report: MergeReport,
    line_ending: LineEnding,
}

impl MergeOutcome {
    /// Full output file contents
    pub fn render(&self) -> String {
        self.store.render(self.line_ending)
    }

    /// Write the merged output in one pass, replacing any existing file
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.render()).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(
            path = %path.display(),
            entries = self.store.entry_count(),
            "wrote merged output"
        );
        Ok(())
    }
}

/// Incremental merger over a sequence of sources
#[derive(Debug)]
pub struct Merger {
    classifier: Classifier,
    store: MergeStore,
    stats: StatsCollector,
    options: MergeOptions,
}

impl Merger {
    pub fn new(options: MergeOptions) -> Result<Self> {
        let classifier = Classifier::new(options.shape, &options.default_language)?;
        Ok(Self {
            classifier,
            store: MergeStore::new(options.shape.same_file_policy()),
            stats: StatsCollector::new(),
            options,
        })
    }

    /// Merge one source held in memory
    pub fn merge_str(&mut self, name: impl Into<PathBuf>, content: &str) {
        let name = name.into();
        self.store.begin_file();
        self.stats.begin_file(name.clone());

        let mut key_lines = 0usize;
        for line in content.lines() {
            if let Some(slot) = self.store.feed(self.classifier.classify(line)) {
                self.stats.record(&slot);
                key_lines += 1;
            }
        }

        self.store.end_file();
        self.stats.end_file();
        debug!(source = %name.display(), key_lines, "merged source");
    }

    /// Read and merge one file
    ///
    /// On a read error nothing from the file is merged and the error is
    /// returned for the caller to report.
    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = read_lossy(path)?;
        self.merge_str(path, &content);
        Ok(())
    }

    /// Merge a file, logging and recording a read failure instead of failing
    pub fn merge_file_or_skip<P: AsRef<Path>>(&mut self, path: P) {
        let path = path.as_ref();
        if let Err(e) = self.merge_file(path) {
            warn!(path = %path.display(), error = %e, "skipping unreadable file");
            self.stats.record_failure(path, e);
        }
    }

    pub fn finish(self) -> MergeOutcome {
        let orphan_lines = self.store.orphan_lines().len();
        MergeOutcome {
            report: self.stats.finish(self.options.shape, orphan_lines),
            store: self.store,
            line_ending: self.options.line_ending,
        }
    }
}

/// Merge in-memory `(name, contents)` sources in order
pub fn merge_sources(sources: &[(&str, &str)], options: MergeOptions) -> Result<MergeOutcome> {
    let mut merger = Merger::new(options)?;
    for (name, content) in sources {
        merger.merge_str(*name, content);
    }
    Ok(merger.finish())
}

/// Merge files in order, skipping any that cannot be read
pub fn merge_files<P: AsRef<Path>>(paths: &[P], options: MergeOptions) -> Result<MergeOutcome> {
    let mut merger = Merger::new(options)?;
    for path in paths {
        merger.merge_file_or_skip(path);
    }
    Ok(merger.finish())
}

/// Read a file as text, replacing invalid UTF-8 instead of failing
pub fn read_lossy<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!(path = %path.display(), "input is not valid UTF-8, replacing bad bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    // A UTF-8 byte order mark would otherwise hide the first key
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}
