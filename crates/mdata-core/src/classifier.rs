//! Line classifier for pv_db and str_array text files
//!
//! Every input line is either a key line (it carries a key that takes part
//! in merging) or a pending line (comments, blanks, anything unrecognized).
//! Which lines count as key lines depends on the [`LineShape`] of the run.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language that is implicit when a str_array key carries no language prefix
pub const DEFAULT_LANGUAGE: &str = "en";

/// How colliding keys from the same file are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameFilePolicy {
    /// A later line replaces the earlier body
    Replace,
    /// Lines are appended to the body the file already started
    AppendRecord,
}

/// The line layout of a family of input files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineShape {
    /// `pv_NNN.field=value` lines keyed by the record id
    PvRecord,
    /// `lang.category.id = "value"` lines keyed by the dotted path
    StrArray,
}

impl LineShape {
    /// Pattern whose first capture group is the full key
    pub fn pattern(self) -> &'static str {
        match self {
            LineShape::PvRecord => r"^pv_(\d+)",
            LineShape::StrArray => r"^([a-zA-Z0-9_.]+)\s*=",
        }
    }

    /// File extensions the scanner picks up for this shape
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            LineShape::PvRecord => &["txt"],
            LineShape::StrArray => &["toml", "txt"],
        }
    }

    pub fn same_file_policy(self) -> SameFilePolicy {
        match self {
            LineShape::PvRecord => SameFilePolicy::AppendRecord,
            LineShape::StrArray => SameFilePolicy::Replace,
        }
    }

    /// Conventional name of the merged output file
    pub fn default_output(self) -> &'static str {
        match self {
            LineShape::PvRecord => "mdata_pv_db.txt",
            LineShape::StrArray => "mod_str_array.toml",
        }
    }

    /// Whether comment/blank lines are recognized before pattern matching
    fn skips_comments(self) -> bool {
        matches!(self, LineShape::StrArray)
    }
}

impl fmt::Display for LineShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineShape::PvRecord => write!(f, "pv"),
            LineShape::StrArray => write!(f, "str-array"),
        }
    }
}

impl FromStr for LineShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pv" | "pv_db" | "pv_record" | "pv-record" => Ok(LineShape::PvRecord),
            "str" | "str_array" | "str-array" | "strarray" => Ok(LineShape::StrArray),
            _ => Err(Error::UnknownShape(s.to_string())),
        }
    }
}

/// A line that carries a mergeable key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLine {
    /// Dotted key with any default-language prefix removed
    pub full_key: String,
    /// Line text to store (terminator removed)
    pub payload: String,
}

/// Result of classifying one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedLine {
    Key(KeyLine),
    Pending(String),
}

/// Classifier configured for one line shape
#[derive(Debug, Clone)]
pub struct Classifier {
    shape: LineShape,
    pattern: Regex,
    /// `"<lang>."`, or empty when normalization is off
    language_prefix: String,
}

impl Classifier {
    /// Create a classifier for `shape`
    ///
    /// An empty `default_language` disables prefix normalization.
    pub fn new(shape: LineShape, default_language: &str) -> Result<Self> {
        let pattern = Regex::new(shape.pattern())?;
        let language_prefix = if default_language.is_empty() {
            String::new()
        } else {
            format!("{}.", default_language)
        };

        Ok(Self {
            shape,
            pattern,
            language_prefix,
        })
    }

    /// Classify a single line
    pub fn classify(&self, raw_line: &str) -> ClassifiedLine {
        let line = strip_line_ending(raw_line);

        let candidate = if self.shape.skips_comments() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return ClassifiedLine::Pending(line.to_string());
            }
            trimmed
        } else {
            line
        };

        let full_key = match self.pattern.captures(candidate).and_then(|c| c.get(1)) {
            Some(m) => m.as_str(),
            None => return ClassifiedLine::Pending(line.to_string()),
        };

        ClassifiedLine::Key(self.normalize(full_key, line))
    }

    /// Collapse an explicit default-language prefix onto the implicit form
    fn normalize(&self, full_key: &str, line: &str) -> KeyLine {
        if !self.language_prefix.is_empty() {
            if let Some(stripped_key) = full_key.strip_prefix(&self.language_prefix) {
                if let Some(rest) = line.trim_start().strip_prefix(&self.language_prefix) {
                    return KeyLine {
                        full_key: stripped_key.to_string(),
                        payload: rest.to_string(),
                    };
                }
            }
        }

        KeyLine {
            full_key: full_key.to_string(),
            payload: line.to_string(),
        }
    }
}

/// Remove a trailing `\n` or `\r\n`
pub fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
