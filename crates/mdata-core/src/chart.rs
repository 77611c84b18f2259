//! Chart fixer for text-dumped DSC charts
//!
//! Rewrites `Target` lines so charts authored with sustain and W notes play
//! on a game build without them:
//! - sustain tails are dropped
//! - W-note flags are cleared
//! - sustain heads become plain hold notes
//!
//! Every other line passes through untouched.

use crate::error::{Error, Result};
use crate::merger::read_lossy;
use std::fs;
use std::path::Path;

const TARGET_PREFIX: &str = "Target";

// Field positions on a whitespace-split Target line
const NOTE_KIND: usize = 5;
const W_FLAG_A: usize = 8;
const W_FLAG_B: usize = 9;
const PREV_LINK: usize = 11;
const NEXT_LINK: usize = 12;

/// Counts from fixing one chart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartFixReport {
    pub lines_read: usize,
    /// Target lines that were rewritten
    pub targets_rewritten: usize,
    /// Sustain heads turned into holds
    pub holds_converted: usize,
    /// Sustain tails removed
    pub tails_dropped: usize,
}

/// What happened to a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartLine {
    /// Not a Target line
    Unchanged(String),
    Rewritten { line: String, converted_hold: bool },
    Dropped,
}

/// A link field that points at another note (not 0, not a timing value)
fn is_note_link(field: &str) -> bool {
    field != "0" && !field.contains('.')
}

/// Apply the fix rules to one line (without terminator)
pub fn fix_chart_line(line: &str) -> ChartLine {
    if !line.trim().starts_with(TARGET_PREFIX) {
        return ChartLine::Unchanged(line.to_string());
    }

    let mut fields: Vec<&str> = line.split_whitespace().collect();
    let mut converted_hold = false;

    if fields.len() > NEXT_LINK {
        let prev = fields[PREV_LINK];
        let next = fields[NEXT_LINK];

        if is_note_link(prev) {
            return ChartLine::Dropped;
        }

        fields[W_FLAG_A] = "0";
        fields[W_FLAG_B] = "0";

        if prev == "0" && is_note_link(next) {
            fields[NOTE_KIND] = "1";
            fields[PREV_LINK] = "0";
            fields[NEXT_LINK] = "0";
            converted_hold = true;
        }
    }

    ChartLine::Rewritten {
        line: fields.join(" "),
        converted_hold,
    }
}

/// Fix chart text, returning the new text and what changed
pub fn fix_chart_text(text: &str) -> (String, ChartFixReport) {
    let mut report = ChartFixReport::default();
    let mut out = String::with_capacity(text.len());

    for line in text.lines() {
        report.lines_read += 1;
        match fix_chart_line(line) {
            ChartLine::Unchanged(line) => out.push_str(&line),
            ChartLine::Rewritten {
                line,
                converted_hold,
            } => {
                report.targets_rewritten += 1;
                if converted_hold {
                    report.holds_converted += 1;
                }
                out.push_str(&line);
            }
            ChartLine::Dropped => {
                report.tails_dropped += 1;
                continue;
            }
        }
        out.push('\n');
    }

    (out, report)
}

/// Fix a chart file and write the result to `output`
pub fn fix_chart_file<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<ChartFixReport> {
    let text = read_lossy(input)?;
    let (fixed, report) = fix_chart_text(&text);

    let output = output.as_ref();
    fs::write(output, fixed).map_err(|e| Error::FileWrite {
        path: output.to_path_buf(),
        source: e,
    })?;

    Ok(report)
}
