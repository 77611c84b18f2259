//! Merge plan files: a saved description of a merge run
//!
//! A plan is JSON and can be written by hand or generated with
//! `mdata create-plan`. Only `roots` and `shape` are required.

use crate::classifier::{LineShape, DEFAULT_LANGUAGE};
use crate::error::{Error, Result};
use crate::merger::{merge_files, MergeOptions, MergeOutcome};
use crate::scanner::{scan_inputs, ScanOptions, ScanResult};
use crate::store::LineEnding;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// A merge run stored as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePlan {
    /// Root directories to scan
    pub roots: Vec<PathBuf>,
    /// Line shape of the input files
    pub shape: LineShape,
    /// Output file; defaults to the shape's conventional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default)]
    pub line_ending: LineEnding,
    #[serde(default)]
    pub recursive: bool,
    /// Where to write a JSON report, if anywhere
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
}

impl MergePlan {
    /// Create a plan with default settings
    pub fn new(roots: Vec<PathBuf>, shape: LineShape) -> Self {
        Self {
            roots,
            shape,
            output: None,
            default_language: default_language(),
            line_ending: LineEnding::default(),
            recursive: false,
            report: None,
        }
    }

    /// Load a plan from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the plan to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Output path, falling back to the shape's conventional file name
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.shape.default_output()))
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions::new(self.shape)
            .with_language(self.default_language.clone())
            .with_line_ending(self.line_ending)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            recursive: self.recursive,
            exclude: Some(self.output_path()),
        }
    }

    /// Discover the plan's input files
    pub fn scan(&self) -> Result<ScanResult> {
        scan_inputs(&self.roots, self.shape, &self.scan_options())
    }

    /// Scan, merge, and write the output (and report, if configured)
    pub fn execute(&self) -> Result<(ScanResult, MergeOutcome)> {
        let scan = self.scan()?;
        if scan.is_empty() {
            return Err(Error::NoInputFiles(self.roots.clone()));
        }

        let outcome = merge_files(&scan.files, self.merge_options())?;
        outcome.write_to(self.output_path())?;

        if let Some(report_path) = &self.report {
            outcome.report.save(report_path)?;
        }

        Ok((scan, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plan_defaults_from_minimal_json() {
        let json = r#"{ "roots": ["mods"], "shape": "str_array" }"#;
        let plan: MergePlan = serde_json::from_str(json).unwrap();

        assert_eq!(plan.shape, LineShape::StrArray);
        assert_eq!(plan.default_language, "en");
        assert_eq!(plan.line_ending, LineEnding::Lf);
        assert!(!plan.recursive);
        assert_eq!(plan.output_path(), PathBuf::from("mod_str_array.toml"));
    }

    #[test]
    fn test_plan_serialization() {
        let mut plan = MergePlan::new(vec![PathBuf::from("mods")], LineShape::PvRecord);
        plan.line_ending = LineEnding::Crlf;
        plan.output = Some(PathBuf::from("out.txt"));

        let json = serde_json::to_string_pretty(&plan).unwrap();
        assert!(json.contains("\"pv_record\""));
        assert!(json.contains("\"crlf\""));

        let loaded: MergePlan = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.shape, LineShape::PvRecord);
        assert_eq!(loaded.output_path(), PathBuf::from("out.txt"));
        assert!(loaded.report.is_none());
    }

    #[test]
    fn test_plan_execute() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.toml"), "# a\nmodule.1 = \"A\"\n").unwrap();
        fs::write(dir.path().join("b.toml"), "module.1 = \"B\"\nmodule.2 = \"C\"\n").unwrap();
        // Previous output is ignored as input
        fs::write(dir.path().join("merged.toml"), "module.9 = \"stale\"\n").unwrap();

        let output = dir.path().join("merged.toml");
        let report = dir.path().join("report.json");
        let mut plan = MergePlan::new(vec![dir.path().to_path_buf()], LineShape::StrArray);
        plan.output = Some(output.clone());
        plan.report = Some(report.clone());

        let (scan, outcome) = plan.execute().unwrap();
        assert_eq!(scan.files.len(), 2);
        assert_eq!(outcome.report.duplicates(), 1);

        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(written, "module.1 = \"B\"\nmodule.2 = \"C\"\n");
        assert!(report.exists());
    }

    #[test]
    fn test_plan_execute_without_inputs() {
        let dir = TempDir::new().unwrap();
        let plan = MergePlan::new(vec![dir.path().to_path_buf()], LineShape::PvRecord);
        assert!(matches!(plan.execute(), Err(Error::NoInputFiles(_))));
    }

    #[test]
    fn test_plan_load_missing_file() {
        let result = MergePlan::load("/definitely/not/here.json");
        assert!(matches!(result, Err(Error::FileRead { .. })));
    }

    #[test]
    fn test_plan_save_into_missing_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("plan.json");
        let plan = MergePlan::new(vec![PathBuf::from(".")], LineShape::StrArray);

        match plan.save(&target) {
            Err(Error::FileWrite { path, .. }) => assert_eq!(path, target),
            other => panic!("expected FileWrite error, got {:?}", other),
        }
    }
}
