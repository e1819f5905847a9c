//! Scan orchestration across files.
//!
//! Each file is an independent traversal of (tree, rule set), with no shared
//! mutable state, so files are scanned in parallel with rayon. Within one
//! file, visitation stays sequential to keep findings in source order.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::rules::{Finding, RuleSet};
use crate::syntax::CSharpParser;
use crate::walker::Walker;

/// A file that could not be scanned, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Results of scanning a set of files.
#[derive(Debug, Default, Serialize)]
pub struct ScanResult {
    /// All findings, grouped by file in input order, source order within.
    pub findings: Vec<Finding>,
    /// Number of files successfully parsed and walked.
    pub scanned: usize,
    /// Files skipped due to read or parse failures.
    pub skipped: Vec<SkippedFile>,
}

impl ScanResult {
    /// Whether any finding was emitted.
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }
}

/// Executes the breaking-change scan against a set of files.
pub struct Runner {
    parser: CSharpParser,
    rules: RuleSet,
}

impl Runner {
    /// Create a runner over the given rule set.
    pub fn new(rules: RuleSet) -> Self {
        Self {
            parser: CSharpParser::new(),
            rules,
        }
    }

    /// Scan all files, in parallel, one traversal per file.
    ///
    /// Unreadable files are recorded as skipped rather than aborting the
    /// scan. Findings keep the input file order.
    pub fn run(&self, files: &[PathBuf]) -> ScanResult {
        let per_file: Vec<_> = files.par_iter().map(|path| self.scan_file(path)).collect();

        let mut result = ScanResult::default();
        for (path, outcome) in files.iter().zip(per_file) {
            match outcome {
                Ok(findings) => {
                    result.scanned += 1;
                    result.findings.extend(findings);
                }
                Err(reason) => result.skipped.push(SkippedFile {
                    path: path.display().to_string(),
                    reason,
                }),
            }
        }
        result
    }

    fn scan_file(&self, path: &Path) -> Result<Vec<Finding>, String> {
        let source = fs::read(path).map_err(|e| e.to_string())?;
        let parsed = self
            .parser
            .parse(path, &source)
            .map_err(|e| e.to_string())?;
        Ok(Walker::new(&self.rules).analyze(&parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleId;
    use tempfile::TempDir;

    #[test]
    fn test_scan_directory_of_files() {
        let temp = TempDir::new().unwrap();
        let profile = temp.path().join("OrderProfile.cs");
        std::fs::write(
            &profile,
            "class OrderProfile : Profile { public OrderProfile() { CreateMap<Order, OrderDto>(); } }",
        )
        .unwrap();
        let startup = temp.path().join("Startup.cs");
        std::fs::write(
            &startup,
            "class Startup { void Configure() { Mapper.Initialize(c => {}); } }",
        )
        .unwrap();

        let runner = Runner::new(RuleSet::breaking_changes().unwrap());
        let result = runner.run(&[profile.clone(), startup]);

        assert_eq!(result.scanned, 2);
        assert!(result.skipped.is_empty());
        let ids: Vec<RuleId> = result.findings.iter().map(|f| f.rule).collect();
        assert_eq!(
            ids,
            vec![
                RuleId::ProfileInheritance,
                RuleId::CreateMapOverloads,
                RuleId::StaticInitialization,
            ]
        );
        assert!(result.findings[0].file.ends_with("OrderProfile.cs"));
    }

    #[test]
    fn test_missing_file_is_skipped_not_fatal() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("a.cs");
        std::fs::write(&present, "class A : Profile {}").unwrap();
        let missing = temp.path().join("gone.cs");

        let runner = Runner::new(RuleSet::breaking_changes().unwrap());
        let result = runner.run(&[missing, present]);

        assert_eq!(result.scanned, 1);
        assert_eq!(result.skipped.len(), 1);
        assert!(result.skipped[0].path.ends_with("gone.cs"));
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn test_clean_scan_has_no_findings() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("clean.cs");
        std::fs::write(&file, "class Repo { void Save(Order o) { _db.Add(o); } }").unwrap();

        let runner = Runner::new(RuleSet::breaking_changes().unwrap());
        let result = runner.run(&[file]);

        assert_eq!(result.scanned, 1);
        assert!(!result.has_findings());
    }
}
