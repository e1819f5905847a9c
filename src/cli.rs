//! Command-line interface for mapcheck.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::report;
use crate::rules::{RuleId, RuleSet};
use crate::runner::Runner;

/// Exit codes.
pub const EXIT_CLEAN: i32 = 0;
pub const EXIT_FINDINGS: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Directories never worth descending into.
const SKIP_DIRS: &[&str] = &["bin", "obj", "packages", "node_modules", "TestResults"];

/// Generated-source suffixes the analyzer opts out of, matching the upstream
/// analyzer's generated-code exclusion.
const GENERATED_SUFFIXES: &[&str] = &[".g.cs", ".generated.cs", ".Designer.cs", ".AssemblyInfo.cs"];

/// AutoMapper upgrade analyzer.
///
/// Scans C# sources for AutoMapper API usage that is known to break across
/// the library's major versions and reports one categorized finding per
/// detected usage.
#[derive(Parser)]
#[command(name = "mapcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a file or directory for breaking-change usages
    #[command(visible_alias = "check")]
    Scan(ScanArgs),
    /// List the breaking-change rule catalog
    Rules,
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Path to scan (file or directory)
    pub path: PathBuf,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Include generated sources (*.g.cs, *.Designer.cs, ...)
    #[arg(long)]
    pub include_generated: bool,
}

/// Collect the C# files under `root`.
fn collect_files(root: &Path, include_generated: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // The root itself always passes; the skip rules apply only to
            // entries discovered while descending.
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if e.file_type().is_dir() && name.starts_with('.') {
                return false;
            }
            if e.file_type().is_dir() && SKIP_DIRS.contains(&name.as_ref()) {
                return false;
            }
            true
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("cs") {
            continue;
        }
        if !include_generated {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if GENERATED_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                continue;
            }
        }
        files.push(path.to_path_buf());
    }

    Ok(files)
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" && args.format != "sarif" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let files = if metadata.is_dir() {
        collect_files(&args.path, args.include_generated)?
    } else {
        vec![args.path.clone()]
    };

    if files.is_empty() {
        eprintln!("Warning: no C# files to scan");
        return Ok(EXIT_CLEAN);
    }

    let rules = RuleSet::breaking_changes()?;
    let runner = Runner::new(rules);
    let result = runner.run(&files);

    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&path_str, &result)?,
        "sarif" => report::write_sarif(&result)?,
        _ => report::write_pretty(&path_str, &result),
    }

    if result.has_findings() {
        Ok(EXIT_FINDINGS)
    } else {
        Ok(EXIT_CLEAN)
    }
}

/// Run the rules command: print the catalog.
pub fn run_rules() -> anyhow::Result<i32> {
    println!("Breaking-change rules:");
    println!();

    for id in RuleId::ALL {
        println!("  {:<8} {}", id.as_str(), id.summary());
        println!("           {}", id.guidance());
        println!();
    }

    Ok(EXIT_CLEAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_filters_extensions() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Program.cs"), "class P {}").unwrap();
        std::fs::write(temp.path().join("readme.md"), "# hi").unwrap();
        std::fs::write(temp.path().join("script.csx"), "// csx").unwrap();

        let files = collect_files(temp.path(), false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("Program.cs"));
    }

    #[test]
    fn test_collect_files_skips_build_dirs() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("obj")).unwrap();
        std::fs::write(temp.path().join("obj").join("Gen.cs"), "class G {}").unwrap();
        std::fs::write(temp.path().join("App.cs"), "class A {}").unwrap();

        let files = collect_files(temp.path(), false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("App.cs"));
    }

    #[test]
    fn test_collect_files_dot_named_root() {
        // Scanning a hidden directory directly (e.g. `mapcheck scan .foo`)
        // must walk it; only hidden subdirectories are skipped.
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".myrepo");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("Program.cs"), "class P {}").unwrap();
        std::fs::create_dir(root.join(".git")).unwrap();
        std::fs::write(root.join(".git").join("Hook.cs"), "class H {}").unwrap();

        let files = collect_files(&root, false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("Program.cs"));
    }

    #[test]
    fn test_collect_files_skips_generated() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Form.Designer.cs"), "class F {}").unwrap();
        std::fs::write(temp.path().join("Model.g.cs"), "class M {}").unwrap();
        std::fs::write(temp.path().join("Model.cs"), "class M {}").unwrap();

        let files = collect_files(temp.path(), false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("Model.cs"));

        let all = collect_files(temp.path(), true).unwrap();
        assert_eq!(all.len(), 3);
    }
}
