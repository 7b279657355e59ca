// src/health/scan.rs

//! File and directory scan helpers for the issue detector.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::Result;
use crate::health::detector::CodeScanner;
use crate::health::issue::DetectedIssue;
use crate::health::patterns::PatternLibrary;

/// Scan a single file's text against the pattern library.
///
/// Non-UTF-8 content is read lossily; log files are messy.
pub fn scan_file(library: &PatternLibrary, path: &Path) -> Result<Vec<DetectedIssue>> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let target = path.display().to_string();
    Ok(library.classify(&text, &target))
}

/// Recursively scan a directory, keeping files whose extension is in
/// `extensions` (all files when empty). Unreadable entries are skipped with
/// a warning rather than aborting the scan.
pub fn scan_dir(
    library: &PatternLibrary,
    root: &Path,
    extensions: &[&str],
) -> Result<Vec<DetectedIssue>> {
    let mut issues = Vec::new();

    for entry in WalkDir::new(root).into_iter() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry during scan");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if !extensions.is_empty() {
            let matches = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.contains(&e))
                .unwrap_or(false);
            if !matches {
                continue;
            }
        }

        match scan_file(library, entry.path()) {
            Ok(found) => issues.extend(found),
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "failed to scan file");
            }
        }
    }

    debug!(root = %root.display(), issues = issues.len(), "directory scan complete");
    Ok(issues)
}

/// Ready-made [`CodeScanner`] that sweeps a directory with the pattern
/// library on every detection cycle.
pub struct DirectoryScanner {
    library: PatternLibrary,
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryScanner {
    pub fn new(root: impl Into<PathBuf>, extensions: &[&str]) -> Self {
        Self {
            library: PatternLibrary::new(),
            root: root.into(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl CodeScanner for DirectoryScanner {
    fn scan(&self) -> Vec<DetectedIssue> {
        let extensions: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
        match scan_dir(&self.library, &self.root, &extensions) {
            Ok(issues) => issues,
            Err(err) => {
                warn!(root = %self.root.display(), error = %err, "directory scan failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn scan_file_finds_signatures() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "boot ok").unwrap();
        writeln!(file, "worker: connection refused by upstream").unwrap();

        let library = PatternLibrary::new();
        let issues = scan_file(&library, file.path()).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "connection_error");
        assert!(issues[0].target.contains(
            file.path()
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
        ));
    }

    #[test]
    fn scan_dir_respects_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.log"), "request timed out").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "request timed out").unwrap();

        let library = PatternLibrary::new();
        let issues = scan_dir(&library, dir.path(), &["log"]).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].target.ends_with("app.log"));
    }

    #[test]
    fn scan_dir_without_filter_takes_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.log"), "address already in use").unwrap();
        std::fs::write(dir.path().join("b.out"), "SyntaxError: oops").unwrap();

        let library = PatternLibrary::new();
        let issues = scan_dir(&library, dir.path(), &[]).unwrap();
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let library = PatternLibrary::new();
        assert!(scan_file(&library, Path::new("/no/such/file.log")).is_err());
    }

    #[test]
    fn directory_scanner_feeds_the_detector() {
        use crate::config::DetectorSection;
        use crate::health::detector::IssueDetector;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("worker.log"), "ImportError: no module").unwrap();

        // Unreachable resource thresholds keep the cycle down to the
        // directory sweep.
        let cfg = DetectorSection {
            memory_threshold: 100.0,
            cpu_threshold: 100.0,
            auto_fix: false,
            ..DetectorSection::default()
        };
        let detector = IssueDetector::new(cfg)
            .with_code_scanner(Box::new(DirectoryScanner::new(dir.path(), &["log"])));

        detector.run_cycle();

        let issues = detector.recent_issues(10);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "import_error");
    }
}
