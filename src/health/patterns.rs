// src/health/patterns.rs

//! Static pattern library for classifying raw log/source text into issues.

use regex::Regex;

use crate::health::issue::{DetectedIssue, IssueCategory, IssueSeverity};

/// One recognizable failure signature.
#[derive(Debug)]
pub struct IssuePattern {
    pub issue_type: &'static str,
    pub category: IssueCategory,
    pub severity: IssueSeverity,
    regex: Regex,
}

impl IssuePattern {
    fn new(
        issue_type: &'static str,
        category: IssueCategory,
        severity: IssueSeverity,
        pattern: &str,
    ) -> Self {
        Self {
            issue_type,
            category,
            severity,
            // Patterns are static literals; failing to compile is a
            // programming error, not a runtime condition.
            regex: Regex::new(pattern).expect("builtin issue pattern compiles"),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// The built-in signatures, scanned in declaration order.
#[derive(Debug)]
pub struct PatternLibrary {
    patterns: Vec<IssuePattern>,
}

impl PatternLibrary {
    pub fn new() -> Self {
        let patterns = vec![
            IssuePattern::new(
                "import_error",
                IssueCategory::Code,
                IssueSeverity::High,
                r"(?i)ImportError|ModuleNotFoundError|unresolved import|cannot find (crate|module)",
            ),
            IssuePattern::new(
                "syntax_error",
                IssueCategory::Code,
                IssueSeverity::High,
                r"(?i)SyntaxError|unexpected token|expected .+, found",
            ),
            IssuePattern::new(
                "encoding_error",
                IssueCategory::Code,
                IssueSeverity::Medium,
                r"(?i)UnicodeDecodeError|invalid utf-?8|encoding error",
            ),
            IssuePattern::new(
                "type_error",
                IssueCategory::Code,
                IssueSeverity::Medium,
                r"(?i)TypeError|mismatched types|type mismatch",
            ),
            IssuePattern::new(
                "port_conflict",
                IssueCategory::Network,
                IssueSeverity::High,
                r"(?i)address already in use|EADDRINUSE|port \d+ is (already )?in use",
            ),
            IssuePattern::new(
                "memory_issue",
                IssueCategory::System,
                IssueSeverity::Critical,
                r"(?i)OutOfMemory|out of memory|memory exhausted|cannot allocate memory",
            ),
            IssuePattern::new(
                "connection_error",
                IssueCategory::Network,
                IssueSeverity::High,
                r"(?i)ConnectionRefused|connection refused|connection reset|ConnectionError",
            ),
            IssuePattern::new(
                "timeout_error",
                IssueCategory::Service,
                IssueSeverity::Medium,
                r"(?i)TimeoutError|timed out|deadline exceeded",
            ),
        ];
        Self { patterns }
    }

    /// Run every pattern over `text`; one issue per matching pattern.
    ///
    /// The description carries the first matching line so the remediation
    /// task has something concrete to work from.
    pub fn classify(&self, text: &str, target: &str) -> Vec<DetectedIssue> {
        self.patterns
            .iter()
            .filter(|p| p.is_match(text))
            .map(|p| {
                let evidence = text
                    .lines()
                    .find(|line| p.is_match(line))
                    .unwrap_or("")
                    .trim();
                DetectedIssue::new(
                    p.category,
                    p.severity,
                    p.issue_type,
                    target,
                    format!("matched pattern '{}': {evidence}", p.issue_type),
                )
            })
            .collect()
    }

    pub fn patterns(&self) -> &[IssuePattern] {
        &self.patterns
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::new()
    }
}
