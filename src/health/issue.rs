// src/health/issue.rs

//! Detected-issue model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Code,
    System,
    Service,
    Performance,
    Security,
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

/// An abnormal condition observed by the detector (or reported externally),
/// convertible into a remediation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedIssue {
    pub id: String,
    pub category: IssueCategory,
    pub severity: IssueSeverity,
    pub issue_type: String,
    /// What the issue is about: a host, a file path, a service name.
    pub target: String,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub auto_fix_attempted: bool,
    pub resolved: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DetectedIssue {
    pub fn new(
        category: IssueCategory,
        severity: IssueSeverity,
        issue_type: impl Into<String>,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category,
            severity,
            issue_type: issue_type.into(),
            target: target.into(),
            description: description.into(),
            detected_at: Utc::now(),
            auto_fix_attempted: false,
            resolved: false,
            metadata: Map::new(),
        }
    }
}
