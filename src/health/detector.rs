// src/health/detector.rs

//! Periodic issue detection and auto-remediation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use sysinfo::System;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::DetectorSection;
use crate::health::issue::{DetectedIssue, IssueCategory, IssueSeverity};
use crate::health::patterns::PatternLibrary;
use crate::pool::ExecutorPool;

/// Pluggable source-code health scan.
pub trait CodeScanner: Send + Sync {
    fn scan(&self) -> Vec<DetectedIssue>;
}

/// Pluggable service health scan.
pub trait ServiceScanner: Send + Sync {
    fn scan(&self) -> Vec<DetectedIssue>;
}

/// Per-type remediation callback; registered callbacks take precedence over
/// the pool's default remediation mapping.
pub type IssueCallback = Box<dyn Fn(&DetectedIssue) + Send + Sync>;

/// Samples system, code and service health on an interval, archiving
/// detected issues and pushing remediation tasks into the attached pool.
///
/// The pool is an explicit optional dependency: without one the detector
/// only observes and archives.
pub struct IssueDetector {
    cfg: DetectorSection,
    pool: Option<Arc<ExecutorPool>>,
    patterns: PatternLibrary,
    code_scanner: Option<Box<dyn CodeScanner>>,
    service_scanner: Option<Box<dyn ServiceScanner>>,
    history: Mutex<VecDeque<DetectedIssue>>,
    handlers: Mutex<HashMap<String, IssueCallback>>,
    /// Kept across cycles so CPU readings are deltas since the previous
    /// sample rather than blocking measurements.
    system: Mutex<System>,
    running: AtomicBool,
}

impl IssueDetector {
    pub fn new(cfg: DetectorSection) -> Self {
        Self {
            cfg,
            pool: None,
            patterns: PatternLibrary::new(),
            code_scanner: None,
            service_scanner: None,
            history: Mutex::new(VecDeque::new()),
            handlers: Mutex::new(HashMap::new()),
            system: Mutex::new(System::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Attach the pool that receives remediation tasks.
    pub fn with_pool(mut self, pool: Arc<ExecutorPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_code_scanner(mut self, scanner: Box<dyn CodeScanner>) -> Self {
        self.code_scanner = Some(scanner);
        self
    }

    pub fn with_service_scanner(mut self, scanner: Box<dyn ServiceScanner>) -> Self {
        self.service_scanner = Some(scanner);
        self
    }

    fn history_locked(&self) -> MutexGuard<'_, VecDeque<DetectedIssue>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a custom remediation callback for an issue type.
    pub fn register_handler(&self, issue_type: impl Into<String>, callback: IssueCallback) {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(issue_type.into(), callback);
    }

    /// The library used to classify scanned text; exposed for the scan
    /// helpers in [`crate::health::scan`].
    pub fn pattern_library(&self) -> &PatternLibrary {
        &self.patterns
    }

    /// Run one detection cycle: code scan, service scan, resource scan.
    pub fn run_cycle(&self) {
        let mut issues = Vec::new();

        if let Some(scanner) = &self.code_scanner {
            issues.extend(scanner.scan());
        }
        if let Some(scanner) = &self.service_scanner {
            issues.extend(scanner.scan());
        }
        issues.extend(self.scan_resources());

        debug!(issues = issues.len(), "detection cycle complete");
        for issue in issues {
            self.process_issue(issue);
        }
    }

    /// Built-in resource scan.
    fn scan_resources(&self) -> Vec<DetectedIssue> {
        let (memory_pct, cpu_pct) = self.sample_resources();
        resource_issues(memory_pct, cpu_pct, &self.cfg)
    }

    fn sample_resources(&self) -> (f32, f32) {
        let mut sys = self.system.lock().unwrap_or_else(|e| e.into_inner());
        sys.refresh_memory();
        sys.refresh_cpu_usage();

        let total = sys.total_memory();
        let memory_pct = if total == 0 {
            0.0
        } else {
            sys.used_memory() as f32 / total as f32 * 100.0
        };

        let cpus = sys.cpus();
        let cpu_pct = if cpus.is_empty() {
            0.0
        } else {
            cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32
        };

        (memory_pct, cpu_pct)
    }

    /// Archive an issue and trigger remediation.
    ///
    /// A registered per-type callback wins over the default pool mapping;
    /// each auto-remediated issue produces exactly one downstream task.
    pub fn process_issue(&self, mut issue: DetectedIssue) {
        let handled_by_callback = {
            let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
            match handlers.get(&issue.issue_type) {
                Some(callback) => {
                    callback(&issue);
                    true
                }
                None => false,
            }
        };

        if !handled_by_callback && self.cfg.auto_fix {
            if let Some(pool) = &self.pool {
                match pool.handle_system_issue(&issue) {
                    Ok(task_id) => {
                        issue.auto_fix_attempted = true;
                        info!(
                            issue = %issue.id,
                            issue_type = %issue.issue_type,
                            task = %task_id,
                            "submitted remediation task"
                        );
                    }
                    Err(err) => {
                        warn!(
                            issue = %issue.id,
                            issue_type = %issue.issue_type,
                            error = %err,
                            "failed to submit remediation task"
                        );
                    }
                }
            }
        }

        let mut history = self.history_locked();
        history.push_back(issue);
        while history.len() > self.cfg.history {
            history.pop_front();
        }
    }

    /// Most recent issues, oldest first.
    pub fn recent_issues(&self, n: usize) -> Vec<DetectedIssue> {
        let history = self.history_locked();
        let skip = history.len().saturating_sub(n);
        history.iter().skip(skip).cloned().collect()
    }

    /// Spawn the background detection loop.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let detector = self;
        detector.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            info!(interval_ms = detector.cfg.interval_ms, "issue detector started");
            let mut interval =
                tokio::time::interval(Duration::from_millis(detector.cfg.interval_ms));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            while detector.running.load(Ordering::SeqCst) {
                interval.tick().await;
                if !detector.running.load(Ordering::SeqCst) {
                    break;
                }
                detector.run_cycle();
            }

            info!("issue detector stopped");
        })
    }

    /// Stop the detection loop after its current sleep.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for IssueDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueDetector")
            .field("interval_ms", &self.cfg.interval_ms)
            .field("auto_fix", &self.cfg.auto_fix)
            .field("has_pool", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}

/// Threshold classification of a resource sample. Pure so the thresholds
/// are testable without real memory pressure.
pub(crate) fn resource_issues(
    memory_pct: f32,
    cpu_pct: f32,
    cfg: &DetectorSection,
) -> Vec<DetectedIssue> {
    let mut issues = Vec::new();

    if memory_pct > cfg.memory_threshold {
        issues.push(DetectedIssue::new(
            IssueCategory::System,
            IssueSeverity::High,
            "memory_high",
            "system",
            format!("memory usage at {memory_pct:.1}%"),
        ));
    }

    if cpu_pct > cfg.cpu_threshold {
        issues.push(DetectedIssue::new(
            IssueCategory::Performance,
            IssueSeverity::Medium,
            "cpu_high",
            "system",
            format!("cpu usage at {cpu_pct:.1}%"),
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_over_threshold_raises_high_issue() {
        let cfg = DetectorSection::default();
        let issues = resource_issues(95.0, 10.0, &cfg);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "memory_high");
        assert_eq!(issues[0].severity, IssueSeverity::High);
        assert_eq!(issues[0].category, IssueCategory::System);
    }

    #[test]
    fn cpu_over_threshold_raises_medium_issue() {
        let cfg = DetectorSection::default();
        let issues = resource_issues(50.0, 99.0, &cfg);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "cpu_high");
        assert_eq!(issues[0].severity, IssueSeverity::Medium);
    }

    #[test]
    fn nominal_sample_raises_nothing() {
        let cfg = DetectorSection::default();
        assert!(resource_issues(50.0, 50.0, &cfg).is_empty());
    }

    #[test]
    fn both_thresholds_can_fire_together() {
        let cfg = DetectorSection::default();
        let issues = resource_issues(99.0, 99.0, &cfg);
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let cfg = DetectorSection {
            history: 3,
            auto_fix: false,
            ..DetectorSection::default()
        };
        let detector = IssueDetector::new(cfg);
        for i in 0..5 {
            detector.process_issue(DetectedIssue::new(
                IssueCategory::Service,
                IssueSeverity::Low,
                format!("issue_{i}"),
                "svc",
                "noise",
            ));
        }
        let recent = detector.recent_issues(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].issue_type, "issue_2");
        assert_eq!(recent[2].issue_type, "issue_4");
    }

    #[test]
    fn registered_callback_wins_over_auto_fix() {
        use std::sync::atomic::AtomicUsize;

        let detector = IssueDetector::new(DetectorSection::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in_callback = Arc::clone(&hits);
        detector.register_handler(
            "timeout_error",
            Box::new(move |_issue| {
                hits_in_callback.fetch_add(1, Ordering::SeqCst);
            }),
        );

        detector.process_issue(DetectedIssue::new(
            IssueCategory::Service,
            IssueSeverity::Medium,
            "timeout_error",
            "svc",
            "timed out",
        ));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        // Archived either way.
        assert_eq!(detector.recent_issues(10).len(), 1);
        assert!(!detector.recent_issues(10)[0].auto_fix_attempted);
    }
}
