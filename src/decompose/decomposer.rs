// src/decompose/decomposer.rs

//! Splitting compound tasks into dependency-ordered subtasks.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DecomposerSection;
use crate::decompose::ordering::{execution_order, total_estimated_duration};
use crate::decompose::subtask::{Subtask, TaskDecomposition};
use crate::decompose::templates::{self, TemplateKind};
use crate::errors::Result;
use crate::task::{Task, TaskType};

/// Markers that join independent clauses in a compound description.
const CONJUNCTION_MARKERS: [&str; 2] = [" and ", " then "];

/// Markers that make a subtask depend on its predecessor.
const SEQUENTIAL_MARKERS: [&str; 3] = ["requires", "after", "then"];

/// Markers that veto parallel execution without adding an edge.
const CONFLICT_MARKERS: [&str; 2] = ["conflicts", "cannot"];

/// Splits compound task descriptions into subtasks with a dependency graph
/// and a topologically valid execution order.
///
/// Decomposition is deterministic: the same task and context always produce
/// the same subtasks in the same order.
#[derive(Debug, Clone)]
pub struct TaskDecomposer {
    length_threshold: usize,
}

impl TaskDecomposer {
    pub fn new(cfg: DecomposerSection) -> Self {
        Self {
            length_threshold: cfg.length_threshold,
        }
    }

    /// Whether a task qualifies for decomposition: long description, or at
    /// least two conjunction markers.
    pub fn is_complex(&self, task: &Task) -> bool {
        let text = task.description_text();
        if text.len() > self.length_threshold {
            return true;
        }
        let lower = text.to_ascii_lowercase();
        let conjunctions: usize = CONJUNCTION_MARKERS
            .iter()
            .map(|m| lower.matches(m).count())
            .sum();
        conjunctions >= 2
    }

    /// Decompose a task into subtasks.
    ///
    /// `context` carries extra classification hints (merged into the text
    /// used for template selection, in key order for determinism).
    pub fn decompose_task(
        &self,
        task: &Task,
        context: &HashMap<String, String>,
    ) -> Result<TaskDecomposition> {
        let text = task.description_text();

        let steps = self.plan_steps(task, &text, context);
        let mut subtasks = self.build_subtasks(task, &steps);
        infer_dependencies(&mut subtasks);

        let order = execution_order(&subtasks)?;
        let total = total_estimated_duration(&subtasks, &order);

        let dependency_graph: BTreeMap<_, _> = subtasks
            .iter()
            .map(|s| (s.subtask_id.clone(), s.dependencies.clone()))
            .collect();

        info!(
            task = %task.id,
            subtasks = subtasks.len(),
            groups = order.len(),
            total_estimated_ms = total.as_millis() as u64,
            "decomposed task"
        );

        Ok(TaskDecomposition {
            decomposition_id: Uuid::new_v4().to_string(),
            task: task.clone(),
            subtasks,
            dependency_graph,
            execution_order: order,
            total_estimated_duration: total,
        })
    }

    /// Decide the step descriptions.
    ///
    /// A description with conjunction-separated clauses is split into those
    /// clauses ("analyze X then fix X" becomes two subtasks, the second
    /// requiring the first). Otherwise the keyword-selected template
    /// provides the steps.
    fn plan_steps(
        &self,
        task: &Task,
        text: &str,
        context: &HashMap<String, String>,
    ) -> Vec<PlannedStep> {
        let clauses = split_clauses(text);
        if clauses.len() >= 2 {
            debug!(task = %task.id, clauses = clauses.len(), "decomposing by clause split");
            return clauses;
        }

        let mut classification = format!("{} {}", task.task_type, text);
        let mut hint_keys: Vec<&String> = context.keys().collect();
        hint_keys.sort();
        for key in hint_keys {
            classification.push(' ');
            classification.push_str(&context[key]);
        }

        let template = templates::classify(&classification);
        debug!(task = %task.id, template = template.name(), "decomposing by template");
        template_steps(template)
    }

    fn build_subtasks(&self, task: &Task, steps: &[PlannedStep]) -> Vec<Subtask> {
        let count = steps.len();
        steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let subtask_id = format!("{}-sub-{}", task.id, i + 1);
                let mut dependencies = std::collections::BTreeSet::new();
                if step.requires_previous && i > 0 {
                    dependencies.insert(format!("{}-sub-{}", task.id, i));
                }
                Subtask {
                    subtask_id,
                    parent_task_id: task.id.clone(),
                    task_type: infer_type(&step.description, task.task_type),
                    priority: subtask_priority(task.priority, i, count, &step.description),
                    estimated_duration: estimate_duration(&step.description),
                    description: step.description.clone(),
                    dependencies,
                    can_parallelize: true,
                }
            })
            .collect()
    }
}

/// A step planned for a subtask, before assignment.
#[derive(Debug, Clone)]
struct PlannedStep {
    description: String,
    /// Set when the step was split off a `then` boundary.
    requires_previous: bool,
}

fn template_steps(template: TemplateKind) -> Vec<PlannedStep> {
    template
        .steps()
        .iter()
        .map(|s| PlannedStep {
            description: s.to_string(),
            requires_previous: false,
        })
        .collect()
}

/// Split a description on conjunction markers, remembering which boundaries
/// were `then` (sequential) rather than `and` (parallel).
fn split_clauses(text: &str) -> Vec<PlannedStep> {
    let mut clauses = Vec::new();
    let mut rest = text;
    let mut requires_previous = false;

    loop {
        let lower = rest.to_ascii_lowercase();
        let next_then = lower.find(" then ");
        let next_and = lower.find(" and ");

        let boundary = match (next_then, next_and) {
            (Some(t), Some(a)) if t <= a => Some((t, " then ".len(), true)),
            (Some(t), None) => Some((t, " then ".len(), true)),
            (_, Some(a)) => Some((a, " and ".len(), false)),
            (None, None) => None,
        };

        match boundary {
            Some((pos, marker_len, is_then)) => {
                let clause = rest[..pos].trim();
                if !clause.is_empty() {
                    clauses.push(PlannedStep {
                        description: clause.to_string(),
                        requires_previous,
                    });
                }
                rest = &rest[pos + marker_len..];
                requires_previous = is_then;
            }
            None => {
                let clause = rest.trim();
                if !clause.is_empty() {
                    clauses.push(PlannedStep {
                        description: clause.to_string(),
                        requires_previous,
                    });
                }
                break;
            }
        }
    }

    clauses
}

/// Earliest keyword occurrence wins, so "implement a fix" types as a fix
/// rather than whatever the trailing words suggest.
fn infer_type(description: &str, parent: TaskType) -> TaskType {
    let lower = description.to_ascii_lowercase();

    let groups: [(&[&str], TaskType); 4] = [
        (&["fix", "repair", "patch", "correct"], TaskType::Fix),
        (
            &["analy", "investigate", "review", "inspect", "profile"],
            TaskType::Analyze,
        ),
        (&["optimi", "speed", "performance"], TaskType::Optimize),
        // No dedicated test type exists; verification work is analysis.
        (&["test", "verify", "validate"], TaskType::Analyze),
    ];

    let mut best: Option<(usize, TaskType)> = None;
    for (keywords, ty) in groups {
        for keyword in keywords {
            if let Some(pos) = lower.find(keyword) {
                if best.map(|(b, _)| pos < b).unwrap_or(true) {
                    best = Some((pos, ty));
                }
            }
        }
    }

    best.map(|(_, ty)| ty).unwrap_or(parent)
}

/// Parent priority degraded proportionally to position, with a boost for
/// steps flagged as critical path in their own wording.
fn subtask_priority(parent: u8, index: usize, count: usize, description: &str) -> u8 {
    let offset = (index * 4) / count.max(1);
    let mut prio = (parent as usize + offset).clamp(1, 10) as u8;

    let lower = description.to_ascii_lowercase();
    if ["critical", "core", "essential"]
        .iter()
        .any(|k| lower.contains(k))
    {
        prio = prio.saturating_sub(2).max(1);
    }
    prio
}

/// Keyword → duration lookup, earliest occurrence winning.
fn estimate_duration(description: &str) -> Duration {
    let lower = description.to_ascii_lowercase();

    let table: [(&str, u64); 4] = [("analy", 5), ("design", 10), ("implement", 30), ("test", 15)];

    let mut best: Option<(usize, u64)> = None;
    for (keyword, secs) in table {
        if let Some(pos) = lower.find(keyword) {
            if best.map(|(b, _)| pos < b).unwrap_or(true) {
                best = Some((pos, secs));
            }
        }
    }

    Duration::from_secs(best.map(|(_, secs)| secs).unwrap_or(10))
}

/// Pairwise marker scan over the planned subtasks.
///
/// - A description with a sequential marker depends on its predecessor.
/// - One with "before" is depended on by its successor.
/// - Conflict markers veto parallelism for the subtask and its predecessor
///   without adding an edge.
fn infer_dependencies(subtasks: &mut [Subtask]) {
    let n = subtasks.len();
    for i in 0..n {
        let lower = subtasks[i].description.to_ascii_lowercase();

        if i > 0 && SEQUENTIAL_MARKERS.iter().any(|m| lower.contains(m)) {
            let prev = subtasks[i - 1].subtask_id.clone();
            subtasks[i].dependencies.insert(prev);
        }

        if i + 1 < n && lower.contains("before") {
            let this = subtasks[i].subtask_id.clone();
            subtasks[i + 1].dependencies.insert(this);
        }

        if CONFLICT_MARKERS.iter().any(|m| lower.contains(m)) {
            subtasks[i].can_parallelize = false;
            if i > 0 {
                subtasks[i - 1].can_parallelize = false;
            }
        }
    }
}
