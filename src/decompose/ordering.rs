// src/decompose/ordering.rs

//! Topological batching of subtasks into parallel groups.

use std::collections::HashMap;

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use crate::decompose::subtask::Subtask;
use crate::errors::{EngineError, Result};

/// Kahn's-algorithm batching: repeatedly take the whole zero-in-degree
/// frontier as one parallel group, then unlock its dependents.
///
/// Groups preserve subtask declaration order, which keeps the result
/// deterministic. Dependencies on ids that are not among the given subtasks
/// are ignored (a caller contract, not validated here).
///
/// Fails with [`EngineError::DecompositionCycle`] if the frontier empties
/// while subtasks remain unscheduled.
pub fn execution_order(subtasks: &[Subtask]) -> Result<Vec<Vec<String>>> {
    if subtasks.is_empty() {
        return Ok(Vec::new());
    }

    let index_of: HashMap<&str, usize> = subtasks
        .iter()
        .enumerate()
        .map(|(i, s)| (s.subtask_id.as_str(), i))
        .collect();

    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for i in 0..subtasks.len() {
        graph.add_node(i);
    }
    for (i, subtask) in subtasks.iter().enumerate() {
        for dep in &subtask.dependencies {
            if let Some(&dep_idx) = index_of.get(dep.as_str()) {
                graph.add_edge(dep_idx, i, ());
            }
        }
    }

    let n = subtasks.len();
    let mut in_degree: Vec<usize> = (0..n)
        .map(|i| graph.neighbors_directed(i, Direction::Incoming).count())
        .collect();
    let mut scheduled = vec![false; n];
    let mut remaining = n;
    let mut order: Vec<Vec<String>> = Vec::new();

    while remaining > 0 {
        let frontier: Vec<usize> = (0..n)
            .filter(|&i| !scheduled[i] && in_degree[i] == 0)
            .collect();

        if frontier.is_empty() {
            let stuck: Vec<&str> = (0..n)
                .filter(|&i| !scheduled[i])
                .map(|i| subtasks[i].subtask_id.as_str())
                .collect();
            return Err(EngineError::DecompositionCycle(stuck.join(", ")));
        }

        for &i in &frontier {
            scheduled[i] = true;
            for dependent in graph.neighbors_directed(i, Direction::Outgoing) {
                in_degree[dependent] -= 1;
            }
        }
        remaining -= frontier.len();

        order.push(
            frontier
                .iter()
                .map(|&i| subtasks[i].subtask_id.clone())
                .collect(),
        );
    }

    Ok(order)
}

/// Critical-path style duration: per group take the longest subtask, then
/// sum the groups.
pub fn total_estimated_duration(
    subtasks: &[Subtask],
    order: &[Vec<String>],
) -> std::time::Duration {
    let duration_of: HashMap<&str, std::time::Duration> = subtasks
        .iter()
        .map(|s| (s.subtask_id.as_str(), s.estimated_duration))
        .collect();

    order
        .iter()
        .map(|group| {
            group
                .iter()
                .filter_map(|id| duration_of.get(id.as_str()).copied())
                .max()
                .unwrap_or_default()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskType;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn subtask(id: &str, deps: &[&str], secs: u64) -> Subtask {
        Subtask {
            subtask_id: id.to_string(),
            parent_task_id: "parent".to_string(),
            description: id.to_string(),
            task_type: TaskType::Custom,
            priority: 5,
            estimated_duration: Duration::from_secs(secs),
            dependencies: deps.iter().map(|d| d.to_string()).collect::<BTreeSet<_>>(),
            can_parallelize: true,
        }
    }

    #[test]
    fn diamond_batches_into_three_groups() {
        let subtasks = vec![
            subtask("a", &[], 5),
            subtask("b", &["a"], 10),
            subtask("c", &["a"], 20),
            subtask("d", &["b", "c"], 5),
        ];
        let order = execution_order(&subtasks).unwrap();
        assert_eq!(
            order,
            vec![
                vec!["a".to_string()],
                vec!["b".to_string(), "c".to_string()],
                vec!["d".to_string()],
            ]
        );
    }

    #[test]
    fn critical_path_sums_group_maxima() {
        let subtasks = vec![
            subtask("a", &[], 5),
            subtask("b", &["a"], 10),
            subtask("c", &["a"], 20),
            subtask("d", &["b", "c"], 5),
        ];
        let order = execution_order(&subtasks).unwrap();
        let total = total_estimated_duration(&subtasks, &order);
        // 5 + max(10, 20) + 5
        assert_eq!(total, Duration::from_secs(30));
    }

    #[test]
    fn cycle_fails_decomposition() {
        let subtasks = vec![
            subtask("a", &["b"], 5),
            subtask("b", &["a"], 5),
            subtask("c", &[], 5),
        ];
        let err = execution_order(&subtasks).unwrap_err();
        match err {
            EngineError::DecompositionCycle(names) => {
                assert!(names.contains('a') && names.contains('b'));
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dependencies_are_ignored() {
        let subtasks = vec![subtask("a", &["ghost"], 5), subtask("b", &["a"], 5)];
        let order = execution_order(&subtasks).unwrap();
        assert_eq!(order, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }

    #[test]
    fn empty_input_yields_empty_order() {
        assert!(execution_order(&[]).unwrap().is_empty());
    }
}
