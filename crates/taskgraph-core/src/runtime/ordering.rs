// taskgraph-core/src/runtime/ordering.rs
// ============================================================================
// Module: Taskgraph Ordering Engine
// Description: Scope filtering, dependency lookup, and deterministic
//              topological ordering over a (command, context) scope.
// Purpose: Give the executor a dependency-correct, duplicate-free task order.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! `task_names_in_order` performs a depth-first traversal in task-set
//! insertion order, recursing into dependencies before appending the
//! dependent task. An explicit in-progress path (not just a completed set)
//! detects cycles instead of letting them terminate silently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;

use thiserror::Error;

use crate::core::Command;
use crate::core::Context;
use crate::core::TaskId;
use crate::core::TaskSet;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Ordering engine errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderingError {
    /// A dependency was referenced but is not itself in scope for the run.
    #[error("task '{task}' depends on '{dependency}', which is out of scope")]
    DependencyOutOfScope {
        /// The task that declared the dependency.
        task: TaskId,
        /// The out-of-scope dependency.
        dependency: TaskId,
    },
    /// A dependency cycle was found among the named participants, listed in
    /// the order the cycle was encountered.
    #[error("dependency cycle detected: {}", participants.iter().map(TaskId::as_str).collect::<Vec<_>>().join(" -> "))]
    DependencyCycle {
        /// The task ids participating in the cycle.
        participants: Vec<TaskId>,
    },
    /// A task id was referenced that does not exist in the task set.
    #[error("unknown task '{0}'")]
    UnknownTask(TaskId),
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Returns a deterministic ordering of every in-scope task under
/// `(cmd, ctx)`, such that every in-scope task precedes every in-scope task
/// that depends on it.
///
/// # Errors
///
/// Returns [`OrderingError::DependencyOutOfScope`] if an active dependency
/// is not itself in scope, and [`OrderingError::DependencyCycle`] if the
/// dependency graph contains a cycle.
pub fn task_names_in_order(tasks: &TaskSet, cmd: &Command, ctx: &Context) -> Result<Vec<TaskId>, OrderingError> {
    let mut order = Vec::new();
    let mut completed = HashSet::new();
    let mut path = Vec::new();
    for task_id in tasks.insertion_order() {
        let Some(task) = tasks.get(task_id) else {
            continue;
        };
        if !task.is_in_scope(cmd, ctx) {
            continue;
        }
        visit(tasks, task_id, cmd, ctx, &mut order, &mut completed, &mut path)?;
    }
    Ok(order)
}

fn visit(
    tasks: &TaskSet,
    task_id: &TaskId,
    cmd: &Command,
    ctx: &Context,
    order: &mut Vec<TaskId>,
    completed: &mut HashSet<TaskId>,
    path: &mut Vec<TaskId>,
) -> Result<(), OrderingError> {
    if completed.contains(task_id) {
        return Ok(());
    }
    if let Some(pos) = path.iter().position(|id| id == task_id) {
        let mut participants = path[pos..].to_vec();
        participants.push(task_id.clone());
        return Err(OrderingError::DependencyCycle { participants });
    }
    path.push(task_id.clone());
    let task = tasks.get(task_id).ok_or_else(|| OrderingError::UnknownTask(task_id.clone()))?;
    for dep in task.active_dependencies(cmd, ctx) {
        let in_scope = tasks.get(&dep).is_some_and(|dep_task| dep_task.is_in_scope(cmd, ctx));
        if !in_scope {
            path.pop();
            return Err(OrderingError::DependencyOutOfScope { task: task_id.clone(), dependency: dep });
        }
        visit(tasks, &dep, cmd, ctx, order, completed, path)?;
    }
    path.pop();
    completed.insert(task_id.clone());
    if !order.contains(task_id) {
        order.push(task_id.clone());
    }
    Ok(())
}

/// Returns the expanded, order-preserving list of active dependencies for
/// `task_id` under `(cmd, ctx)`.
///
/// # Errors
///
/// Returns [`OrderingError::UnknownTask`] if `task_id` is not in the set,
/// and [`OrderingError::DependencyOutOfScope`] if any active dependency is
/// itself out of scope.
pub fn dependencies_for(tasks: &TaskSet, task_id: &TaskId, cmd: &Command, ctx: &Context) -> Result<Vec<TaskId>, OrderingError> {
    let task = tasks.get(task_id).ok_or_else(|| OrderingError::UnknownTask(task_id.clone()))?;
    let deps = task.active_dependencies(cmd, ctx);
    for dep in &deps {
        let in_scope = tasks.get(dep).is_some_and(|dep_task| dep_task.is_in_scope(cmd, ctx));
        if !in_scope {
            return Err(OrderingError::DependencyOutOfScope { task: task_id.clone(), dependency: dep.clone() });
        }
    }
    Ok(deps)
}

/// Returns true if `task_id` is in scope for `(cmd, ctx)`. Returns false for
/// an unknown task id rather than erroring, since "is this task relevant
/// right now" is a query, not a traversal step.
#[must_use]
pub fn task_scoped_for_processing(tasks: &TaskSet, task_id: &TaskId, cmd: &Command, ctx: &Context) -> bool {
    tasks.get(task_id).is_some_and(|task| task.is_in_scope(cmd, ctx))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::OrderingError;
    use super::dependencies_for;
    use super::task_names_in_order;
    use crate::core::Command;
    use crate::core::Context;
    use crate::core::Task;
    use crate::core::TaskSet;

    fn cmd(s: &str) -> Command {
        Command::from(s)
    }

    fn ctx(s: &str) -> Context {
        Context::from(s)
    }

    /// S1 — basic dependency: t2 depends on t1, t1 scoped to (c1|c2, x1|x2),
    /// inserted in order [t2, t1]; order must come out [t1, t2].
    #[test]
    fn basic_dependency_orders_dependency_first() {
        let mut tasks = TaskSet::new();
        tasks.insert(Task::new(
            "v1",
            "k",
            json!({"name": "t2", "dependencies": [{"tasks": ["t1"]}]}),
            json!({}),
        ));
        tasks.insert(Task::new(
            "v1",
            "k",
            json!({"name": "t1", "processingScope": [{"commands": ["c1", "c2"], "contexts": ["x1", "x2"]}]}),
            json!({}),
        ));

        let order = task_names_in_order(&tasks, &cmd("c1"), &ctx("x1")).unwrap();
        assert_eq!(order, vec!["t1".into(), "t2".into()]);
    }

    /// S2 — conditional dependency: only active under the clause's own
    /// command/context.
    #[test]
    fn conditional_dependency_is_scoped_to_its_clause() {
        let mut tasks = TaskSet::new();
        tasks.insert(Task::new("v1", "k", json!({"name": "t1"}), json!({})));
        tasks.insert(Task::new(
            "v1",
            "k",
            json!({"name": "t2", "dependencies": [{"tasks": ["t1"], "commands": ["c1"], "contexts": ["x1"]}]}),
            json!({}),
        ));

        assert_eq!(dependencies_for(&tasks, &"t2".into(), &cmd("c1"), &ctx("x1")).unwrap(), vec!["t1".into()]);
        assert!(dependencies_for(&tasks, &"t2".into(), &cmd("c2"), &ctx("x1")).unwrap().is_empty());
        assert!(dependencies_for(&tasks, &"t2".into(), &cmd("c1"), &ctx("x2")).unwrap().is_empty());
    }

    /// S3 — an active dependency that's out of scope under the requested
    /// command raises `DependencyOutOfScope`.
    #[test]
    fn out_of_scope_dependency_raises() {
        let mut tasks = TaskSet::new();
        tasks.insert(Task::new(
            "v1",
            "k",
            json!({"name": "t1", "processingScope": [{"commands": ["c1", "c2"]}]}),
            json!({}),
        ));
        tasks.insert(Task::new("v1", "k", json!({"name": "t2", "dependencies": [{"tasks": ["t1"]}]}), json!({})));

        let err = task_names_in_order(&tasks, &cmd("c3"), &ctx("any")).unwrap_err();
        assert!(matches!(err, OrderingError::DependencyOutOfScope { .. }));
    }

    /// S-extra — a direct cycle must be reported, not silently dropped.
    #[test]
    fn cycle_is_detected() {
        let mut tasks = TaskSet::new();
        tasks.insert(Task::new("v1", "k", json!({"name": "t1", "dependencies": [{"tasks": ["t2"]}]}), json!({})));
        tasks.insert(Task::new("v1", "k", json!({"name": "t2", "dependencies": [{"tasks": ["t1"]}]}), json!({})));

        let err = task_names_in_order(&tasks, &cmd("apply"), &ctx("prod")).unwrap_err();
        assert!(matches!(err, OrderingError::DependencyCycle { .. }));
    }

    #[test]
    fn order_is_duplicate_free_under_diamond_dependency() {
        let mut tasks = TaskSet::new();
        tasks.insert(Task::new("v1", "k", json!({"name": "base"}), json!({})));
        tasks.insert(Task::new("v1", "k", json!({"name": "left", "dependencies": [{"tasks": ["base"]}]}), json!({})));
        tasks.insert(Task::new("v1", "k", json!({"name": "right", "dependencies": [{"tasks": ["base"]}]}), json!({})));
        tasks.insert(Task::new(
            "v1",
            "k",
            json!({"name": "top", "dependencies": [{"tasks": ["left", "right"]}]}),
            json!({}),
        ));

        let order = task_names_in_order(&tasks, &cmd("apply"), &ctx("prod")).unwrap();
        let unique: std::collections::HashSet<_> = order.iter().collect();
        assert_eq!(unique.len(), order.len());
        assert!(order.iter().position(|t| t.as_str() == "base").unwrap() < order.iter().position(|t| t.as_str() == "top").unwrap());
    }
}
