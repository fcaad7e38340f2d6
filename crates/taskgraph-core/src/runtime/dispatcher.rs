// taskgraph-core/src/runtime/dispatcher.rs
// ============================================================================
// Module: Taskgraph Action Dispatcher
// Description: Per-action state machine with auto-rollback and event
//              journaling.
// Purpose: Invoke a registered Processor action and record its outcome.
// Dependencies: serde_json, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! `process_task` runs exactly one action against the processor registered
//! for a task's `apiVersion`, appending start/done/error events to
//! `<taskId>:PROCESSING_EVENTS`. On failure, it triggers at most one
//! auto-rollback attempt — never for a `Rollback` action itself, and never
//! for the read-only `Describe`/`DetectDrift` actions regardless of the
//! task's `autoRollback` flag.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::Action;
use crate::core::Task;
use crate::core::TaskId;
use crate::core::Timestamp;
use crate::core::VariableStore;
use crate::core::VariableValue;
use crate::core::processing_events_key;
use crate::core::rollback_from_key;
use crate::interfaces::ActionContext;
use crate::interfaces::Processor;
use crate::interfaces::ProcessorError;
use crate::interfaces::ProcessorRegistry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// What happened to the auto-rollback attempt for a failed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// No rollback was attempted (read-only action, `autoRollback` disabled,
    /// or the failing action was itself `Rollback`).
    NotAttempted,
    /// The rollback action ran and succeeded.
    Succeeded,
    /// The rollback action ran and itself failed.
    Failed,
}

/// Dispatcher errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The action name supplied to `process_task` does not name one of the
    /// six known actions.
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    /// No processor is registered for the task's `apiVersion`.
    #[error("no processor registered for api version '{0}'")]
    NoProcessor(String),
    /// The action failed; `rollback` records what happened next.
    #[error("action {action:?} failed: {message}")]
    ActionFailed {
        /// The action that failed.
        action: Action,
        /// The processor's failure message.
        message: String,
        /// The auto-rollback outcome.
        rollback: RollbackOutcome,
    },
}

// ============================================================================
// SECTION: Event Journal
// ============================================================================

fn append_event(variables: &mut VariableStore, task_id: &TaskId, now: Timestamp, label: &str, description: &str) {
    let record = crate::core::EventRecord::new(now, label, description, task_id.clone());
    let encoded = serde_json::to_value(&record).unwrap_or(Value::Null);
    variables.append_to_seq(processing_events_key(task_id), VariableValue::Opaque(encoded));
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Invokes `action_name` against the processor registered for `task`'s
/// `apiVersion`, journaling start/done/error events and running at most one
/// auto-rollback attempt on failure.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownAction`] if `action_name` doesn't name one
/// of the six actions, [`DispatchError::NoProcessor`] if no processor is
/// registered for the task's `apiVersion`, and [`DispatchError::ActionFailed`]
/// if the processor call (and any auto-rollback attempt) did not succeed.
pub fn process_task(
    registry: &ProcessorRegistry,
    task: &Task,
    action_name: &str,
    resolved_spec: &Value,
    variables: &mut VariableStore,
    now: Timestamp,
) -> Result<(), DispatchError> {
    append_event(variables, &task.task_id, now, "PROCESS_TASK_CALLED", "dispatch requested");
    let action = Action::parse(action_name).ok_or_else(|| DispatchError::UnknownAction(action_name.to_string()))?;
    let processor = registry.get(&task.api_version).ok_or_else(|| DispatchError::NoProcessor(task.api_version.clone()))?;
    run_action(processor, task, action, resolved_spec, variables, now)
}

fn run_action(
    processor: &(dyn Processor + Send + Sync),
    task: &Task,
    action: Action,
    resolved_spec: &Value,
    variables: &mut VariableStore,
    now: Timestamp,
) -> Result<(), DispatchError> {
    append_event(variables, &task.task_id, now, &format!("{}_START", action.event_prefix()), "action started");
    let outcome = {
        let mut ctx = ActionContext { task_id: &task.task_id, resolved_spec, variables: &mut *variables };
        processor.dispatch(action, &mut ctx)
    };
    match outcome {
        Ok(()) => {
            append_event(variables, &task.task_id, now, &format!("{}_DONE", action.event_prefix()), "action completed");
            Ok(())
        }
        Err(err) => {
            append_event(variables, &task.task_id, now, &format!("{}_ERROR", action.event_prefix()), &err.to_string());
            Err(handle_failure(processor, task, action, resolved_spec, variables, now, &err))
        }
    }
}

fn handle_failure(
    processor: &(dyn Processor + Send + Sync),
    task: &Task,
    action: Action,
    resolved_spec: &Value,
    variables: &mut VariableStore,
    now: Timestamp,
    original_err: &ProcessorError,
) -> DispatchError {
    let message = original_err.to_string();
    if action == Action::Rollback || action.is_read_only() || !task.auto_rollback {
        return DispatchError::ActionFailed { action, message, rollback: RollbackOutcome::NotAttempted };
    }

    variables.set(rollback_from_key(&task.task_id), action.processor_name());
    let rollback_prefix = Action::Rollback.event_prefix();
    append_event(variables, &task.task_id, now, &format!("{rollback_prefix}_START"), "auto-rollback started");

    let rollback_outcome = {
        let mut ctx = ActionContext { task_id: &task.task_id, resolved_spec, variables: &mut *variables };
        processor.rollback(&mut ctx)
    };

    match rollback_outcome {
        Ok(()) => {
            append_event(variables, &task.task_id, now, &format!("{rollback_prefix}_DONE"), "auto-rollback completed");
            DispatchError::ActionFailed { action, message, rollback: RollbackOutcome::Succeeded }
        }
        Err(rollback_err) => {
            append_event(variables, &task.task_id, now, &format!("{rollback_prefix}_ERROR"), &rollback_err.to_string());
            DispatchError::ActionFailed { action, message, rollback: RollbackOutcome::Failed }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use serde_json::Value;
    use serde_json::json;

    use super::DispatchError;
    use super::RollbackOutcome;
    use super::process_task;
    use crate::core::Task;
    use crate::core::Timestamp;
    use crate::core::VariableStore;
    use crate::core::processing_events_key;
    use crate::interfaces::ActionContext;
    use crate::interfaces::Processor;
    use crate::interfaces::ProcessorError;
    use crate::interfaces::ProcessorRegistry;

    struct FailingCreateProcessor {
        rollback_calls: AtomicU32,
    }

    impl Processor for FailingCreateProcessor {
        fn create(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Err(ProcessorError::Failed("boom".to_string()))
        }
        fn update(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Ok(())
        }
        fn delete(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Ok(())
        }
        fn rollback(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            self.rollback_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn describe(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Ok(())
        }
        fn detect_drift(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Ok(())
        }
    }

    fn registry_with(processor: FailingCreateProcessor) -> ProcessorRegistry {
        let mut registry = ProcessorRegistry::new();
        registry.register("v1", Box::new(processor));
        registry
    }

    /// S7 — auto-rollback runs exactly once, RollbackFrom is recorded, and
    /// the event sequence is ERROR then rollback START then rollback DONE.
    #[test]
    fn auto_rollback_runs_once_and_records_provenance() {
        let task = Task::new("v1", "k", json!({"name": "res", "autoRollback": true}), json!({}));
        let registry = registry_with(FailingCreateProcessor { rollback_calls: AtomicU32::new(0) });
        let mut variables = VariableStore::new();

        let err = process_task(&registry, &task, "CreateAction", &Value::Null, &mut variables, Timestamp::from_unix_seconds(1)).unwrap_err();

        match err {
            DispatchError::ActionFailed { rollback, .. } => assert_eq!(rollback, RollbackOutcome::Succeeded),
            other => panic!("expected ActionFailed, got {other:?}"),
        }

        let rollback_from = variables.get(&format!("{}:RollbackFrom", task.task_id).into()).unwrap();
        assert_eq!(rollback_from.as_str(), Some("CreateAction"));

        let events = variables.get(&processing_events_key(&task.task_id)).unwrap();
        let labels: Vec<String> = events
            .as_seq()
            .unwrap()
            .iter()
            .map(|e| e.as_opaque().unwrap().get("EventLabel").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            labels,
            vec![
                "PROCESS_TASK_CALLED",
                "CREATE_ACTION_START",
                "CREATE_ACTION_ERROR",
                "ROLLBACK_ACTION_START",
                "ROLLBACK_ACTION_DONE",
            ]
        );
    }

    #[test]
    fn read_only_actions_never_auto_rollback() {
        struct FailingDescribe;
        impl Processor for FailingDescribe {
            fn create(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
                Ok(())
            }
            fn update(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
                Ok(())
            }
            fn delete(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
                Ok(())
            }
            fn rollback(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
                panic!("rollback must not be called for a read-only action failure");
            }
            fn describe(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
                Err(ProcessorError::Failed("describe failed".to_string()))
            }
            fn detect_drift(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
                Ok(())
            }
        }

        let task = Task::new("v1", "k", json!({"name": "res", "autoRollback": true}), json!({}));
        let mut registry = ProcessorRegistry::new();
        registry.register("v1", Box::new(FailingDescribe));
        let mut variables = VariableStore::new();

        let err = process_task(&registry, &task, "DescribeAction", &Value::Null, &mut variables, Timestamp::from_unix_seconds(1)).unwrap_err();
        match err {
            DispatchError::ActionFailed { rollback, .. } => assert_eq!(rollback, RollbackOutcome::NotAttempted),
            other => panic!("expected ActionFailed, got {other:?}"),
        }
    }

    #[test]
    fn unknown_action_name_is_rejected() {
        let task = Task::new("v1", "k", json!({"name": "res"}), json!({}));
        let registry = registry_with(FailingCreateProcessor { rollback_calls: AtomicU32::new(0) });
        let mut variables = VariableStore::new();
        let err = process_task(&registry, &task, "FrobnicateAction", &Value::Null, &mut variables, Timestamp::from_unix_seconds(1)).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownAction(_)));
    }

    #[test]
    fn missing_processor_is_reported() {
        let task = Task::new("v2", "k", json!({"name": "res"}), json!({}));
        let registry = ProcessorRegistry::new();
        let mut variables = VariableStore::new();
        let err = process_task(&registry, &task, "CreateAction", &Value::Null, &mut variables, Timestamp::from_unix_seconds(1)).unwrap_err();
        assert!(matches!(err, DispatchError::NoProcessor(_)));
    }
}
