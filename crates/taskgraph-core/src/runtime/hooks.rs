// taskgraph-core/src/runtime/hooks.rs
// ============================================================================
// Module: Taskgraph Built-In Hooks
// Description: The four pipeline stages that express the core per-task logic.
// Purpose: Resolve variables, dispatch the action, commit new state, and
//          sink terminal errors.
// Dependencies: serde_json, crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! These four hooks are the default `WorkflowExecutor` pipeline. Each reads
//! and writes only through its [`HookContext`] operands — no hook holds its
//! own hidden state across tasks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde_json::Value;

use crate::core::Timestamp;
use crate::core::VariableValue;
use crate::core::resolved_spec_key;
use crate::core::task_state_key;
use crate::core::task_state_updates_key;
use crate::core::task::TaskState;
use crate::interfaces::Hook;
use crate::interfaces::HookContext;
use crate::interfaces::HookError;
use crate::runtime::dispatcher::process_task;
use crate::runtime::resolver::resolve_spec;

fn current_timestamp() -> Timestamp {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    Timestamp::from_unix_seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}

fn hook_failed(hook: &str, message: impl Into<String>) -> HookError {
    HookError::Failed { hook: hook.to_string(), message: message.into() }
}

// ============================================================================
// SECTION: ResolveTaskSpecVariablesHook
// ============================================================================

/// Writes `ResolvedSpec:<taskId>` by resolving every `${VAR:...}` placeholder
/// in the task's raw spec against the shared variable store.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolveTaskSpecVariablesHook;

impl Hook for ResolveTaskSpecVariablesHook {
    fn name(&self) -> &str {
        "ResolveTaskSpecVariablesHook"
    }

    fn run(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        let resolved = resolve_spec(&ctx.task.spec, &ctx.parameters.command, &ctx.parameters.context, ctx.variables);
        ctx.variables.set(resolved_spec_key(&ctx.task.task_id), VariableValue::Opaque(resolved));
        Ok(())
    }
}

// ============================================================================
// SECTION: TaskProcessingHook
// ============================================================================

/// Validates parameters, looks up the processor for `task.apiVersion`, reads
/// the resolved spec (falling back to the raw spec), and dispatches the
/// configured action.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskProcessingHook;

impl Hook for TaskProcessingHook {
    fn name(&self) -> &str {
        "TaskProcessingHook"
    }

    fn run(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        if !ctx.validator.validation_passed(ctx.parameters) {
            return Ok(());
        }
        let Some(action) = ctx.parameters.action else {
            return Err(hook_failed(self.name(), "no action resolved for this run"));
        };
        if ctx.processors.get(&ctx.task.api_version).is_none() {
            return Err(hook_failed(self.name(), format!("no processor registered for api version '{}'", ctx.task.api_version)));
        }

        let resolved_spec = ctx
            .variables
            .get(&resolved_spec_key(&ctx.task.task_id))
            .and_then(|value| value.as_opaque().cloned())
            .unwrap_or_else(|| ctx.task.spec.clone());

        process_task(ctx.processors, ctx.task, action.processor_name(), &resolved_spec, ctx.variables, current_timestamp())
            .map_err(|err| hook_failed(self.name(), err.to_string()))
    }
}

// ============================================================================
// SECTION: TaskPostProcessingStateUpdateHook
// ============================================================================

/// Consumes `<taskId>:TASK_STATE_UPDATES`. When `state_changed` is true and
/// parameters pass validation, replaces `task.state` with a fresh
/// `TaskState` built from the update payload and persists it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskPostProcessingStateUpdateHook;

impl Hook for TaskPostProcessingStateUpdateHook {
    fn name(&self) -> &str {
        "TaskPostProcessingStateUpdateHook"
    }

    fn run(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        if !ctx.validator.validation_passed(ctx.parameters) {
            return Ok(());
        }
        let Some(updates) = ctx.variables.get(&task_state_updates_key(&ctx.task.task_id)).and_then(|v| v.as_opaque().cloned()) else {
            return Ok(());
        };
        let Some(obj) = updates.as_object() else {
            return Ok(());
        };
        let state_changed = obj.get("state_changed").and_then(Value::as_bool).unwrap_or(false);
        if !state_changed {
            return Ok(());
        }

        let raw_spec = obj.get("raw_spec").cloned().unwrap_or(Value::Null);
        let metadata = obj.get("metadata").cloned().unwrap_or(Value::Null);
        let resolved_spec_applied = obj.get("resolved_spec_applied").cloned().unwrap_or(Value::Null);
        let resource_checksum = obj.get("resource_checksum").and_then(Value::as_str).map(str::to_string);
        let create_timestamp = obj.get("create_timestamp").and_then(Value::as_i64).unwrap_or(0);

        let mut new_state = TaskState::new(raw_spec, metadata, ctx.task.state.report_label.clone());
        new_state.current_resolved_spec = Some(resolved_spec_applied.clone());
        new_state.update_applied_spec(resolved_spec_applied, resource_checksum, Timestamp::from_unix_seconds(create_timestamp));
        ctx.task.state = new_state;

        let persisted = ctx.task.state.to_map(false, true, true);
        ctx.persistence
            .update_object_state(&task_state_key(&ctx.task.task_id), persisted)
            .map_err(|err| hook_failed(self.name(), err.to_string()))
    }
}

// ============================================================================
// SECTION: GeneralErrorHook
// ============================================================================

/// Terminal error sink: logs the accumulated stacktrace and does not
/// re-raise, since by the time it runs the executor is already unwinding
/// the workflow.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeneralErrorHook;

impl Hook for GeneralErrorHook {
    fn name(&self) -> &str {
        "GeneralErrorHook"
    }

    fn run(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        if let Some(trace) = &ctx.parameters.exception_stacktrace {
            ctx.log.error(trace);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ResolveTaskSpecVariablesHook;
    use super::TaskPostProcessingStateUpdateHook;
    use crate::core::Command;
    use crate::core::Context;
    use crate::core::Task;
    use crate::core::VariableStore;
    use crate::core::VariableValue;
    use crate::core::resolved_spec_key;
    use crate::core::task_state_updates_key;
    use crate::interfaces::Hook;
    use crate::interfaces::HookContext;
    use crate::interfaces::NoopLogSink;
    use crate::interfaces::Parameters;
    use crate::interfaces::ProcessorRegistry;
    use crate::runtime::store::InMemoryPersistence;
    use crate::runtime::validator::DefaultParameterValidator;

    #[test]
    fn resolve_hook_writes_resolved_spec_key() {
        let mut task = Task::new("v1", "k", json!({"name": "web"}), json!({"host": "${VAR:db:host}"}));
        let mut variables = VariableStore::new();
        variables.set("db:host", "10.0.0.1");
        let mut parameters = Parameters::new(Command::from("apply"), Context::from("prod"));
        let validator = DefaultParameterValidator::new();
        let mut persistence = InMemoryPersistence::new();
        let registry = ProcessorRegistry::new();
        let log = NoopLogSink;

        let mut ctx = HookContext {
            task: &mut task,
            parameters: &mut parameters,
            validator: &validator,
            persistence: &mut persistence,
            variables: &mut variables,
            processors: &registry,
            log: &log,
        };
        ResolveTaskSpecVariablesHook.run(&mut ctx).unwrap();

        let resolved = variables.get(&resolved_spec_key(&task.task_id)).unwrap();
        assert_eq!(resolved.as_opaque().unwrap(), &json!({"host": "10.0.0.1"}));
    }

    #[test]
    fn state_update_hook_replaces_state_when_changed() {
        let mut task = Task::new("v1", "k", json!({"name": "web"}), json!({"field": 1}));
        let mut variables = VariableStore::new();
        variables.set(
            task_state_updates_key(&task.task_id),
            VariableValue::Opaque(json!({
                "resource_checksum": "abc123",
                "resolved_spec_applied": {"field": 1},
                "state_changed": true,
                "is_created": true,
                "create_timestamp": 1000,
                "raw_spec": {"field": 1},
                "metadata": {},
            })),
        );
        let mut parameters = Parameters::new(Command::from("apply"), Context::from("prod"));
        let validator = DefaultParameterValidator::new();
        let mut persistence = InMemoryPersistence::new();
        let registry = ProcessorRegistry::new();
        let log = NoopLogSink;

        let mut ctx = HookContext {
            task: &mut task,
            parameters: &mut parameters,
            validator: &validator,
            persistence: &mut persistence,
            variables: &mut variables,
            processors: &registry,
            log: &log,
        };
        TaskPostProcessingStateUpdateHook.run(&mut ctx).unwrap();

        assert!(task.state.is_created());
        assert_eq!(task.state.created_timestamp.unix_seconds(), 1000);
    }
}
