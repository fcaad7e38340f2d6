// taskgraph-core/src/interfaces/mod.rs
// ============================================================================
// Module: Taskgraph Interfaces
// Description: Capability interfaces for processors, persistence, hooks,
//              parameter validation, and logging.
// Purpose: Define the contract surfaces the runtime dispatches through,
//          without embedding any concrete backend.
// Dependencies: serde_json, thiserror, crate::core
// ============================================================================

//! ## Overview
//! Each external collaborator gets its own single-purpose trait rather than
//! one reflectively dispatched interface: `Processor` (one method per
//! action), `Persistence` (a small read-through cache contract), `Hook` (one
//! pipeline stage), `ParameterValidator` (command/context/action gating),
//! and `LogSink` (no global logger). Implementations must be deterministic
//! and fail closed on missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::core::Action;
use crate::core::Command;
use crate::core::Context;
use crate::core::Task;
use crate::core::TaskId;
use crate::core::VariableStore;

// ============================================================================
// SECTION: Processor
// ============================================================================

/// Processor errors.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The processor reported a failure while executing an action.
    #[error("processor action failed: {0}")]
    Failed(String),
}

/// Per-invocation context passed to every `Processor` method.
pub struct ActionContext<'a> {
    /// The task the action is being performed against.
    pub task_id: &'a TaskId,
    /// The fully resolved spec for this task under the current run.
    pub resolved_spec: &'a Value,
    /// The shared variable store, mutable so the processor may publish
    /// `<taskId>:TASK_STATE_UPDATES` or `ResourceData:<taskId>`.
    pub variables: &'a mut VariableStore,
}

/// Implements the six lifecycle actions for a given `apiVersion`.
pub trait Processor {
    /// Creates a new managed resource.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError`] when the underlying create call fails.
    fn create(&self, ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError>;

    /// Updates an existing managed resource.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError`] when the underlying update call fails.
    fn update(&self, ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError>;

    /// Deletes a managed resource.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError`] when the underlying delete call fails.
    fn delete(&self, ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError>;

    /// Reverts a previously attempted action.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError`] when the rollback itself fails.
    fn rollback(&self, ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError>;

    /// Describes the current state of a managed resource.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError`] when the underlying describe call fails.
    fn describe(&self, ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError>;

    /// Compares applied and observed resource state.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError`] when the underlying drift scan fails.
    fn detect_drift(&self, ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError>;

    /// Routes to the method matching `action`.
    ///
    /// # Errors
    ///
    /// Returns whatever the routed-to method returns.
    fn dispatch(&self, action: Action, ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
        match action {
            Action::Create => self.create(ctx),
            Action::Update => self.update(ctx),
            Action::Delete => self.delete(ctx),
            Action::Rollback => self.rollback(ctx),
            Action::Describe => self.describe(ctx),
            Action::DetectDrift => self.detect_drift(ctx),
        }
    }
}

/// Maps `apiVersion` strings to the `Processor` that handles them.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Box<dyn Processor + Send + Sync>>,
}

impl ProcessorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `processor` under `api_version`, replacing any previous
    /// registration for the same version.
    pub fn register(&mut self, api_version: impl Into<String>, processor: Box<dyn Processor + Send + Sync>) {
        self.processors.insert(api_version.into(), processor);
    }

    /// Looks up the processor registered for `api_version`.
    #[must_use]
    pub fn get(&self, api_version: &str) -> Option<&(dyn Processor + Send + Sync)> {
        self.processors.get(api_version).map(std::convert::AsRef::as_ref)
    }
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

/// Persistence adapter errors.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing store reported an I/O or connectivity failure.
    #[error("persistence io error: {0}")]
    Io(String),
}

/// Read-through cache plus commit contract consumed by the core.
///
/// The core never inspects storage internals; it only sees the booleans and
/// errors this trait returns.
pub trait Persistence {
    /// Populates the internal cache from the backing store. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the backing store cannot be read.
    fn load(&mut self) -> Result<bool, PersistenceError>;

    /// Returns a deep copy of the mapping stored under `key`, or an empty
    /// mapping if absent. When `refresh_if_missing` is true and the key is
    /// not cached, the adapter may attempt a backing-store read before
    /// giving up.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when a refresh read fails.
    fn get(&mut self, key: &str, refresh_if_missing: bool) -> Result<serde_json::Map<String, Value>, PersistenceError>;

    /// Stores a deep copy of `value` under `key` in the cache.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the adapter rejects the write.
    fn update_object_state(&mut self, key: &str, value: serde_json::Map<String, Value>) -> Result<(), PersistenceError>;

    /// Flushes the cache to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the flush fails.
    fn commit(&mut self) -> Result<(), PersistenceError>;
}

// ============================================================================
// SECTION: Parameters
// ============================================================================

/// The per-run parameter bag threaded through hooks and the validator.
#[derive(Debug, Clone)]
pub struct Parameters {
    /// The action resolved for the current task, if dispatch has started.
    pub action: Option<Action>,
    /// The operator-supplied command.
    pub command: Command,
    /// The operator-supplied context.
    pub context: Context,
    /// Accumulated traceback text from a failed hook, if any.
    pub exception_stacktrace: Option<String>,
}

impl Parameters {
    /// Builds a fresh parameter bag for `(command, context)` with no action
    /// resolved yet.
    #[must_use]
    pub const fn new(command: Command, context: Context) -> Self {
        Self { action: None, command, context, exception_stacktrace: None }
    }
}

// ============================================================================
// SECTION: Parameter Validator
// ============================================================================

/// Gates hook execution on `Command`/`Context`/`Action` membership.
pub trait ParameterValidator {
    /// Returns true when `parameters` satisfies this validator's configured
    /// command/context/action membership rules.
    fn validation_passed(&self, parameters: &Parameters) -> bool;
}

// ============================================================================
// SECTION: Hook
// ============================================================================

/// Hook errors.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook itself failed, outside of a processor action failure.
    #[error("hook '{hook}' failed: {message}")]
    Failed {
        /// Name of the failing hook.
        hook: String,
        /// Failure detail.
        message: String,
    },
}

/// Mutable operands shared across one task's hook chain. Rust threads state
/// by reference rather than by hook-to-hook return value, so every operand a
/// hook might read or write is bundled here.
pub struct HookContext<'a> {
    /// The task this hook chain is processing.
    pub task: &'a mut Task,
    /// The run's parameter bag.
    pub parameters: &'a mut Parameters,
    /// The configured parameter validator.
    pub validator: &'a dyn ParameterValidator,
    /// The configured persistence adapter.
    pub persistence: &'a mut dyn Persistence,
    /// The shared variable store.
    pub variables: &'a mut VariableStore,
    /// The configured processor registry.
    pub processors: &'a ProcessorRegistry,
    /// The configured log sink.
    pub log: &'a dyn LogSink,
}

/// A single stage in a task's workflow pipeline.
pub trait Hook {
    /// Returns this hook's name, used in error reporting.
    fn name(&self) -> &str;

    /// Runs this hook against `ctx`, mutating it in place.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when the hook cannot complete; the executor
    /// aborts the workflow on any hook error.
    fn run(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError>;
}

// ============================================================================
// SECTION: Log Sink
// ============================================================================

/// A logging sink threaded explicitly through the executor and hooks,
/// rather than a process-wide global logger.
pub trait LogSink {
    /// Logs a debug-level message.
    fn debug(&self, message: &str);
    /// Logs an info-level message.
    fn info(&self, message: &str);
    /// Logs a warning-level message.
    fn warn(&self, message: &str);
    /// Logs an error-level message.
    fn error(&self, message: &str);
}

/// A `LogSink` that discards every message.
///
/// This is the only built-in `LogSink` implementation; concrete sinks
/// (console, file, structured) are consumed only through the trait.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::LogSink;
    use super::NoopLogSink;
    use super::ProcessorRegistry;

    #[test]
    fn noop_log_sink_accepts_all_levels() {
        let sink = NoopLogSink;
        sink.debug("x");
        sink.info("x");
        sink.warn("x");
        sink.error("x");
    }

    #[test]
    fn processor_registry_starts_empty() {
        let registry = ProcessorRegistry::new();
        assert!(registry.get("v1").is_none());
    }
}
