// taskgraph-core/src/lib.rs
// ============================================================================
// Module: Taskgraph Core Library
// Description: Public API surface for the Taskgraph orchestration engine.
// Purpose: Expose core types, interfaces, runtime, and configuration.
// Dependencies: crate::{config, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Taskgraph core provides dependency-ordered task execution, late-bound
//! variable resolution, and drift-aware lifecycle dispatch for declarative,
//! managed-resource task graphs. It is backend-agnostic: concrete resource
//! types plug in through [`interfaces::Processor`], concrete storage through
//! [`interfaces::Persistence`], and cross-cutting concerns through
//! [`interfaces::Hook`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::EngineConfig;

pub use core::Action;
pub use core::CHECKSUM_SCHEME;
pub use core::Command;
pub use core::Context;
pub use core::DependencyClause;
pub use core::EventRecord;
pub use core::ScopeClause;
pub use core::Task;
pub use core::TaskId;
pub use core::TaskSet;
pub use core::TaskState;
pub use core::Timestamp;
pub use core::VariableName;
pub use core::VariableStore;
pub use core::VariableValue;

pub use interfaces::ActionContext;
pub use interfaces::Hook;
pub use interfaces::HookContext;
pub use interfaces::HookError;
pub use interfaces::LogSink;
pub use interfaces::NoopLogSink;
pub use interfaces::Parameters;
pub use interfaces::ParameterValidator;
pub use interfaces::Persistence;
pub use interfaces::PersistenceError;
pub use interfaces::Processor;
pub use interfaces::ProcessorError;
pub use interfaces::ProcessorRegistry;

pub use runtime::DefaultParameterValidator;
pub use runtime::DispatchError;
pub use runtime::ExecutorError;
pub use runtime::GeneralErrorHook;
pub use runtime::InMemoryPersistence;
pub use runtime::OrderingError;
pub use runtime::ResolveTaskSpecVariablesHook;
pub use runtime::RollbackOutcome;
pub use runtime::SharedPersistence;
pub use runtime::TaskPostProcessingStateUpdateHook;
pub use runtime::TaskProcessingHook;
pub use runtime::WorkflowExecutor;
pub use runtime::dependencies_for;
pub use runtime::process_task;
pub use runtime::resolve_spec;
pub use runtime::task_names_in_order;
pub use runtime::task_scoped_for_processing;
