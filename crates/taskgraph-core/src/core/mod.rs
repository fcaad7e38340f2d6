// taskgraph-core/src/core/mod.rs
// ============================================================================
// Module: Taskgraph Core Data Model
// Description: Submodule aggregator for identifiers, time, hashing, tasks,
//              variables, and events.
// Purpose: Re-export the data-model types consumed by the runtime layer.
// Dependencies: (none beyond submodules)
// ============================================================================

//! ## Overview
//! The core module holds pure data types and algorithms with no external
//! collaborators: identifiers, checksums, timestamps, the task/task-state
//! record, the variable store, and event records. Everything that talks to
//! the outside world lives in `crate::interfaces` and `crate::runtime`.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod action;
pub mod event;
pub mod hashing;
pub mod identifiers;
pub mod task;
pub mod time;
pub mod variables;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use action::Action;
pub use event::EventRecord;
pub use hashing::CHECKSUM_SCHEME;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::checksum_spec;
pub use hashing::hash_spec_for_task_id;
pub use identifiers::Command;
pub use identifiers::Context;
pub use identifiers::TaskId;
pub use identifiers::VariableName;
pub use task::DependencyClause;
pub use task::ScopeClause;
pub use task::Task;
pub use task::TaskSet;
pub use task::TaskState;
pub use task::render_report;
pub use task::report_column_header_rule;
pub use task::report_column_headers;
pub use task::report_row_width;
pub use time::Timestamp;
pub use variables::VariableStore;
pub use variables::VariableValue;
pub use variables::processing_events_key;
pub use variables::resolved_spec_key;
pub use variables::resource_data_key;
pub use variables::rollback_from_key;
pub use variables::task_state_key;
pub use variables::task_state_updates_key;
