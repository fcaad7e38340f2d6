// taskgraph-core/src/core/action.rs
// ============================================================================
// Module: Taskgraph Action
// Description: The closed set of lifecycle actions a Processor implements.
// Purpose: Give the dispatcher and processor registry a single sum type
//          instead of reflective method dispatch.
// Dependencies: (none)
// ============================================================================

//! ## Overview
//! `Action` is a closed six-variant enum rather than an open string or a
//! reflectively dispatched method name. `Describe` and `DetectDrift` are
//! read-only actions that never trigger auto-rollback.

// ============================================================================
// SECTION: Action
// ============================================================================

/// One of the six lifecycle actions the dispatcher can invoke on a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Creates a new managed resource.
    Create,
    /// Updates an existing managed resource.
    Update,
    /// Deletes a managed resource.
    Delete,
    /// Reverts a previously attempted action.
    Rollback,
    /// Describes the current state of a managed resource, read-only.
    Describe,
    /// Compares applied and observed resource state, read-only.
    DetectDrift,
}

impl Action {
    /// All actions, in declaration order.
    pub const ALL: [Self; 6] = [Self::Create, Self::Update, Self::Delete, Self::Rollback, Self::Describe, Self::DetectDrift];

    /// Returns true if this action never triggers auto-rollback, regardless
    /// of a task's `autoRollback` flag.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Describe | Self::DetectDrift)
    }

    /// Returns the processor-facing action name, e.g. `CreateAction`.
    #[must_use]
    pub const fn processor_name(self) -> &'static str {
        match self {
            Self::Create => "CreateAction",
            Self::Update => "UpdateAction",
            Self::Delete => "DeleteAction",
            Self::Rollback => "RollbackAction",
            Self::Describe => "DescribeAction",
            Self::DetectDrift => "DetectDriftAction",
        }
    }

    /// Returns the event-label prefix for this action, e.g. `CREATE_ACTION`.
    #[must_use]
    pub const fn event_prefix(self) -> &'static str {
        match self {
            Self::Create => "CREATE_ACTION",
            Self::Update => "UPDATE_ACTION",
            Self::Delete => "DELETE_ACTION",
            Self::Rollback => "ROLLBACK_ACTION",
            Self::Describe => "DESCRIBE_ACTION",
            Self::DetectDrift => "DETECT_DRIFT_ACTION",
        }
    }

    /// Parses an action from its processor-facing name, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.processor_name().eq_ignore_ascii_case(name))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
