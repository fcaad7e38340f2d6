// taskgraph-core/src/core/event.rs
// ============================================================================
// Module: Taskgraph Event Journal Records
// Description: Per-task processing event records appended during dispatch.
// Purpose: Give the dispatcher a single record shape for state entry/exit.
// Dependencies: serde, crate::core::identifiers, crate::core::time
// ============================================================================

//! ## Overview
//! Every dispatcher state entry and exit appends an [`EventRecord`] to the
//! `<taskId>:PROCESSING_EVENTS` sequence. Records are append-only and
//! monotonically ordered by `timestamp`, matching the ordering guarantee
//! that event records for a task appear in the order they were emitted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TaskId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Event Record
// ============================================================================

/// A single entry in a task's processing event journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventRecord {
    /// ISO-8601 UTC timestamp of the event.
    pub event_timestamp: String,
    /// Short event label, e.g. `CREATE_ACTION_START`.
    pub event_label: String,
    /// Longer human-readable description.
    pub event_description: String,
    /// Task the event describes.
    pub task_id: TaskId,
}

impl EventRecord {
    /// Builds a new event record stamped with `timestamp`.
    #[must_use]
    pub fn new(
        timestamp: Timestamp,
        label: impl Into<String>,
        description: impl Into<String>,
        task_id: TaskId,
    ) -> Self {
        Self {
            event_timestamp: timestamp.to_iso8601(),
            event_label: label.into(),
            event_description: description.into(),
            task_id,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
