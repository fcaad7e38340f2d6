// taskgraph-core/src/core/identifiers.rs
// ============================================================================
// Module: Taskgraph Identifiers
// Description: Canonical opaque identifiers for tasks, commands, and contexts.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical string-based identifiers used throughout
//! Taskgraph. Identifiers are opaque and serialize as strings. Validation is
//! handled at the scope/dependency boundaries rather than within these simple
//! wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Unique identifier for a task within a `TaskSet`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new task identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Operator-supplied verb resolved to an `Action` by the dispatcher (for
/// example `apply`, `destroy`, `inspect`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(String);

impl Command {
    /// Creates a new command.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the command as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Command {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Command {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Scope qualifier orthogonal to command, used to restrict a run to a subset
/// of a `TaskSet` (for example `production`, `sandbox`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(String);

impl Context {
    /// Creates a new context.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the context as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Context {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Context {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Name of an entry in the `VariableStore`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableName(String);

impl VariableName {
    /// Creates a new variable name.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the variable name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this variable name contains `other` as a substring.
    ///
    /// The resolver's lookup order matches the first stored name containing
    /// a scoped or unscoped candidate key, rather than requiring exact
    /// equality.
    #[must_use]
    pub fn contains(&self, other: &str) -> bool {
        self.0.contains(other)
    }
}

impl fmt::Display for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for VariableName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VariableName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::TaskId;
    use super::VariableName;

    #[test]
    fn task_id_round_trips_through_display() {
        let id = TaskId::from("web-server");
        assert_eq!(id.as_str(), "web-server");
        assert_eq!(id.to_string(), "web-server");
    }

    #[test]
    fn variable_name_contains_matches_substring() {
        let name = VariableName::new("ResolvedSpec:web-server");
        assert!(name.contains("web-server"));
        assert!(!name.contains("database"));
    }
}
