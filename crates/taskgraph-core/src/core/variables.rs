// taskgraph-core/src/core/variables.rs
// ============================================================================
// Module: Taskgraph Variable Store
// Description: Tagged opaque value type and the shared variable store.
// Purpose: Hold inter-task values and well-known keys the core reads/writes.
// Dependencies: serde, serde_json, crate::core::identifiers, crate::core::time
// ============================================================================

//! ## Overview
//! The variable store is the only shared mutable structure threaded through a
//! workflow run. Every read returns an owned clone and every write stores an
//! owned clone, so callers may freely mutate values they passed in or
//! received back without aliasing the store's internal state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TaskId;
use crate::core::identifiers::VariableName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Variable Value
// ============================================================================

/// Tagged, heterogeneous payload held by the variable store.
///
/// Typed accessors return `None` on a type mismatch rather than panicking;
/// callers that need a specific shape must check the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VariableValue {
    /// A UTF-8 string.
    String(String),
    /// A signed integer.
    Int(i64),
    /// A boolean flag.
    Bool(bool),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// An ordered sequence of values.
    Seq(Vec<VariableValue>),
    /// A string-keyed mapping of values.
    Map(BTreeMap<String, VariableValue>),
    /// A Unix-second timestamp.
    Timestamp(Timestamp),
    /// Any other JSON-encodable payload that doesn't fit the tags above.
    Opaque(serde_json::Value),
}

impl VariableValue {
    /// Returns the string form, if this value is a [`VariableValue::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the integer form, if this value is a [`VariableValue::Int`].
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the boolean form, if this value is a [`VariableValue::Bool`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the byte form, if this value is a [`VariableValue::Bytes`].
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(value) => Some(value.as_slice()),
            _ => None,
        }
    }

    /// Returns the sequence form, if this value is a [`VariableValue::Seq`].
    #[must_use]
    pub fn as_seq(&self) -> Option<&[VariableValue]> {
        match self {
            Self::Seq(value) => Some(value.as_slice()),
            _ => None,
        }
    }

    /// Returns the mapping form, if this value is a [`VariableValue::Map`].
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, VariableValue>> {
        match self {
            Self::Map(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the timestamp form, if this value is a
    /// [`VariableValue::Timestamp`].
    #[must_use]
    pub const fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the opaque JSON form, if this value is a
    /// [`VariableValue::Opaque`].
    #[must_use]
    pub const fn as_opaque(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Opaque(value) => Some(value),
            _ => None,
        }
    }

    /// Coerces this value to its string form for placeholder substitution.
    ///
    /// Unlike [`VariableValue::as_str`], this never fails: every variant has
    /// a textual rendering, matching the resolver's "coerced to its string
    /// form" substitution rule.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::String(value) => value.clone(),
            Self::Int(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Bytes(value) => String::from_utf8_lossy(value).into_owned(),
            Self::Timestamp(value) => value.unix_seconds().to_string(),
            Self::Seq(_) | Self::Map(_) | Self::Opaque(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Timestamp> for VariableValue {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

// ============================================================================
// SECTION: Well-Known Key Helpers
// ============================================================================

/// Builds the `<id>:PROCESSING_EVENTS` key for a task.
#[must_use]
pub fn processing_events_key(task_id: &TaskId) -> VariableName {
    VariableName::new(format!("{task_id}:PROCESSING_EVENTS"))
}

/// Builds the `<id>:TASK_STATE_UPDATES` key for a task.
#[must_use]
pub fn task_state_updates_key(task_id: &TaskId) -> VariableName {
    VariableName::new(format!("{task_id}:TASK_STATE_UPDATES"))
}

/// Builds the `ResolvedSpec:<id>` key for a task. Always suffixed with the
/// task id; the unsuffixed `ResolvedSpec` key is a known bug in the system
/// this design supersedes and must never be read or written.
#[must_use]
pub fn resolved_spec_key(task_id: &TaskId) -> VariableName {
    VariableName::new(format!("ResolvedSpec:{task_id}"))
}

/// Builds the `ResourceData:<id>` key for a task.
#[must_use]
pub fn resource_data_key(task_id: &TaskId) -> VariableName {
    VariableName::new(format!("ResourceData:{task_id}"))
}

/// Builds the `<id>:RollbackFrom` key for a task.
#[must_use]
pub fn rollback_from_key(task_id: &TaskId) -> VariableName {
    VariableName::new(format!("{task_id}:RollbackFrom"))
}

/// Builds the `<id>:TASK_STATE` persistence key for a task.
#[must_use]
pub fn task_state_key(task_id: &TaskId) -> String {
    format!("{task_id}:TASK_STATE")
}

// ============================================================================
// SECTION: Variable Store
// ============================================================================

/// The shared, mutable variable store threaded through a workflow run.
///
/// Reads return owned clones; writes store owned clones. This gives the
/// store value semantics even though `VariableValue` contains heap-backed
/// variants (`String`, `Vec`, `BTreeMap`).
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    values: BTreeMap<VariableName, VariableValue>,
}

impl VariableStore {
    /// Creates an empty variable store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, returning `&mut Self` for fluent chaining.
    ///
    /// This is the single return contract for the store's `add_variable`
    /// operation: always `&mut Self`, never a conditional `Option`.
    pub fn set(&mut self, name: impl Into<VariableName>, value: impl Into<VariableValue>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Returns an owned clone of the value stored under `name`, if present.
    #[must_use]
    pub fn get(&self, name: &VariableName) -> Option<VariableValue> {
        self.values.get(name).cloned()
    }

    /// Returns true if `name` has a stored value.
    #[must_use]
    pub fn contains(&self, name: &VariableName) -> bool {
        self.values.contains_key(name)
    }

    /// Removes and returns the value stored under `name`, if present.
    pub fn remove(&mut self, name: &VariableName) -> Option<VariableValue> {
        self.values.remove(name)
    }

    /// Appends `event` to the sequence stored under `key`, initializing it to
    /// an empty sequence on first use.
    pub fn append_to_seq(&mut self, key: impl Into<VariableName>, event: VariableValue) {
        let key = key.into();
        let mut seq = match self.values.get(&key) {
            Some(VariableValue::Seq(existing)) => existing.clone(),
            _ => Vec::new(),
        };
        seq.push(event);
        self.values.insert(key, VariableValue::Seq(seq));
    }

    /// Finds the first stored variable name containing `candidate` as a
    /// substring, returning an owned clone of its value.
    ///
    /// Iteration follows the store's sorted key order, matching the
    /// resolver's "first name containing it as a substring" lookup rule.
    #[must_use]
    pub fn find_first_containing(&self, candidate: &str) -> Option<VariableValue> {
        self.values
            .iter()
            .find(|(name, _)| name.contains(candidate))
            .map(|(_, value)| value.clone())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
