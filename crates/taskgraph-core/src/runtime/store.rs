// taskgraph-core/src/runtime/store.rs
// ============================================================================
// Module: Taskgraph In-Memory Persistence
// Description: Simple in-memory Persistence implementation for tests and
//              local use.
// Purpose: Provide a deterministic default adapter without external deps.
// Dependencies: serde_json, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`Persistence`] for
//! tests and local demos. It is not intended for production use: `commit`
//! never touches durable storage, so process restarts lose all state. Both
//! `load` and `commit` emit a loud warning through the configured `LogSink`
//! on every call, so an operator running the default adapter unmodified is
//! told at runtime, not just in documentation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;

use crate::interfaces::LogSink;
use crate::interfaces::NoopLogSink;
use crate::interfaces::Persistence;
use crate::interfaces::PersistenceError;

// ============================================================================
// SECTION: In-Memory Persistence
// ============================================================================

/// In-memory persistence adapter for tests and local demos.
#[derive(Clone)]
pub struct InMemoryPersistence {
    /// The in-memory backing map, shared across clones.
    objects: Arc<Mutex<BTreeMap<String, serde_json::Map<String, Value>>>>,
    /// Sink for the `load`/`commit` "not backed by durable storage" warnings.
    log: Arc<dyn LogSink + Send + Sync>,
}

impl fmt::Debug for InMemoryPersistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryPersistence").field("objects", &self.objects).finish_non_exhaustive()
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self { objects: Arc::default(), log: Arc::new(NoopLogSink) }
    }
}

impl InMemoryPersistence {
    /// Creates a new, empty in-memory persistence adapter with a `NoopLogSink`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new, empty in-memory persistence adapter that warns through
    /// `log` on every `load`/`commit` call.
    #[must_use]
    pub fn with_log_sink(log: impl LogSink + Send + Sync + 'static) -> Self {
        Self { objects: Arc::default(), log: Arc::new(log) }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, serde_json::Map<String, Value>>>, PersistenceError> {
        self.objects.lock().map_err(|_| PersistenceError::Io("in-memory persistence mutex poisoned".to_string()))
    }
}

impl Persistence for InMemoryPersistence {
    fn load(&mut self) -> Result<bool, PersistenceError> {
        self.log.warn("InMemoryPersistence::load() is not backed by durable storage; state is memory-only");
        Ok(true)
    }

    fn get(&mut self, key: &str, _refresh_if_missing: bool) -> Result<serde_json::Map<String, Value>, PersistenceError> {
        Ok(self.lock()?.get(key).cloned().unwrap_or_default())
    }

    fn update_object_state(&mut self, key: &str, value: serde_json::Map<String, Value>) -> Result<(), PersistenceError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), PersistenceError> {
        self.log.warn("InMemoryPersistence::commit() is not backed by durable storage; committed state will not survive a restart");
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Persistence Wrapper
// ============================================================================

/// Shared persistence adapter backed by an `Arc<Mutex<dyn Persistence>>>`,
/// so multiple owners (e.g. several `WorkflowExecutor`s in tests) can share
/// one backing cache.
#[derive(Clone)]
pub struct SharedPersistence {
    inner: Arc<Mutex<dyn Persistence + Send>>,
}

impl SharedPersistence {
    /// Wraps a persistence adapter in a shared, clonable wrapper.
    #[must_use]
    pub fn from_persistence(persistence: impl Persistence + Send + 'static) -> Self {
        Self { inner: Arc::new(Mutex::new(persistence)) }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, dyn Persistence + Send + 'static>, PersistenceError> {
        self.inner.lock().map_err(move |_| PersistenceError::Io("shared persistence mutex poisoned".to_string()))
    }
}

impl Persistence for SharedPersistence {
    fn load(&mut self) -> Result<bool, PersistenceError> {
        self.lock()?.load()
    }

    fn get(&mut self, key: &str, refresh_if_missing: bool) -> Result<serde_json::Map<String, Value>, PersistenceError> {
        self.lock()?.get(key, refresh_if_missing)
    }

    fn update_object_state(&mut self, key: &str, value: serde_json::Map<String, Value>) -> Result<(), PersistenceError> {
        self.lock()?.update_object_state(key, value)
    }

    fn commit(&mut self) -> Result<(), PersistenceError> {
        self.lock()?.commit()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use serde_json::json;

    use super::InMemoryPersistence;
    use crate::interfaces::LogSink;
    use crate::interfaces::Persistence;

    #[derive(Clone)]
    struct RecordingLogSink {
        warnings: Arc<Mutex<Vec<String>>>,
    }

    impl LogSink for RecordingLogSink {
        fn debug(&self, _message: &str) {}
        fn info(&self, _message: &str) {}
        fn warn(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }
        fn error(&self, _message: &str) {}
    }

    #[test]
    fn get_on_missing_key_returns_empty_mapping() {
        let mut persistence = InMemoryPersistence::new();
        assert!(persistence.get("missing", true).unwrap().is_empty());
    }

    #[test]
    fn update_then_get_round_trips() {
        let mut persistence = InMemoryPersistence::new();
        let mut value = serde_json::Map::new();
        value.insert("IsCreated".to_string(), json!(true));
        persistence.update_object_state("task:TASK_STATE", value.clone()).unwrap();
        assert_eq!(persistence.get("task:TASK_STATE", false).unwrap(), value);
    }

    #[test]
    fn load_and_commit_warn_through_the_configured_log_sink() {
        let warnings = Arc::new(Mutex::new(Vec::new()));
        let mut persistence = InMemoryPersistence::with_log_sink(RecordingLogSink { warnings: warnings.clone() });
        persistence.load().unwrap();
        persistence.commit().unwrap();
        assert_eq!(warnings.lock().unwrap().len(), 2);
    }

    #[test]
    fn cloned_adapters_share_the_same_backing_map() {
        let mut a = InMemoryPersistence::new();
        let mut b = a.clone();
        let mut value = serde_json::Map::new();
        value.insert("IsCreated".to_string(), json!(true));
        a.update_object_state("k", value.clone()).unwrap();
        assert_eq!(b.get("k", false).unwrap(), value);
    }
}
