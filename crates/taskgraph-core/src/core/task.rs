// taskgraph-core/src/core/task.rs
// ============================================================================
// Module: Taskgraph Task & TaskState
// Description: The declarative task record, its mutable drift state, and the
//              task set that holds an entire run's tasks.
// Purpose: Carry the manifest-derived shape the ordering, resolver, and
//          dispatcher components all operate on.
// Dependencies: serde_json, crate::core::{hashing, identifiers, time}
// ============================================================================

//! ## Overview
//! A [`Task`] is immutable after construction except for its [`TaskState`],
//! which the state-update hook replaces after a successful action. Fields
//! that the ordering engine and resolver consume (`dependencies`,
//! `processing_scope`, `auto_rollback`) are parsed once at construction time
//! from the raw `metadata` mapping; this is structural extraction, not
//! manifest file parsing or schema validation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use serde_json::Value;

use crate::core::hashing::checksum_spec;
use crate::core::hashing::hash_spec_for_task_id;
use crate::core::identifiers::Command;
use crate::core::identifiers::Context;
use crate::core::identifiers::TaskId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Dependency & Scope Clauses
// ============================================================================

/// A single clause of the `metadata.dependencies` sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyClause {
    /// Dependency task ids named by this clause.
    pub tasks: Vec<TaskId>,
    /// Commands this clause is restricted to, if any.
    pub commands: Option<Vec<Command>>,
    /// Contexts this clause is restricted to, if any.
    pub contexts: Option<Vec<Context>>,
}

/// A single clause of the `metadata.processingScope` sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeClause {
    /// Commands this clause is restricted to, if any.
    pub commands: Option<Vec<Command>>,
    /// Contexts this clause is restricted to, if any.
    pub contexts: Option<Vec<Context>>,
}

/// Shared clause-matching rule used by both dependency and scope clauses:
/// active under `(cmd, ctx)` when both restriction lists (if present) match,
/// and unconditionally active when a restriction list is absent.
fn clause_matches(
    commands: Option<&[Command]>,
    contexts: Option<&[Context]>,
    cmd: &Command,
    ctx: &Context,
) -> bool {
    match (commands, contexts) {
        (None, None) => true,
        (Some(cmds), None) => cmds.contains(cmd),
        (None, Some(ctxs)) => ctxs.contains(ctx),
        (Some(cmds), Some(ctxs)) => cmds.contains(cmd) && ctxs.contains(ctx),
    }
}

impl DependencyClause {
    /// Returns true if this clause is active under `(cmd, ctx)`.
    #[must_use]
    pub fn is_active(&self, cmd: &Command, ctx: &Context) -> bool {
        clause_matches(self.commands.as_deref(), self.contexts.as_deref(), cmd, ctx)
    }

    fn parse_all(metadata: &Value) -> Vec<Self> {
        let Some(clauses) = metadata.get("dependencies").and_then(Value::as_array) else {
            return Vec::new();
        };
        clauses
            .iter()
            .filter_map(|clause| {
                let obj = clause.as_object()?;
                let tasks = obj
                    .get("tasks")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(Value::as_str).map(TaskId::from).collect())
                    .unwrap_or_default();
                Some(Self {
                    tasks,
                    commands: parse_string_list(obj.get("commands")).map(|v| v.into_iter().map(Command::from).collect()),
                    contexts: parse_string_list(obj.get("contexts")).map(|v| v.into_iter().map(Context::from).collect()),
                })
            })
            .collect()
    }
}

impl ScopeClause {
    /// Returns true if this clause matches `(cmd, ctx)`. An empty clause
    /// (no `commands`, no `contexts`) matches everything.
    #[must_use]
    pub fn matches(&self, cmd: &Command, ctx: &Context) -> bool {
        clause_matches(self.commands.as_deref(), self.contexts.as_deref(), cmd, ctx)
    }

    /// Parses `metadata.processingScope` into clauses. Returns `None` when
    /// the field is absent, null, or not a sequence, matching the
    /// permissive "in scope by default" rule.
    fn parse_all(metadata: &Value) -> Option<Vec<Self>> {
        let clauses = metadata.get("processingScope")?.as_array()?;
        Some(
            clauses
                .iter()
                .map(|clause| {
                    let obj = clause.as_object();
                    Self {
                        commands: obj
                            .and_then(|o| parse_string_list(o.get("commands")))
                            .map(|v| v.into_iter().map(Command::from).collect()),
                        contexts: obj
                            .and_then(|o| parse_string_list(o.get("contexts")))
                            .map(|v| v.into_iter().map(Context::from).collect()),
                    }
                })
                .collect(),
        )
    }
}

fn parse_string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(items.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

// ============================================================================
// SECTION: TaskState
// ============================================================================

/// Mutable drift-tracking state owned by a [`Task`].
#[derive(Debug, Clone)]
pub struct TaskState {
    /// The raw spec this state was constructed from.
    pub raw_spec: Value,
    /// The raw metadata this state was constructed from.
    pub raw_metadata: Value,
    /// Human-facing label used in reports.
    pub report_label: String,
    /// Unix-second timestamp of the last successful create/update; `0` means
    /// never created.
    pub created_timestamp: Timestamp,
    /// The spec last successfully applied, if any.
    pub applied_spec: Option<Value>,
    /// The most recently resolved spec, if any.
    pub current_resolved_spec: Option<Value>,
    is_created: bool,
    /// Checksum of the resource fingerprint recorded at apply time.
    pub applied_resources_checksum: Option<String>,
    /// Checksum of the resource fingerprint observed on the last drift scan.
    pub current_resource_checksum: Option<String>,
}

fn mapping_non_empty(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
        _ => true,
    }
}

impl TaskState {
    /// Builds the initial state for a freshly constructed task.
    #[must_use]
    pub fn new(raw_spec: Value, raw_metadata: Value, report_label: String) -> Self {
        Self {
            raw_spec,
            raw_metadata,
            report_label,
            created_timestamp: Timestamp::NEVER,
            applied_spec: None,
            current_resolved_spec: None,
            is_created: false,
            applied_resources_checksum: None,
            current_resource_checksum: None,
        }
    }

    /// Returns `(appliedSpec non-empty) OR (createdTimestamp > 0)`.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        self.is_created
    }

    fn recompute_is_created(&mut self) {
        let applied_non_empty = self.applied_spec.as_ref().is_some_and(mapping_non_empty);
        self.is_created = applied_non_empty || self.created_timestamp.is_set();
    }

    /// Returns `None` when the task has never been created; otherwise `Some`
    /// indicating whether the applied spec and the current resolved spec
    /// checksum differently.
    #[must_use]
    pub fn spec_drifted(&self) -> Option<bool> {
        if !self.is_created {
            return None;
        }
        let empty = Value::Object(serde_json::Map::new());
        let applied = self.applied_spec.as_ref().unwrap_or(&empty);
        let current = self.current_resolved_spec.as_ref().unwrap_or(&empty);
        let applied_hash = checksum_spec(applied, Some(&self.raw_metadata));
        let current_hash = checksum_spec(current, Some(&self.raw_metadata));
        Some(applied_hash.value != current_hash.value)
    }

    /// Returns `None` when the task has never been created; otherwise `Some`
    /// per the resource-drift rule: no drift when there is no applied
    /// checksum to compare against, drift when the applied checksum is set
    /// but no current checksum was observed, and a direct comparison
    /// otherwise.
    #[must_use]
    pub fn resource_drifted(&self) -> Option<bool> {
        if !self.is_created {
            return None;
        }
        Some(match &self.applied_resources_checksum {
            None => false,
            Some(applied) => match &self.current_resource_checksum {
                None => true,
                Some(current) => applied != current,
            },
        })
    }

    /// Atomically replaces `appliedSpec`, `appliedResourcesChecksum`, and
    /// `createdTimestamp`, then recomputes `isCreated`.
    pub fn update_applied_spec(
        &mut self,
        new_applied_spec: Value,
        new_resource_checksum: Option<String>,
        updated_timestamp: Timestamp,
    ) {
        self.applied_spec = Some(new_applied_spec);
        self.applied_resources_checksum = new_resource_checksum;
        self.created_timestamp = updated_timestamp;
        self.recompute_is_created();
    }

    /// Renders this state as a mapping suitable for persistence or reporting.
    ///
    /// `human_readable` substitutes `Yes`/`No`/`N/A`/`Unknown`/`-` for
    /// booleans, missing timestamps, and missing checksums respectively.
    #[must_use]
    pub fn to_map(&self, human_readable: bool, with_checksums: bool, include_applied_spec: bool) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert("Label".to_string(), Value::String(self.report_label.clone()));
        map.insert("IsCreated".to_string(), bool_cell(self.is_created, human_readable));
        map.insert("CreatedTimestamp".to_string(), timestamp_cell(self.created_timestamp, human_readable));
        map.insert("SpecDrifted".to_string(), option_bool_cell(self.spec_drifted(), human_readable));
        map.insert("ResourceDrifted".to_string(), option_bool_cell(self.resource_drifted(), human_readable));

        if with_checksums {
            let empty = Value::Object(serde_json::Map::new());
            let applied = self.applied_spec.as_ref().unwrap_or(&empty);
            let current = self.current_resolved_spec.as_ref().unwrap_or(&empty);
            map.insert(
                "AppliedSpecChecksum".to_string(),
                Value::String(checksum_spec(applied, Some(&self.raw_metadata)).value),
            );
            map.insert(
                "CurrentResolvedSpecChecksum".to_string(),
                Value::String(checksum_spec(current, Some(&self.raw_metadata)).value),
            );
            map.insert(
                "AppliedResourcesChecksum".to_string(),
                option_string_cell(self.applied_resources_checksum.as_deref(), human_readable),
            );
            map.insert(
                "CurrentResourceChecksum".to_string(),
                option_string_cell(self.current_resource_checksum.as_deref(), human_readable),
            );
        }

        if include_applied_spec {
            map.insert("AppliedSpec".to_string(), self.applied_spec.clone().unwrap_or(Value::Null));
        }

        map
    }

    /// Renders this state as a single fixed-width report row.
    #[must_use]
    pub fn column_string(&self, with_checksums: bool, gap: usize) -> String {
        let gap_str = " ".repeat(gap.max(1));
        let mut cols = vec![
            pad(&self.report_label, COL_MANIFEST),
            pad(yes_no(self.is_created), COL_CREATED),
            pad(&timestamp_display(self.created_timestamp), COL_CREATED_TS),
            pad(&option_bool_display(self.spec_drifted()), COL_SPEC_DRIFTED),
            pad(&option_bool_display(self.resource_drifted()), COL_RESOURCE_DRIFTED),
        ];
        if with_checksums {
            let empty = Value::Object(serde_json::Map::new());
            let applied = self.applied_spec.as_ref().unwrap_or(&empty);
            let current = self.current_resolved_spec.as_ref().unwrap_or(&empty);
            cols.push(pad(&checksum_spec(applied, Some(&self.raw_metadata)).value, COL_CHECKSUM));
            cols.push(pad(&checksum_spec(current, Some(&self.raw_metadata)).value, COL_CHECKSUM));
            cols.push(pad(self.applied_resources_checksum.as_deref().unwrap_or("-"), COL_CHECKSUM));
            cols.push(pad(self.current_resource_checksum.as_deref().unwrap_or("-"), COL_CHECKSUM));
        }
        cols.join(&gap_str).trim_end().to_string()
    }
}

const COL_MANIFEST: usize = 16;
const COL_CREATED: usize = 7;
const COL_CREATED_TS: usize = 25;
const COL_SPEC_DRIFTED: usize = 17;
const COL_RESOURCE_DRIFTED: usize = 17;
const COL_CHECKSUM: usize = 32;

/// Total width of a [`TaskState::column_string`] row, for drawing a matching
/// horizontal rule.
#[must_use]
pub fn report_row_width(with_checksums: bool, gap: usize) -> usize {
    let gap = gap.max(1);
    let mut widths = vec![COL_MANIFEST, COL_CREATED, COL_CREATED_TS, COL_SPEC_DRIFTED, COL_RESOURCE_DRIFTED];
    if with_checksums {
        widths.extend([COL_CHECKSUM; 4]);
    }
    widths.iter().sum::<usize>() + gap * widths.len().saturating_sub(1)
}

/// Renders the column header row matching [`TaskState::column_string`]'s
/// layout, so a caller can pair the two into a readable table.
#[must_use]
pub fn report_column_headers(with_checksums: bool, gap: usize) -> String {
    let gap_str = " ".repeat(gap.max(1));
    let mut cols = vec![
        pad("Manifest", COL_MANIFEST),
        pad("Created", COL_CREATED),
        pad("Created Timestamp", COL_CREATED_TS),
        pad("Spec Drifted", COL_SPEC_DRIFTED),
        pad("Resources Drifted", COL_RESOURCE_DRIFTED),
    ];
    if with_checksums {
        cols.push(pad("Applied Spec Checksum", COL_CHECKSUM));
        cols.push(pad("Current Spec Checksum", COL_CHECKSUM));
        cols.push(pad("Applied Resource Checksum", COL_CHECKSUM));
        cols.push(pad("Current Resource Checksum", COL_CHECKSUM));
    }
    cols.join(&gap_str).trim_end().to_string()
}

/// Renders a horizontal rule the width of a header/row pair produced by
/// [`report_column_headers`]/[`TaskState::column_string`].
#[must_use]
pub fn report_column_header_rule(with_checksums: bool, gap: usize) -> String {
    "-".repeat(report_row_width(with_checksums, gap))
}

/// Renders a full report: header row, horizontal rule, then one
/// [`TaskState::column_string`] row per task in [`TaskSet`] insertion order.
#[must_use]
pub fn render_report(tasks: &TaskSet, with_checksums: bool, gap: usize) -> String {
    let mut lines = vec![report_column_headers(with_checksums, gap), report_column_header_rule(with_checksums, gap)];
    lines.extend(tasks.iter_in_order().map(|task| task.state.column_string(with_checksums, gap)));
    lines.join("\n")
}

fn pad(value: &str, width: usize) -> String {
    format!("{value:<width$}")
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

fn option_bool_display(value: Option<bool>) -> String {
    match value {
        Some(true) => "Yes".to_string(),
        Some(false) => "No".to_string(),
        None => "N/A".to_string(),
    }
}

fn timestamp_display(value: Timestamp) -> String {
    if value.is_set() { value.unix_seconds().to_string() } else { "Unknown".to_string() }
}

fn bool_cell(value: bool, human_readable: bool) -> Value {
    if human_readable { Value::String(yes_no(value).to_string()) } else { Value::Bool(value) }
}

fn option_bool_cell(value: Option<bool>, human_readable: bool) -> Value {
    if human_readable {
        Value::String(option_bool_display(value))
    } else {
        value.map_or(Value::Null, Value::Bool)
    }
}

fn timestamp_cell(value: Timestamp, human_readable: bool) -> Value {
    if human_readable {
        Value::String(timestamp_display(value))
    } else if value.is_set() {
        Value::from(value.unix_seconds())
    } else {
        Value::Null
    }
}

fn option_string_cell(value: Option<&str>, human_readable: bool) -> Value {
    match value {
        Some(v) => Value::String(v.to_string()),
        None if human_readable => Value::String("-".to_string()),
        None => Value::Null,
    }
}

// ============================================================================
// SECTION: Task
// ============================================================================

/// A declarative unit of work, immutable after construction except for its
/// [`TaskState`].
#[derive(Debug, Clone)]
pub struct Task {
    /// Selects which `Processor` handles this task.
    pub api_version: String,
    /// Informational kind label.
    pub kind: String,
    /// Unique identifier within a [`TaskSet`].
    pub task_id: TaskId,
    /// Raw metadata mapping, including `dependencies`/`processingScope`/`autoRollback`.
    pub metadata: Value,
    /// Raw spec mapping, may contain `${VAR:...}` placeholders.
    pub spec: Value,
    /// Whether a failed action should trigger an automatic rollback.
    pub auto_rollback: bool,
    /// Parsed active-dependency clauses.
    pub dependencies: Vec<DependencyClause>,
    /// Parsed processing-scope clauses; `None` means always in scope.
    pub processing_scope: Option<Vec<ScopeClause>>,
    /// Mutable drift-tracking state.
    pub state: TaskState,
}

impl Task {
    /// Constructs a task from its `apiVersion`, `kind`, `metadata`, and
    /// `spec`. `metadata` and `spec` are taken by value so ownership (and
    /// the defensive-copy boundary) is explicit at the call site.
    #[must_use]
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, metadata: Value, spec: Value) -> Self {
        let task_id = derive_task_id(&metadata, &spec);
        let auto_rollback = metadata.get("autoRollback").and_then(Value::as_bool).unwrap_or(false);
        let dependencies = DependencyClause::parse_all(&metadata);
        let processing_scope = ScopeClause::parse_all(&metadata);
        let state = TaskState::new(spec.clone(), metadata.clone(), task_id.to_string());
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            task_id,
            metadata,
            spec,
            auto_rollback,
            dependencies,
            processing_scope,
            state,
        }
    }

    /// Returns the union of dependency task ids across clauses active under
    /// `(cmd, ctx)`.
    #[must_use]
    pub fn active_dependencies(&self, cmd: &Command, ctx: &Context) -> Vec<TaskId> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for clause in &self.dependencies {
            if !clause.is_active(cmd, ctx) {
                continue;
            }
            for dep in &clause.tasks {
                if seen.insert(dep.clone()) {
                    out.push(dep.clone());
                }
            }
        }
        out
    }

    /// Returns true if this task is in scope for `(cmd, ctx)` under the
    /// processing-scope rules: absent/null/non-sequence scope is permissive,
    /// otherwise at least one clause must match.
    #[must_use]
    pub fn is_in_scope(&self, cmd: &Command, ctx: &Context) -> bool {
        match &self.processing_scope {
            None => true,
            Some(clauses) => clauses.iter().any(|clause| clause.matches(cmd, ctx)),
        }
    }
}

fn derive_task_id(metadata: &Value, spec: &Value) -> TaskId {
    if let Some(name) = metadata.get("name").and_then(Value::as_str) {
        return TaskId::from(name);
    }
    let digest = hash_spec_for_task_id(spec);
    TaskId::new(digest.value.chars().take(16).collect::<String>())
}

// ============================================================================
// SECTION: TaskSet
// ============================================================================

/// An insertion-ordered collection of tasks, keyed by [`TaskId`].
///
/// Insertion order is preserved explicitly because the ordering engine's
/// deterministic tie-break depends on it; a sorted map would silently change
/// output order for any task set with ids that don't sort the way they were
/// declared.
#[derive(Debug, Default)]
pub struct TaskSet {
    order: Vec<TaskId>,
    tasks: HashMap<TaskId, Task>,
}

impl TaskSet {
    /// Creates an empty task set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `task` at the end of the insertion order.
    ///
    /// # Panics
    ///
    /// Panics if a task with the same id is already present. Per the data
    /// model invariant, this indicates a caller bug, not a recoverable
    /// runtime condition.
    pub fn insert(&mut self, task: Task) {
        assert!(!self.tasks.contains_key(&task.task_id), "duplicate task id: {}", task.task_id);
        self.order.push(task.task_id.clone());
        self.tasks.insert(task.task_id.clone(), task);
    }

    /// Returns a reference to the task with the given id, if present.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Returns a mutable reference to the task with the given id, if present.
    pub fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    /// Returns true if a task with the given id is present.
    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Returns the task ids in insertion order.
    #[must_use]
    pub fn insertion_order(&self) -> &[TaskId] {
        &self.order
    }

    /// Returns an iterator over tasks in insertion order.
    pub fn iter_in_order(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(move |id| self.tasks.get(id))
    }

    /// Returns the number of tasks in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the set holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Task;
    use super::TaskSet;
    use crate::core::identifiers::Command;
    use crate::core::identifiers::Context;

    #[test]
    fn task_id_prefers_metadata_name() {
        let task = Task::new("v1", "Server", json!({"name": "web"}), json!({"field": 1}));
        assert_eq!(task.task_id.as_str(), "web");
    }

    #[test]
    fn task_id_falls_back_to_spec_hash() {
        let task = Task::new("v1", "Server", json!({}), json!({"field": 1}));
        assert_eq!(task.task_id.as_str().len(), 16);
    }

    #[test]
    fn task_id_fallback_ignores_metadata_content() {
        let a = Task::new("v1", "Server", json!({"autoRollback": true}), json!({"field": 1}));
        let b = Task::new("v1", "Server", json!({"autoRollback": false}), json!({"field": 1}));
        assert_eq!(a.task_id, b.task_id);
    }

    #[test]
    fn processing_scope_absent_is_permissive() {
        let task = Task::new("v1", "Server", json!({}), json!({}));
        assert!(task.is_in_scope(&Command::from("apply"), &Context::from("prod")));
    }

    #[test]
    fn processing_scope_restricts_to_matching_clause() {
        let task = Task::new(
            "v1",
            "Server",
            json!({"processingScope": [{"commands": ["apply"], "contexts": ["prod"]}]}),
            json!({}),
        );
        assert!(task.is_in_scope(&Command::from("apply"), &Context::from("prod")));
        assert!(!task.is_in_scope(&Command::from("apply"), &Context::from("dev")));
    }

    #[test]
    fn active_dependencies_filters_by_command_and_context() {
        let task = Task::new(
            "v1",
            "Server",
            json!({"dependencies": [{"tasks": ["db"], "commands": ["apply"], "contexts": ["prod"]}]}),
            json!({}),
        );
        assert_eq!(task.active_dependencies(&Command::from("apply"), &Context::from("prod")), vec!["db".into()]);
        assert!(task.active_dependencies(&Command::from("apply"), &Context::from("dev")).is_empty());
    }

    #[test]
    fn render_report_lists_headers_rule_and_one_row_per_task() {
        let mut set = TaskSet::new();
        set.insert(Task::new("v1", "Server", json!({"name": "web"}), json!({"field": 1})));
        set.insert(Task::new("v1", "Database", json!({"name": "db"}), json!({"field": 2})));
        let report = super::render_report(&set, false, 2);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Manifest"));
        assert!(lines[1].chars().all(|c| c == '-'));
        assert_eq!(lines[1].len(), super::report_row_width(false, 2));
        assert!(lines[2].starts_with("web"));
        assert!(lines[3].starts_with("db"));
    }

    #[test]
    fn task_set_panics_on_duplicate_id() {
        let mut set = TaskSet::new();
        set.insert(Task::new("v1", "Server", json!({"name": "a"}), json!({})));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            set.insert(Task::new("v1", "Server", json!({"name": "a"}), json!({})));
        }));
        assert!(result.is_err());
    }
}
