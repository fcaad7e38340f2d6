// taskgraph-core/src/runtime/resolver.rs
// ============================================================================
// Module: Taskgraph Variable Resolver
// Description: Late-bound `${VAR:task:key}` placeholder substitution.
// Purpose: Produce the resolved spec the dispatcher hands to a processor.
// Dependencies: regex, serde_json, crate::core
// ============================================================================

//! ## Overview
//! Resolution is pure: it walks a task's raw spec and returns a new,
//! resolved `Value` without mutating the input. The caller (the
//! resolve-spec hook) is responsible for storing the result under
//! `ResolvedSpec:<taskId>` — always suffixed, never the bare `ResolvedSpec`
//! key some earlier systems read by mistake.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::core::Command;
use crate::core::Context;
use crate::core::VariableStore;

/// Compiled singleton for the canonical placeholder grammar.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{VAR:[A-Za-z0-9_\-\s:.;]+\}").unwrap_or_else(|err| unreachable_regex(&err)));

#[cold]
fn unreachable_regex(err: &regex::Error) -> Regex {
    // The placeholder pattern is a fixed literal; a compile failure here
    // would mean the pattern itself was edited incorrectly.
    panic!("placeholder regex failed to compile: {err}");
}

// ============================================================================
// SECTION: Structural Walk
// ============================================================================

/// Recursively resolves every `${VAR:...}` placeholder found in string
/// values anywhere within `spec`. Mapping keys and non-string scalars pass
/// through unchanged.
#[must_use]
pub fn resolve_spec(spec: &Value, cmd: &Command, ctx: &Context, variables: &VariableStore) -> Value {
    match spec {
        Value::String(s) => Value::String(resolve_string(s, cmd, ctx, variables)),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), resolve_spec(v, cmd, ctx, variables))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_spec(v, cmd, ctx, variables)).collect()),
        other => other.clone(),
    }
}

fn resolve_string(input: &str, cmd: &Command, ctx: &Context, variables: &VariableStore) -> String {
    PLACEHOLDER
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let whole = &caps[0];
            let inner = &whole[b"${VAR:".len()..whole.len() - 1];
            resolve_placeholder(inner, cmd, ctx, variables)
        })
        .into_owned()
}

/// Resolves a single placeholder body (the `<task>:<key>[:<key>...]` part
/// between `${VAR:` and `}`), trying each scoped candidate key in order and
/// falling back to the empty string if none match.
fn resolve_placeholder(inner: &str, cmd: &Command, ctx: &Context, variables: &VariableStore) -> String {
    let Some((target, key)) = inner.split_once(':') else {
        return String::new();
    };
    if target.is_empty() || key.is_empty() {
        return String::new();
    }
    let candidates = [
        format!("{target}:{cmd}:{ctx}:{key}"),
        format!("{target}:{cmd}::{key}"),
        format!("{target}::{ctx}:{key}"),
        format!("{target}:{key}"),
    ];
    for candidate in &candidates {
        if let Some(value) = variables.find_first_containing(candidate) {
            return value.to_display_string();
        }
    }
    String::new()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::resolve_spec;
    use crate::core::Command;
    use crate::core::Context;
    use crate::core::VariableStore;

    /// S6 — variable resolution, matching binding present.
    #[test]
    fn resolves_fully_scoped_binding() {
        let mut store = VariableStore::new();
        store.set("u:c1:x1:K", "HELLO");
        let resolved = resolve_spec(&json!({"cmd": "echo ${VAR:u:K}"}), &Command::from("c1"), &Context::from("x1"), &store);
        assert_eq!(resolved, json!({"cmd": "echo HELLO"}));
    }

    /// S6 — no matching binding under a different (command, context) pair
    /// resolves to the empty string, not an error.
    #[test]
    fn unresolved_placeholder_becomes_empty_string() {
        let mut store = VariableStore::new();
        store.set("u:c1:x1:K", "HELLO");
        let resolved = resolve_spec(&json!({"cmd": "echo ${VAR:u:K}"}), &Command::from("c9"), &Context::from("x9"), &store);
        assert_eq!(resolved, json!({"cmd": "echo "}));
    }

    /// Property 5 — a spec with no placeholders resolves byte-identical.
    #[test]
    fn spec_without_placeholders_is_unchanged() {
        let store = VariableStore::new();
        let spec = json!({"field": 1, "nested": {"list": ["a", "b"]}});
        assert_eq!(resolve_spec(&spec, &Command::from("apply"), &Context::from("prod"), &store), spec);
    }

    #[test]
    fn resolution_recurses_into_sequences_and_mappings() {
        let mut store = VariableStore::new();
        store.set("db:host", "10.0.0.1");
        let spec = json!({"addresses": ["${VAR:db:host}", "static"]});
        let resolved = resolve_spec(&spec, &Command::from("apply"), &Context::from("prod"), &store);
        assert_eq!(resolved, json!({"addresses": ["10.0.0.1", "static"]}));
    }

    #[test]
    fn falls_back_from_scoped_to_unscoped_binding() {
        let mut store = VariableStore::new();
        store.set("db:K", "UNSCOPED");
        let resolved = resolve_spec(&json!("${VAR:db:K}"), &Command::from("apply"), &Context::from("prod"), &store);
        assert_eq!(resolved, json!("UNSCOPED"));
    }
}
