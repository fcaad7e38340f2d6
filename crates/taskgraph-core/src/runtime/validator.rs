// taskgraph-core/src/runtime/validator.rs
// ============================================================================
// Module: Taskgraph Parameter Validator
// Description: Command/context/action membership gating for hooks.
// Purpose: Let a hook skip itself (rather than error) on out-of-scope input.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! `DefaultParameterValidator` holds the recognized `SupportedCommands`,
//! `SupportedContexts`, and `SupportedActions`. An empty configured list
//! accepts anything; `*`, `ALL`, and `ANY` in a configured list are
//! catch-all markers with the same effect.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::Action;
use crate::core::Command;
use crate::core::Context;
use crate::interfaces::Parameters;
use crate::interfaces::ParameterValidator;

const CATCH_ALL: [&str; 3] = ["*", "ALL", "ANY"];

// ============================================================================
// SECTION: Default Parameter Validator
// ============================================================================

/// The built-in `ParameterValidator`, configured with allow-lists for each
/// of `Command`, `Context`, and `Action`.
#[derive(Debug, Clone)]
pub struct DefaultParameterValidator {
    /// Recognized commands; empty means accept any.
    pub supported_commands: Vec<Command>,
    /// Recognized contexts; empty means accept any.
    pub supported_contexts: Vec<Context>,
    /// Recognized actions; defaults to all six.
    pub supported_actions: Vec<Action>,
}

impl Default for DefaultParameterValidator {
    fn default() -> Self {
        Self { supported_commands: Vec::new(), supported_contexts: Vec::new(), supported_actions: Action::ALL.to_vec() }
    }
}

impl DefaultParameterValidator {
    /// Creates a validator that accepts any command and context and all six
    /// actions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator restricted to the given commands, contexts, and
    /// actions. An empty list still means "accept any" for that dimension.
    #[must_use]
    pub fn with_allow_lists(commands: Vec<Command>, contexts: Vec<Context>, actions: Vec<Action>) -> Self {
        Self { supported_commands: commands, supported_contexts: contexts, supported_actions: actions }
    }
}

fn commands_allow(configured: &[Command], value: &Command) -> bool {
    if !value.as_str().is_empty() && configured.is_empty() {
        return true;
    }
    configured.iter().any(|c| CATCH_ALL.contains(&c.as_str())) || configured.contains(value)
}

fn contexts_allow(configured: &[Context], value: &Context) -> bool {
    if !value.as_str().is_empty() && configured.is_empty() {
        return true;
    }
    configured.iter().any(|c| CATCH_ALL.contains(&c.as_str())) || configured.contains(value)
}

impl ParameterValidator for DefaultParameterValidator {
    fn validation_passed(&self, parameters: &Parameters) -> bool {
        if parameters.command.as_str().is_empty() || parameters.context.as_str().is_empty() {
            return false;
        }
        let Some(action) = parameters.action else {
            return false;
        };
        commands_allow(&self.supported_commands, &parameters.command)
            && contexts_allow(&self.supported_contexts, &parameters.context)
            && (self.supported_actions.is_empty() || self.supported_actions.contains(&action))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
