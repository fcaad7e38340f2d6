// taskgraph-core/src/runtime/executor.rs
// ============================================================================
// Module: Taskgraph Workflow Executor
// Description: Runs the ordered hook pipeline over every in-scope task.
// Purpose: Single canonical entry point; every caller (CLI, service, test
//          harness) must go through this to preserve ordering and auto-
//          rollback guarantees.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! `WorkflowExecutor::execute_workflow` computes the dependency order once,
//! then runs every in-scope task through the same stage chain. A hook
//! failure anywhere aborts the remaining tasks; tasks already committed keep
//! their persisted state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::core::Action;
use crate::core::Command;
use crate::core::Context;
use crate::core::TaskId;
use crate::core::TaskSet;
use crate::core::VariableStore;
use crate::interfaces::Hook;
use crate::interfaces::HookContext;
use crate::interfaces::LogSink;
use crate::interfaces::Parameters;
use crate::interfaces::ParameterValidator;
use crate::interfaces::Persistence;
use crate::interfaces::ProcessorRegistry;
use crate::runtime::ordering::OrderingError;
use crate::runtime::ordering::task_names_in_order;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while executing a workflow.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// No hook stages are configured; there is nothing to run.
    #[error("no hook stages configured")]
    NoStages,
    /// The task set exceeds the configured `max_tasks` ceiling.
    #[error("task set has {len} tasks, exceeding the configured ceiling of {max}")]
    TooManyTasks {
        /// The number of tasks in the set.
        len: usize,
        /// The configured ceiling.
        max: usize,
    },
    /// `command` has no entry in the executor's command-to-action mapping.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// Dependency ordering failed before any task could run.
    #[error("ordering failed: {0}")]
    Ordering(#[from] OrderingError),
    /// A hook raised while processing `task_id`; the workflow was aborted
    /// after the general error hook ran.
    #[error("task '{task_id}' stage '{hook}' failed: {message}")]
    HookFailed {
        /// The task being processed when the failure occurred.
        task_id: TaskId,
        /// The name of the failing hook.
        hook: String,
        /// The failure detail.
        message: String,
    },
}

// ============================================================================
// SECTION: Workflow Executor
// ============================================================================

/// Runs a task set's dependency-ordered hook pipeline for one `(command,
/// context)` invocation.
pub struct WorkflowExecutor<Pe, V, L> {
    /// The ordered pipeline stages run for every in-scope task.
    pub stages: Vec<Box<dyn Hook>>,
    /// The task set this executor operates over.
    pub tasks: TaskSet,
    /// The shared variable store threaded through every hook.
    pub variables: VariableStore,
    /// The registry of processors available to the dispatch stage.
    pub processors: ProcessorRegistry,
    /// The configured persistence adapter.
    pub persistence: Pe,
    /// The configured parameter validator.
    pub validator: V,
    /// The configured log sink.
    pub log: L,
    /// Maps an operator-supplied command to the action it resolves to.
    pub command_actions: HashMap<Command, Action>,
    /// Runs once, after a hook failure, before the workflow aborts.
    pub general_error_hook: Box<dyn Hook>,
    /// Engine-level knobs: `max_tasks` ceiling and report rendering defaults.
    pub config: EngineConfig,
}

impl<Pe, V, L> WorkflowExecutor<Pe, V, L>
where
    Pe: Persistence,
    V: ParameterValidator,
    L: LogSink,
{
    /// Executes every in-scope task, in dependency order, through the
    /// configured hook pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::NoStages`] if no hooks are configured,
    /// [`ExecutorError::TooManyTasks`] if the task set exceeds
    /// `config.max_tasks`, [`ExecutorError::UnknownCommand`] if `command`
    /// has no mapped action, [`ExecutorError::Ordering`] if the task set's
    /// dependencies cannot be ordered, and [`ExecutorError::HookFailed`] if
    /// any hook raises while processing a task.
    pub fn execute_workflow(&mut self, command: Command, context: Context) -> Result<(), ExecutorError> {
        if self.stages.is_empty() {
            return Err(ExecutorError::NoStages);
        }
        if self.tasks.len() > self.config.max_tasks {
            return Err(ExecutorError::TooManyTasks { len: self.tasks.len(), max: self.config.max_tasks });
        }
        let action = *self.command_actions.get(&command).ok_or_else(|| ExecutorError::UnknownCommand(command.to_string()))?;

        let mut parameters = Parameters::new(command, context);
        parameters.action = Some(action);

        let order = task_names_in_order(&self.tasks, &parameters.command, &parameters.context)?;

        for task_id in order {
            let Some(task) = self.tasks.get(&task_id) else { continue };
            if !task.is_in_scope(&parameters.command, &parameters.context) {
                continue;
            }
            if let Err(err) = self.run_stages(&task_id, &mut parameters) {
                return Err(err);
            }
            self.persistence.commit().map_err(|err| ExecutorError::HookFailed {
                task_id: task_id.clone(),
                hook: "commit".to_string(),
                message: err.to_string(),
            })?;
        }
        Ok(())
    }

    /// Renders the current task set as a columnar report, using
    /// `config.show_checksums_by_default`/`config.report_gap_width`.
    #[must_use]
    pub fn render_report(&self) -> String {
        crate::core::render_report(&self.tasks, self.config.show_checksums_by_default, self.config.report_gap_width)
    }

    fn run_stages(&mut self, task_id: &TaskId, parameters: &mut Parameters) -> Result<(), ExecutorError> {
        for stage in &self.stages {
            let Some(task) = self.tasks.get_mut(task_id) else { continue };
            let mut ctx = HookContext {
                task,
                parameters,
                validator: &self.validator,
                persistence: &mut self.persistence,
                variables: &mut self.variables,
                processors: &self.processors,
                log: &self.log,
            };
            if let Err(err) = stage.run(&mut ctx) {
                parameters.exception_stacktrace = Some(err.to_string());
                let mut error_ctx = HookContext {
                    task: self.tasks.get_mut(task_id).expect("task id was just looked up above"),
                    parameters,
                    validator: &self.validator,
                    persistence: &mut self.persistence,
                    variables: &mut self.variables,
                    processors: &self.processors,
                    log: &self.log,
                };
                let _ = self.general_error_hook.run(&mut error_ctx);
                return Err(ExecutorError::HookFailed {
                    task_id: task_id.clone(),
                    hook: stage.name().to_string(),
                    message: err.to_string(),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ExecutorError;
    use super::WorkflowExecutor;
    use crate::config::EngineConfig;
    use crate::core::Action;
    use crate::core::Command;
    use crate::core::Context;
    use crate::core::Task;
    use crate::core::TaskSet;
    use crate::core::VariableStore;
    use crate::interfaces::ActionContext;
    use crate::interfaces::HookContext;
    use crate::interfaces::HookError;
    use crate::interfaces::NoopLogSink;
    use crate::interfaces::Processor;
    use crate::interfaces::ProcessorError;
    use crate::interfaces::ProcessorRegistry;
    use crate::runtime::hooks::GeneralErrorHook;
    use crate::runtime::hooks::ResolveTaskSpecVariablesHook;
    use crate::runtime::hooks::TaskPostProcessingStateUpdateHook;
    use crate::runtime::hooks::TaskProcessingHook;
    use crate::runtime::store::InMemoryPersistence;
    use crate::runtime::validator::DefaultParameterValidator;
    use crate::interfaces::Hook;

    struct NoopProcessor;
    impl Processor for NoopProcessor {
        fn create(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Ok(())
        }
        fn update(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Ok(())
        }
        fn delete(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Ok(())
        }
        fn rollback(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Ok(())
        }
        fn describe(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Ok(())
        }
        fn detect_drift(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ProcessorError> {
            Ok(())
        }
    }

    fn default_executor() -> WorkflowExecutor<InMemoryPersistence, DefaultParameterValidator, NoopLogSink> {
        let mut tasks = TaskSet::new();
        tasks.insert(Task::new("v1", "Server", json!({"name": "web"}), json!({"field": 1})));

        let mut processors = ProcessorRegistry::new();
        processors.register("v1", Box::new(NoopProcessor));

        let mut command_actions = std::collections::HashMap::new();
        command_actions.insert(Command::from("apply"), Action::Create);

        WorkflowExecutor {
            stages: vec![Box::new(ResolveTaskSpecVariablesHook), Box::new(TaskProcessingHook), Box::new(TaskPostProcessingStateUpdateHook)],
            tasks,
            variables: VariableStore::new(),
            processors,
            persistence: InMemoryPersistence::new(),
            validator: DefaultParameterValidator::new(),
            log: NoopLogSink,
            command_actions,
            general_error_hook: Box::new(GeneralErrorHook),
            config: EngineConfig::default(),
        }
    }

    #[test]
    fn empty_stage_list_is_rejected() {
        let mut executor = default_executor();
        executor.stages.clear();
        let err = executor.execute_workflow(Command::from("apply"), Context::from("prod")).unwrap_err();
        assert!(matches!(err, ExecutorError::NoStages));
    }

    #[test]
    fn unmapped_command_is_rejected() {
        let mut executor = default_executor();
        let err = executor.execute_workflow(Command::from("destroy"), Context::from("prod")).unwrap_err();
        assert!(matches!(err, ExecutorError::UnknownCommand(_)));
    }

    #[test]
    fn full_pipeline_runs_to_completion() {
        let mut executor = default_executor();
        executor.execute_workflow(Command::from("apply"), Context::from("prod")).unwrap();
        let task = executor.tasks.get(&"web".into()).unwrap();
        assert!(task.state.is_created());
    }

    #[test]
    fn out_of_scope_task_is_skipped_without_error() {
        let mut executor = default_executor();
        executor.tasks.insert(Task::new(
            "v1",
            "Server",
            json!({"name": "scoped-out", "processingScope": [{"commands": ["destroy"]}]}),
            json!({}),
        ));
        executor.command_actions.insert(Command::from("apply"), Action::Create);
        executor.execute_workflow(Command::from("apply"), Context::from("prod")).unwrap();
        let scoped_out = executor.tasks.get(&"scoped-out".into()).unwrap();
        assert!(!scoped_out.state.is_created());
    }

    #[test]
    fn too_many_tasks_is_rejected() {
        let mut executor = default_executor();
        executor.config.max_tasks = 0;
        let err = executor.execute_workflow(Command::from("apply"), Context::from("prod")).unwrap_err();
        assert!(matches!(err, ExecutorError::TooManyTasks { len: 1, max: 0 }));
    }

    #[test]
    fn render_report_includes_task_label() {
        let executor = default_executor();
        let report = executor.render_report();
        assert!(report.lines().any(|line| line.starts_with("web")));
        assert!(report.lines().next().unwrap().starts_with("Manifest"));
    }

    struct FailingHook;
    impl Hook for FailingHook {
        fn name(&self) -> &str {
            "FailingHook"
        }
        fn run(&self, _ctx: &mut HookContext<'_>) -> Result<(), HookError> {
            Err(HookError::Failed { hook: self.name().to_string(), message: "boom".to_string() })
        }
    }

    #[test]
    fn hook_failure_aborts_workflow_and_runs_general_error_hook() {
        let mut executor = default_executor();
        executor.stages = vec![Box::new(FailingHook)];
        let err = executor.execute_workflow(Command::from("apply"), Context::from("prod")).unwrap_err();
        assert!(matches!(err, ExecutorError::HookFailed { .. }));
    }
}
