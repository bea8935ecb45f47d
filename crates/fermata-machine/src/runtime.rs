// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The machine runtime: run-scoped registration and the execution loop.
//!
//! The runtime is process-scoped and shared by all concurrent invocations;
//! registrations are keyed by run name, so two runs never see each other's
//! handlers even when they bind the same resource identifiers. A run's
//! registration is removed as soon as the run stops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::completion::{CompletionHandle, RunFailure, RunOutcome};
use crate::definition::{MachineDefinition, State};
use crate::error::MachineError;
use crate::paths;

/// Default data path when a state declares none.
const ROOT_PATH: &str = "$";

/// Map from resource identifier to the task bound to it for one run.
pub type HandlerMap = HashMap<String, Arc<dyn Task>>;

/// A task handler dispatched for one state.
///
/// A handler either reports to the per-task signal (advancing or failing the
/// machine), or resolves the run's terminal completion and drops the context
/// without reporting (halting the machine). Returning an error is equivalent
/// to reporting a failure for the state.
#[async_trait]
pub trait Task: Send + Sync {
    /// Execute the state with the selected event slice.
    async fn run(&self, input: Value, ctx: TaskContext) -> Result<(), MachineError>;
}

/// What a handler reported through its per-task signal.
enum TaskReport {
    Success(Value),
    Failure(String),
}

/// Per-step execution context handed to a task handler.
pub struct TaskContext {
    run_name: String,
    state_name: String,
    state: State,
    machine: Arc<MachineDefinition>,
    completion: CompletionHandle,
    report: oneshot::Sender<TaskReport>,
}

impl TaskContext {
    /// Unique name of the enclosing run.
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Name of the state being executed.
    pub fn state_name(&self) -> &str {
        &self.state_name
    }

    /// Descriptor of the state being executed (including its declared
    /// `Next`, which a suspending handler snapshots as the resume point).
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The definition of the enclosing run's machine.
    pub fn machine(&self) -> &MachineDefinition {
        &self.machine
    }

    /// The run's terminal completion handle.
    pub fn completion(&self) -> &CompletionHandle {
        &self.completion
    }

    /// Report task success, advancing the machine. Consumes the context:
    /// a task reports at most once.
    pub fn report_success(self, value: Value) {
        let _ = self.report.send(TaskReport::Success(value));
    }

    /// Report task failure through the interpreter's failure path.
    /// Consumes the context.
    pub fn report_failure(self, message: impl Into<String>) {
        let _ = self.report.send(TaskReport::Failure(message.into()));
    }
}

/// Options for starting one run.
pub struct StartOptions {
    /// Terminal completion handle resolving the invocation's result.
    pub completion: CompletionHandle,
}

#[derive(Clone, Default)]
struct RunEntry {
    handlers: HandlerMap,
    definition: Option<Arc<MachineDefinition>>,
}

/// Process-scoped machine runtime.
///
/// Cheap to clone; clones share the registration table.
#[derive(Clone, Default)]
pub struct MachineRuntime {
    runs: Arc<Mutex<HashMap<String, RunEntry>>>,
}

impl MachineRuntime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler map for one run. Registration is cumulative and
    /// safe under concurrent calls from unrelated invocations.
    pub fn register_handlers(&self, run_name: &str, handlers: HandlerMap) {
        let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        runs.entry(run_name.to_string()).or_default().handlers = handlers;
    }

    /// Validate and register the machine definition for one run.
    pub fn register_machine(
        &self,
        run_name: &str,
        definition: MachineDefinition,
    ) -> Result<(), MachineError> {
        definition.validate()?;
        let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        runs.entry(run_name.to_string()).or_default().definition = Some(Arc::new(definition));
        debug!(run = %run_name, "machine registered");
        Ok(())
    }

    /// Launch the run on the async runtime. Returns once the run is spawned;
    /// the terminal outcome arrives through the completion channel supplied
    /// in `options`.
    pub fn start_execution(
        &self,
        input: Value,
        run_name: &str,
        options: StartOptions,
    ) -> Result<(), MachineError> {
        let entry = {
            let runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
            runs.get(run_name).cloned()
        };

        let Some(RunEntry {
            handlers,
            definition: Some(definition),
        }) = entry
        else {
            return Err(MachineError::NotRegistered {
                run_name: run_name.to_string(),
            });
        };

        debug!(run = %run_name, start_at = %definition.start_at, "starting execution");

        let runs = self.runs.clone();
        let run_name = run_name.to_string();
        tokio::spawn(async move {
            run_machine(definition, handlers, input, &run_name, options.completion).await;
            let mut runs = runs.lock().unwrap_or_else(PoisonError::into_inner);
            runs.remove(&run_name);
        });

        Ok(())
    }

    /// Remove a run's registration. Running runs clean up after themselves;
    /// this is for runs that failed to start.
    pub fn deregister(&self, run_name: &str) {
        let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        runs.remove(run_name);
    }

    /// Number of currently registered runs (live or not yet started).
    pub fn registered_runs(&self) -> usize {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Drive one run from `StartAt` to a stop.
async fn run_machine(
    definition: Arc<MachineDefinition>,
    handlers: HandlerMap,
    mut event: Value,
    run_name: &str,
    completion: CompletionHandle,
) {
    let mut current = definition.start_at.clone();

    loop {
        let Some(state) = definition.states.get(&current) else {
            completion.complete(RunOutcome::Failed(RunFailure {
                state: current.clone(),
                resource: String::new(),
                message: format!("machine references unknown state '{}'", current),
            }));
            return;
        };

        // Unknown identifiers are a lookup failure, never a silent no-op.
        let Some(task) = handlers.get(&state.resource) else {
            completion.complete(RunOutcome::Failed(RunFailure {
                state: current.clone(),
                resource: state.resource.clone(),
                message: format!("no handler registered for resource '{}'", state.resource),
            }));
            return;
        };

        let input_path = state.input_path.as_deref().unwrap_or(ROOT_PATH);
        let input = match paths::select(&event, input_path) {
            Ok(value) => value,
            Err(e) => {
                completion.complete(RunOutcome::Failed(RunFailure {
                    state: current.clone(),
                    resource: state.resource.clone(),
                    message: e.to_string(),
                }));
                return;
            }
        };

        let (report_tx, report_rx) = oneshot::channel();
        let ctx = TaskContext {
            run_name: run_name.to_string(),
            state_name: current.clone(),
            state: state.clone(),
            machine: definition.clone(),
            completion: completion.clone(),
            report: report_tx,
        };

        debug!(run = %run_name, state = %current, resource = %state.resource, "dispatching state");

        if let Err(e) = task.run(input, ctx).await {
            completion.complete(RunOutcome::Failed(RunFailure {
                state: current.clone(),
                resource: state.resource.clone(),
                message: e.to_string(),
            }));
            return;
        }

        match report_rx.await {
            Ok(TaskReport::Success(value)) => {
                let result_path = state.result_path.as_deref().unwrap_or(ROOT_PATH);
                if let Err(e) = paths::inject(&mut event, result_path, value) {
                    completion.complete(RunOutcome::Failed(RunFailure {
                        state: current.clone(),
                        resource: state.resource.clone(),
                        message: e.to_string(),
                    }));
                    return;
                }

                match &state.next {
                    Some(next) => current = next.clone(),
                    None => {
                        // End state whose handler reported instead of
                        // completing the run terminally.
                        warn!(run = %run_name, state = %current, "machine ended without a terminal resource");
                        completion.complete(RunOutcome::Failed(RunFailure {
                            state: current.clone(),
                            resource: state.resource.clone(),
                            message: format!(
                                "machine ended at state '{}' without completing the run",
                                current
                            ),
                        }));
                        return;
                    }
                }
            }
            Ok(TaskReport::Failure(message)) => {
                completion.complete(RunOutcome::Failed(RunFailure {
                    state: current.clone(),
                    resource: state.resource.clone(),
                    message,
                }));
                return;
            }
            // No task-success signal: the handler completed the run
            // terminally (suspend or respond). The machine must not advance
            // past this state.
            Err(_) => {
                debug!(run = %run_name, state = %current, "state completed the run; halting");
                return;
            }
        }
    }
}
