// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fermata Machine - State machine definitions and the execution runtime.
//!
//! This crate is the interpreter half of fermata. It owns the wire format for
//! machine definitions (PascalCase JSON: `StartAt`, `States`, per-state
//! `Type`/`InputPath`/`ResultPath`/`Resource`/`Next`/`End`), the data-path
//! selectors used for input/output mapping, and [`MachineRuntime`], which
//! drives one registered run to a terminal outcome.
//!
//! The runtime is deliberately narrow: chains of `Task` states with
//! `Next`/`End` transitions. Choice, parallel, retry and catch semantics are
//! out of scope; the orchestration layer composes everything else.
//!
//! # Execution model
//!
//! A run is registered in three steps and then driven by a spawned task:
//!
//! ```ignore
//! let runtime = MachineRuntime::new();
//! runtime.register_handlers(&run_name, handlers);
//! runtime.register_machine(&run_name, definition)?;
//!
//! let (completion, outcome) = completion_channel();
//! runtime.start_execution(event, &run_name, StartOptions { completion })?;
//!
//! match outcome.await {
//!     Ok(RunOutcome::Completed(body)) => { /* responded */ }
//!     Ok(RunOutcome::Suspended(body)) => { /* checkpointed, token attached */ }
//!     Ok(RunOutcome::Failed(failure)) => { /* task failed */ }
//!     Err(_) => { /* run ended without completing */ }
//! }
//! ```
//!
//! For each state the runtime hands the bound [`Task`] a [`TaskContext`]
//! carrying a single-use task-success signal. A handler that reports success
//! advances the machine to its `Next` state. A handler that instead resolves
//! the run's terminal [`CompletionHandle`] and drops the context halts the
//! machine: no task-success signal means no advancement, which is exactly how
//! a suspending state stops the interpreter from running past the suspend
//! point.

mod completion;
mod definition;
mod error;
mod paths;
mod runtime;

pub use completion::{CompletionHandle, RunFailure, RunOutcome, completion_channel};
pub use definition::{MachineDefinition, State, StateType};
pub use error::MachineError;
pub use paths::{inject, select};
pub use runtime::{HandlerMap, MachineRuntime, StartOptions, Task, TaskContext};

/// Type alias for machine results.
pub type Result<T> = std::result::Result<T, MachineError>;
