// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Terminal completion signalling for one run.
//!
//! Each invocation owns exactly one completion channel. The handle is cloned
//! into every task context; the first writer wins and later completion
//! attempts are ignored, so a run can never signal "completed" and
//! "suspended" both.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The respond resource fired: the run finished with a final payload.
    Completed(Value),
    /// The suspend resource fired: state was persisted and the payload
    /// carries the continuation token.
    Suspended(Value),
    /// A task failed, or the machine ended without a terminal resource.
    Failed(RunFailure),
}

/// Details of a failed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    /// Name of the state where the run failed.
    pub state: String,
    /// Resource identifier the state was bound to (may be empty when the
    /// failure happened before dispatch).
    pub resource: String,
    /// Failure message.
    pub message: String,
}

/// Single-assignment completion handle for one run.
#[derive(Clone)]
pub struct CompletionHandle {
    sender: Arc<Mutex<Option<oneshot::Sender<RunOutcome>>>>,
}

/// Create a completion channel: the handle given to the run, and the
/// receiver the caller awaits.
pub fn completion_channel() -> (CompletionHandle, oneshot::Receiver<RunOutcome>) {
    let (tx, rx) = oneshot::channel();
    (
        CompletionHandle {
            sender: Arc::new(Mutex::new(Some(tx))),
        },
        rx,
    )
}

impl CompletionHandle {
    /// Resolve the run with `outcome`. Returns `true` if this call won the
    /// race; `false` if the run was already completed (the outcome is
    /// dropped).
    pub fn complete(&self, outcome: RunOutcome) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => {
                // A dropped receiver means nobody is waiting anymore; the
                // completion still counts as delivered.
                let _ = tx.send(outcome);
                true
            }
            None => {
                debug!("duplicate run completion ignored");
                false
            }
        }
    }
}

impl std::fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("CompletionHandle")
            .field("pending", &pending)
            .finish()
    }
}
