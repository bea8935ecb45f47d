// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Machine-specific error types.

use thiserror::Error;

/// Errors that can occur while registering or executing a machine.
#[derive(Debug, Error)]
pub enum MachineError {
    /// The definition failed structural validation.
    #[error("invalid machine definition: {reason}")]
    InvalidDefinition {
        /// What was wrong with the definition.
        reason: String,
    },

    /// A data-path selector is not of the supported `$.a.b` form.
    #[error("invalid data path '{path}'")]
    InvalidPath {
        /// The offending path expression.
        path: String,
    },

    /// Execution was started for a run with no registered machine.
    #[error("run '{run_name}' has no registered machine")]
    NotRegistered {
        /// The run name that was not registered.
        run_name: String,
    },

    /// A task handler failed before it could report to the interpreter.
    #[error("{message}")]
    Task {
        /// Handler-supplied failure message.
        message: String,
    },
}
