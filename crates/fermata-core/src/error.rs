// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Invocation error taxonomy with status mapping.
//!
//! Every rejection distinguishes "bad request" from "expired/invalid
//! continuation" from "internal dependency failure" through its status and
//! stable error code.

use std::fmt;

use fermata_machine::MachineError;
use fermata_store::StoreError;

/// Result type using OrchestrationError
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Errors that reject an invocation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum OrchestrationError {
    /// The invocation-method marker did not match the expected trigger verb.
    Validation {
        /// The method that was presented.
        method: String,
        /// The method that was expected.
        expected: String,
    },

    /// The presented continuation token is unknown or expired.
    ContinuationNotFound {
        /// The literal token that failed to resolve.
        token: String,
    },

    /// The continuation store could not be reached or operated on.
    StoreConnectivity {
        /// Driver-level details.
        details: String,
    },

    /// The action platform catalog could not be listed.
    RegistryDiscovery {
        /// Platform-level details.
        details: String,
    },

    /// The interpreter rejected registration or start of the run.
    InterpreterStart {
        /// Interpreter-level details.
        details: String,
    },

    /// A dispatched task's remote call failed.
    RemoteAction {
        /// The resource identifier of the failing action.
        resource: String,
        /// Failure message from the platform.
        message: String,
    },

    /// The run failed for a reason attributable to neither a remote call
    /// nor the store (e.g. an unknown resource identifier).
    RunFailed {
        /// The state where the run failed.
        state: String,
        /// Failure message.
        message: String,
    },
}

impl OrchestrationError {
    /// Get the stable error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::ContinuationNotFound { .. } => "CONTINUATION_NOT_FOUND",
            Self::StoreConnectivity { .. } => "STORE_CONNECTIVITY_ERROR",
            Self::RegistryDiscovery { .. } => "REGISTRY_DISCOVERY_ERROR",
            Self::InterpreterStart { .. } => "INTERPRETER_START_ERROR",
            Self::RemoteAction { .. } => "REMOTE_ACTION_ERROR",
            Self::RunFailed { .. } => "RUN_FAILED",
        }
    }

    /// Get the response status for this error type. Caller mistakes map to
    /// 4xx, dependency failures to 5xx.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 405,
            Self::ContinuationNotFound { .. } => 404,
            Self::StoreConnectivity { .. } => 500,
            Self::RegistryDiscovery { .. } => 502,
            Self::InterpreterStart { .. } => 500,
            Self::RemoteAction { .. } => 502,
            Self::RunFailed { .. } => 500,
        }
    }

    /// Render this error as a structured rejection body.
    pub fn to_rejection(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error_code(),
            "message": self.to_string(),
        })
    }
}

impl fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { method, expected } => {
                write!(
                    f,
                    "invocation method '{}' not allowed; expected '{}'",
                    method, expected
                )
            }
            Self::ContinuationNotFound { token } => {
                write!(f, "Continuation not found or expired: {}", token)
            }
            Self::StoreConnectivity { details } => {
                write!(f, "continuation store failure: {}", details)
            }
            Self::RegistryDiscovery { details } => {
                write!(f, "resource discovery failed: {}", details)
            }
            Self::InterpreterStart { details } => {
                write!(f, "failed to start machine execution: {}", details)
            }
            Self::RemoteAction { resource, message } => {
                write!(f, "remote action '{}' failed: {}", resource, message)
            }
            Self::RunFailed { state, message } => {
                write!(f, "run failed at state '{}': {}", state, message)
            }
        }
    }
}

impl std::error::Error for OrchestrationError {}

impl From<StoreError> for OrchestrationError {
    fn from(err: StoreError) -> Self {
        OrchestrationError::StoreConnectivity {
            details: err.to_string(),
        }
    }
}

impl From<MachineError> for OrchestrationError {
    fn from(err: MachineError) -> Self {
        OrchestrationError::InterpreterStart {
            details: err.to_string(),
        }
    }
}
