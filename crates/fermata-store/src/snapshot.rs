// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Suspend snapshots and the tokens that address them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use fermata_machine::MachineDefinition;

/// Opaque handle to a stored suspend snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Generate a fresh, collision-resistant token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContinuationToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ContinuationToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Everything needed to restart a suspended run at its next state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspendSnapshot {
    /// Event payload at the moment of suspension (without the token).
    pub data: Value,
    /// Name of the state the resumed run starts at.
    pub resume_at: String,
    /// The run's machine definition with `StartAt` rewritten to `resume_at`.
    pub machine: MachineDefinition,
}

impl SuspendSnapshot {
    /// Build a snapshot, rewriting the definition's `StartAt` to the resume
    /// point. The invariant `machine.start_at == resume_at` holds for every
    /// snapshot built this way, so a resumed run can never replay the state
    /// that suspended.
    pub fn capture(
        data: Value,
        resume_at: impl Into<String>,
        mut machine: MachineDefinition,
    ) -> Self {
        let resume_at = resume_at.into();
        machine.start_at = resume_at.clone();
        Self {
            data,
            resume_at,
            machine,
        }
    }
}
