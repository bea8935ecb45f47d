// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Machine definition types and structural validation.
//!
//! Definitions are loaded from PascalCase JSON and never mutated in place;
//! a suspend snapshot gets its own rewritten copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MachineError;
use crate::paths;

/// Type tag of a state. Only `Task` is supported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateType {
    /// Dispatch the state's `Resource` to a task handler.
    Task,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One state in a machine: a resource to dispatch plus transition wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct State {
    /// State type tag.
    #[serde(rename = "Type")]
    pub state_type: StateType,

    /// Free-form description, carried but never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Selector picking the slice of the event handed to the handler.
    /// Defaults to `$` (the whole event).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,

    /// Selector naming where the handler's reported result lands in the
    /// event. Defaults to `$` (replace the whole event).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,

    /// Resource identifier bound to a task handler at dispatch time.
    pub resource: String,

    /// Name of the state to advance to on task success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// Terminal marker; mutually exclusive with `next`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub end: bool,
}

/// An immutable named graph of states with a single entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineDefinition {
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Name of the entry state.
    pub start_at: String,

    /// State name to state descriptor.
    pub states: BTreeMap<String, State>,
}

impl MachineDefinition {
    /// Structurally validate the definition.
    ///
    /// Checks that `StartAt` names a state, that every state declares
    /// exactly one of `Next` and `End`, that every `Next` names a state,
    /// that no resource identifier is empty, and that all data paths parse.
    pub fn validate(&self) -> Result<(), MachineError> {
        if self.states.is_empty() {
            return Err(MachineError::InvalidDefinition {
                reason: "machine has no states".to_string(),
            });
        }

        if !self.states.contains_key(&self.start_at) {
            return Err(MachineError::InvalidDefinition {
                reason: format!("StartAt '{}' does not name a state", self.start_at),
            });
        }

        for (name, state) in &self.states {
            match (&state.next, state.end) {
                (Some(_), true) => {
                    return Err(MachineError::InvalidDefinition {
                        reason: format!("state '{}' declares both Next and End", name),
                    });
                }
                (None, false) => {
                    return Err(MachineError::InvalidDefinition {
                        reason: format!("state '{}' declares neither Next nor End", name),
                    });
                }
                (Some(next), false) => {
                    if !self.states.contains_key(next) {
                        return Err(MachineError::InvalidDefinition {
                            reason: format!(
                                "state '{}' transitions to unknown state '{}'",
                                name, next
                            ),
                        });
                    }
                }
                (None, true) => {}
            }

            if state.resource.is_empty() {
                return Err(MachineError::InvalidDefinition {
                    reason: format!("state '{}' has an empty Resource", name),
                });
            }

            if let Some(path) = &state.input_path {
                paths::parse(path)?;
            }
            if let Some(path) = &state.result_path {
                paths::parse(path)?;
            }
        }

        Ok(())
    }
}
