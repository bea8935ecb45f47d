// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run instantiation: binding input to a uniquely named run.

use serde_json::{Value, json};
use uuid::Uuid;

use fermata_machine::MachineDefinition;
use fermata_store::SuspendSnapshot;

/// A machine definition wrapped under a globally unique run name, with the
/// initial event values for that run.
#[derive(Debug, Clone)]
pub struct RunInstance {
    /// Globally unique run name (`M-<uuid>`). No two concurrently live runs
    /// ever share a name.
    pub run_name: String,
    /// The definition this run executes.
    pub definition: MachineDefinition,
    /// Initial `values` object for the run's event payload.
    pub values: Value,
}

impl RunInstance {
    /// Instantiate a fresh run from a template definition and initial value.
    pub fn fresh(definition: MachineDefinition, initial_value: i64) -> Self {
        Self {
            run_name: unique_run_name(),
            definition,
            values: json!({ "value": initial_value }),
        }
    }

    /// Instantiate a run from a suspend snapshot. The snapshot's definition
    /// already starts at the resume point; the run gets a brand-new name so
    /// the interpreter never conflates it with the suspended run.
    pub fn resumed(snapshot: SuspendSnapshot) -> Self {
        let values = snapshot
            .data
            .get("values")
            .cloned()
            .unwrap_or_else(|| json!({}));

        Self {
            run_name: unique_run_name(),
            definition: snapshot.machine,
            values,
        }
    }
}

fn unique_run_name() -> String {
    format!("M-{}", Uuid::new_v4())
}
