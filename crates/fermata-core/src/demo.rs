// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The built-in demo machine used when the caller supplies no definition.

use std::collections::BTreeMap;

use fermata_machine::{MachineDefinition, State, StateType};

use crate::registry::{RESOURCE_RESPOND, RESOURCE_SUSPEND};

fn arithmetic(resource: &str, next: &str) -> State {
    State {
        state_type: StateType::Task,
        comment: None,
        input_path: Some("$.values".to_string()),
        result_path: Some("$.values.value".to_string()),
        resource: resource.to_string(),
        next: Some(next.to_string()),
        end: false,
    }
}

/// `incsquare`: increment, square, suspend, then increment again and
/// respond. With input 5 the run suspends at 36 and responds with 37.
pub fn demo_machine() -> MachineDefinition {
    let mut states = BTreeMap::new();
    states.insert("A".to_string(), arithmetic("increment", "B"));
    states.insert("B".to_string(), arithmetic("square", "Suspend"));
    states.insert(
        "Suspend".to_string(),
        State {
            state_type: StateType::Task,
            comment: None,
            input_path: None,
            result_path: None,
            resource: RESOURCE_SUSPEND.to_string(),
            next: Some("C".to_string()),
            end: false,
        },
    );
    states.insert("C".to_string(), arithmetic("increment", "SendResponse"));
    states.insert(
        "SendResponse".to_string(),
        State {
            state_type: StateType::Task,
            comment: None,
            input_path: None,
            result_path: None,
            resource: RESOURCE_RESPOND.to_string(),
            next: None,
            end: true,
        },
    );

    MachineDefinition {
        comment: Some("Increment and square a value".to_string()),
        start_at: "A".to_string(),
        states,
    }
}
