// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for fermata-core E2E tests.
//!
//! Provides TestContext wiring a tempfile-backed store, an in-process
//! action platform double, and a shared machine runtime.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

use fermata_core::orchestrator::Orchestrator;
use fermata_core::platform::{ActionPlatform, PlatformError};
use fermata_core::registry::RESOURCE_RESPOND;
use fermata_machine::{MachineDefinition, MachineRuntime, State, StateType};
use fermata_store::{ContinuationStore, StoreConfig};

/// In-process stand-in for the action platform: the demo arithmetic
/// actions plus one that always fails.
pub struct StaticPlatform;

#[async_trait]
impl ActionPlatform for StaticPlatform {
    async fn list_actions(&self) -> Result<Vec<String>, PlatformError> {
        Ok(vec![
            "increment".to_string(),
            "square".to_string(),
            "explode".to_string(),
        ])
    }

    async fn invoke(&self, name: &str, params: Value) -> Result<Value, PlatformError> {
        let value = params.get("value").and_then(Value::as_i64).unwrap_or(0);
        match name {
            "increment" => {
                let increment = params.get("increment").and_then(Value::as_i64).unwrap_or(1);
                Ok(json!({ "value": value + increment }))
            }
            "square" => Ok(json!({ "value": value * value })),
            "explode" => Err(PlatformError::Invoke {
                name: name.to_string(),
                details: "deliberate test failure".to_string(),
            }),
            _ => Err(PlatformError::Invoke {
                name: name.to_string(),
                details: "action not deployed".to_string(),
            }),
        }
    }
}

/// A platform whose catalog cannot be listed.
pub struct BrokenPlatform;

#[async_trait]
impl ActionPlatform for BrokenPlatform {
    async fn list_actions(&self) -> Result<Vec<String>, PlatformError> {
        Err(PlatformError::List("connection refused".to_string()))
    }

    async fn invoke(&self, name: &str, _params: Value) -> Result<Value, PlatformError> {
        Err(PlatformError::Invoke {
            name: name.to_string(),
            details: "unreachable".to_string(),
        })
    }
}

/// Test context owning the store directory and the shared runtime.
pub struct TestContext {
    dir: TempDir,
    pub runtime: MachineRuntime,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            runtime: MachineRuntime::new(),
        }
    }

    /// Path of the SQLite database backing the store.
    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("continuations.db")
    }

    /// Store configuration pointing at the test database.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::from_url(format!("sqlite:{}?mode=rwc", self.store_path().display()))
    }

    /// An orchestrator over the test store and the static platform.
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            self.store_config(),
            Arc::new(StaticPlatform),
            self.runtime.clone(),
        )
    }

    /// An orchestrator whose registry discovery fails.
    pub fn orchestrator_with_broken_platform(&self) -> Orchestrator {
        Orchestrator::new(
            self.store_config(),
            Arc::new(BrokenPlatform),
            self.runtime.clone(),
        )
    }

    /// Open a separate store connection for direct snapshot inspection.
    pub async fn open_store(&self) -> ContinuationStore {
        ContinuationStore::connect(&self.store_config())
            .await
            .expect("failed to open test store")
    }
}

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

fn respond_state() -> State {
    State {
        state_type: StateType::Task,
        comment: None,
        input_path: None,
        result_path: None,
        resource: RESOURCE_RESPOND.to_string(),
        next: None,
        end: true,
    }
}

/// The demo arithmetic chain without the suspend point:
/// increment, square, increment, respond.
pub fn straight_through_machine() -> MachineDefinition {
    let mut states = BTreeMap::new();
    states.insert("A".to_string(), arithmetic("increment", "B"));
    states.insert("B".to_string(), arithmetic("square", "C"));
    states.insert("C".to_string(), arithmetic("increment", "SendResponse"));
    states.insert("SendResponse".to_string(), respond_state());
    MachineDefinition {
        comment: Some("Increment and square, no suspension".to_string()),
        start_at: "A".to_string(),
        states,
    }
}

/// A machine bound to a resource no platform deploys.
pub fn unknown_resource_machine() -> MachineDefinition {
    let mut states = BTreeMap::new();
    states.insert("A".to_string(), arithmetic("not-deployed-anywhere", "SendResponse"));
    states.insert("SendResponse".to_string(), respond_state());
    MachineDefinition {
        comment: None,
        start_at: "A".to_string(),
        states,
    }
}

/// A machine whose first state's remote call always fails.
pub fn exploding_machine() -> MachineDefinition {
    let mut states = BTreeMap::new();
    states.insert("A".to_string(), arithmetic("explode", "SendResponse"));
    states.insert("SendResponse".to_string(), respond_state());
    MachineDefinition {
        comment: None,
        start_at: "A".to_string(),
        states,
    }
}
