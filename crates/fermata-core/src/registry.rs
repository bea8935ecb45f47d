// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource registry: built-in handlers plus every deployed remote action.
//!
//! The registry is built once per invocation through an explicit discovery
//! step and is immutable thereafter. Binding it to one invocation's
//! resources (platform handle, continuation store, TTL) produces the
//! handler map the interpreter dispatches against for that run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use fermata_machine::{HandlerMap, MachineError, RunOutcome, Task, TaskContext};
use fermata_store::{ContinuationStore, SuspendSnapshot};

use crate::platform::{ActionPlatform, PlatformError};

/// Resource identifier of the built-in suspend handler.
pub const RESOURCE_SUSPEND: &str = "builtin:suspend";

/// Resource identifier of the built-in respond handler.
pub const RESOURCE_RESPOND: &str = "builtin:respond";

/// Event key under which the suspend handler attaches the token.
pub const CONTINUATION_KEY: &str = "continuation";

/// A task handler bound to a resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskHandler {
    /// Persist a snapshot and complete the run as suspended.
    Suspend,
    /// Finalize the event and complete the run.
    Respond,
    /// Dispatch to the named remote action.
    RemoteAction(String),
}

/// Mapping from resource identifier to task handler.
#[derive(Debug)]
pub struct ResourceRegistry {
    handlers: HashMap<String, TaskHandler>,
}

impl ResourceRegistry {
    /// Query the platform catalog and build the registry: the built-ins
    /// plus a `RemoteAction` handler for every deployed action.
    ///
    /// Discovery failure aborts registry construction; it is propagated,
    /// not retried.
    pub async fn discover(
        platform: &Arc<dyn ActionPlatform>,
    ) -> Result<ResourceRegistry, PlatformError> {
        let mut handlers = HashMap::new();
        handlers.insert(RESOURCE_SUSPEND.to_string(), TaskHandler::Suspend);
        handlers.insert(RESOURCE_RESPOND.to_string(), TaskHandler::Respond);

        for name in platform.list_actions().await? {
            debug!(action = %name, "registering remote action");
            handlers.insert(name.clone(), TaskHandler::RemoteAction(name));
        }

        info!(resources = handlers.len(), "resource registry built");
        Ok(ResourceRegistry { handlers })
    }

    /// Look up the handler bound to `resource`.
    pub fn lookup(&self, resource: &str) -> Option<&TaskHandler> {
        self.handlers.get(resource)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty (it never is after discovery; the
    /// built-ins are always present).
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Bind the registry to one invocation's resources, producing the
    /// handler map registered with the interpreter for that run. The
    /// registry itself stays immutable and reusable.
    pub fn bind(
        &self,
        platform: Arc<dyn ActionPlatform>,
        store: Arc<ContinuationStore>,
        ttl: Duration,
    ) -> HandlerMap {
        let mut bound: HandlerMap = HashMap::new();
        for (resource, handler) in &self.handlers {
            let task: Arc<dyn Task> = match handler {
                TaskHandler::Suspend => Arc::new(SuspendTask {
                    store: store.clone(),
                    ttl,
                }),
                TaskHandler::Respond => Arc::new(RespondTask),
                TaskHandler::RemoteAction(name) => Arc::new(RemoteActionTask {
                    name: name.clone(),
                    platform: platform.clone(),
                }),
            };
            bound.insert(resource.clone(), task);
        }
        bound
    }
}

/// Persists a suspend snapshot and completes the run as suspended.
///
/// Deliberately never reports task success: the missing signal is what
/// stops the interpreter from advancing past the suspend point.
struct SuspendTask {
    store: Arc<ContinuationStore>,
    ttl: Duration,
}

#[async_trait]
impl Task for SuspendTask {
    async fn run(&self, event: Value, ctx: TaskContext) -> Result<(), MachineError> {
        let resume_at =
            ctx.state()
                .next
                .clone()
                .ok_or_else(|| MachineError::Task {
                    message: "suspending state declares no Next state to resume at".to_string(),
                })?;

        // The snapshot captures the event before the token is attached;
        // a resumed run rebuilds its own constants.
        let snapshot = SuspendSnapshot::capture(event.clone(), resume_at, ctx.machine().clone());

        let token = self
            .store
            .put(&snapshot, self.ttl)
            .await
            .map_err(|e| MachineError::Task {
                message: e.to_string(),
            })?;

        info!(
            run = %ctx.run_name(),
            token = %token,
            resume_at = %snapshot.resume_at,
            "run suspended"
        );

        let mut event = event;
        if let Some(object) = event.as_object_mut() {
            object.insert(CONTINUATION_KEY.to_string(), json!(token.as_str()));
        }

        ctx.completion().complete(RunOutcome::Suspended(event));
        Ok(())
    }
}

/// Finalizes the event and completes the run.
struct RespondTask;

#[async_trait]
impl Task for RespondTask {
    async fn run(&self, event: Value, ctx: TaskContext) -> Result<(), MachineError> {
        let mut event = event;

        let elapsed_msec = event
            .pointer("/constants/start_time")
            .and_then(Value::as_str)
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|start| (Utc::now() - start.with_timezone(&Utc)).num_milliseconds());

        match elapsed_msec {
            Some(elapsed) => {
                if let Some(object) = event.as_object_mut() {
                    object.insert("elapsed_msec".to_string(), json!(elapsed));
                }
            }
            None => warn!(run = %ctx.run_name(), "event carries no parseable start_time"),
        }

        info!(run = %ctx.run_name(), "run completed");
        ctx.completion().complete(RunOutcome::Completed(event));
        Ok(())
    }
}

/// Dispatches one state to a deployed remote action.
struct RemoteActionTask {
    name: String,
    platform: Arc<dyn ActionPlatform>,
}

#[async_trait]
impl Task for RemoteActionTask {
    async fn run(&self, input: Value, ctx: TaskContext) -> Result<(), MachineError> {
        match self.platform.invoke(&self.name, input).await {
            Ok(output) => {
                debug!(
                    run = %ctx.run_name(),
                    action = %self.name,
                    "remote action returned"
                );
                // Actions return an object; the dispatched result is its
                // `value` field.
                let value = output.get("value").cloned().unwrap_or(Value::Null);
                ctx.report_success(value);
            }
            Err(e) => {
                warn!(run = %ctx.run_name(), action = %self.name, error = %e, "remote action failed");
                ctx.report_failure(e.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TwoActions;

    #[async_trait]
    impl ActionPlatform for TwoActions {
        async fn list_actions(&self) -> Result<Vec<String>, PlatformError> {
            Ok(vec!["increment".to_string(), "square".to_string()])
        }

        async fn invoke(&self, name: &str, _params: Value) -> Result<Value, PlatformError> {
            Err(PlatformError::Invoke {
                name: name.to_string(),
                details: "not deployed in this test".to_string(),
            })
        }
    }

    struct BrokenCatalog;

    #[async_trait]
    impl ActionPlatform for BrokenCatalog {
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

    #[tokio::test]
    async fn test_discover_registers_builtins_and_actions() {
        let platform: Arc<dyn ActionPlatform> = Arc::new(TwoActions);
        let registry = ResourceRegistry::discover(&platform).await.unwrap();

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.lookup(RESOURCE_SUSPEND), Some(&TaskHandler::Suspend));
        assert_eq!(registry.lookup(RESOURCE_RESPOND), Some(&TaskHandler::Respond));
        assert_eq!(
            registry.lookup("increment"),
            Some(&TaskHandler::RemoteAction("increment".to_string()))
        );
        assert!(registry.lookup("unknown").is_none());
    }

    #[tokio::test]
    async fn test_discovery_failure_propagates() {
        let platform: Arc<dyn ActionPlatform> = Arc::new(BrokenCatalog);
        let err = ResourceRegistry::discover(&platform).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
