// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The execution orchestrator: one entry point per invocation.
//!
//! Each invocation runs the same sequential protocol: validate the method
//! marker, open the continuation store, discover resources, branch between
//! a fresh and a resumed run, register and start it, then await the
//! terminal completion signal. The store connection is released on every
//! exit path. Distinct invocations execute fully independently; they share
//! only the process-scoped machine runtime and platform handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use fermata_machine::{MachineDefinition, MachineRuntime, RunOutcome, StartOptions, completion_channel};
use fermata_store::{ContinuationStore, ContinuationToken, StoreConfig};

use crate::config::{Config, DEFAULT_CONTINUATION_TTL_SECS};
use crate::demo::demo_machine;
use crate::error::OrchestrationError;
use crate::instance::RunInstance;
use crate::platform::ActionPlatform;
use crate::registry::{ResourceRegistry, TaskHandler};

/// The trigger verb an invocation must carry.
pub const EXPECTED_METHOD: &str = "post";

/// Initial input value when the caller supplies none.
pub const DEFAULT_INPUT: i64 = 1;

/// Parameters of one invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Invocation-method marker; must equal the expected trigger verb.
    pub method: String,
    /// Initial input value (default 1). Ignored on the resume path.
    pub input: Option<i64>,
    /// Continuation token from an earlier suspension.
    pub continuation: Option<String>,
    /// Inline machine definition; defaults to the built-in demo.
    pub machine: Option<MachineDefinition>,
    /// Store host override.
    pub store_host: Option<String>,
    /// Store port override.
    pub store_port: Option<u16>,
}

impl Invocation {
    /// An invocation carrying the expected trigger verb and no parameters.
    pub fn post() -> Self {
        Self {
            method: EXPECTED_METHOD.to_string(),
            input: None,
            continuation: None,
            machine: None,
            store_host: None,
            store_port: None,
        }
    }

    /// Set the initial input value.
    pub fn with_input(mut self, input: i64) -> Self {
        self.input = Some(input);
        self
    }

    /// Set the continuation token to resume from.
    pub fn with_continuation(mut self, token: impl Into<String>) -> Self {
        self.continuation = Some(token.into());
        self
    }

    /// Set an inline machine definition.
    pub fn with_machine(mut self, machine: MachineDefinition) -> Self {
        self.machine = Some(machine);
        self
    }

    /// Override the store host.
    pub fn with_store_host(mut self, host: impl Into<String>) -> Self {
        self.store_host = Some(host.into());
        self
    }

    /// Override the store port.
    pub fn with_store_port(mut self, port: u16) -> Self {
        self.store_port = Some(port);
        self
    }

    /// The store configuration this invocation resolves to: host/port
    /// overrides map to the PostgreSQL endpoint, otherwise the
    /// orchestrator's configured default applies.
    fn store_config(&self, default: &StoreConfig) -> StoreConfig {
        match (&self.store_host, self.store_port) {
            (None, None) => default.clone(),
            (host, port) => StoreConfig::host_port(
                host.as_deref().unwrap_or(fermata_store::DEFAULT_STORE_HOST),
                port.unwrap_or(fermata_store::DEFAULT_STORE_PORT),
            ),
        }
    }
}

/// The resolved result of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResponse {
    /// 200 for a completed run, 202 for a suspended run.
    pub status: u16,
    /// The final event payload; a suspended run's payload carries the
    /// continuation token under `"continuation"`.
    pub body: Value,
}

/// Top-level orchestrator. One value serves any number of concurrent
/// invocations; each invocation gets its own store connection and
/// completion signal.
pub struct Orchestrator {
    runtime: MachineRuntime,
    platform: Arc<dyn ActionPlatform>,
    store_config: StoreConfig,
    continuation_ttl: Duration,
}

impl Orchestrator {
    /// Create an orchestrator over the given store endpoint, platform and
    /// machine runtime.
    pub fn new(
        store_config: StoreConfig,
        platform: Arc<dyn ActionPlatform>,
        runtime: MachineRuntime,
    ) -> Self {
        Self {
            runtime,
            platform,
            store_config,
            continuation_ttl: Duration::from_secs(DEFAULT_CONTINUATION_TTL_SECS),
        }
    }

    /// Create an orchestrator from environment configuration.
    pub fn from_config(config: &Config, platform: Arc<dyn ActionPlatform>) -> Self {
        Self::new(
            StoreConfig::from_url(config.store_url.clone()),
            platform,
            MachineRuntime::new(),
        )
        .with_continuation_ttl(config.continuation_ttl)
    }

    /// Set the TTL applied to stored suspend snapshots.
    pub fn with_continuation_ttl(mut self, ttl: Duration) -> Self {
        self.continuation_ttl = ttl;
        self
    }

    /// Drive one invocation to completion, suspension, or rejection.
    #[instrument(skip(self, invocation), fields(continuation = ?invocation.continuation))]
    pub async fn invoke(
        &self,
        invocation: Invocation,
    ) -> Result<InvocationResponse, OrchestrationError> {
        // 1. Validate the invocation-method marker before touching any
        //    dependency; a mismatch opens no store connection.
        if !invocation.method.eq_ignore_ascii_case(EXPECTED_METHOD) {
            return Err(OrchestrationError::Validation {
                method: invocation.method.clone(),
                expected: EXPECTED_METHOD.to_string(),
            });
        }

        let started_at = Utc::now();

        // 2. Open the continuation store: a per-invocation resource.
        let store_config = invocation.store_config(&self.store_config);
        let store = Arc::new(ContinuationStore::connect(&store_config).await?);

        // 3-6. The rest of the protocol runs with the store open; whatever
        //      it returns, the connection is released below.
        let result = self.run(&invocation, store.clone(), started_at).await;

        // 7. Release the store connection unconditionally.
        store.close().await;

        result
    }

    async fn run(
        &self,
        invocation: &Invocation,
        store: Arc<ContinuationStore>,
        started_at: DateTime<Utc>,
    ) -> Result<InvocationResponse, OrchestrationError> {
        // 3. Build the resource registry via discovery.
        let registry = ResourceRegistry::discover(&self.platform)
            .await
            .map_err(|e| OrchestrationError::RegistryDiscovery {
                details: e.to_string(),
            })?;

        // 4. Fresh run or resumed run.
        let (instance, restarted_from) = match &invocation.continuation {
            Some(token_text) => {
                let token = ContinuationToken::from(token_text.as_str());
                match store.get(&token).await? {
                    Some(snapshot) => {
                        info!(token = %token, resume_at = %snapshot.resume_at, "resuming from continuation");
                        (RunInstance::resumed(snapshot), Some(token_text.clone()))
                    }
                    None => {
                        warn!(token = %token, "continuation not found or expired");
                        return Err(OrchestrationError::ContinuationNotFound {
                            token: token_text.clone(),
                        });
                    }
                }
            }
            None => {
                let definition = invocation.machine.clone().unwrap_or_else(demo_machine);
                let input = invocation.input.unwrap_or(DEFAULT_INPUT);
                (RunInstance::fresh(definition, input), None)
            }
        };

        info!(run = %instance.run_name, "starting run");

        // 5. Register this invocation's bound handlers and definition under
        //    the run name, then start execution with the terminal
        //    completion signal.
        let handlers = registry.bind(self.platform.clone(), store, self.continuation_ttl);
        self.runtime.register_handlers(&instance.run_name, handlers);
        if let Err(e) = self
            .runtime
            .register_machine(&instance.run_name, instance.definition.clone())
        {
            self.runtime.deregister(&instance.run_name);
            return Err(e.into());
        }

        let event = initial_event(&instance, started_at, restarted_from);
        let (completion, outcome) = completion_channel();
        if let Err(e) =
            self.runtime
                .start_execution(event, &instance.run_name, StartOptions { completion })
        {
            self.runtime.deregister(&instance.run_name);
            return Err(e.into());
        }

        // 6. Await the terminal completion signal, fired by exactly one of
        //    respond, suspend, or the interpreter's failure path.
        let outcome = outcome
            .await
            .map_err(|_| OrchestrationError::InterpreterStart {
                details: "run ended without completing the invocation".to_string(),
            })?;

        match outcome {
            RunOutcome::Completed(body) => Ok(InvocationResponse { status: 200, body }),
            RunOutcome::Suspended(body) => Ok(InvocationResponse { status: 202, body }),
            RunOutcome::Failed(failure) => Err(match registry.lookup(&failure.resource) {
                Some(TaskHandler::RemoteAction(_)) => OrchestrationError::RemoteAction {
                    resource: failure.resource,
                    message: failure.message,
                },
                // Only the store can fail a suspend; surface it as such.
                Some(TaskHandler::Suspend) => OrchestrationError::StoreConnectivity {
                    details: failure.message,
                },
                _ => OrchestrationError::RunFailed {
                    state: failure.state,
                    message: failure.message,
                },
            }),
        }
    }
}

/// Build the initial event payload threaded between states.
fn initial_event(
    instance: &RunInstance,
    started_at: DateTime<Utc>,
    restarted_from: Option<String>,
) -> Value {
    let mut constants = json!({
        "version": env!("CARGO_PKG_VERSION"),
        "start_time": started_at.to_rfc3339(),
        "run_name": instance.run_name,
    });

    if let Some(token) = restarted_from
        && let Some(object) = constants.as_object_mut()
    {
        object.insert("restarted_from".to_string(), json!(token));
    }

    json!({
        "constants": constants,
        "values": instance.values,
    })
}
