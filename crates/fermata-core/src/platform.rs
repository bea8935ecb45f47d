// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Remote action platform client.
//!
//! The platform hosts independently deployed actions. Fermata consumes it
//! through a narrow trait: list the catalog, invoke one action blocking for
//! its result. The HTTP implementation speaks the platform's REST surface;
//! transport authentication beyond basic credentials is the platform's
//! concern.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors from the action platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The deployed-actions catalog could not be listed.
    #[error("failed to list deployed actions: {0}")]
    List(String),

    /// A blocking invocation failed on the platform side.
    #[error("action '{name}' invocation failed: {details}")]
    Invoke {
        /// The action that was invoked.
        name: String,
        /// Platform-reported details.
        details: String,
    },

    /// The platform could not be reached.
    #[error("platform transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The task platform consumed by the resource registry.
#[async_trait]
pub trait ActionPlatform: Send + Sync {
    /// Names of all currently deployed actions.
    async fn list_actions(&self) -> Result<Vec<String>, PlatformError>;

    /// Invoke `name` with `params`, blocking until its result is available.
    async fn invoke(&self, name: &str, params: Value) -> Result<Value, PlatformError>;
}

/// Catalog entry returned by the platform's action listing.
#[derive(Debug, Deserialize)]
struct ActionEntry {
    name: String,
}

/// HTTP client for the action platform's REST surface.
pub struct HttpActionPlatform {
    client: reqwest::Client,
    base_url: String,
    auth: Option<(String, String)>,
}

impl HttpActionPlatform {
    /// Create a client for the platform at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: None,
        }
    }

    /// Attach basic-auth credentials of the form `user:pass`.
    pub fn with_auth(mut self, credentials: &str) -> Self {
        if let Some((user, pass)) = credentials.split_once(':') {
            self.auth = Some((user.to_string(), pass.to_string()));
        }
        self
    }

    fn actions_url(&self) -> String {
        format!("{}/api/v1/namespaces/_/actions", self.base_url)
    }

    fn invoke_url(&self, name: &str) -> String {
        format!(
            "{}/api/v1/namespaces/_/actions/{}?blocking=true&result=true",
            self.base_url, name
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some((user, pass)) => request.basic_auth(user, Some(pass)),
            None => request,
        }
    }
}

#[async_trait]
impl ActionPlatform for HttpActionPlatform {
    async fn list_actions(&self) -> Result<Vec<String>, PlatformError> {
        let response = self
            .authorized(self.client.get(self.actions_url()))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::List(format!("{}: {}", status, body)));
        }

        let entries: Vec<ActionEntry> = response.json().await?;
        debug!(count = entries.len(), "listed deployed actions");
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    async fn invoke(&self, name: &str, params: Value) -> Result<Value, PlatformError> {
        debug!(action = %name, "invoking remote action");
        let response = self
            .authorized(self.client.post(self.invoke_url(name)))
            .json(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Invoke {
                name: name.to_string(),
                details: format!("{}: {}", status, body),
            });
        }

        Ok(response.json().await?)
    }
}
