// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fermata - Suspendable Workflow Orchestrator
//!
//! Drives one invocation from positional process arguments:
//!
//! ```text
//! fermata [input] [continuation] [store-host] [store-port]
//! ```
//!
//! A completed run prints the final payload; a suspended run prints the
//! payload with the continuation token attached. Pass the token back as
//! the second argument to resume.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use fermata_core::config::Config;
use fermata_core::orchestrator::{Invocation, Orchestrator};
use fermata_core::platform::HttpActionPlatform;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fermata_core=info".parse()?),
        )
        .init();

    info!("Starting Fermata");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        store_url = %config.store_url,
        platform_url = %config.platform_url,
        ttl_secs = config.continuation_ttl.as_secs(),
        "Configuration loaded"
    );

    // Build the platform client
    let mut platform = HttpActionPlatform::new(&config.platform_url);
    if let Some(auth) = &config.platform_auth {
        platform = platform.with_auth(auth);
    }

    let orchestrator = Orchestrator::from_config(&config, Arc::new(platform));

    // One invocation from positional arguments, mirroring the request
    // surface: input, continuation, store host, store port.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut invocation = Invocation::post();
    if let Some(input) = args.first().filter(|v| !v.is_empty()) {
        invocation = invocation.with_input(input.parse()?);
    }
    if let Some(token) = args.get(1).filter(|v| !v.is_empty()) {
        invocation = invocation.with_continuation(token.clone());
    }
    if let Some(host) = args.get(2).filter(|v| !v.is_empty()) {
        invocation = invocation.with_store_host(host.clone());
    }
    if let Some(port) = args.get(3).filter(|v| !v.is_empty()) {
        invocation = invocation.with_store_port(port.parse()?);
    }

    match orchestrator.invoke(invocation).await {
        Ok(response) => {
            info!(status = response.status, "invocation resolved");
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            error!(code = e.error_code(), status = e.status(), "invocation rejected: {}", e);
            println!("{}", serde_json::to_string_pretty(&e.to_rejection())?);
            std::process::exit(1);
        }
    }
}
