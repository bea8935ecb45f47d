// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::time::Duration;

use fermata_store::StoreConfig;

/// Default action platform endpoint.
pub const DEFAULT_PLATFORM_URL: &str = "http://localhost:3233";

/// Default continuation snapshot TTL in seconds.
pub const DEFAULT_CONTINUATION_TTL_SECS: u64 = 300;

/// Fermata orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Continuation store connection URL
    pub store_url: String,
    /// Action platform base URL
    pub platform_url: String,
    /// Optional platform basic-auth credentials (`user:pass`)
    pub platform_auth: Option<String>,
    /// TTL applied to stored suspend snapshots
    pub continuation_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `FERMATA_STORE_URL`: store URL (default: local PostgreSQL endpoint)
    /// - `FERMATA_PLATFORM_URL`: platform base URL (default: `http://localhost:3233`)
    /// - `FERMATA_PLATFORM_AUTH`: platform `user:pass` credentials
    /// - `FERMATA_CONTINUATION_TTL_SECS`: snapshot TTL (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_url =
            std::env::var("FERMATA_STORE_URL").unwrap_or_else(|_| StoreConfig::localhost().url);

        let platform_url = std::env::var("FERMATA_PLATFORM_URL")
            .unwrap_or_else(|_| DEFAULT_PLATFORM_URL.to_string());

        let platform_auth = std::env::var("FERMATA_PLATFORM_AUTH").ok();

        let ttl_secs: u64 = std::env::var("FERMATA_CONTINUATION_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_CONTINUATION_TTL_SECS.to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid(
                    "FERMATA_CONTINUATION_TTL_SECS",
                    "must be a positive integer",
                )
            })?;

        Ok(Self {
            store_url,
            platform_url,
            platform_auth,
            continuation_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
