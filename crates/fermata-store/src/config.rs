// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Store connection configuration.

/// Default store host when only a port override is supplied.
pub const DEFAULT_STORE_HOST: &str = "localhost";

/// Default store port when only a host override is supplied.
pub const DEFAULT_STORE_PORT: u16 = 5432;

/// Connection configuration for the continuation store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Connection URL; the scheme selects the backend (`postgres:` or
    /// `sqlite:`).
    pub url: String,
    /// Maximum pool connections (default: 5).
    pub max_connections: u32,
}

impl StoreConfig {
    /// Configuration from a full connection URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
        }
    }

    /// Configuration for the PostgreSQL endpoint at `host:port`.
    ///
    /// This is the mapping for the invocation surface's store host/port
    /// parameters.
    pub fn host_port(host: &str, port: u16) -> Self {
        Self::from_url(format!("postgres://fermata@{}:{}/fermata", host, port))
    }

    /// Configuration for the local default endpoint.
    pub fn localhost() -> Self {
        Self::host_port(DEFAULT_STORE_HOST, DEFAULT_STORE_PORT)
    }

    /// Set the maximum pool connections.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}
