// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Store-specific error types.

use thiserror::Error;

/// Errors that can occur against the continuation store.
///
/// An ordinary "token not found or expired" is *not* an error; lookups
/// return `Ok(None)` for that case.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connecting to the backing database failed.
    #[error("failed to connect to continuation store at '{url}': {details}")]
    Connect {
        /// The connection URL that was attempted.
        url: String,
        /// Driver-level details.
        details: String,
    },

    /// A store operation failed after the connection was established.
    #[error("continuation store {operation} failed: {details}")]
    Backend {
        /// The operation that failed (`put`, `get`, `migrate`).
        operation: &'static str,
        /// Driver-level details.
        details: String,
    },

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}
