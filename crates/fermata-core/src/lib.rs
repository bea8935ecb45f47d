// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fermata Core - Suspendable Workflow Orchestrator
//!
//! This crate is the top-level entry point for one workflow invocation. It
//! composes the machine runtime (`fermata-machine`), the continuation store
//! (`fermata-store`), and the remote action platform into a single
//! suspend/resume protocol.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Invocation (caller)                          │
//! │            method / input / continuation / machine / store          │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                  │
//!                                  ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Execution Orchestrator                          │
//! │        validate → open store → discover → fresh | resumed           │
//! │               → register + start → await completion                 │
//! └─────────────────────────────────────────────────────────────────────┘
//!        │                    │                          │
//!        ▼                    ▼                          ▼
//! ┌──────────────┐   ┌─────────────────┐   ┌──────────────────────────┐
//! │ Continuation │   │ Resource        │   │ Machine Runtime           │
//! │ Store        │   │ Registry        │   │ (fermata-machine)         │
//! │ (fermata-    │   │ builtin:suspend │   │ per-run handlers +        │
//! │  store)      │   │ builtin:respond │   │ definitions, run loop     │
//! └──────────────┘   │ remote actions  │   └──────────────────────────┘
//!                    └─────────────────┘
//!                             │
//!                             ▼
//!                    ┌─────────────────┐
//!                    │ Action Platform │
//!                    │ (HTTP catalog + │
//!                    │  blocking invoke)│
//!                    └─────────────────┘
//! ```
//!
//! # Suspend/resume protocol
//!
//! A run suspends when it reaches a state bound to `builtin:suspend`: the
//! orchestrator's continuation store receives a snapshot (event payload,
//! resume point, machine definition rewritten to start at the resume point)
//! and the invocation resolves with status 202 and the opaque token attached
//! to the payload under `"continuation"`. Presenting that token in a later
//! invocation loads the snapshot and instantiates a brand-new run that
//! starts exactly at the state after the suspend - the suspending state is
//! never replayed.
//!
//! The respond/suspend split is signalled through a single-assignment
//! completion handle: exactly one of `builtin:respond`, `builtin:suspend`,
//! or the interpreter's failure path completes an invocation, first writer
//! wins.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `FERMATA_STORE_URL` | No | local PostgreSQL endpoint | Continuation store URL |
//! | `FERMATA_PLATFORM_URL` | No | `http://localhost:3233` | Action platform base URL |
//! | `FERMATA_PLATFORM_AUTH` | No | - | Platform basic-auth `user:pass` |
//! | `FERMATA_CONTINUATION_TTL_SECS` | No | `300` | Snapshot TTL in seconds |
//!
//! # Modules
//!
//! - [`config`]: Environment configuration
//! - [`demo`]: The built-in increment/square demo machine
//! - [`error`]: Invocation error taxonomy with status mapping
//! - [`instance`]: Uniquely named run instantiation (fresh and resumed)
//! - [`orchestrator`]: The per-invocation protocol
//! - [`platform`]: Remote action platform client
//! - [`registry`]: Resource registry and the built-in task handlers

#![deny(missing_docs)]

/// Environment configuration.
pub mod config;

/// The built-in increment/square demo machine.
pub mod demo;

/// Invocation error taxonomy with status mapping.
pub mod error;

/// Uniquely named run instantiation (fresh and resumed).
pub mod instance;

/// The per-invocation orchestration protocol.
pub mod orchestrator;

/// Remote action platform client.
pub mod platform;

/// Resource registry and the built-in task handlers.
pub mod registry;

pub use config::{Config, ConfigError};
pub use demo::demo_machine;
pub use error::OrchestrationError;
pub use instance::RunInstance;
pub use orchestrator::{Invocation, InvocationResponse, Orchestrator};
pub use platform::{ActionPlatform, HttpActionPlatform, PlatformError};
pub use registry::{RESOURCE_RESPOND, RESOURCE_SUSPEND, ResourceRegistry, TaskHandler};
