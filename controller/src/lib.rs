// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! # Stratus Controller
//!
//! Control-plane gateway for the Stratus application platform. A single
//! public entry point multiplexes health checks, REST and RPC traffic,
//! enforces authorization, fans out platform events, and coordinates
//! graceful shutdown.
//!
//! Layout follows the layering used across Stratus services:
//!
//! - `domain` - resource payload types, platform events and the repository
//!   capability contracts
//! - `infrastructure` - repository implementations, schema validation and
//!   platform service clients
//! - `presentation` - the HTTP surfaces: multiplexer, generic CRUD
//!   registry, explicit REST routes and the RPC bridge

pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod infrastructure;
pub mod presentation;
pub mod security;
pub mod shutdown;

pub use config::Config;
pub use error::{ControllerError, SHUTDOWN_MESSAGE};
