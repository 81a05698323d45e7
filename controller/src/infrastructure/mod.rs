// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0

pub mod discovery;
pub mod log_client;
pub mod memory;
pub mod schema;
