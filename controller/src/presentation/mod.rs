// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0

pub mod api;
pub mod mux;
pub mod registry;
pub mod rpc;
