// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0

pub mod events;
pub mod repository;
pub mod types;
