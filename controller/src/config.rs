// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! Process configuration, read once from the environment at boot.
//!
//! Malformed input is fatal before any listener binds: there is no
//! partial-startup mode.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Default JSON-schema root when `SCHEMA_ROOT` is unset.
pub const DEFAULT_SCHEMA_ROOT: &str = "/etc/stratus-controller/jsonschema";

/// Default upper bound on signed-token validity windows (30 days).
const DEFAULT_TOKEN_MAX_VALIDITY: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    /// REST + bridged-RPC listen port.
    pub http_port: u16,
    /// Native RPC listen port.
    pub rpc_port: u16,
    /// Seed for generated object names, decoded from hex.
    pub name_seed: Option<Vec<u8>>,
    /// Accepted shared-secret keys; multiple entries support rotation.
    pub auth_keys: Vec<String>,
    /// Key identifiers correlated 1:1 with `auth_keys`.
    pub auth_key_ids: Vec<String>,
    /// PEM-encoded ES256 public key for signed access tokens.
    pub token_key_pem: Option<String>,
    /// Tokens valid for longer than this are rejected outright.
    pub token_max_validity: Duration,
    pub default_route_domain: Option<String>,
    /// Selects the structured audit request logger.
    pub audit_log: bool,
    /// Platform CA certificate served on the bootstrap path.
    pub ca_cert: Vec<u8>,
    pub schema_root: PathBuf,
    pub database_url: Option<String>,
    /// Service-discovery endpoint; registration is skipped when unset.
    pub discoverd_url: Option<String>,
    /// Log-aggregator endpoint for app log retrieval.
    pub log_aggregator_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let http_port = port_var("PORT", 3000)?;
        let rpc_port = port_var("PORT_2", 3001)?;

        let name_seed = match nonempty_var("NAME_SEED") {
            Some(seed) => Some(hex::decode(&seed).context("error decoding NAME_SEED")?),
            None => None,
        };

        let auth_keys = list_var("AUTH_KEY");
        let auth_key_ids = list_var("AUTH_KEY_IDS");
        if !auth_key_ids.is_empty() && auth_key_ids.len() != auth_keys.len() {
            bail!(
                "AUTH_KEY_IDS has {} entries but AUTH_KEY has {}",
                auth_key_ids.len(),
                auth_keys.len()
            );
        }

        let token_max_validity = match nonempty_var("ACCESS_TOKEN_MAX_VALIDITY") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .context("error parsing ACCESS_TOKEN_MAX_VALIDITY")?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_TOKEN_MAX_VALIDITY,
        };

        Ok(Self {
            http_port,
            rpc_port,
            name_seed,
            auth_keys,
            auth_key_ids,
            token_key_pem: nonempty_var("ACCESS_TOKEN_KEY"),
            token_max_validity,
            default_route_domain: nonempty_var("DEFAULT_ROUTE_DOMAIN"),
            audit_log: std::env::var("AUDIT_LOG").is_ok_and(|v| v == "true"),
            ca_cert: std::env::var("CA_CERT").unwrap_or_default().into_bytes(),
            schema_root: nonempty_var("SCHEMA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_ROOT)),
            database_url: nonempty_var("DATABASE_URL"),
            discoverd_url: nonempty_var("DISCOVERD"),
            log_aggregator_url: nonempty_var("LOGAGGREGATOR"),
        })
    }
}

fn nonempty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn port_var(name: &str, default: u16) -> Result<u16> {
    match nonempty_var(name) {
        Some(raw) => raw.parse().with_context(|| format!("error parsing {name}")),
        None => Ok(default),
    }
}

fn list_var(name: &str) -> Vec<String> {
    nonempty_var(name)
        .map(|v| v.split(',').map(str::to_owned).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_port_falls_back_to_default() {
        assert_eq!(port_var("STRATUS_TEST_UNSET_PORT", 3000).unwrap(), 3000);
    }

    #[test]
    fn empty_list_var_is_empty_not_single_blank() {
        assert!(list_var("STRATUS_TEST_UNSET_LIST").is_empty());
    }
}
