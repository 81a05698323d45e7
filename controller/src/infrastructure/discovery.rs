// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! Service-discovery registration client.
//!
//! Registers this instance's listen addresses so upstream routing finds it,
//! and deregisters during teardown so new traffic stops being routed here
//! before the listeners close.

use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Clone)]
pub struct DiscoveryClient {
    base_url: String,
    http: reqwest::Client,
}

impl DiscoveryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Register `addr` under `service`. Failure here is boot-fatal for the
    /// caller; a controller nobody can route to is not serving.
    pub async fn register(
        &self,
        service: &str,
        addr: &str,
        meta: HashMap<String, String>,
    ) -> Result<Registration> {
        let url = format!("{}/services/{service}/instances/{addr}", self.base_url);
        self.http
            .put(&url)
            .json(&meta)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .with_context(|| format!("error registering {service} at {addr}"))?;
        info!(service, addr, "registered with service discovery");
        Ok(Registration {
            client: self.clone(),
            service: service.to_string(),
            addr: addr.to_string(),
        })
    }
}

pub struct Registration {
    client: DiscoveryClient,
    service: String,
    addr: String,
}

impl Registration {
    /// Best-effort removal; teardown proceeds even if discovery is gone.
    pub async fn deregister(self) {
        let url = format!(
            "{}/services/{}/instances/{}",
            self.client.base_url, self.service, self.addr
        );
        match self.client.http.delete(&url).send().await {
            Ok(res) if res.status().is_success() => {
                info!(service = %self.service, "deregistered from service discovery");
            }
            Ok(res) => {
                warn!(service = %self.service, status = %res.status(), "deregistration rejected");
            }
            Err(err) => {
                warn!(service = %self.service, error = %err, "deregistration failed");
            }
        }
    }
}
