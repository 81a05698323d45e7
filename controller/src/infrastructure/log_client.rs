// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! Log-aggregator query client for app log retrieval.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};

use crate::error::ControllerError;

/// Options forwarded to the aggregator's log query endpoint.
#[derive(Debug, Clone, Default)]
pub struct LogOpts {
    pub follow: bool,
    pub lines: Option<u32>,
    pub job_id: Option<String>,
    pub process_type: Option<String>,
}

pub type LogStream = BoxStream<'static, Result<Bytes, ControllerError>>;

/// Log retrieval capability; failures propagate as opaque internal errors.
#[async_trait]
pub trait LogClient: Send + Sync {
    async fn get_log(&self, channel_id: &str, opts: &LogOpts) -> Result<LogStream, ControllerError>;
}

/// HTTP client against the platform log aggregator.
pub struct AggregatorClient {
    base_url: String,
    http: reqwest::Client,
}

impl AggregatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LogClient for AggregatorClient {
    async fn get_log(&self, channel_id: &str, opts: &LogOpts) -> Result<LogStream, ControllerError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if opts.follow {
            query.push(("follow", "true".into()));
        }
        if let Some(lines) = opts.lines {
            query.push(("lines", lines.to_string()));
        }
        if let Some(job_id) = &opts.job_id {
            query.push(("job_id", job_id.clone()));
        }
        if let Some(process_type) = &opts.process_type {
            query.push(("process_type", process_type.clone()));
        }

        let url = format!("{}/log/{channel_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| ControllerError::Internal(anyhow::anyhow!("log query failed: {e}")))?;

        Ok(response
            .bytes_stream()
            .map_err(|e| ControllerError::Internal(anyhow::anyhow!("log stream failed: {e}")))
            .boxed())
    }
}

/// Stands in when no aggregator is configured; every query yields an empty
/// stream.
pub struct NullLogClient;

#[async_trait]
impl LogClient for NullLogClient {
    async fn get_log(
        &self,
        _channel_id: &str,
        _opts: &LogOpts,
    ) -> Result<LogStream, ControllerError> {
        Ok(futures::stream::empty().boxed())
    }
}
