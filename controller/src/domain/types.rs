// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! Resource payload types carried through the gateway.
//!
//! The gateway treats these as opaque decoded/encoded payloads: their
//! internal invariants belong to the repositories behind
//! [`crate::domain::repository`]. Fields the repository assigns on create
//! (id, timestamps) are optional on the way in and populated on the way out.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A resource kind usable with the generic CRUD registry.
///
/// Resolved at compile time; there is no runtime type reflection anywhere in
/// the dispatch path.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Path segment and schema name for this kind, e.g. `"apps"`.
    const KIND: &'static str;

    fn id(&self) -> Option<Uuid>;

    /// Stamp repository-assigned fields onto a freshly created instance.
    fn assign(&mut self, id: Uuid, now: DateTime<Utc>);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct App {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub meta: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource for App {
    const KIND: &'static str = "apps";

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn assign(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = Some(id);
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessType {
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Release {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default)]
    pub artifact_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub processes: HashMap<String, ProcessType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource for Release {
    const KIND: &'static str = "releases";

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn assign(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = Some(id);
        self.created_at = Some(now);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource for Provider {
    const KIND: &'static str = "providers";

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn assign(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = Some(id);
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub meta: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource for Artifact {
    const KIND: &'static str = "artifacts";

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn assign(&mut self, id: Uuid, now: DateTime<Utc>) {
        self.id = Some(id);
        self.created_at = Some(now);
    }
}

/// Desired process counts for one (app, release) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub release_id: String,
    #[serde(default)]
    pub processes: HashMap<String, i32>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub release_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_processes: Option<HashMap<String, i32>>,
    #[serde(default)]
    pub new_processes: HashMap<String, i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Starting,
    Up,
    Stopping,
    Down,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub release_id: String,
    #[serde(rename = "type", default)]
    pub process_type: String,
    #[serde(default)]
    pub state: Option<JobState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub meta: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of `POST /apps/{app_id}/jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub release_id: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_release_id: Option<String>,
    #[serde(default)]
    pub new_release_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub processes: HashMap<String, i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Body of `POST /apps/{app_id}/deploy`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployRequest {
    pub release_id: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub timeout: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Prefix for route parent references pointing at an app.
pub const ROUTE_PARENT_REF_PREFIX: &str = "controller/apps/";

pub fn route_parent_ref(app_id: &str) -> String {
    format!("{ROUTE_PARENT_REF_PREFIX}{app_id}")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionedResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub apps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /providers/{provider_id}/resources`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default)]
    pub apps: Vec<String>,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeState {
    Pending,
    Created,
    Decommissioned,
    Destroyed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<VolumeState>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub meta: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decommissioned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainMigration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub old_domain: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_deserializes_from_sparse_payload() {
        let app: App = serde_json::from_str(r#"{"name":"web"}"#).unwrap();
        assert_eq!(app.name, "web");
        assert!(app.id.is_none());
        assert!(app.created_at.is_none());
    }

    #[test]
    fn assign_populates_repository_fields() {
        let mut app: App = serde_json::from_str(r#"{"name":"web"}"#).unwrap();
        let id = Uuid::new_v4();
        let now = Utc::now();
        app.assign(id, now);
        assert_eq!(app.id, Some(id));
        assert_eq!(app.created_at, Some(now));
    }

    #[test]
    fn artifact_kind_serializes_as_type() {
        let artifact = Artifact {
            id: None,
            kind: "docker".into(),
            uri: "https://registry/image".into(),
            meta: HashMap::new(),
            created_at: None,
        };
        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(value["type"], "docker");
    }
}
