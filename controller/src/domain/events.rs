// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! Platform state-change events fanned out by the event dispatcher and
//! recorded by the event repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    App,
    AppDeletion,
    Release,
    Artifact,
    Provider,
    Formation,
    ScaleRequest,
    Job,
    Deployment,
    Route,
    Resource,
    Volume,
    Sink,
    DomainMigration,
}

/// One recorded state change. `data` carries the serialized object at the
/// time of the change; the gateway never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEvent {
    pub id: Uuid,
    pub object_type: ObjectType,
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(object_type: ObjectType, object_id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            object_type,
            object_id: object_id.into(),
            app_id: None,
            data,
            created_at: Utc::now(),
        }
    }

    pub fn for_app(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }
}
