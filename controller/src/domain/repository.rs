// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! # Repository capability contracts
//!
//! One trait per resource kind, defined here and implemented in
//! `crate::infrastructure` (in-memory for development and tests; production
//! persistence lives outside this crate). The gateway only ever talks to
//! these interfaces: repository internals, ordering and synchronization are
//! the implementation's concern.
//!
//! [`Repository<T>`] is the minimal capability set consumed by the generic
//! CRUD registry; kind-specific traits extend it with the operations their
//! explicit routes need.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::events::PlatformEvent;
use crate::domain::types::{
    App, Deployment, DeployRequest, DomainMigration, Formation, Job, NewJob, ProvisionedResource,
    ProvisionRequest, Release, Resource, Route, ScaleRequest, Sink, Volume,
};

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("object not found")]
    NotFound,

    #[error("validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Minimal capability set required by the generic CRUD registry.
///
/// List ordering is repository-defined; the gateway does not re-sort.
#[async_trait]
pub trait Repository<T: Resource>: Send + Sync {
    async fn create(&self, payload: T) -> Result<T, RepositoryError>;
    async fn get(&self, id: &str) -> Result<T, RepositoryError>;
    async fn list(&self) -> Result<Vec<T>, RepositoryError>;
}

#[async_trait]
pub trait AppRepo: Repository<App> {
    /// Merge metadata into an existing app (`POST /apps/{app_id}` and
    /// `/apps/{app_id}/meta`).
    async fn update_meta(&self, id: &str, meta: HashMap<String, String>)
        -> Result<App, RepositoryError>;

    /// Delete the app; follow-on cleanup is enqueued by the caller.
    async fn remove(&self, id: &str) -> Result<App, RepositoryError>;

    /// Pin the app's current release.
    async fn set_release(&self, app_id: &str, release_id: &str) -> Result<(), RepositoryError>;

    /// Current release id, if one was ever set.
    async fn release_id(&self, app_id: &str) -> Result<Option<String>, RepositoryError>;
}

#[async_trait]
pub trait ReleaseRepo: Repository<Release> {
    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Release>, RepositoryError>;
    async fn remove_for_app(&self, app_id: &str, release_id: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait FormationRepo: Send + Sync {
    async fn put(&self, formation: Formation) -> Result<Formation, RepositoryError>;
    async fn get(&self, app_id: &str, release_id: &str) -> Result<Formation, RepositoryError>;
    async fn remove(&self, app_id: &str, release_id: &str) -> Result<(), RepositoryError>;
    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Formation>, RepositoryError>;
    /// Cluster-wide formations with active processes (`GET /formations`).
    async fn list_active(&self) -> Result<Vec<Formation>, RepositoryError>;
    async fn put_scale_request(&self, req: ScaleRequest) -> Result<ScaleRequest, RepositoryError>;
}

#[async_trait]
pub trait JobRepo: Send + Sync {
    async fn run(&self, app_id: &str, req: NewJob) -> Result<Job, RepositoryError>;
    async fn get(&self, job_id: &str) -> Result<Job, RepositoryError>;
    async fn put(&self, job: Job) -> Result<Job, RepositoryError>;
    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Job>, RepositoryError>;
    async fn list_active(&self) -> Result<Vec<Job>, RepositoryError>;
    async fn kill(&self, job_id: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait DeploymentRepo: Send + Sync {
    async fn create(&self, app_id: &str, req: DeployRequest) -> Result<Deployment, RepositoryError>;
    async fn get(&self, id: &str) -> Result<Deployment, RepositoryError>;
    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Deployment>, RepositoryError>;
}

#[async_trait]
pub trait RouteRepo: Send + Sync {
    async fn add(&self, app_id: &str, route: Route) -> Result<Route, RepositoryError>;
    async fn get(&self, kind: &str, id: &str) -> Result<Route, RepositoryError>;
    async fn update(&self, kind: &str, id: &str, route: Route) -> Result<Route, RepositoryError>;
    async fn remove(&self, kind: &str, id: &str) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<Route>, RepositoryError>;
    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Route>, RepositoryError>;
}

#[async_trait]
pub trait ResourceRepo: Send + Sync {
    async fn provision(
        &self,
        provider_id: &str,
        req: ProvisionRequest,
    ) -> Result<ProvisionedResource, RepositoryError>;
    async fn get(&self, provider_id: &str, id: &str)
        -> Result<ProvisionedResource, RepositoryError>;
    async fn put(
        &self,
        provider_id: &str,
        id: &str,
        resource: ProvisionedResource,
    ) -> Result<ProvisionedResource, RepositoryError>;
    async fn remove(&self, provider_id: &str, id: &str) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<ProvisionedResource>, RepositoryError>;
    async fn list_for_provider(
        &self,
        provider_id: &str,
    ) -> Result<Vec<ProvisionedResource>, RepositoryError>;
    async fn list_for_app(&self, app_id: &str) -> Result<Vec<ProvisionedResource>, RepositoryError>;
    async fn add_app(&self, provider_id: &str, id: &str, app_id: &str)
        -> Result<ProvisionedResource, RepositoryError>;
    async fn remove_app(
        &self,
        provider_id: &str,
        id: &str,
        app_id: &str,
    ) -> Result<ProvisionedResource, RepositoryError>;
}

#[async_trait]
pub trait VolumeRepo: Send + Sync {
    async fn list(&self) -> Result<Vec<Volume>, RepositoryError>;
    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Volume>, RepositoryError>;
    async fn get(&self, app_id: &str, volume_id: &str) -> Result<Volume, RepositoryError>;
    async fn put(&self, volume: Volume) -> Result<Volume, RepositoryError>;
    async fn decommission(&self, app_id: &str, volume_id: &str) -> Result<Volume, RepositoryError>;
}

#[async_trait]
pub trait SinkRepo: Send + Sync {
    async fn create(&self, sink: Sink) -> Result<Sink, RepositoryError>;
    async fn get(&self, id: &str) -> Result<Sink, RepositoryError>;
    async fn list(&self) -> Result<Vec<Sink>, RepositoryError>;
    async fn remove(&self, id: &str) -> Result<Sink, RepositoryError>;
}

#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn get(&self, id: &str) -> Result<PlatformEvent, RepositoryError>;
    async fn list(&self) -> Result<Vec<PlatformEvent>, RepositoryError>;
}

#[async_trait]
pub trait BackupRepo: Send + Sync {
    /// Latest cluster backup as raw bytes.
    async fn get(&self) -> Result<Vec<u8>, RepositoryError>;
}

#[async_trait]
pub trait DomainMigrationRepo: Send + Sync {
    async fn migrate(&self, migration: DomainMigration) -> Result<DomainMigration, RepositoryError>;
}

/// Follow-on work enqueued by handlers (app deletion cleanup, GC runs).
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, job_type: &str, args: Value) -> Result<(), RepositoryError>;
}
