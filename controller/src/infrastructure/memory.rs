// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! In-memory repository implementations.
//!
//! Used for development and tests; production persistence lives behind the
//! same traits outside this crate. Ordering is insertion order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::events::{ObjectType, PlatformEvent};
use crate::domain::repository::{
    AppRepo, BackupRepo, DeploymentRepo, DomainMigrationRepo, EventRepo, FormationRepo, JobRepo,
    Repository, RepositoryError, ResourceRepo, RouteRepo, SinkRepo, VolumeRepo, WorkQueue,
};
use crate::domain::types::{
    route_parent_ref, App, Deployment, DeployRequest, DomainMigration, Formation, Job, JobState,
    NewJob, ProvisionedResource, ProvisionRequest, Release, Resource, Route, ScaleRequest, Sink,
    Volume, VolumeState,
};
use crate::events::{EventFeed, ListenerItem};
use crate::error::ControllerError;

fn matches_id<T: Resource>(item: &T, id: &str) -> bool {
    item.id().map(|u| u.to_string()).as_deref() == Some(id)
}

/// Shared sink for state-change events: every mutation lands in the stored
/// event list and fans out to attached subscribers through the feed.
pub struct EventRecorder {
    store: Arc<MemEventRepo>,
    feed: Arc<MemoryEventFeed>,
}

impl EventRecorder {
    pub fn new(store: Arc<MemEventRepo>, feed: Arc<MemoryEventFeed>) -> Self {
        Self { store, feed }
    }

    pub fn record(&self, event: PlatformEvent) {
        self.store.append(event.clone());
        self.feed.publish(event);
    }
}

fn record(recorder: &Option<Arc<EventRecorder>>, event: PlatformEvent) {
    if let Some(recorder) = recorder {
        recorder.record(event);
    }
}

/// Generic in-memory store satisfying the registry's capability set.
#[derive(Default)]
pub struct MemRepo<T: Resource> {
    items: Mutex<Vec<T>>,
}

impl<T: Resource> MemRepo<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl<T: Resource> Repository<T> for MemRepo<T> {
    async fn create(&self, mut payload: T) -> Result<T, RepositoryError> {
        payload.assign(Uuid::new_v4(), Utc::now());
        self.items.lock().push(payload.clone());
        Ok(payload)
    }

    async fn get(&self, id: &str) -> Result<T, RepositoryError> {
        self.items
            .lock()
            .iter()
            .find(|item| matches_id(*item, id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self) -> Result<Vec<T>, RepositoryError> {
        Ok(self.items.lock().clone())
    }
}

/// App store; apps are addressable by id or by name, and carry the default
/// routing domain configured at boot.
pub struct MemAppRepo {
    items: Mutex<Vec<App>>,
    current_release: Mutex<HashMap<String, String>>,
    name_seed: Vec<u8>,
    name_counter: AtomicU64,
    default_domain: Option<String>,
    routes: Option<Arc<dyn RouteRepo>>,
    recorder: Option<Arc<EventRecorder>>,
}

impl MemAppRepo {
    pub fn new(name_seed: Option<Vec<u8>>, default_domain: Option<String>) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            current_release: Mutex::new(HashMap::new()),
            name_seed: name_seed.unwrap_or_default(),
            name_counter: AtomicU64::new(0),
            default_domain,
            routes: None,
            recorder: None,
        }
    }

    /// Route store for default-route creation; new apps get an HTTP route
    /// under the configured default domain when both are present.
    pub fn with_routes(mut self, routes: Arc<dyn RouteRepo>) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<EventRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Deterministic generated name for apps created without one.
    fn generate_name(&self) -> String {
        let counter = self.name_counter.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Sha256::new();
        hasher.update(&self.name_seed);
        hasher.update(counter.to_be_bytes());
        let digest = hasher.finalize();
        format!("app-{}", hex::encode(&digest[..4]))
    }

    fn find(&self, id: &str) -> Option<App> {
        self.items
            .lock()
            .iter()
            .find(|app| matches_id(*app, id) || app.name == id)
            .cloned()
    }
}

#[async_trait]
impl Repository<App> for MemAppRepo {
    async fn create(&self, mut payload: App) -> Result<App, RepositoryError> {
        if payload.name.is_empty() {
            payload.name = self.generate_name();
        }
        if self.items.lock().iter().any(|app| app.name == payload.name) {
            return Err(RepositoryError::Conflict(format!(
                "app name {} already exists",
                payload.name
            )));
        }
        payload.assign(Uuid::new_v4(), Utc::now());
        self.items.lock().push(payload.clone());

        let app_id = payload.id.map(|u| u.to_string()).unwrap_or_default();
        if let (Some(routes), Some(domain)) = (&self.routes, &self.default_domain) {
            routes
                .add(
                    &app_id,
                    Route {
                        kind: "http".to_string(),
                        domain: Some(format!("{}.{domain}", payload.name)),
                        service: Some(format!("{}-web", payload.name)),
                        ..Route::default()
                    },
                )
                .await?;
        }
        record(
            &self.recorder,
            PlatformEvent::new(
                ObjectType::App,
                &app_id,
                serde_json::to_value(&payload).unwrap_or_default(),
            )
            .for_app(&app_id),
        );
        Ok(payload)
    }

    async fn get(&self, id: &str) -> Result<App, RepositoryError> {
        self.find(id).ok_or(RepositoryError::NotFound)
    }

    async fn list(&self) -> Result<Vec<App>, RepositoryError> {
        Ok(self.items.lock().clone())
    }
}

#[async_trait]
impl AppRepo for MemAppRepo {
    async fn update_meta(
        &self,
        id: &str,
        meta: HashMap<String, String>,
    ) -> Result<App, RepositoryError> {
        let mut items = self.items.lock();
        let app = items
            .iter_mut()
            .find(|app| matches_id(*app, id) || app.name == id)
            .ok_or(RepositoryError::NotFound)?;
        app.meta = meta;
        app.updated_at = Some(Utc::now());
        Ok(app.clone())
    }

    async fn remove(&self, id: &str) -> Result<App, RepositoryError> {
        let mut items = self.items.lock();
        let index = items
            .iter()
            .position(|app| matches_id(app, id) || app.name == id)
            .ok_or(RepositoryError::NotFound)?;
        let app = items.remove(index);
        drop(items);
        if let Some(app_id) = app.id {
            let key = app_id.to_string();
            self.current_release.lock().remove(&key);
            record(
                &self.recorder,
                PlatformEvent::new(
                    ObjectType::AppDeletion,
                    &key,
                    serde_json::to_value(&app).unwrap_or_default(),
                )
                .for_app(&key),
            );
        }
        Ok(app)
    }

    async fn set_release(&self, app_id: &str, release_id: &str) -> Result<(), RepositoryError> {
        let app = self.find(app_id).ok_or(RepositoryError::NotFound)?;
        let key = app.id.map(|u| u.to_string()).unwrap_or_default();
        self.current_release
            .lock()
            .insert(key, release_id.to_string());
        Ok(())
    }

    async fn release_id(&self, app_id: &str) -> Result<Option<String>, RepositoryError> {
        let app = self.find(app_id).ok_or(RepositoryError::NotFound)?;
        let key = app.id.map(|u| u.to_string()).unwrap_or_default();
        Ok(self.current_release.lock().get(&key).cloned())
    }
}

#[derive(Default)]
pub struct MemReleaseRepo {
    items: Mutex<Vec<Release>>,
    recorder: Option<Arc<EventRecorder>>,
}

impl MemReleaseRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recorder(mut self, recorder: Arc<EventRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }
}

#[async_trait]
impl Repository<Release> for MemReleaseRepo {
    async fn create(&self, mut payload: Release) -> Result<Release, RepositoryError> {
        payload.assign(Uuid::new_v4(), Utc::now());
        self.items.lock().push(payload.clone());

        let mut event = PlatformEvent::new(
            ObjectType::Release,
            payload.id.map(|u| u.to_string()).unwrap_or_default(),
            serde_json::to_value(&payload).unwrap_or_default(),
        );
        if let Some(app_id) = &payload.app_id {
            event = event.for_app(app_id);
        }
        record(&self.recorder, event);
        Ok(payload)
    }

    async fn get(&self, id: &str) -> Result<Release, RepositoryError> {
        self.items
            .lock()
            .iter()
            .find(|release| matches_id(*release, id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self) -> Result<Vec<Release>, RepositoryError> {
        Ok(self.items.lock().clone())
    }
}

#[async_trait]
impl crate::domain::repository::ReleaseRepo for MemReleaseRepo {
    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Release>, RepositoryError> {
        Ok(self
            .items
            .lock()
            .iter()
            .filter(|release| release.app_id.as_deref() == Some(app_id))
            .cloned()
            .collect())
    }

    async fn remove_for_app(&self, app_id: &str, release_id: &str) -> Result<(), RepositoryError> {
        let mut items = self.items.lock();
        let index = items
            .iter()
            .position(|release| {
                matches_id(release, release_id) && release.app_id.as_deref() == Some(app_id)
            })
            .ok_or(RepositoryError::NotFound)?;
        items.remove(index);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemFormationRepo {
    formations: Mutex<Vec<Formation>>,
    scale_requests: Mutex<Vec<ScaleRequest>>,
    recorder: Option<Arc<EventRecorder>>,
}

impl MemFormationRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recorder(mut self, recorder: Arc<EventRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }
}

#[async_trait]
impl FormationRepo for MemFormationRepo {
    async fn put(&self, mut formation: Formation) -> Result<Formation, RepositoryError> {
        let now = Utc::now();
        let mut formations = self.formations.lock();
        match formations
            .iter_mut()
            .find(|f| f.app_id == formation.app_id && f.release_id == formation.release_id)
        {
            Some(existing) => {
                formation.created_at = existing.created_at;
                formation.updated_at = Some(now);
                *existing = formation.clone();
            }
            None => {
                formation.created_at = Some(now);
                formation.updated_at = Some(now);
                formations.push(formation.clone());
            }
        }
        drop(formations);
        record(
            &self.recorder,
            PlatformEvent::new(
                ObjectType::Formation,
                format!("{}-{}", formation.app_id, formation.release_id),
                serde_json::to_value(&formation).unwrap_or_default(),
            )
            .for_app(&formation.app_id),
        );
        Ok(formation)
    }

    async fn get(&self, app_id: &str, release_id: &str) -> Result<Formation, RepositoryError> {
        self.formations
            .lock()
            .iter()
            .find(|f| f.app_id == app_id && f.release_id == release_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn remove(&self, app_id: &str, release_id: &str) -> Result<(), RepositoryError> {
        let mut formations = self.formations.lock();
        let index = formations
            .iter()
            .position(|f| f.app_id == app_id && f.release_id == release_id)
            .ok_or(RepositoryError::NotFound)?;
        formations.remove(index);
        Ok(())
    }

    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Formation>, RepositoryError> {
        Ok(self
            .formations
            .lock()
            .iter()
            .filter(|f| f.app_id == app_id)
            .cloned()
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<Formation>, RepositoryError> {
        Ok(self
            .formations
            .lock()
            .iter()
            .filter(|f| f.processes.values().any(|count| *count > 0))
            .cloned()
            .collect())
    }

    async fn put_scale_request(&self, mut req: ScaleRequest) -> Result<ScaleRequest, RepositoryError> {
        let now = Utc::now();
        req.id = Some(Uuid::new_v4());
        req.state.get_or_insert_with(|| "pending".to_string());
        req.created_at = Some(now);
        req.updated_at = Some(now);

        // The scheduler consumes the request asynchronously; the stored
        // formation reflects the target immediately.
        self.put(Formation {
            app_id: req.app_id.clone(),
            release_id: req.release_id.clone(),
            processes: req.new_processes.clone(),
            tags: HashMap::new(),
            created_at: None,
            updated_at: None,
        })
        .await?;

        self.scale_requests.lock().push(req.clone());
        record(
            &self.recorder,
            PlatformEvent::new(
                ObjectType::ScaleRequest,
                req.id.map(|u| u.to_string()).unwrap_or_default(),
                serde_json::to_value(&req).unwrap_or_default(),
            )
            .for_app(&req.app_id),
        );
        Ok(req)
    }
}

#[derive(Default)]
pub struct MemJobRepo {
    jobs: Mutex<Vec<Job>>,
}

impl MemJobRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepo for MemJobRepo {
    async fn run(&self, app_id: &str, req: NewJob) -> Result<Job, RepositoryError> {
        let now = Utc::now();
        let job = Job {
            id: Some(Uuid::new_v4().to_string()),
            app_id: app_id.to_string(),
            release_id: req.release_id,
            process_type: "run".to_string(),
            state: Some(JobState::Starting),
            args: req.args,
            meta: req.meta,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.jobs.lock().push(job.clone());
        Ok(job)
    }

    async fn get(&self, job_id: &str) -> Result<Job, RepositoryError> {
        self.jobs
            .lock()
            .iter()
            .find(|job| job.id.as_deref() == Some(job_id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn put(&self, mut job: Job) -> Result<Job, RepositoryError> {
        let Some(id) = job.id.clone() else {
            return Err(RepositoryError::validation("id", "job id is required"));
        };
        job.updated_at = Some(Utc::now());
        let mut jobs = self.jobs.lock();
        match jobs.iter_mut().find(|j| j.id.as_deref() == Some(&id)) {
            Some(existing) => *existing = job.clone(),
            None => {
                job.created_at = job.created_at.or(job.updated_at);
                jobs.push(job.clone());
            }
        }
        Ok(job)
    }

    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Job>, RepositoryError> {
        Ok(self
            .jobs
            .lock()
            .iter()
            .filter(|job| job.app_id == app_id)
            .cloned()
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<Job>, RepositoryError> {
        Ok(self
            .jobs
            .lock()
            .iter()
            .filter(|job| {
                matches!(
                    job.state,
                    Some(JobState::Pending) | Some(JobState::Starting) | Some(JobState::Up)
                )
            })
            .cloned()
            .collect())
    }

    async fn kill(&self, job_id: &str) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .iter_mut()
            .find(|job| job.id.as_deref() == Some(job_id))
            .ok_or(RepositoryError::NotFound)?;
        job.state = Some(JobState::Stopping);
        job.updated_at = Some(Utc::now());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemDeploymentRepo {
    deployments: Mutex<Vec<Deployment>>,
    recorder: Option<Arc<EventRecorder>>,
}

impl MemDeploymentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recorder(mut self, recorder: Arc<EventRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }
}

#[async_trait]
impl DeploymentRepo for MemDeploymentRepo {
    async fn create(&self, app_id: &str, req: DeployRequest) -> Result<Deployment, RepositoryError> {
        if req.release_id.is_empty() {
            return Err(RepositoryError::validation(
                "release_id",
                "release_id must not be empty",
            ));
        }
        let deployment = Deployment {
            id: Some(Uuid::new_v4()),
            app_id: app_id.to_string(),
            old_release_id: None,
            new_release_id: req.release_id,
            strategy: req.strategy,
            status: Some("pending".to_string()),
            processes: HashMap::new(),
            created_at: Some(Utc::now()),
            finished_at: None,
        };
        self.deployments.lock().push(deployment.clone());
        record(
            &self.recorder,
            PlatformEvent::new(
                ObjectType::Deployment,
                deployment.id.map(|u| u.to_string()).unwrap_or_default(),
                serde_json::to_value(&deployment).unwrap_or_default(),
            )
            .for_app(&deployment.app_id),
        );
        Ok(deployment)
    }

    async fn get(&self, id: &str) -> Result<Deployment, RepositoryError> {
        self.deployments
            .lock()
            .iter()
            .find(|d| d.id.map(|u| u.to_string()).as_deref() == Some(id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Deployment>, RepositoryError> {
        Ok(self
            .deployments
            .lock()
            .iter()
            .filter(|d| d.app_id == app_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemRouteRepo {
    routes: Mutex<Vec<Route>>,
}

impl MemRouteRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteRepo for MemRouteRepo {
    async fn add(&self, app_id: &str, mut route: Route) -> Result<Route, RepositoryError> {
        if route.kind.is_empty() {
            return Err(RepositoryError::validation("type", "type must not be empty"));
        }
        let now = Utc::now();
        route.id = Some(Uuid::new_v4().to_string());
        route.parent_ref = Some(route_parent_ref(app_id));
        route.created_at = Some(now);
        route.updated_at = Some(now);
        self.routes.lock().push(route.clone());
        Ok(route)
    }

    async fn get(&self, kind: &str, id: &str) -> Result<Route, RepositoryError> {
        self.routes
            .lock()
            .iter()
            .find(|route| route.kind == kind && route.id.as_deref() == Some(id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update(&self, kind: &str, id: &str, mut route: Route) -> Result<Route, RepositoryError> {
        let mut routes = self.routes.lock();
        let existing = routes
            .iter_mut()
            .find(|route| route.kind == kind && route.id.as_deref() == Some(id))
            .ok_or(RepositoryError::NotFound)?;
        route.id = existing.id.clone();
        route.kind = existing.kind.clone();
        route.parent_ref = existing.parent_ref.clone();
        route.created_at = existing.created_at;
        route.updated_at = Some(Utc::now());
        *existing = route.clone();
        Ok(route)
    }

    async fn remove(&self, kind: &str, id: &str) -> Result<(), RepositoryError> {
        let mut routes = self.routes.lock();
        let index = routes
            .iter()
            .position(|route| route.kind == kind && route.id.as_deref() == Some(id))
            .ok_or(RepositoryError::NotFound)?;
        routes.remove(index);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Route>, RepositoryError> {
        Ok(self.routes.lock().clone())
    }

    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Route>, RepositoryError> {
        let parent = route_parent_ref(app_id);
        Ok(self
            .routes
            .lock()
            .iter()
            .filter(|route| route.parent_ref.as_deref() == Some(parent.as_str()))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemResourceRepo {
    resources: Mutex<Vec<ProvisionedResource>>,
}

impl MemResourceRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceRepo for MemResourceRepo {
    async fn provision(
        &self,
        provider_id: &str,
        req: ProvisionRequest,
    ) -> Result<ProvisionedResource, RepositoryError> {
        let resource = ProvisionedResource {
            id: Some(Uuid::new_v4()),
            provider_id: provider_id.to_string(),
            external_id: None,
            env: HashMap::new(),
            apps: req.apps,
            created_at: Some(Utc::now()),
        };
        self.resources.lock().push(resource.clone());
        Ok(resource)
    }

    async fn get(
        &self,
        provider_id: &str,
        id: &str,
    ) -> Result<ProvisionedResource, RepositoryError> {
        self.resources
            .lock()
            .iter()
            .find(|r| {
                r.provider_id == provider_id && r.id.map(|u| u.to_string()).as_deref() == Some(id)
            })
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn put(
        &self,
        provider_id: &str,
        id: &str,
        mut resource: ProvisionedResource,
    ) -> Result<ProvisionedResource, RepositoryError> {
        let mut resources = self.resources.lock();
        let existing = resources
            .iter_mut()
            .find(|r| {
                r.provider_id == provider_id && r.id.map(|u| u.to_string()).as_deref() == Some(id)
            })
            .ok_or(RepositoryError::NotFound)?;
        resource.id = existing.id;
        resource.provider_id = existing.provider_id.clone();
        resource.created_at = existing.created_at;
        *existing = resource.clone();
        Ok(resource)
    }

    async fn remove(&self, provider_id: &str, id: &str) -> Result<(), RepositoryError> {
        let mut resources = self.resources.lock();
        let index = resources
            .iter()
            .position(|r| {
                r.provider_id == provider_id && r.id.map(|u| u.to_string()).as_deref() == Some(id)
            })
            .ok_or(RepositoryError::NotFound)?;
        resources.remove(index);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProvisionedResource>, RepositoryError> {
        Ok(self.resources.lock().clone())
    }

    async fn list_for_provider(
        &self,
        provider_id: &str,
    ) -> Result<Vec<ProvisionedResource>, RepositoryError> {
        Ok(self
            .resources
            .lock()
            .iter()
            .filter(|r| r.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn list_for_app(&self, app_id: &str) -> Result<Vec<ProvisionedResource>, RepositoryError> {
        Ok(self
            .resources
            .lock()
            .iter()
            .filter(|r| r.apps.iter().any(|a| a == app_id))
            .cloned()
            .collect())
    }

    async fn add_app(
        &self,
        provider_id: &str,
        id: &str,
        app_id: &str,
    ) -> Result<ProvisionedResource, RepositoryError> {
        let mut resources = self.resources.lock();
        let resource = resources
            .iter_mut()
            .find(|r| {
                r.provider_id == provider_id && r.id.map(|u| u.to_string()).as_deref() == Some(id)
            })
            .ok_or(RepositoryError::NotFound)?;
        if !resource.apps.iter().any(|a| a == app_id) {
            resource.apps.push(app_id.to_string());
        }
        Ok(resource.clone())
    }

    async fn remove_app(
        &self,
        provider_id: &str,
        id: &str,
        app_id: &str,
    ) -> Result<ProvisionedResource, RepositoryError> {
        let mut resources = self.resources.lock();
        let resource = resources
            .iter_mut()
            .find(|r| {
                r.provider_id == provider_id && r.id.map(|u| u.to_string()).as_deref() == Some(id)
            })
            .ok_or(RepositoryError::NotFound)?;
        resource.apps.retain(|a| a != app_id);
        Ok(resource.clone())
    }
}

#[derive(Default)]
pub struct MemVolumeRepo {
    volumes: Mutex<Vec<Volume>>,
}

impl MemVolumeRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VolumeRepo for MemVolumeRepo {
    async fn list(&self) -> Result<Vec<Volume>, RepositoryError> {
        Ok(self.volumes.lock().clone())
    }

    async fn list_for_app(&self, app_id: &str) -> Result<Vec<Volume>, RepositoryError> {
        Ok(self
            .volumes
            .lock()
            .iter()
            .filter(|v| v.app_id.as_deref() == Some(app_id))
            .cloned()
            .collect())
    }

    async fn get(&self, app_id: &str, volume_id: &str) -> Result<Volume, RepositoryError> {
        self.volumes
            .lock()
            .iter()
            .find(|v| {
                v.app_id.as_deref() == Some(app_id)
                    && v.id.map(|u| u.to_string()).as_deref() == Some(volume_id)
            })
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn put(&self, mut volume: Volume) -> Result<Volume, RepositoryError> {
        let now = Utc::now();
        let mut volumes = self.volumes.lock();
        let existing = volume
            .id
            .and_then(|id| volumes.iter().position(|v| v.id == Some(id)));
        match existing {
            Some(index) => {
                volume.created_at = volumes[index].created_at;
                volume.updated_at = Some(now);
                volumes[index] = volume.clone();
            }
            None => {
                volume.id.get_or_insert_with(Uuid::new_v4);
                volume.state.get_or_insert(VolumeState::Created);
                volume.created_at = Some(now);
                volume.updated_at = Some(now);
                volumes.push(volume.clone());
            }
        }
        Ok(volume)
    }

    async fn decommission(&self, app_id: &str, volume_id: &str) -> Result<Volume, RepositoryError> {
        let now = Utc::now();
        let mut volumes = self.volumes.lock();
        let volume = volumes
            .iter_mut()
            .find(|v| {
                v.app_id.as_deref() == Some(app_id)
                    && v.id.map(|u| u.to_string()).as_deref() == Some(volume_id)
            })
            .ok_or(RepositoryError::NotFound)?;
        volume.state = Some(VolumeState::Decommissioned);
        volume.decommissioned_at = Some(now);
        volume.updated_at = Some(now);
        Ok(volume.clone())
    }
}

#[derive(Default)]
pub struct MemSinkRepo {
    sinks: Mutex<Vec<Sink>>,
}

impl MemSinkRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SinkRepo for MemSinkRepo {
    async fn create(&self, mut sink: Sink) -> Result<Sink, RepositoryError> {
        if sink.kind.is_empty() {
            return Err(RepositoryError::validation("kind", "kind must not be empty"));
        }
        let now = Utc::now();
        sink.id = Some(Uuid::new_v4());
        sink.created_at = Some(now);
        sink.updated_at = Some(now);
        self.sinks.lock().push(sink.clone());
        Ok(sink)
    }

    async fn get(&self, id: &str) -> Result<Sink, RepositoryError> {
        self.sinks
            .lock()
            .iter()
            .find(|s| s.id.map(|u| u.to_string()).as_deref() == Some(id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self) -> Result<Vec<Sink>, RepositoryError> {
        Ok(self.sinks.lock().clone())
    }

    async fn remove(&self, id: &str) -> Result<Sink, RepositoryError> {
        let mut sinks = self.sinks.lock();
        let index = sinks
            .iter()
            .position(|s| s.id.map(|u| u.to_string()).as_deref() == Some(id))
            .ok_or(RepositoryError::NotFound)?;
        Ok(sinks.remove(index))
    }
}

#[derive(Default)]
pub struct MemEventRepo {
    events: Mutex<Vec<PlatformEvent>>,
}

impl MemEventRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, event: PlatformEvent) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl EventRepo for MemEventRepo {
    async fn get(&self, id: &str) -> Result<PlatformEvent, RepositoryError> {
        self.events
            .lock()
            .iter()
            .find(|e| e.id.to_string() == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self) -> Result<Vec<PlatformEvent>, RepositoryError> {
        Ok(self.events.lock().clone())
    }
}

pub struct MemBackupRepo {
    bytes: Vec<u8>,
}

impl MemBackupRepo {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl BackupRepo for MemBackupRepo {
    async fn get(&self) -> Result<Vec<u8>, RepositoryError> {
        Ok(self.bytes.clone())
    }
}

#[derive(Default)]
pub struct MemDomainMigrationRepo {
    migrations: Mutex<Vec<DomainMigration>>,
}

impl MemDomainMigrationRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DomainMigrationRepo for MemDomainMigrationRepo {
    async fn migrate(
        &self,
        mut migration: DomainMigration,
    ) -> Result<DomainMigration, RepositoryError> {
        if migration.domain.is_empty() {
            return Err(RepositoryError::validation(
                "domain",
                "domain must not be empty",
            ));
        }
        migration.id = Some(Uuid::new_v4());
        migration.created_at = Some(Utc::now());
        self.migrations.lock().push(migration.clone());
        Ok(migration)
    }
}

/// Records enqueued work so tests can assert on follow-on jobs.
#[derive(Default)]
pub struct MemWorkQueue {
    jobs: Mutex<Vec<(String, Value)>>,
}

impl MemWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueued(&self) -> Vec<(String, Value)> {
        self.jobs.lock().clone()
    }
}

#[async_trait]
impl WorkQueue for MemWorkQueue {
    async fn enqueue(&self, job_type: &str, args: Value) -> Result<(), RepositoryError> {
        self.jobs.lock().push((job_type.to_string(), args));
        Ok(())
    }
}

/// In-process notification source backing the event dispatcher.
#[derive(Default)]
pub struct MemoryEventFeed {
    sink: Mutex<Option<broadcast::Sender<ListenerItem>>>,
}

impl MemoryEventFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish to the attached dispatcher sink, if a listener exists.
    pub fn publish(&self, event: PlatformEvent) {
        if let Some(sink) = self.sink.lock().as_ref() {
            let _ = sink.send(ListenerItem::Event(event));
        }
    }
}

impl EventFeed for MemoryEventFeed {
    fn open(&self, sink: broadcast::Sender<ListenerItem>) -> Result<(), ControllerError> {
        *self.sink.lock() = Some(sink);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::ReleaseRepo;

    #[tokio::test]
    async fn create_assigns_id_and_timestamps() {
        let repo = MemAppRepo::new(None, None);
        let app = repo
            .create(App {
                name: "web".into(),
                ..App::default()
            })
            .await
            .unwrap();
        assert!(app.id.is_some());
        assert!(app.created_at.is_some());

        let by_id = repo.get(&app.id.unwrap().to_string()).await.unwrap();
        let by_name = repo.get("web").await.unwrap();
        assert_eq!(by_id, by_name);
    }

    #[tokio::test]
    async fn empty_app_name_is_generated_deterministically() {
        let first = MemAppRepo::new(Some(vec![1, 2, 3]), None);
        let second = MemAppRepo::new(Some(vec![1, 2, 3]), None);
        let a = first.create(App::default()).await.unwrap();
        let b = second.create(App::default()).await.unwrap();
        assert_eq!(a.name, b.name);
        assert!(a.name.starts_with("app-"));
    }

    #[tokio::test]
    async fn duplicate_app_name_conflicts() {
        let repo = MemAppRepo::new(None, None);
        let app = App {
            name: "web".into(),
            ..App::default()
        };
        repo.create(app.clone()).await.unwrap();
        assert!(matches!(
            repo.create(app).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn releases_filter_by_app() {
        let repo = MemReleaseRepo::new();
        for app in ["a", "b", "a"] {
            repo.create(Release {
                app_id: Some(app.into()),
                ..Release::default()
            })
            .await
            .unwrap();
        }
        assert_eq!(repo.list_for_app("a").await.unwrap().len(), 2);
        assert_eq!(repo.list_for_app("b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn formation_scale_request_updates_target() {
        let repo = MemFormationRepo::new();
        let req = repo
            .put_scale_request(ScaleRequest {
                app_id: "app-1".into(),
                release_id: "rel-1".into(),
                new_processes: HashMap::from([("web".to_string(), 3)]),
                ..ScaleRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(req.state.as_deref(), Some("pending"));

        let formation = repo.get("app-1", "rel-1").await.unwrap();
        assert_eq!(formation.processes.get("web"), Some(&3));
        assert_eq!(repo.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn default_domain_creates_an_http_route_for_new_apps() {
        let routes = Arc::new(MemRouteRepo::new());
        let repo = MemAppRepo::new(None, Some("stratus.local".into()))
            .with_routes(routes.clone());

        let app = repo
            .create(App {
                name: "web".into(),
                ..App::default()
            })
            .await
            .unwrap();

        let app_routes = routes
            .list_for_app(&app.id.unwrap().to_string())
            .await
            .unwrap();
        assert_eq!(app_routes.len(), 1);
        assert_eq!(app_routes[0].kind, "http");
        assert_eq!(app_routes[0].domain.as_deref(), Some("web.stratus.local"));
        assert_eq!(app_routes[0].service.as_deref(), Some("web-web"));
    }

    #[tokio::test]
    async fn no_default_domain_means_no_route() {
        let routes = Arc::new(MemRouteRepo::new());
        let repo = MemAppRepo::new(None, None).with_routes(routes.clone());
        repo.create(App {
            name: "web".into(),
            ..App::default()
        })
        .await
        .unwrap();
        assert!(routes.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mutations_are_recorded_and_published() {
        use crate::events::EventDispatcher;
        use futures::StreamExt;

        let store = Arc::new(MemEventRepo::new());
        let feed = Arc::new(MemoryEventFeed::new());
        let recorder = Arc::new(EventRecorder::new(store.clone(), feed.clone()));

        let dispatcher = EventDispatcher::new();
        let mut stream = dispatcher.subscribe(feed.as_ref()).unwrap();

        let apps = MemAppRepo::new(None, None).with_recorder(recorder.clone());
        let app = apps
            .create(App {
                name: "web".into(),
                ..App::default()
            })
            .await
            .unwrap();
        let app_id = app.id.unwrap().to_string();

        let created = stream.next().await.unwrap().unwrap();
        assert_eq!(created.object_type, ObjectType::App);
        assert_eq!(created.object_id, app_id);
        assert_eq!(created.app_id.as_deref(), Some(app_id.as_str()));

        apps.remove(&app_id).await.unwrap();
        let deleted = stream.next().await.unwrap().unwrap();
        assert_eq!(deleted.object_type, ObjectType::AppDeletion);

        let stored = store.list().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].object_type, ObjectType::App);
        assert_eq!(stored[1].object_type, ObjectType::AppDeletion);
    }

    #[tokio::test]
    async fn deployment_creation_is_recorded() {
        let store = Arc::new(MemEventRepo::new());
        let feed = Arc::new(MemoryEventFeed::new());
        let recorder = Arc::new(EventRecorder::new(store.clone(), feed));

        let repo = MemDeploymentRepo::new().with_recorder(recorder);
        repo.create(
            "app-1",
            DeployRequest {
                release_id: "rel-1".into(),
                strategy: None,
                timeout: None,
            },
        )
        .await
        .unwrap();

        let stored = store.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].object_type, ObjectType::Deployment);
        assert_eq!(stored[0].app_id.as_deref(), Some("app-1"));
    }

    #[tokio::test]
    async fn decommissioned_volume_keeps_timestamps() {
        let repo = MemVolumeRepo::new();
        let volume = repo
            .put(Volume {
                app_id: Some("app-1".into()),
                ..Volume::default()
            })
            .await
            .unwrap();
        let id = volume.id.unwrap().to_string();
        let gone = repo.decommission("app-1", &id).await.unwrap();
        assert_eq!(gone.state, Some(VolumeState::Decommissioned));
        assert!(gone.decommissioned_at.is_some());
        assert_eq!(gone.created_at, volume.created_at);
    }
}
