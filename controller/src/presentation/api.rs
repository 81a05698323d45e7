// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! # REST dispatch table
//!
//! The full HTTP surface: generic CRUD endpoints bound through the
//! registry, plus the explicit route bindings. Handlers never decide
//! status codes; they return taxonomy errors and let the shared translator
//! render them. App-scoped handlers resolve the app explicitly through
//! [`resolve_app`], so the dependency is visible in the handler body rather
//! than hidden in ambient request state.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;

use crate::domain::events::PlatformEvent;
use crate::domain::repository::{
    AppRepo, BackupRepo, DeploymentRepo, DomainMigrationRepo, EventRepo, FormationRepo, JobRepo,
    ReleaseRepo, Repository, ResourceRepo, RouteRepo, SinkRepo, VolumeRepo, WorkQueue,
};
use crate::domain::types::{
    route_parent_ref, App, Artifact, DeployRequest, DomainMigration, Formation, Job, NewJob,
    Provider, ProvisionRequest, Release, Route, ScaleRequest, Sink, Volume,
};
use crate::error::ControllerError;
use crate::events::{EventDispatcher, EventFeed};
use crate::infrastructure::log_client::{LogClient, LogOpts};
use crate::infrastructure::schema::SchemaSet;
use crate::presentation::registry;

/// Persistence liveness probe backing `GET /status`.
#[async_trait::async_trait]
pub trait HealthSource: Send + Sync {
    async fn healthy(&self) -> bool;
}

#[derive(Clone)]
pub struct ApiState {
    pub apps: Arc<dyn AppRepo>,
    pub releases: Arc<dyn ReleaseRepo>,
    pub providers: Arc<dyn Repository<Provider>>,
    pub artifacts: Arc<dyn Repository<Artifact>>,
    pub formations: Arc<dyn FormationRepo>,
    pub jobs: Arc<dyn JobRepo>,
    pub deployments: Arc<dyn DeploymentRepo>,
    pub routes: Arc<dyn RouteRepo>,
    pub resources: Arc<dyn ResourceRepo>,
    pub volumes: Arc<dyn VolumeRepo>,
    pub sinks: Arc<dyn SinkRepo>,
    pub events: Arc<dyn EventRepo>,
    pub backups: Arc<dyn BackupRepo>,
    pub domain_migrations: Arc<dyn DomainMigrationRepo>,
    pub queue: Arc<dyn WorkQueue>,
    pub logs: Arc<dyn LogClient>,
    pub dispatcher: Arc<EventDispatcher>,
    pub feed: Arc<dyn EventFeed>,
    pub health: Arc<dyn HealthSource>,
    pub ca_cert: Bytes,
}

/// Build the REST dispatch table. The registry binds the generic CRUD
/// kinds; everything else is an explicit route.
pub fn router(state: ApiState, schemas: Arc<SchemaSet>) -> Router {
    let apps_crud: Arc<dyn Repository<App>> = state.apps.clone();
    let releases_crud: Arc<dyn Repository<Release>> = state.releases.clone();

    Router::new()
        .merge(registry::register::<App>(apps_crud, schemas.clone()))
        .merge(registry::register::<Release>(releases_crud, schemas.clone()))
        .merge(registry::register::<Provider>(
            state.providers.clone(),
            schemas.clone(),
        ))
        .merge(registry::register::<Artifact>(
            state.artifacts.clone(),
            schemas,
        ))
        .merge(
            Router::new()
                .route("/ca-cert", get(get_ca_cert))
                .route("/status", get(get_status))
                .route("/backup", get(get_backup))
                .route("/domain", put(migrate_domain))
                .route("/apps/{apps_id}", post(update_app).delete(delete_app))
                .route("/apps/{apps_id}/meta", post(update_app))
                .route("/apps/{apps_id}/log", get(app_log))
                .route("/apps/{apps_id}/gc", post(schedule_gc))
                .route(
                    "/apps/{apps_id}/release",
                    put(set_app_release).get(get_app_release),
                )
                .route("/apps/{apps_id}/releases", get(list_app_releases))
                .route(
                    "/apps/{apps_id}/releases/{releases_id}",
                    delete(delete_release),
                )
                .route(
                    "/apps/{apps_id}/formations/{releases_id}",
                    put(put_formation).get(get_formation).delete(delete_formation),
                )
                .route("/apps/{apps_id}/formations", get(list_formations))
                .route("/formations", get(list_active_formations))
                .route("/apps/{apps_id}/scale/{releases_id}", put(put_scale_request))
                .route("/apps/{apps_id}/jobs", post(run_job).get(list_jobs))
                .route(
                    "/apps/{apps_id}/jobs/{jobs_id}",
                    get(get_job).put(put_job).delete(kill_job),
                )
                .route("/active-jobs", get(list_active_jobs))
                .route("/apps/{apps_id}/deploy", post(create_deployment))
                .route("/apps/{apps_id}/deployments", get(list_deployments))
                .route("/deployments/{deployment_id}", get(get_deployment))
                .route("/resources", get(list_resources))
                .route(
                    "/providers/{providers_id}/resources",
                    post(provision_resource).get(list_provider_resources),
                )
                .route(
                    "/providers/{providers_id}/resources/{resources_id}",
                    get(get_resource).put(put_resource).delete(delete_resource),
                )
                .route(
                    "/providers/{providers_id}/resources/{resources_id}/apps/{apps_id}",
                    put(add_resource_app).delete(delete_resource_app),
                )
                .route("/apps/{apps_id}/resources", get(list_app_resources))
                .route("/routes", get(list_routes))
                .route(
                    "/apps/{apps_id}/routes",
                    post(create_route).get(list_app_routes),
                )
                .route(
                    "/apps/{apps_id}/routes/{routes_type}/{routes_id}",
                    get(get_route).put(update_route).delete(delete_route),
                )
                .route("/events", get(events))
                .route("/events/{id}", get(get_event))
                .route("/volumes", get(list_volumes))
                .route("/volumes/{volume_id}", put(put_volume))
                .route("/apps/{apps_id}/volumes", get(list_app_volumes))
                .route("/apps/{apps_id}/volumes/{volume_id}", get(get_app_volume))
                .route(
                    "/apps/{apps_id}/volumes/{volume_id}/decommission",
                    put(decommission_volume),
                )
                .route("/sinks", post(create_sink).get(list_sinks))
                .route("/sinks/{sink_id}", get(get_sink).delete(delete_sink))
                .with_state(state),
        )
}

/// Look the app up by id or name; the typed value is then threaded
/// explicitly through the handler.
async fn resolve_app(state: &ApiState, id: &str) -> Result<App, ControllerError> {
    Ok(state.apps.get(id).await?)
}

fn app_key(app: &App) -> String {
    app.id.map(|u| u.to_string()).unwrap_or_default()
}

async fn get_ca_cert(State(state): State<ApiState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/x-x509-ca-cert")],
        state.ca_cert.clone(),
    )
        .into_response()
}

async fn get_status(State(state): State<ApiState>) -> Response {
    if state.health.healthy().await {
        Json(json!({"status": "healthy"})).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "unhealthy"})),
        )
            .into_response()
    }
}

async fn get_backup(State(state): State<ApiState>) -> Result<Response, ControllerError> {
    let bytes = state.backups.get().await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

async fn migrate_domain(
    State(state): State<ApiState>,
    Json(migration): Json<DomainMigration>,
) -> Result<Json<DomainMigration>, ControllerError> {
    Ok(Json(state.domain_migrations.migrate(migration).await?))
}

async fn update_app(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
    Json(payload): Json<App>,
) -> Result<Json<App>, ControllerError> {
    Ok(Json(state.apps.update_meta(&app_id, payload.meta).await?))
}

async fn delete_app(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Result<Json<App>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    let removed = state.apps.remove(&app_key(&app)).await?;
    state
        .queue
        .enqueue("app-deletion", json!({"app_id": app_key(&removed)}))
        .await?;
    Ok(Json(removed))
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    #[serde(default)]
    follow: bool,
    lines: Option<u32>,
    job_id: Option<String>,
    process_type: Option<String>,
}

async fn app_log(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
    Query(query): Query<LogQuery>,
) -> Result<Response, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    let opts = LogOpts {
        follow: query.follow,
        lines: query.lines,
        job_id: query.job_id,
        process_type: query.process_type,
    };
    let stream = state.logs.get_log(&app_key(&app), &opts).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn schedule_gc(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Result<StatusCode, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    state
        .queue
        .enqueue("app-gc", json!({"app_id": app_key(&app)}))
        .await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct SetReleaseRequest {
    id: String,
}

async fn set_app_release(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
    Json(req): Json<SetReleaseRequest>,
) -> Result<Json<Release>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    let release = state.releases.get(&req.id).await?;
    state.apps.set_release(&app_key(&app), &req.id).await?;
    Ok(Json(release))
}

async fn get_app_release(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Result<Json<Release>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    let release_id = state
        .apps
        .release_id(&app_key(&app))
        .await?
        .ok_or(ControllerError::NotFound)?;
    Ok(Json(state.releases.get(&release_id).await?))
}

async fn list_app_releases(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Result<Json<Vec<Release>>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(state.releases.list_for_app(&app_key(&app)).await?))
}

async fn delete_release(
    State(state): State<ApiState>,
    Path((app_id, release_id)): Path<(String, String)>,
) -> Result<StatusCode, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    state
        .releases
        .remove_for_app(&app_key(&app), &release_id)
        .await?;
    Ok(StatusCode::OK)
}

async fn put_formation(
    State(state): State<ApiState>,
    Path((app_id, release_id)): Path<(String, String)>,
    Json(mut formation): Json<Formation>,
) -> Result<Json<Formation>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    formation.app_id = app_key(&app);
    formation.release_id = release_id;
    Ok(Json(state.formations.put(formation).await?))
}

async fn get_formation(
    State(state): State<ApiState>,
    Path((app_id, release_id)): Path<(String, String)>,
) -> Result<Json<Formation>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(state.formations.get(&app_key(&app), &release_id).await?))
}

async fn delete_formation(
    State(state): State<ApiState>,
    Path((app_id, release_id)): Path<(String, String)>,
) -> Result<StatusCode, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    state.formations.remove(&app_key(&app), &release_id).await?;
    Ok(StatusCode::OK)
}

async fn list_formations(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Result<Json<Vec<Formation>>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(state.formations.list_for_app(&app_key(&app)).await?))
}

async fn list_active_formations(
    State(state): State<ApiState>,
) -> Result<Json<Vec<Formation>>, ControllerError> {
    Ok(Json(state.formations.list_active().await?))
}

async fn put_scale_request(
    State(state): State<ApiState>,
    Path((app_id, release_id)): Path<(String, String)>,
    Json(mut req): Json<ScaleRequest>,
) -> Result<Json<ScaleRequest>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    req.app_id = app_key(&app);
    req.release_id = release_id;
    Ok(Json(state.formations.put_scale_request(req).await?))
}

async fn run_job(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
    Json(req): Json<NewJob>,
) -> Result<Json<Job>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(state.jobs.run(&app_key(&app), req).await?))
}

async fn get_job(
    State(state): State<ApiState>,
    Path((_app_id, job_id)): Path<(String, String)>,
) -> Result<Json<Job>, ControllerError> {
    Ok(Json(state.jobs.get(&job_id).await?))
}

async fn put_job(
    State(state): State<ApiState>,
    Path((_app_id, job_id)): Path<(String, String)>,
    Json(mut job): Json<Job>,
) -> Result<Json<Job>, ControllerError> {
    job.id.get_or_insert(job_id);
    Ok(Json(state.jobs.put(job).await?))
}

async fn kill_job(
    State(state): State<ApiState>,
    Path((_app_id, job_id)): Path<(String, String)>,
) -> Result<StatusCode, ControllerError> {
    state.jobs.kill(&job_id).await?;
    Ok(StatusCode::OK)
}

async fn list_jobs(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Result<Json<Vec<Job>>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(state.jobs.list_for_app(&app_key(&app)).await?))
}

async fn list_active_jobs(State(state): State<ApiState>) -> Result<Json<Vec<Job>>, ControllerError> {
    Ok(Json(state.jobs.list_active().await?))
}

async fn create_deployment(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
    Json(req): Json<DeployRequest>,
) -> Result<(StatusCode, Json<crate::domain::types::Deployment>), ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    let deployment = state.deployments.create(&app_key(&app), req).await?;
    Ok((StatusCode::CREATED, Json(deployment)))
}

async fn list_deployments(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Result<Json<Vec<crate::domain::types::Deployment>>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(state.deployments.list_for_app(&app_key(&app)).await?))
}

async fn get_deployment(
    State(state): State<ApiState>,
    Path(deployment_id): Path<String>,
) -> Result<Json<crate::domain::types::Deployment>, ControllerError> {
    Ok(Json(state.deployments.get(&deployment_id).await?))
}

async fn list_resources(
    State(state): State<ApiState>,
) -> Result<Json<Vec<crate::domain::types::ProvisionedResource>>, ControllerError> {
    Ok(Json(state.resources.list().await?))
}

async fn provision_resource(
    State(state): State<ApiState>,
    Path(provider_id): Path<String>,
    Json(req): Json<ProvisionRequest>,
) -> Result<(StatusCode, Json<crate::domain::types::ProvisionedResource>), ControllerError> {
    // The provider must exist before anything is provisioned against it.
    let provider = state.providers.get(&provider_id).await?;
    let key = provider.id.map(|u| u.to_string()).unwrap_or(provider_id);
    let resource = state.resources.provision(&key, req).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn list_provider_resources(
    State(state): State<ApiState>,
    Path(provider_id): Path<String>,
) -> Result<Json<Vec<crate::domain::types::ProvisionedResource>>, ControllerError> {
    Ok(Json(state.resources.list_for_provider(&provider_id).await?))
}

async fn get_resource(
    State(state): State<ApiState>,
    Path((provider_id, resource_id)): Path<(String, String)>,
) -> Result<Json<crate::domain::types::ProvisionedResource>, ControllerError> {
    Ok(Json(state.resources.get(&provider_id, &resource_id).await?))
}

async fn put_resource(
    State(state): State<ApiState>,
    Path((provider_id, resource_id)): Path<(String, String)>,
    Json(resource): Json<crate::domain::types::ProvisionedResource>,
) -> Result<Json<crate::domain::types::ProvisionedResource>, ControllerError> {
    Ok(Json(
        state
            .resources
            .put(&provider_id, &resource_id, resource)
            .await?,
    ))
}

async fn delete_resource(
    State(state): State<ApiState>,
    Path((provider_id, resource_id)): Path<(String, String)>,
) -> Result<StatusCode, ControllerError> {
    state.resources.remove(&provider_id, &resource_id).await?;
    Ok(StatusCode::OK)
}

async fn add_resource_app(
    State(state): State<ApiState>,
    Path((provider_id, resource_id, app_id)): Path<(String, String, String)>,
) -> Result<Json<crate::domain::types::ProvisionedResource>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(
        state
            .resources
            .add_app(&provider_id, &resource_id, &app_key(&app))
            .await?,
    ))
}

async fn delete_resource_app(
    State(state): State<ApiState>,
    Path((provider_id, resource_id, app_id)): Path<(String, String, String)>,
) -> Result<Json<crate::domain::types::ProvisionedResource>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(
        state
            .resources
            .remove_app(&provider_id, &resource_id, &app_key(&app))
            .await?,
    ))
}

async fn list_app_resources(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Result<Json<Vec<crate::domain::types::ProvisionedResource>>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(state.resources.list_for_app(&app_key(&app)).await?))
}

async fn list_routes(State(state): State<ApiState>) -> Result<Json<Vec<Route>>, ControllerError> {
    Ok(Json(state.routes.list().await?))
}

async fn create_route(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
    Json(route): Json<Route>,
) -> Result<(StatusCode, Json<Route>), ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    let stored = state.routes.add(&app_key(&app), route).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_app_routes(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Result<Json<Vec<Route>>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(state.routes.list_for_app(&app_key(&app)).await?))
}

/// Routes are app-scoped: a route that exists but belongs to another app is
/// indistinguishable from one that does not exist.
async fn route_for_app(
    state: &ApiState,
    app: &App,
    kind: &str,
    route_id: &str,
) -> Result<Route, ControllerError> {
    let route = state.routes.get(kind, route_id).await?;
    if route.parent_ref.as_deref() != Some(route_parent_ref(&app_key(app)).as_str()) {
        return Err(ControllerError::NotFound);
    }
    Ok(route)
}

async fn get_route(
    State(state): State<ApiState>,
    Path((app_id, route_type, route_id)): Path<(String, String, String)>,
) -> Result<Json<Route>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(route_for_app(&state, &app, &route_type, &route_id).await?))
}

async fn update_route(
    State(state): State<ApiState>,
    Path((app_id, route_type, route_id)): Path<(String, String, String)>,
    Json(route): Json<Route>,
) -> Result<Json<Route>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    route_for_app(&state, &app, &route_type, &route_id).await?;
    Ok(Json(state.routes.update(&route_type, &route_id, route).await?))
}

async fn delete_route(
    State(state): State<ApiState>,
    Path((app_id, route_type, route_id)): Path<(String, String, String)>,
) -> Result<StatusCode, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    route_for_app(&state, &app, &route_type, &route_id).await?;
    state.routes.remove(&route_type, &route_id).await?;
    Ok(StatusCode::OK)
}

/// `GET /events`: an event-stream subscription through the dispatcher when
/// the client asks for one, otherwise the stored audit list.
async fn events(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, ControllerError> {
    let wants_stream = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"));
    if !wants_stream {
        return Ok(Json(state.events.list().await?).into_response());
    }

    let stream = state.dispatcher.subscribe(state.feed.as_ref())?;
    let sse = stream.map(|item| -> Result<SseEvent, Infallible> {
        Ok(match item {
            Ok(event) => SseEvent::default()
                .data(serde_json::to_string(&event).unwrap_or_default()),
            Err(err) => SseEvent::default().event("error").data(err.to_string()),
        })
    });
    Ok(Sse::new(sse).keep_alive(KeepAlive::default()).into_response())
}

async fn get_event(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<PlatformEvent>, ControllerError> {
    Ok(Json(state.events.get(&id).await?))
}

async fn list_volumes(State(state): State<ApiState>) -> Result<Json<Vec<Volume>>, ControllerError> {
    Ok(Json(state.volumes.list().await?))
}

async fn put_volume(
    State(state): State<ApiState>,
    Path(volume_id): Path<String>,
    Json(mut volume): Json<Volume>,
) -> Result<Json<Volume>, ControllerError> {
    let id = volume_id
        .parse()
        .map_err(|_| ControllerError::validation("id", "volume id must be a uuid"))?;
    volume.id = Some(id);
    Ok(Json(state.volumes.put(volume).await?))
}

async fn list_app_volumes(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Result<Json<Vec<Volume>>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(state.volumes.list_for_app(&app_key(&app)).await?))
}

async fn get_app_volume(
    State(state): State<ApiState>,
    Path((app_id, volume_id)): Path<(String, String)>,
) -> Result<Json<Volume>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(state.volumes.get(&app_key(&app), &volume_id).await?))
}

async fn decommission_volume(
    State(state): State<ApiState>,
    Path((app_id, volume_id)): Path<(String, String)>,
) -> Result<Json<Volume>, ControllerError> {
    let app = resolve_app(&state, &app_id).await?;
    Ok(Json(
        state
            .volumes
            .decommission(&app_key(&app), &volume_id)
            .await?,
    ))
}

async fn create_sink(
    State(state): State<ApiState>,
    Json(sink): Json<Sink>,
) -> Result<(StatusCode, Json<Sink>), ControllerError> {
    let stored = state.sinks.create(sink).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_sinks(State(state): State<ApiState>) -> Result<Json<Vec<Sink>>, ControllerError> {
    Ok(Json(state.sinks.list().await?))
}

async fn get_sink(
    State(state): State<ApiState>,
    Path(sink_id): Path<String>,
) -> Result<Json<Sink>, ControllerError> {
    Ok(Json(state.sinks.get(&sink_id).await?))
}

async fn delete_sink(
    State(state): State<ApiState>,
    Path(sink_id): Path<String>,
) -> Result<Json<Sink>, ControllerError> {
    Ok(Json(state.sinks.remove(&sink_id).await?))
}
