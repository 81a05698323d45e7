// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! # RPC service
//!
//! Method-per-path JSON transport under `/stratus.Controller/{Method}`,
//! served natively on the RPC port and reachable on the public port through
//! the multiplexer's grpc-web branch. Requests pass the same authorization
//! gate as REST; the gate sees a normalized credential and never learns
//! which transport produced it.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::ControllerError;
use crate::security::{extract_credential, Gate};
use crate::shutdown::ShutdownCoordinator;

use super::api::ApiState;

#[derive(Clone)]
pub struct RpcGateState {
    pub shutdown: Arc<ShutdownCoordinator>,
    pub gate: Arc<dyn Gate>,
}

/// Drain check and authorization for the RPC surface. There is no
/// bootstrap bypass here; every method requires a credential.
pub async fn rpc_gate(
    State(state): State<RpcGateState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if state.shutdown.is_draining() {
        return ControllerError::Shutdown.into_response();
    }
    let credential = extract_credential(request.headers());
    let path = request.uri().path().to_string();
    match state.gate.authorize(&path, credential.as_ref()) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Build the RPC router. Methods map one-to-one onto the REST handlers'
/// repository calls; only the framing differs.
pub fn router(api: ApiState, gate: RpcGateState) -> Router {
    Router::new()
        .route("/stratus.Controller/Status", post(status))
        .route("/stratus.Controller/ListApps", post(list_apps))
        .route("/stratus.Controller/GetApp", post(get_app))
        .route("/stratus.Controller/GetAppRelease", post(get_app_release))
        .route("/stratus.Controller/ListFormations", post(list_formations))
        .route(
            "/stratus.Controller/CreateDeployment",
            post(create_deployment),
        )
        .layer(middleware::from_fn_with_state(gate, rpc_gate))
        .with_state(api)
}

async fn status(State(state): State<ApiState>) -> Response {
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

async fn list_apps(State(state): State<ApiState>) -> Result<Response, ControllerError> {
    let apps = state.apps.list().await?;
    Ok(Json(json!({ "apps": apps })).into_response())
}

#[derive(Debug, Deserialize)]
struct AppRef {
    app_id: String,
}

async fn get_app(
    State(state): State<ApiState>,
    Json(req): Json<AppRef>,
) -> Result<Response, ControllerError> {
    let app = state.apps.get(&req.app_id).await?;
    Ok(Json(app).into_response())
}

async fn get_app_release(
    State(state): State<ApiState>,
    Json(req): Json<AppRef>,
) -> Result<Response, ControllerError> {
    let app = state.apps.get(&req.app_id).await?;
    let app_id = app.id.map(|u| u.to_string()).unwrap_or_default();
    let release_id = state
        .apps
        .release_id(&app_id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    Ok(Json(state.releases.get(&release_id).await?).into_response())
}

async fn list_formations(
    State(state): State<ApiState>,
    Json(req): Json<AppRef>,
) -> Result<Response, ControllerError> {
    let app = state.apps.get(&req.app_id).await?;
    let app_id = app.id.map(|u| u.to_string()).unwrap_or_default();
    let formations = state.formations.list_for_app(&app_id).await?;
    Ok(Json(json!({ "formations": formations })).into_response())
}

#[derive(Debug, Deserialize)]
struct CreateDeploymentRequest {
    app_id: String,
    release_id: String,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    timeout: Option<i64>,
}

async fn create_deployment(
    State(state): State<ApiState>,
    Json(req): Json<CreateDeploymentRequest>,
) -> Result<Response, ControllerError> {
    let app = state.apps.get(&req.app_id).await?;
    let app_id = app.id.map(|u| u.to_string()).unwrap_or_default();
    let deployment = state
        .deployments
        .create(
            &app_id,
            crate::domain::types::DeployRequest {
                release_id: req.release_id,
                strategy: req.strategy,
                timeout: req.timeout,
            },
        )
        .await?;
    Ok(Json(deployment).into_response())
}
