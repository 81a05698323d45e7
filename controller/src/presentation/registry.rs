// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! # Resource Registry
//!
//! Generic binder wiring the uniform create/get/list endpoints for a
//! resource kind. Parametric over a [`Resource`] type and its repository
//! capability set, resolved entirely at compile time.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use crate::domain::repository::Repository;
use crate::domain::types::Resource;
use crate::error::ControllerError;
use crate::infrastructure::schema::SchemaSet;

pub struct RegistryState<T: Resource> {
    repo: Arc<dyn Repository<T>>,
    schemas: Arc<SchemaSet>,
}

// Manual impl: derive(Clone) would demand T: Clone on the state itself.
impl<T: Resource> Clone for RegistryState<T> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            schemas: self.schemas.clone(),
        }
    }
}

/// Bind the three uniform endpoints for kind `T` and return the sub-router.
///
/// Path parameters follow the `{kind}_id` convention shared with the
/// explicit route table, so merged routers never disagree on a segment name.
pub fn register<T: Resource>(repo: Arc<dyn Repository<T>>, schemas: Arc<SchemaSet>) -> Router {
    let kind = T::KIND;
    Router::new()
        .route(&format!("/{kind}"), post(create::<T>).get(list::<T>))
        .route(&format!("/{kind}/{{{kind}_id}}"), get(get_one::<T>))
        .with_state(RegistryState { repo, schemas })
}

async fn create<T: Resource>(
    State(state): State<RegistryState<T>>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<T>), ControllerError> {
    state.schemas.validate(T::KIND, &payload)?;
    let resource: T = serde_json::from_value(payload)
        .map_err(|e| ControllerError::validation("body", e.to_string()))?;
    let stored = state.repo.create(resource).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_one<T: Resource>(
    State(state): State<RegistryState<T>>,
    Path(id): Path<String>,
) -> Result<Json<T>, ControllerError> {
    Ok(Json(state.repo.get(&id).await?))
}

async fn list<T: Resource>(
    State(state): State<RegistryState<T>>,
) -> Result<Json<Vec<T>>, ControllerError> {
    Ok(Json(state.repo.list().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Provider;
    use crate::infrastructure::memory::MemRepo;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn schemas() -> Arc<SchemaSet> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("providers.json"),
            r#"{"type":"object","required":["name"],"properties":{"name":{"type":"string","minLength":1}}}"#,
        )
        .unwrap();
        Arc::new(SchemaSet::load(dir.path()).unwrap())
    }

    fn app() -> Router {
        let repo: Arc<dyn Repository<Provider>> = Arc::new(MemRepo::new());
        register::<Provider>(repo, schemas())
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let app = app();

        let res = app
            .clone()
            .oneshot(
                Request::post("/providers")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"pg","url":"discoverd+http://pg"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let stored: Provider = serde_json::from_slice(&body).unwrap();
        let id = stored.id.unwrap();
        assert_eq!(stored.name, "pg");

        let res = app
            .oneshot(
                Request::get(format!("/providers/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let fetched: Provider = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn schema_violation_is_a_field_error_not_a_500() {
        let res = app()
            .oneshot(
                Request::post("/providers")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["field"], "name");
    }

    #[tokio::test]
    async fn unknown_id_is_an_empty_404() {
        let res = app()
            .oneshot(
                Request::get("/providers/unknown-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
