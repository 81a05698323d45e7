// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! End-to-end tests against the fully wired HTTP application: multiplexer,
//! authorization gate, CRUD registry, explicit routes and the RPC bridge.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use stratus_controller::domain::types::App;
use stratus_controller::error::ControllerError;
use stratus_controller::events::EventDispatcher;
use stratus_controller::infrastructure::log_client::NullLogClient;
use stratus_controller::infrastructure::memory::{
    EventRecorder, MemAppRepo, MemBackupRepo, MemDeploymentRepo, MemDomainMigrationRepo,
    MemEventRepo,
    MemFormationRepo, MemJobRepo, MemReleaseRepo, MemRepo, MemResourceRepo, MemRouteRepo,
    MemSinkRepo, MemVolumeRepo, MemWorkQueue, MemoryEventFeed,
};
use stratus_controller::infrastructure::schema::SchemaSet;
use stratus_controller::presentation::api::{self, ApiState, HealthSource};
use stratus_controller::presentation::mux::{self, LogFormat, MuxState};
use stratus_controller::presentation::rpc::{self, RpcGateState};
use stratus_controller::security::{AuthorizedIdentity, Authorizer, Credential, Gate};
use stratus_controller::shutdown::ShutdownCoordinator;

const AUTH_KEY: &str = "test-key";
const CA_CERT: &[u8] = b"-----BEGIN CERTIFICATE-----\ntest\n-----END CERTIFICATE-----\n";

struct AlwaysHealthy;

#[async_trait::async_trait]
impl HealthSource for AlwaysHealthy {
    async fn healthy(&self) -> bool {
        true
    }
}

/// Wraps the real gate and counts how often it is consulted, so tests can
/// assert the drain and bootstrap branches never reach it.
struct CountingGate {
    inner: Authorizer,
    calls: Arc<AtomicUsize>,
}

impl Gate for CountingGate {
    fn authorize(
        &self,
        path: &str,
        credential: Option<&Credential>,
    ) -> Result<AuthorizedIdentity, ControllerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.authorize(path, credential)
    }
}

struct Harness {
    app: Router,
    shutdown: Arc<ShutdownCoordinator>,
    gate_calls: Arc<AtomicUsize>,
    queue: Arc<MemWorkQueue>,
    dispatcher: Arc<EventDispatcher>,
    feed: Arc<MemoryEventFeed>,
    _schema_dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let schema_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        schema_dir.path().join("apps.json"),
        r#"{"type":"object","properties":{"name":{"type":"string","minLength":1}}}"#,
    )
    .unwrap();
    let schemas = Arc::new(SchemaSet::load(schema_dir.path()).unwrap());

    let shutdown = Arc::new(ShutdownCoordinator::new());
    let dispatcher = Arc::new(EventDispatcher::new());
    let feed = Arc::new(MemoryEventFeed::new());
    let queue = Arc::new(MemWorkQueue::new());

    let gate_calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(CountingGate {
        inner: Authorizer::new(
            vec![AUTH_KEY.to_string()],
            vec!["key0".to_string()],
            None,
            Duration::from_secs(3600),
        )
        .unwrap(),
        calls: gate_calls.clone(),
    });

    let event_store = Arc::new(MemEventRepo::new());
    let recorder = Arc::new(EventRecorder::new(event_store.clone(), feed.clone()));
    let routes = Arc::new(MemRouteRepo::new());

    let api_state = ApiState {
        apps: Arc::new(
            MemAppRepo::new(Some(vec![7; 16]), None)
                .with_routes(routes.clone())
                .with_recorder(recorder.clone()),
        ),
        releases: Arc::new(MemReleaseRepo::new().with_recorder(recorder.clone())),
        providers: Arc::new(MemRepo::new()),
        artifacts: Arc::new(MemRepo::new()),
        formations: Arc::new(MemFormationRepo::new().with_recorder(recorder.clone())),
        jobs: Arc::new(MemJobRepo::new()),
        deployments: Arc::new(MemDeploymentRepo::new().with_recorder(recorder)),
        routes,
        resources: Arc::new(MemResourceRepo::new()),
        volumes: Arc::new(MemVolumeRepo::new()),
        sinks: Arc::new(MemSinkRepo::new()),
        events: event_store,
        backups: Arc::new(MemBackupRepo::new(b"backup".to_vec())),
        domain_migrations: Arc::new(MemDomainMigrationRepo::new()),
        queue: queue.clone(),
        logs: Arc::new(NullLogClient),
        dispatcher: dispatcher.clone(),
        feed: feed.clone(),
        health: Arc::new(AlwaysHealthy),
        ca_cert: CA_CERT.to_vec().into(),
    };

    let rpc_router = rpc::router(
        api_state.clone(),
        RpcGateState {
            shutdown: shutdown.clone(),
            gate: gate.clone(),
        },
    );
    let rest = api::router(api_state, schemas);
    let app = mux::http_app(
        rest,
        MuxState {
            shutdown: shutdown.clone(),
            gate,
            rpc: rpc_router,
        },
        LogFormat::Standard,
    );

    Harness {
        app,
        shutdown,
        gate_calls,
        queue,
        dispatcher,
        feed,
        _schema_dir: schema_dir,
    }
}

fn authed(builder: axum::http::request::Builder) -> axum::http::request::Builder {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{AUTH_KEY}"));
    builder.header("authorization", format!("Basic {encoded}"))
}

fn json_request(
    builder: axum::http::request::Builder,
    body: Value,
) -> Request<Body> {
    authed(builder)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn create_app(harness: &Harness, name: &str) -> App {
    let response = harness
        .app
        .clone()
        .oneshot(json_request(
            Request::post("/apps"),
            json!({ "name": name }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn ping_answers_without_credentials() {
    let harness = harness();
    let response = harness
        .app
        .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.gate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn draining_returns_the_fixed_503_for_every_request_shape() {
    let harness = harness();
    harness.shutdown.begin().await;

    let requests = vec![
        Request::get("/ping").body(Body::empty()).unwrap(),
        Request::get("/ca-cert").body(Body::empty()).unwrap(),
        authed(Request::get("/apps")).body(Body::empty()).unwrap(),
        json_request(Request::put("/domain"), json!({"domain": "new.example.com"})),
        Request::post("/stratus.Controller/ListApps")
            .header("content-type", "application/grpc-web")
            .body(Body::empty())
            .unwrap(),
    ];
    for request in requests {
        let response = harness.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["code"], "unavailable");
        assert_eq!(body["message"], "controller: shutting down");
    }
    // Nothing past the drain check ran.
    assert_eq!(harness.gate_calls.load(Ordering::SeqCst), 0);
    assert!(harness.queue.enqueued().is_empty());
}

#[tokio::test]
async fn anonymous_ca_cert_returns_the_exact_bytes_without_the_gate() {
    let harness = harness();
    let response = harness
        .app
        .clone()
        .oneshot(Request::get("/ca-cert").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/x-x509-ca-cert"
    );
    assert_eq!(&body_bytes(response).await[..], CA_CERT);
    assert_eq!(harness.gate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_key_is_an_empty_401() {
    let harness = harness();
    let encoded = base64::engine::general_purpose::STANDARD.encode(":wrong-key");
    let response = harness
        .app
        .oneshot(
            Request::get("/apps")
                .header("authorization", format!("Basic {encoded}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn missing_credentials_are_an_empty_401() {
    let harness = harness();
    let response = harness
        .app
        .oneshot(Request::get("/apps").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn schema_invalid_app_is_a_422_naming_the_field() {
    let harness = harness();
    let response = harness
        .app
        .clone()
        .oneshot(json_request(Request::post("/apps"), json!({"name": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "validation_error");
    assert_eq!(body["field"], "name");
}

#[tokio::test]
async fn unknown_app_is_an_empty_404() {
    let harness = harness();
    let response = harness
        .app
        .oneshot(
            authed(Request::get("/apps/no-such-app"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn created_apps_are_readable_by_id_and_by_name() {
    let harness = harness();
    let app = create_app(&harness, "web").await;
    let id = app.id.unwrap();

    for key in [id.to_string(), "web".to_string()] {
        let response = harness
            .app
            .clone()
            .oneshot(
                authed(Request::get(format!("/apps/{key}")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: App = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(fetched, app);
    }
}

#[tokio::test]
async fn deleting_an_app_enqueues_cleanup() {
    let harness = harness();
    let app = create_app(&harness, "doomed").await;

    let response = harness
        .app
        .clone()
        .oneshot(
            authed(Request::delete("/apps/doomed"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let enqueued = harness.queue.enqueued();
    assert_eq!(enqueued.len(), 1);
    assert_eq!(enqueued[0].0, "app-deletion");
    assert_eq!(enqueued[0].1["app_id"], app.id.unwrap().to_string());
}

#[tokio::test]
async fn scale_request_updates_the_stored_formation() {
    let harness = harness();
    let app = create_app(&harness, "scaled").await;
    let app_id = app.id.unwrap();

    let response = harness
        .app
        .clone()
        .oneshot(json_request(
            Request::put(format!("/apps/{app_id}/scale/rel-1")),
            json!({"new_processes": {"web": 2}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let scale = body_json(response).await;
    assert_eq!(scale["state"], "pending");

    let response = harness
        .app
        .oneshot(
            authed(Request::get(format!("/apps/{app_id}/formations/rel-1")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let formation = body_json(response).await;
    assert_eq!(formation["processes"]["web"], 2);
}

#[tokio::test]
async fn routes_of_other_apps_are_not_visible() {
    let harness = harness();
    let owner = create_app(&harness, "owner").await;
    let other = create_app(&harness, "other").await;

    let response = harness
        .app
        .clone()
        .oneshot(json_request(
            Request::post(format!("/apps/{}/routes", owner.id.unwrap())),
            json!({"type": "http", "domain": "owner.example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let route = body_json(response).await;
    let route_id = route["id"].as_str().unwrap().to_string();

    // The owning app sees its route.
    let response = harness
        .app
        .clone()
        .oneshot(
            authed(Request::get(format!(
                "/apps/{}/routes/http/{route_id}",
                owner.id.unwrap()
            )))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Another app gets the same empty 404 as for a missing route.
    let response = harness
        .app
        .oneshot(
            authed(Request::get(format!(
                "/apps/{}/routes/http/{route_id}",
                other.id.unwrap()
            )))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn grpc_web_requests_reach_the_rpc_bridge_on_the_public_port() {
    let harness = harness();
    create_app(&harness, "bridged").await;

    let response = harness
        .app
        .oneshot(
            authed(Request::post("/stratus.Controller/ListApps"))
                .header("content-type", "application/grpc-web+json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["apps"][0]["name"], "bridged");
}

#[tokio::test]
async fn rpc_methods_require_credentials_too() {
    let harness = harness();
    let response = harness
        .app
        .oneshot(
            Request::post("/stratus.Controller/ListApps")
                .header("content-type", "application/grpc-web")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn app_creation_surfaces_on_an_event_subscription() {
    use futures::StreamExt;
    use stratus_controller::domain::events::ObjectType;

    let harness = harness();
    // Same subscription path the SSE endpoint uses.
    let mut stream = harness
        .dispatcher
        .subscribe(harness.feed.as_ref())
        .unwrap();

    let app = create_app(&harness, "evented").await;
    let app_id = app.id.unwrap().to_string();

    let event = stream.next().await.unwrap().unwrap();
    assert_eq!(event.object_type, ObjectType::App);
    assert_eq!(event.object_id, app_id);
    assert_eq!(event.data["name"], "evented");

    // The stored list serves the non-streaming GET /events read.
    let response = harness
        .app
        .clone()
        .oneshot(
            authed(Request::get("/events"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stored = body_json(response).await;
    assert_eq!(stored[0]["object_type"], "app");
    assert_eq!(stored[0]["object_id"], app_id);

    // And the recorded event is individually addressable.
    let event_id = stored[0]["id"].as_str().unwrap().to_string();
    let response = harness
        .app
        .oneshot(
            authed(Request::get(format!("/events/{event_id}")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn domain_migration_round_trips() {
    let harness = harness();
    let response = harness
        .app
        .oneshot(json_request(
            Request::put("/domain"),
            json!({"old_domain": "old.example.com", "domain": "new.example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["domain"], "new.example.com");
    assert!(body["id"].is_string());
}
