// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! # Protocol Multiplexer
//!
//! Single entry point in front of the REST surface. Every request passes
//! through the same fixed sequence of checks:
//!
//! 1. drain flag -> fixed 503, nothing else runs
//! 2. `/ping` -> immediate 200
//! 3. grpc-web content type -> hand off to the RPC bridge
//! 4. anonymous `/ca-cert` -> skip authorization
//! 5. authorization gate -> 401 on failure
//! 6. stamp the resolved identity and dispatch
//!
//! The ordering is load-bearing: a draining gateway must not touch the gate
//! or any repository, and the health probe must answer without credentials.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::error::ControllerError;
use crate::security::{extract_credential, AuthorizedIdentity, Gate, BOOTSTRAP_PATH};
use crate::shutdown::ShutdownCoordinator;

/// Header carrying the authenticated principal id to downstream handlers.
pub const AUTH_ID_HEADER: &str = "stratus-auth-id";
/// Header carrying the authenticated user name, when one is known.
pub const AUTH_USER_HEADER: &str = "stratus-auth-user";

#[derive(Clone)]
pub struct MuxState {
    pub shutdown: Arc<ShutdownCoordinator>,
    pub gate: Arc<dyn Gate>,
    /// RPC bridge the grpc-web branch forwards into.
    pub rpc: Router,
}

fn is_grpc_web(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/grpc-web"))
}

/// The multiplexing middleware itself. See the module docs for the check
/// sequence.
pub async fn multiplex(
    State(state): State<MuxState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if state.shutdown.is_draining() {
        return ControllerError::Shutdown.into_response();
    }

    let path = request.uri().path().to_string();
    if path == "/ping" {
        return StatusCode::OK.into_response();
    }

    if is_grpc_web(&request) {
        // Err is Infallible on Router::oneshot.
        return match state.rpc.clone().oneshot(request).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        };
    }

    let credential = extract_credential(request.headers());

    let identity = if path == BOOTSTRAP_PATH && credential.is_none() {
        AuthorizedIdentity::anonymous()
    } else {
        match state.gate.authorize(&path, credential.as_ref()) {
            Ok(identity) => identity,
            Err(err) => {
                warn!(path = %path, "request rejected by authorization gate");
                return err.into_response();
            }
        }
    };

    if !identity.is_anonymous() {
        if let Ok(value) = HeaderValue::from_str(&identity.id) {
            request.headers_mut().insert(AUTH_ID_HEADER, value);
        }
        if !identity.user.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&identity.user) {
                request.headers_mut().insert(AUTH_USER_HEADER, value);
            }
        }
    }
    request.extensions_mut().insert(identity.clone());

    let mut response = next.run(request).await;
    // The logging layer sits outside this middleware and reads the identity
    // back off the response.
    response.extensions_mut().insert(identity);
    response
}

/// Request log format, selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Standard,
    /// One line per request on the `audit` target, with the authenticated
    /// principal attached.
    Audit,
}

pub async fn request_logger(
    State(format): State<LogFormat>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = std::time::Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match format {
        LogFormat::Standard => {
            info!(%method, path = %path, status, elapsed_ms, "request");
        }
        LogFormat::Audit => {
            let identity = response.extensions().get::<AuthorizedIdentity>();
            let auth_id = identity.map(|i| i.id.as_str()).unwrap_or("-");
            let auth_user = identity
                .map(|i| i.user.as_str())
                .filter(|u| !u.is_empty())
                .unwrap_or("-");
            info!(
                target: "audit",
                %method, path = %path, status, elapsed_ms, auth_id, auth_user,
                "request"
            );
        }
    }
    response
}

/// Compose the public HTTP application: REST surface behind the
/// multiplexer, request logging and permissive CORS outermost.
pub fn http_app(rest: Router, mux: MuxState, format: LogFormat) -> Router {
    rest.layer(middleware::from_fn_with_state(mux, multiplex))
        .layer(middleware::from_fn_with_state(format, request_logger))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::Credential;
    use axum::routing::get;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AllowGate {
        calls: AtomicUsize,
    }

    impl AllowGate {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Gate for AllowGate {
        fn authorize(
            &self,
            _path: &str,
            _credential: Option<&Credential>,
        ) -> Result<AuthorizedIdentity, ControllerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AuthorizedIdentity {
                id: "key-1".into(),
                user: String::new(),
            })
        }
    }

    struct DenyGate;

    impl Gate for DenyGate {
        fn authorize(
            &self,
            _path: &str,
            _credential: Option<&Credential>,
        ) -> Result<AuthorizedIdentity, ControllerError> {
            Err(ControllerError::Unauthorized)
        }
    }

    fn rest() -> Router {
        Router::new()
            .route("/ca-cert", get(|| async { "CERT" }))
            .route(
                "/echo-auth",
                get(|request: Request<Body>| async move {
                    request
                        .headers()
                        .get(AUTH_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string()
                }),
            )
    }

    fn rpc() -> Router {
        Router::new().route("/rpc.probe", axum::routing::any(|| async { "rpc" }))
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn draining_short_circuits_before_the_gate() {
        let gate = AllowGate::new();
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let app = http_app(
            rest(),
            MuxState {
                shutdown: shutdown.clone(),
                gate: gate.clone(),
                rpc: rpc(),
            },
            LogFormat::Standard,
        );
        shutdown.begin().await;

        for path in ["/ping", "/ca-cert", "/echo-auth"] {
            let response = app
                .clone()
                .oneshot(
                    Request::get(path)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }
        assert_eq!(gate.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ping_answers_without_credentials() {
        let app = http_app(
            rest(),
            MuxState {
                shutdown: Arc::new(ShutdownCoordinator::new()),
                gate: Arc::new(DenyGate),
                rpc: rpc(),
            },
            LogFormat::Standard,
        );
        let response = app
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn anonymous_ca_cert_bypasses_the_gate() {
        let gate = AllowGate::new();
        let app = http_app(
            rest(),
            MuxState {
                shutdown: Arc::new(ShutdownCoordinator::new()),
                gate: gate.clone(),
                rpc: rpc(),
            },
            LogFormat::Standard,
        );
        let response = app
            .oneshot(Request::get("/ca-cert").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "CERT");
        assert_eq!(gate.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ca_cert_with_credentials_still_goes_through_the_gate() {
        let app = http_app(
            rest(),
            MuxState {
                shutdown: Arc::new(ShutdownCoordinator::new()),
                gate: Arc::new(DenyGate),
                rpc: rpc(),
            },
            LogFormat::Standard,
        );
        let response = app
            .oneshot(
                Request::get("/ca-cert")
                    .header("authorization", "Bearer bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn authorized_requests_carry_the_identity_header() {
        let app = http_app(
            rest(),
            MuxState {
                shutdown: Arc::new(ShutdownCoordinator::new()),
                gate: AllowGate::new(),
                rpc: rpc(),
            },
            LogFormat::Audit,
        );
        let response = app
            .oneshot(Request::get("/echo-auth").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "key-1");
    }

    #[tokio::test]
    async fn grpc_web_requests_are_forwarded_to_the_bridge() {
        let app = http_app(
            rest(),
            MuxState {
                shutdown: Arc::new(ShutdownCoordinator::new()),
                gate: Arc::new(DenyGate),
                rpc: rpc(),
            },
            LogFormat::Standard,
        );
        let response = app
            .oneshot(
                Request::post("/rpc.probe")
                    .header("content-type", "application/grpc-web+proto")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "rpc");
    }
}
