// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! Controller entry point: read configuration, wire the object graph, bind
//! both listeners, and hand teardown ordering to the shutdown coordinator.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use stratus_controller::config::Config;
use stratus_controller::error::SHUTDOWN_MESSAGE;
use stratus_controller::events::EventDispatcher;
use stratus_controller::infrastructure::discovery::DiscoveryClient;
use stratus_controller::infrastructure::log_client::{
    AggregatorClient, LogClient, NullLogClient,
};
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
use stratus_controller::security::Authorizer;
use stratus_controller::shutdown::ShutdownCoordinator;

/// Reports healthy from the database ping, or unconditionally when the
/// controller runs without one.
struct PgHealth {
    pool: Option<PgPool>,
}

#[async_trait::async_trait]
impl HealthSource for PgHealth {
    async fn healthy(&self) -> bool {
        match &self.pool {
            Some(pool) => sqlx::query("SELECT 1").execute(pool).await.is_ok(),
            None => true,
        }
    }
}

fn init_logging() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .context("error creating log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = Config::from_env().context("error reading configuration")?;
    let schemas = Arc::new(
        SchemaSet::load(&config.schema_root).context("error loading request schemas")?,
    );

    // Connections are established on first use; boot does not block on the
    // database being reachable.
    let pool = match &config.database_url {
        Some(url) => Some(
            PgPoolOptions::new()
                .connect_lazy(url)
                .context("error configuring database pool")?,
        ),
        None => None,
    };

    let shutdown = Arc::new(ShutdownCoordinator::new());
    let dispatcher = Arc::new(EventDispatcher::new());
    let feed = Arc::new(MemoryEventFeed::new());

    let gate = Arc::new(
        Authorizer::new(
            config.auth_keys.clone(),
            config.auth_key_ids.clone(),
            config.token_key_pem.as_deref(),
            config.token_max_validity,
        )
        .context("error building authorization gate")?,
    );

    let logs: Arc<dyn LogClient> = match &config.log_aggregator_url {
        Some(url) => Arc::new(AggregatorClient::new(url.clone())),
        None => Arc::new(NullLogClient),
    };

    let event_store = Arc::new(MemEventRepo::new());
    let recorder = Arc::new(EventRecorder::new(event_store.clone(), feed.clone()));
    let routes = Arc::new(MemRouteRepo::new());

    let api_state = ApiState {
        apps: Arc::new(
            MemAppRepo::new(
                config.name_seed.clone(),
                config.default_route_domain.clone(),
            )
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
        backups: Arc::new(MemBackupRepo::new(Vec::new())),
        domain_migrations: Arc::new(MemDomainMigrationRepo::new()),
        queue: Arc::new(MemWorkQueue::new()),
        logs,
        dispatcher: dispatcher.clone(),
        feed: feed.clone(),
        health: Arc::new(PgHealth { pool: pool.clone() }),
        ca_cert: config.ca_cert.clone().into(),
    };

    let rpc_router = rpc::router(
        api_state.clone(),
        RpcGateState {
            shutdown: shutdown.clone(),
            gate: gate.clone(),
        },
    );

    let rest = api::router(api_state, schemas);
    let format = if config.audit_log {
        LogFormat::Audit
    } else {
        LogFormat::Standard
    };
    let http = mux::http_app(
        rest,
        MuxState {
            shutdown: shutdown.clone(),
            gate,
            rpc: rpc_router.clone(),
        },
        format,
    );

    let http_listener = TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("error binding port {}", config.http_port))?;
    let rpc_listener = TcpListener::bind(("0.0.0.0", config.rpc_port))
        .await
        .with_context(|| format!("error binding port {}", config.rpc_port))?;

    // Teardown order matters: stop attracting new traffic first, then end
    // event streams, then release storage, then close the listeners.
    if let Some(url) = &config.discoverd_url {
        let discovery = DiscoveryClient::new(url.clone());
        let http_addr = http_listener.local_addr()?.to_string();
        let rpc_addr = rpc_listener.local_addr()?.to_string();
        let registration = discovery
            .register("controller", &http_addr, Default::default())
            .await?;
        let rpc_registration = discovery
            .register("controller-rpc", &rpc_addr, Default::default())
            .await?;
        shutdown.on_shutdown("discovery", move || async move {
            registration.deregister().await;
            rpc_registration.deregister().await;
        });
    }

    {
        let dispatcher = dispatcher.clone();
        shutdown.on_shutdown("events", move || async move {
            dispatcher.close(SHUTDOWN_MESSAGE);
        });
    }

    if let Some(pool) = pool {
        shutdown.on_shutdown("database", move || async move {
            pool.close().await;
        });
    }

    let stop = CancellationToken::new();
    {
        let stop = stop.clone();
        shutdown.on_shutdown("listeners", move || async move {
            stop.cancel();
        });
    }

    info!(
        http_port = config.http_port,
        rpc_port = config.rpc_port,
        "controller listening"
    );

    let http_server = {
        let stop = stop.clone();
        tokio::spawn(async move {
            axum::serve(http_listener, http)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
        })
    };
    let rpc_server = {
        let stop = stop.clone();
        tokio::spawn(async move {
            axum::serve(rpc_listener, rpc_router)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
        })
    };

    wait_for_signal().await;
    info!("shutdown signal received");
    shutdown.begin().await;

    for server in [http_server, rpc_server] {
        if let Err(err) = server.await? {
            warn!(error = %err, "server exited with error");
        }
    }

    Ok(())
}

async fn wait_for_signal() {
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
    {
        Ok(signal) => signal,
        Err(err) => {
            warn!(error = %err, "error installing SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
