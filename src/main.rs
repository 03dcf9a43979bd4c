// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use clap::Parser;
use haproxy_operator::{
    config::OperatorConfig,
    constants::{HEALTH_SERVER_PATH, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS},
    context::Context,
    controller::run_backend_controller,
    haproxy::HaproxyClient,
    metrics::OperatorMetrics,
};
use kube::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("haproxy-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

fn init_logging() {
    // Respects RUST_LOG, defaults to INFO.
    // RUST_LOG_FORMAT=json switches to JSON output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    init_logging();

    let config = OperatorConfig::parse();
    config.validate()?;

    info!(
        haproxy_api_url = %config.haproxy_api_url,
        namespaces = ?config.namespaces(),
        watch_label = ?config.watch_label,
        "Starting HAProxy operator"
    );

    let metrics = OperatorMetrics::new()?;

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let haproxy = HaproxyClient::new(config.haproxy_config(), Arc::new(metrics.clone()))?;
    let ctx = Arc::new(Context::new(
        client.clone(),
        haproxy,
        Arc::new(metrics.clone()),
    ));

    tokio::select! {
        () = run_backend_controller(client, ctx, config.watch_scope()) => {
            info!("Backend controller stopped");
            Ok(())
        }
        result = serve_metrics(config.metrics_bind_address, metrics) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
    }
}

/// Serve Prometheus metrics and the health endpoint.
async fn serve_metrics(address: SocketAddr, metrics: OperatorMetrics) -> Result<()> {
    let app = Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(|| async { "ok" }))
        .with_state(metrics);

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(address = %address, "Serving metrics and health endpoints");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler(State(metrics): State<OperatorMetrics>) -> Response {
    match metrics.gather() {
        Ok(body) => body.into_response(),
        Err(e) => {
            error!(error = %e, "Failed to gather metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
