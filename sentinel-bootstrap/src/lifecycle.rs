use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use sentinel_application::commands::pass_commands;
use sentinel_application::queries::checkpoint_queries;
use sentinel_application::AppState;
use sentinel_infrastructure::AppConfig;
use sentinel_interfaces_http::build_router;

use crate::context::AppContext;

/// The timeout bounds the HTTP reply only. A manual pass runs on its own task
/// and outlives a timed-out request.
fn build_router_with_layers(state: AppState) -> Router {
    build_router(state.clone())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_seconds,
        )))
        .layer(TraceLayer::new_for_http())
}

/// Monitor loop plus HTTP API. Both stop on SIGINT/SIGTERM: the server drains
/// open requests and the monitor finishes its current tick.
pub async fn run_standalone(config: AppConfig) -> Result<()> {
    let context = AppContext::new(&config).await?;
    let state = context.state;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let monitor = if state.config.monitor_enabled {
        Some(tokio::spawn(state.change_monitor().run(shutdown_rx.clone())))
    } else {
        info!("change monitor disabled");
        None
    };

    let app = build_router_with_layers(state.clone());
    let addr: std::net::SocketAddr = state.config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", addr);

    let mut server_shutdown = shutdown_rx;
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    });

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested");
        let _ = signal_tx.send(true);
    });

    let served = server.await;
    let _ = shutdown_tx.send(true);
    if let Some(handle) = monitor {
        if let Err(err) = handle.await {
            error!("change monitor task failed: {}", err);
        }
    }
    served?;
    info!("stopped");
    Ok(())
}

/// One MANUAL pass, for use right after an upload.
pub async fn run_once(config: AppConfig) -> Result<()> {
    let context = AppContext::new(&config).await?;
    let result = pass_commands::run_manual_pass(&context.state).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn print_status(config: AppConfig) -> Result<()> {
    let context = AppContext::new(&config).await?;
    let checkpoint = checkpoint_queries::get_checkpoint(&context.state).await?;
    println!("{}", serde_json::to_string_pretty(&checkpoint)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler unavailable: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("sigterm handler unavailable: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
