mod config;

use std::net::SocketAddr;

use outercircle_api::admin::AdminGate;
use outercircle_api::routes;
use outercircle_api::service::DropService;
use outercircle_api::state::AppStateInner;
use outercircle_db::StoreConfig;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outercircle=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init store
    let store = outercircle_db::open(&config.store)?;
    match &config.store {
        StoreConfig::Sqlite { .. } => info!("Using SQLite store"),
        StoreConfig::Document { recover_corrupt, .. } => {
            info!("Using flat-document store");
            if *recover_corrupt {
                warn!("Corrupt document recovery is on: a damaged document will be replaced by an empty one");
            }
        }
    }

    info!(
        "Codes: {} symbols x {} ({} possible)",
        config.code_format.alphabet().len(),
        config.code_format.length(),
        config.code_format.space_size()
    );

    let admin = AdminGate::new(config.admin_password.clone(), config.session_key());
    if admin.is_enabled() {
        info!("Admin listing is password protected");
    } else {
        warn!("No admin password set, the admin listing is public");
    }

    let service = DropService::new(store, config.code_format.clone());
    let state = AppStateInner::new(service, admin);

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("OuterCircle server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
