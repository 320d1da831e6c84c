mod app;
mod config;
mod routes;
mod services;
mod state;

use countries_map_shared::CountryNameTable;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let names = match config::country_names_path() {
        Some(path) => match services::country_names::load(&path).await {
            Ok(names) => {
                tracing::info!(count = names.len(), path = %path.display(), "loaded country names");
                names
            }
            Err(e) => {
                tracing::warn!(error = %e, "country names unavailable; showing codes");
                CountryNameTable::default()
            }
        },
        None => CountryNameTable::default(),
    };

    let state = AppState::new(names);

    // Spawn background services
    let base_map = config::base_map_svg();
    tracing::info!(path = %base_map.display(), "watching base map");
    tokio::spawn(services::document_loader::run(state.clone(), base_map));

    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("Countries map server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
