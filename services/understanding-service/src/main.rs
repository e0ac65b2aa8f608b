mod app;
mod config;
mod db;
mod handlers;
mod ingest;
mod models;
mod state;

use std::{net::SocketAddr, process};

use understanding_common::{bind_listener, init_tracing, shutdown_signal};

use crate::config::ServiceConfig;
use crate::db::Store;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    let config = ServiceConfig::default();
    let guards = init_tracing(&config.log);
    if !guards.has_file_output() {
        tracing::warn!(dir = %config.log.log_dir.display(), "file logging disabled");
    }

    // Without a store there is nothing to collect into; refuse to serve.
    let store = match Store::open(&config.database_path) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(
                error = %err,
                path = %config.database_path.display(),
                "failed to initialize database"
            );
            drop(guards);
            process::exit(1);
        }
    };

    let app = app::build_router(AppState::new(store));
    let listener = match bind_listener(config.listen_port).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, port = config.listen_port, "failed to bind listener");
            drop(guards);
            process::exit(1);
        }
    };
    tracing::info!(port = config.listen_port, "server starting");

    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        tracing::error!(error = %err, "server error");
        drop(guards);
        process::exit(1);
    }

    tracing::info!("server stopped");
}
