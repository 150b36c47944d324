use std::sync::Arc;

use net::{AppState, AuthBackend};
use player_db::PlayerDb;
use world::character::CharacterStore;
use world::{EventPublisher, LogPublisher, WorldService};

use zone_server::auth::AuthService;
use zone_server::characters::CharacterService;
use zone_server::{config, shutdown};

#[tokio::main]
async fn main() {
    observability::init_logging();

    let config = config::parse_cli_args();
    tracing::info!(zone = %config.world.zone_id, "Zone server starting...");
    if config.auth.jwt_secret == "change-me" {
        tracing::warn!("running with the default JWT secret; set [auth] jwt_secret");
    }

    let db = match PlayerDb::open(&config.db.path) {
        Ok(db) => Arc::new(db),
        Err(err) => {
            tracing::error!(path = %config.db.path, error = %err, "failed to open player database");
            std::process::exit(1);
        }
    };

    let publisher: Arc<dyn EventPublisher> = Arc::new(LogPublisher);
    let auth_backend: Arc<dyn AuthBackend> = Arc::new(AuthService::new(db.clone(), &config.auth));
    let character_store: Arc<dyn CharacterStore> = Arc::new(CharacterService::new(
        db,
        publisher.clone(),
        config.world.zone_id.clone(),
    ));

    let world = WorldService::new(
        config.to_world_config(),
        Some(character_store.clone()),
        publisher,
    );

    let (shutdown_tx, shutdown_rx) = shutdown::shutdown_channel();

    let world_task = tokio::spawn(world.clone().run(shutdown_rx.clone().into_inner()));

    let state = Arc::new(AppState {
        auth: auth_backend,
        characters: character_store,
        world,
    });
    let app = net::router(state, &config.net.cors_origin);

    let listener = match tokio::net::TcpListener::bind(&config.net.http_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(addr = %config.net.http_addr, error = %err, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %config.net.http_addr, "server listening");

    let mut server_shutdown = shutdown_rx;
    let server_task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.wait().await })
            .await;
        if let Err(err) = result {
            tracing::error!(error = %err, "http server failed");
        }
    });

    shutdown::wait_for_signal().await;
    tracing::info!("shutdown signal received, stopping server...");
    shutdown_tx.trigger();

    let _ = world_task.await;
    let _ = server_task.await;
    tracing::info!("Server stopped.");
}
