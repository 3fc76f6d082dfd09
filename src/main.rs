//! Matchday Back binary entrypoint wiring REST, SSE and the game store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matchday_back::{
    auth::JwtVerifier,
    config::AppConfig,
    dao::game_store::memory::MemoryGameStore,
    routes,
    services::sse_events,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let verifier = JwtVerifier::from_env().context("configuring token verification")?;
    let app_state = AppState::new(config, verifier);
    sse_events::spawn_degraded_broadcaster(app_state.clone());

    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".into());
    start_storage(&app_state, &backend).await?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, backend = %backend, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the requested game store, supervising remote backends in the background.
async fn start_storage(state: &SharedState, backend: &str) -> anyhow::Result<()> {
    match backend {
        "memory" => {
            info!("using in-memory game store; data is lost on restart");
            state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            use matchday_back::dao::{
                game_store::{
                    GameStore,
                    mongodb::{MongoConfig, MongoGameStore},
                },
                storage::StorageError,
            };

            tokio::spawn(matchday_back::services::storage_supervisor::run(
                state.clone(),
                || async {
                    let config = MongoConfig::from_env().await.map_err(StorageError::from)?;
                    let store = MongoGameStore::connect(config)
                        .await
                        .map_err(StorageError::from)?;
                    Ok(Arc::new(store) as Arc<dyn GameStore>)
                },
            ));
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use matchday_back::dao::{
                game_store::{
                    GameStore,
                    couchdb::{CouchConfig, CouchGameStore},
                },
                storage::StorageError,
            };

            tokio::spawn(matchday_back::services::storage_supervisor::run(
                state.clone(),
                || async {
                    let config = CouchConfig::from_env().map_err(StorageError::from)?;
                    let store = CouchGameStore::connect(config)
                        .await
                        .map_err(StorageError::from)?;
                    Ok(Arc::new(store) as Arc<dyn GameStore>)
                },
            ));
        }
        other => bail!("unsupported STORAGE_BACKEND `{other}`"),
    }
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
