//! Club statistics backend entrypoint: REST routes, recorder sessions and the storage
//! supervisor.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use club_stats_back::{
    config::AppConfig,
    dao::{
        club_store::{ClubStore, memory::MemoryClubStore},
        storage::StorageError,
    },
    routes,
    services::{recorder_service, storage_supervisor},
    state::{AppState, SharedState},
};

/// Persistence backend selected with `STORAGE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageBackend {
    #[cfg(feature = "mongo-store")]
    Mongo,
    #[cfg(feature = "couch-store")]
    Couch,
    Memory,
}

impl StorageBackend {
    fn from_env() -> anyhow::Result<Self> {
        let raw = env::var("STORAGE_BACKEND").ok();
        match raw.as_deref().map(str::trim) {
            #[cfg(feature = "mongo-store")]
            None | Some("") | Some("mongo") => Ok(Self::Mongo),
            #[cfg(not(feature = "mongo-store"))]
            None | Some("") => Ok(Self::Memory),
            #[cfg(feature = "couch-store")]
            Some("couch") => Ok(Self::Couch),
            Some("memory") => Ok(Self::Memory),
            Some(other) => bail!("unsupported STORAGE_BACKEND `{other}`"),
        }
    }
}

async fn connect(backend: StorageBackend) -> Result<Arc<dyn ClubStore>, StorageError> {
    match backend {
        #[cfg(feature = "mongo-store")]
        StorageBackend::Mongo => {
            use club_stats_back::dao::club_store::mongodb::{MongoClubStore, MongoConfig};
            let config = MongoConfig::from_env().await?;
            Ok(Arc::new(MongoClubStore::connect(config).await?))
        }
        #[cfg(feature = "couch-store")]
        StorageBackend::Couch => {
            use club_stats_back::dao::club_store::couchdb::{CouchClubStore, CouchConfig};
            let config = CouchConfig::from_env()?;
            Ok(Arc::new(CouchClubStore::connect(config).await?))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryClubStore::new())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let backend = StorageBackend::from_env()?;
    info!(?backend, "selected storage backend");

    let app_state = AppState::new(config);

    tokio::spawn(storage_supervisor::run(app_state.clone(), move || {
        connect(backend)
    }));
    tokio::spawn(recorder_service::run_sweeper(app_state.clone()));

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

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

/// Wait for Ctrl+C or SIGTERM. Open recorder sessions are dropped with the process.
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
            Err(err) => {
                tracing::warn!(error = %err, "cannot install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
