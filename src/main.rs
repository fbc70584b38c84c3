#![forbid(unsafe_code)]

use contacts_server::{
    build_router, AppState, ContactStore, PostgresStore, ServerConfig, SqliteStore,
};
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("CONTACTS_LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let config = ServerConfig::load_from_env()?;

    let store: Arc<dyn ContactStore> = if let Some(url) = config.database_url.as_deref() {
        let store = PostgresStore::connect(url)
            .await
            .map_err(|e| format!("postgres connect failed: {e}"))?;
        Arc::new(store)
    } else {
        let store = SqliteStore::open(config.sqlite_path())
            .await
            .map_err(|e| format!("sqlite open failed: {e}"))?;
        Arc::new(store)
    };
    info!(backend = store.backend_tag(), "contact store selected");

    // Schema init is fatal: never serve without the contacts table.
    store
        .init()
        .await
        .map_err(|e| format!("schema init failed: {e}"))?;
    info!("contacts table ready");

    let bind_addr = config.bind_addr.clone();
    let production = config.production;
    let state = AppState::new(Arc::clone(&store), Arc::new(config));
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind failed on {bind_addr}: {e}"))?;
    info!("contacts-server listening on {bind_addr}");
    if production {
        info!("running in production mode");
    } else {
        info!("running in development mode");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|e| format!("server failed: {e}"))?;

    info!("shutting down");
    store.close().await;
    Ok(())
}
