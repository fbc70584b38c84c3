#![forbid(unsafe_code)]

use async_trait::async_trait;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::Key;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

mod config;
mod error;
mod http;
mod middleware;
mod store;

pub const CRATE_NAME: &str = "contacts-server";

pub use config::{validate_startup_config, ServerConfig};
pub use error::AppError;
pub use store::backends::{PostgresStore, SqliteStore};
pub use store::fake::FakeStore;

/// A stored contact, exactly as the database returns it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

/// Validated input for create and update. All fields are trimmed and
/// non-empty by the time a store sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInput {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store is closed")]
    Closed,
    #[error("{0}")]
    Backend(String),
}

/// Persistence contract for contacts. Two production backends implement it;
/// handlers hold an `Arc<dyn ContactStore>` and never branch on which one is
/// active.
#[async_trait]
pub trait ContactStore: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str;

    /// Idempotently ensures the `contacts` table exists. Failure is fatal at
    /// startup; callers must not continue without a schema.
    async fn init(&self) -> Result<(), StoreError>;

    /// Inserts a row and returns the stored record, including the generated
    /// `id` and `created_at`.
    async fn create(&self, input: &ContactInput) -> Result<Contact, StoreError>;

    /// All rows ordered by `created_at` descending. An empty store yields an
    /// empty vec, not an error.
    async fn list_all(&self) -> Result<Vec<Contact>, StoreError>;

    /// Rewrites all three mutable fields where `id` matches and returns the
    /// changed-row count. Zero means not-found.
    async fn update(&self, id: i64, input: &ContactInput) -> Result<u64, StoreError>;

    /// Removes the row. Same changed-count convention as `update`.
    async fn delete(&self, id: i64) -> Result<u64, StoreError>;

    /// Releases the underlying pool or connection handle. Best-effort:
    /// failures are logged, never returned.
    async fn close(&self);
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContactStore>,
    pub config: Arc<ServerConfig>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn ContactStore>, config: Arc<ServerConfig>) -> Self {
        Self {
            store,
            config,
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(Duration::hours(24)))
        .with_signed(Key::from(state.config.session_secret.as_bytes()));

    let protected_api = Router::new()
        .route("/api/contacts", get(http::handlers::list_contacts_handler))
        .route(
            "/api/contacts/:id",
            put(http::handlers::update_contact_handler)
                .delete(http::handlers::delete_contact_handler),
        )
        .layer(axum::middleware::from_fn(
            middleware::auth::require_admin_api,
        ));

    let protected_pages = Router::new()
        .route("/admin", get(http::handlers::admin_page_handler))
        .layer(axum::middleware::from_fn(
            middleware::auth::require_admin_page,
        ));

    Router::new()
        .route("/", get(http::handlers::index_page_handler))
        .route("/login", get(http::handlers::login_page_handler))
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/api/admin/login", post(http::handlers::login_handler))
        .route("/api/admin/logout", post(http::handlers::logout_handler))
        .route("/api/contacts", post(http::handlers::create_contact_handler))
        .merge(protected_api)
        .merge(protected_pages)
        .fallback_service(ServeDir::new(&state.config.assets_dir))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::request_tracing::request_tracing_middleware,
        ))
        .layer(session_layer)
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}
