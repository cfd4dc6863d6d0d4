pub mod appresult;
pub mod auth;
pub mod channels;
pub mod config;
pub mod db;
pub mod identity;
pub mod ids;
pub mod index;
pub mod mail;
pub mod maintenance;
pub mod members;
pub mod profiles;
pub mod res;
pub mod rooms;

pub use appresult::{AppError, AppResult};

use axum::{extract::FromRef, routing::get, Router};
use sqlx::{migrate::Migrator, sqlite::{SqliteConnectOptions, SqlitePoolOptions}, SqlitePool};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use auth::JwtService;
use mail::Mailer;

pub static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub jwt: JwtService,
    pub mailer: Mailer,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index::index))
        .merge(auth::router())
        .merge(profiles::router())
        .nest("/rooms", rooms::router())
        .nest("/channels", channels::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Opens the pool, creating the database file if needed, and brings the
/// schema up to date.
pub async fn connect(url: &str, max_connections: u32) -> AppResult<SqlitePool> {
    let options: SqliteConnectOptions = url.parse()?;
    let db_pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options.create_if_missing(true).foreign_keys(true))
        .await?;

    MIGRATOR.run(&db_pool).await?;
    Ok(db_pool)
}

/// `RUST_LOG` if set, `info` otherwise.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
