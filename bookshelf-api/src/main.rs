//! # Bookshelf API Server
//!
//! Book review service: accounts, a shared book catalogue and one review
//! per user per book, with each book's average rating derived from its
//! reviews.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/bookshelf \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p bookshelf-api
//! ```
//!
//! Set `STORE_BACKEND=memory` to run without PostgreSQL.

use bookshelf_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat, StoreBackend},
};
use bookshelf_shared::{
    db::{self, migrations::run_migrations},
    store::{MemoryStore, PgStore, Store},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        "Bookshelf API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let (store, pool): (Arc<dyn Store>, Option<PgPool>) = match config.store {
        StoreBackend::Postgres => {
            let mut db_config = db::pool::DatabaseConfig::from_url(config.database.url.clone());
            db_config.max_connections = config.database.max_connections;

            let pool = db::pool::create_pool(db_config).await?;
            run_migrations(&pool).await?;

            (Arc::new(PgStore::new(pool.clone())), Some(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            (Arc::new(MemoryStore::new()), None)
        }
    };

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        db::pool::close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "bookshelf_api=debug,bookshelf_shared=debug,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received, draining connections...");
}
