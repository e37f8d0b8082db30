/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use bookshelf_api::{app::{build_router, AppState}, config::Config};
/// use bookshelf_shared::store::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use bookshelf_shared::store::Store;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor; both fields are
/// `Arc`s so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health
/// └── /api/
///     ├── /auth/
///     │   ├── POST /signup
///     │   ├── POST /login
///     │   └── GET  /me                    (auth)
///     ├── /books/
///     │   ├── GET  /                      ?page&limit&search&genre&sortBy
///     │   ├── POST /                      (auth)
///     │   ├── GET  /genres
///     │   ├── GET  /user/my-books         (auth)
///     │   ├── GET  /:id
///     │   ├── PUT  /:id                   (auth, owner)
///     │   └── DELETE /:id                 (auth, owner)
///     └── /reviews/
///         ├── POST /                      (auth)
///         ├── GET  /book/:book_id         ?page&limit
///         ├── GET  /user/my-reviews       (auth)
///         ├── GET  /check/:book_id        (auth)
///         ├── GET  /:id
///         ├── PUT  /:id                   (auth, owner)
///         └── DELETE /:id                 (auth, owner)
/// ```
///
/// Authentication is enforced per handler by the `AuthContext` extractor.
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, compression, request tracing.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_routes = Router::new()
        .route("/signup", axum::routing::post(routes::auth::signup))
        .route("/login", axum::routing::post(routes::auth::login))
        .route("/me", get(routes::auth::me));

    let book_routes = Router::new()
        .route(
            "/",
            get(routes::books::list_books).post(routes::books::create_book),
        )
        .route("/genres", get(routes::books::list_genres))
        .route("/user/my-books", get(routes::books::my_books))
        .route(
            "/:id",
            get(routes::books::get_book)
                .put(routes::books::update_book)
                .delete(routes::books::delete_book),
        );

    let review_routes = Router::new()
        .route("/", axum::routing::post(routes::reviews::create_review))
        .route("/book/:book_id", get(routes::reviews::book_reviews))
        .route("/user/my-reviews", get(routes::reviews::my_reviews))
        .route("/check/:book_id", get(routes::reviews::check_review))
        .route(
            "/:id",
            get(routes::reviews::get_review)
                .put(routes::reviews::update_review)
                .delete(routes::reviews::delete_review),
        );

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/books", book_routes)
        .nest("/reviews", review_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .fallback(routes::not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS policy from `CORS_ORIGINS`
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
