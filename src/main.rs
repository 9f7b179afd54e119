//! TagTalk Backend
//!
//! REST backend for the TagTalk posting platform: posts, votes, comments, users
//! and payments over an SQLite document store.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod payments;

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::TokenService;
use config::Config;
use db::Repository;
use payments::{PaymentProcessor, StripeClient};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub tokens: Arc<TokenService>,
    pub payments: Option<Arc<dyn PaymentProcessor>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting TagTalk Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    let token_secret = match &config.token_secret {
        Some(secret) => secret.clone(),
        None => {
            tracing::warn!(
                "No token secret configured (TAGTALK_TOKEN_SECRET). Using a random secret; tokens will not survive a restart!"
            );
            format!("{}{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4())
        }
    };

    let payments: Option<Arc<dyn PaymentProcessor>> = match &config.stripe_secret_key {
        Some(key) => Some(Arc::new(StripeClient::new(&config.stripe_api_base, key))),
        None => {
            tracing::warn!(
                "No payment processor key configured (TAGTALK_STRIPE_SECRET_KEY). Payment intents are disabled!"
            );
            None
        }
    };

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let state = AppState {
        repo: repo.clone(),
        tokens: Arc::new(TokenService::new(token_secret.as_bytes())),
        payments,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("TagTalk server running on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, closing database");
    repo.close().await;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Tokens
        .route("/jwt", post(api::issue_token))
        // Posts
        .route("/post", get(api::list_posts).post(api::create_post))
        // GET reads the segment as a tag, DELETE as an id
        .route(
            "/post/{id}",
            get(api::list_posts_by_tag).delete(api::delete_post),
        )
        .route("/post/{id}/upvote", patch(api::upvote_post))
        .route("/post/{id}/downvote", patch(api::downvote_post))
        .route("/post/user/count/{email}", get(api::count_posts_by_email))
        .route("/postsCount", get(api::count_posts))
        .route("/recentPost/{email}", get(api::recent_posts_by_email))
        .route("/posts/user/{email}", get(api::posts_by_email))
        .route("/popular-post", get(api::popular_posts))
        // Comments
        .route("/comments", get(api::list_comments).post(api::create_comment))
        .route("/comments/count/{post_id}", get(api::count_comments))
        // Users
        .route("/users", get(api::list_users).post(api::create_user))
        .route("/user/{email}", get(api::get_user_by_email))
        .route(
            "/user/admin/{key}",
            get(api::check_admin).patch(api::promote_user),
        )
        // Payments
        .route("/create-payment-intent", post(api::create_payment_intent))
        .route("/payment", post(api::record_payment))
        .route("/payment/{email}", get(api::payment_history));

    // Service routes (no auth required)
    let service_routes = Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check));

    Router::new()
        .merge(api_routes)
        .merge(service_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Root banner.
async fn banner() -> &'static str {
    "TagTalk is Talking"
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
