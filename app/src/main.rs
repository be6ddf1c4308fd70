use axum::{Router, middleware};
use clap::Parser;
use common::{AppState, Config, auth::auth_middleware};
use database::Database;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod handlers;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; the environment and CLI flags still apply.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    let db = Database::new(&config.database_url).await?;
    db.run_migrations().await?;

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });

    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(config.secure_cookies);

    let app = router(state).layer(session_layer).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    if !config.secure_cookies {
        tracing::warn!("Session cookies are sent without the Secure flag; enable SECURE_COOKIES behind HTTPS.");
    }
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let protected_routes = Router::<Arc<AppState>>::new()
        .nest("/accounts", accounts::handler::accounts_router(state.clone()))
        .nest("/categories", categories::handler::categories_router(state.clone()))
        .nest("/budgets", categories::handler::budgets_router(state.clone()))
        .nest("/transactions", transactions::handler::transactions_router(state.clone()))
        .nest("/reports", transactions::handler::reports_router(state.clone()))
        .layer(middleware::from_fn(auth_middleware));

    Router::<Arc<AppState>>::new()
        .nest("/auth", handlers::auth::auth_router(state.clone()))
        .merge(protected_routes)
        .with_state(state)
}
