use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod db;
mod engine;
mod error;
mod handlers;
mod models;
mod services;

use config::Config;
use services::reminders::ReminderService;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub events_tx: broadcast::Sender<String>,
    pub reminders: Arc<ReminderService>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "consistly_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    // Database
    let db = db::create_pool(&config.database_url).await;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    // Change/reminder event channel backing the WebSocket stream
    let (events_tx, _) = broadcast::channel::<String>(config.event_channel_capacity);

    let reminders = ReminderService::new(events_tx.clone());

    // Re-register every active streak's reminders from persisted records.
    // Nothing about the schedule survives a restart except what this
    // derives.
    match reminders.reschedule_all(&db).await {
        Ok(count) => tracing::info!(count, "Boot reminder schedule registered"),
        Err(e) => tracing::error!(error = %e, "Boot reminder scheduling failed"),
    }

    let state = AppState {
        db,
        config: config.clone(),
        events_tx,
        reminders,
    };

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/ws", get(handlers::ws::ws_handler))
        // Streaks
        .route("/api/streaks", get(handlers::streaks::list_streaks))
        .route("/api/streaks", post(handlers::streaks::create_streak))
        .route("/api/streaks/attention", get(handlers::streaks::needs_attention))
        .route("/api/streaks/categories", get(handlers::streaks::list_categories))
        .route("/api/streaks/:id", get(handlers::streaks::get_streak))
        .route("/api/streaks/:id", put(handlers::streaks::update_streak))
        .route("/api/streaks/:id", delete(handlers::streaks::delete_streak))
        // Logging & streak math
        .route("/api/streaks/:id/log", post(handlers::logs::log_day))
        .route("/api/streaks/:id/break", post(handlers::logs::break_streak))
        .route(
            "/api/streaks/:id/statistics",
            get(handlers::streaks::get_statistics),
        )
        .route("/api/streaks/:id/heatmap", get(handlers::streaks::get_heatmap))
        // Reminders
        .route(
            "/api/streaks/:id/reminders",
            get(handlers::reminders::upcoming_reminders),
        )
        .route(
            "/api/reminders/reschedule",
            post(handlers::reminders::reschedule_all),
        )
        .layer(build_cors(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn build_cors(config: &Config) -> CorsLayer {
    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}
