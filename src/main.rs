use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use taskboard_notify::{
    config::{
        internal::InternalApiConfig, jwt::JwtConfig, rate_limit::RateLimitConfig,
    },
    migration, routes,
    store::{DatabaseStore, MemoryStore, SharedStore},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Notification routes
        taskboard_notify::handlers::notification::list_notifications,
        taskboard_notify::handlers::notification::notification_stats,
        taskboard_notify::handlers::notification::mark_read,
        taskboard_notify::handlers::notification::mark_all_read,
        taskboard_notify::handlers::notification::delete_notification,
        // Internal routes
        taskboard_notify::handlers::internal::fan_out,
        taskboard_notify::handlers::internal::delete_by_entity,
    ),
    components(
        schemas(
            taskboard_notify::response::Pagination,
            taskboard_notify::response::SuccessResponse,
            taskboard_notify::error::AppError,
            taskboard_notify::models::NotificationType,
            // Notification
            taskboard_notify::handlers::notification::NotificationResponse,
            taskboard_notify::handlers::notification::NotificationListResponse,
            taskboard_notify::handlers::notification::NotificationStatsResponse,
            taskboard_notify::handlers::notification::MarkReadRequest,
            taskboard_notify::handlers::notification::MarkAllReadRequest,
            taskboard_notify::handlers::notification::MarkAllReadResponse,
            // Internal
            taskboard_notify::handlers::internal::FanOutRequest,
            taskboard_notify::handlers::internal::EntityCleanupResponse,
        )
    ),
    tags(
        (name = "notifications", description = "Per-user notification operations"),
        (name = "internal", description = "Collaborator-only fan-out and cleanup"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard_notify=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Fail fast on configuration before touching the database
    let jwt_config = JwtConfig::from_env()?;
    let internal_config = InternalApiConfig::from_env();
    let rate_limit_config = RateLimitConfig::from_env();

    tracing::info!("Starting Notification API v{}...", env!("CARGO_PKG_VERSION"));

    let store = open_store().await?;

    let app = create_app(&rate_limit_config, &internal_config)
        .layer(Extension(store))
        .layer(Extension(jwt_config));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// `STORE_BACKEND=memory` runs without Postgres; anything else uses `DATABASE_URL`.
async fn open_store() -> anyhow::Result<SharedStore> {
    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "database".to_string());
    if backend.eq_ignore_ascii_case("memory") {
        tracing::warn!("Using in-memory store, notifications are lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let db = taskboard_notify::config::database::get_database().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    Ok(Arc::new(DatabaseStore::new(db)))
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderName, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(taskboard_notify::middleware::internal::INTERNAL_TOKEN_HEADER),
        ]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app(rate_limit: &RateLimitConfig, internal: &InternalApiConfig) -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes(rate_limit, internal))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(store): Extension<SharedStore>) -> impl IntoResponse {
    let store_ok = store.ping().await.is_ok();
    let status = if store_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "Notification API",
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
