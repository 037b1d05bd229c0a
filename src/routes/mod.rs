use crate::config::internal::InternalApiConfig;
use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::{auth::auth_middleware, internal::internal_token_middleware};
use axum::{middleware, routing, Extension, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

/// All notification routes. The caller layers `SharedStore` and `JwtConfig`
/// as extensions on the result.
pub fn create_routes(rate_limit: &RateLimitConfig, internal: &InternalApiConfig) -> Router {
    let mut router = Router::new().nest("/api/v1", user_routes(rate_limit));

    if internal.enabled() {
        router = router.nest("/internal", internal_routes(rate_limit, internal));
    } else {
        tracing::warn!("INTERNAL_API_TOKEN not set, internal routes are disabled");
    }

    router
}

/// Authenticated routes for the notification owner.
fn user_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/notifications",
            routing::get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/stats",
            routing::get(handlers::notification::notification_stats),
        )
        .route(
            "/notifications/read-all",
            routing::patch(handlers::notification::mark_all_read),
        )
        .route(
            "/notifications/{id}",
            routing::patch(handlers::notification::mark_read)
                .delete(handlers::notification::delete_notification),
        )
        .layer(middleware::from_fn(auth_middleware));

    with_optional_rate_limit(router, config.enabled, config.user)
}

/// Collaborator routes: fan-out and entity cleanup.
fn internal_routes(config: &RateLimitConfig, internal: &InternalApiConfig) -> Router {
    let router = Router::new()
        .route(
            "/notifications/fan-out",
            routing::post(handlers::internal::fan_out),
        )
        .route(
            "/notifications/by-entity/{entity_type}/{entity_id}",
            routing::delete(handlers::internal::delete_by_entity),
        )
        .layer(middleware::from_fn(internal_token_middleware))
        .layer(Extension(internal.clone()));

    with_optional_rate_limit(router, config.enabled, config.internal)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
        .expect("Invalid rate limit configuration");

    router.layer(GovernorLayer::new(governor_conf))
}
