use crate::error::{AppError, AppResult};
use crate::models::NotificationType;
use crate::services::notification::{FanOut, NotificationService};
use crate::store::SharedStore;
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FanOutRequest {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[validate(length(min = 1, max = 1000))]
    pub message: String,
    #[validate(length(max = 50))]
    pub entity_type: Option<String>,
    #[validate(length(max = 64))]
    pub entity_id: Option<String>,
    pub target_user_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct EntityCleanupQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityCleanupResponse {
    pub success: bool,
    pub deleted_count: u64,
}

#[utoipa::path(
    post,
    path = "/internal/notifications/fan-out",
    request_body = FanOutRequest,
    responses(
        (status = 204, description = "Accepted; delivery is best-effort"),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Missing or wrong internal token", body = AppError),
    ),
    tag = "internal"
)]
pub async fn fan_out(
    Extension(store): Extension<SharedStore>,
    Json(payload): Json<FanOutRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let recipients = payload.target_user_ids.len();
    let service = NotificationService::new(store);
    match service
        .fan_out(FanOut {
            kind: payload.kind,
            message: payload.message,
            entity_type: payload.entity_type,
            entity_id: payload.entity_id,
            target_user_ids: payload.target_user_ids,
        })
        .await
    {
        Ok(created) => tracing::debug!(recipients, created, "fan-out delivered"),
        Err(e) => tracing::error!(recipients, "fan-out failed: {}", e),
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/internal/notifications/by-entity/{entity_type}/{entity_id}",
    params(
        ("entity_type" = String, Path, description = "Referenced entity kind, e.g. task"),
        ("entity_id" = String, Path, description = "Referenced entity id"),
        ("type" = Option<String>, Query, description = "Restrict to one notification type"),
    ),
    responses(
        (status = 200, description = "Notifications removed", body = EntityCleanupResponse),
        (status = 401, description = "Missing or wrong internal token", body = AppError),
    ),
    tag = "internal"
)]
pub async fn delete_by_entity(
    Extension(store): Extension<SharedStore>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Query(query): Query<EntityCleanupQuery>,
) -> AppResult<impl IntoResponse> {
    let kind = query.kind.as_deref().and_then(NotificationType::parse);

    let service = NotificationService::new(store);
    let deleted_count = service
        .delete_by_entity(&entity_type, &entity_id, kind)
        .await?;

    Ok(Json(EntityCleanupResponse {
        success: true,
        deleted_count,
    }))
}
