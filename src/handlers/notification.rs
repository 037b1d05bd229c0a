use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{NotificationModel, NotificationType};
use crate::response::{Pagination, SuccessResponse};
use crate::services::notification::{ListParams, NotificationService};
use crate::store::SharedStore;
use axum::{
    body::Bytes,
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    pub is_read: bool,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub created_at: String,
}

impl From<NotificationModel> for NotificationResponse {
    fn from(n: NotificationModel) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            message: n.message,
            is_read: n.is_read,
            entity_type: n.entity_type,
            entity_id: n.entity_id,
            created_at: n.created_at.and_utc().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationResponse>,
    pub pagination: Pagination,
    pub unread_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStatsResponse {
    pub total: u64,
    pub unread: u64,
    pub unread_by_type: BTreeMap<NotificationType, u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub success: bool,
    pub updated_count: u64,
    pub unread_count: u64,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub is_read: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MarkAllReadRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Raw query; values are normalized by [`ListParams::resolve`].
#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub unread: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// An empty body is allowed and means "all defaults".
fn parse_optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> AppResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))
}

/// Malformed ids cannot exist, so they get the same answer as missing ones.
fn parse_notification_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number, starting at 1"),
        ("limit" = Option<u64>, Query, description = "Items per page (default 20, max 50)"),
        ("unread" = Option<String>, Query, description = "\"true\" to list unread only"),
        ("type" = Option<String>, Query, description = "Notification type; unknown values are ignored"),
    ),
    responses(
        (status = 200, description = "Page of notifications", body = NotificationListResponse),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    Extension(store): Extension<SharedStore>,
    auth_user: AuthUser,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<impl IntoResponse> {
    let params = ListParams::resolve(
        query.page.as_deref(),
        query.limit.as_deref(),
        query.unread.as_deref(),
        query.kind.as_deref(),
    );

    let service = NotificationService::new(store);
    let page = service.list(auth_user.user_id, params).await?;

    Ok(Json(NotificationListResponse {
        notifications: page
            .items
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
        pagination: page.pagination,
        unread_count: page.unread_count,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Notification statistics", body = NotificationStatsResponse),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn notification_stats(
    Extension(store): Extension<SharedStore>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let service = NotificationService::new(store);
    let stats = service.stats(auth_user.user_id).await?;

    Ok(Json(NotificationStatsResponse {
        total: stats.total,
        unread: stats.unread,
        unread_by_type: stats.unread_by_type,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}",
    security(("jwt_token" = [])),
    params(("id" = String, Path, description = "Notification ID")),
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Updated notification", body = NotificationResponse),
        (status = 400, description = "Attempt to mark as unread", body = crate::error::AppError),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
        (status = 404, description = "Notification not found", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn mark_read(
    Extension(store): Extension<SharedStore>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let id = parse_notification_id(&id)?;
    let payload: MarkReadRequest = parse_optional_body(&body)?;
    if payload.is_read == Some(false) {
        return Err(AppError::Validation(
            "Notifications cannot be marked as unread".to_string(),
        ));
    }

    let service = NotificationService::new(store);
    let updated = service.mark_read(id, auth_user.user_id).await?;
    Ok(Json(NotificationResponse::from(updated)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notifications/read-all",
    security(("jwt_token" = [])),
    request_body = MarkAllReadRequest,
    responses(
        (status = 200, description = "Notifications marked as read", body = MarkAllReadResponse),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn mark_all_read(
    Extension(store): Extension<SharedStore>,
    auth_user: AuthUser,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let payload: MarkAllReadRequest = parse_optional_body(&body)?;
    let kind = payload.kind.as_deref().and_then(|raw| {
        let parsed = NotificationType::parse(raw);
        if parsed.is_none() {
            tracing::debug!("ignoring unknown notification type filter '{}'", raw);
        }
        parsed
    });

    let service = NotificationService::new(store);
    let outcome = service.mark_all_read(auth_user.user_id, kind).await?;

    Ok(Json(MarkAllReadResponse {
        success: true,
        updated_count: outcome.updated_count,
        unread_count: outcome.unread_count,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notifications/{id}",
    security(("jwt_token" = [])),
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification deleted", body = SuccessResponse),
        (status = 401, description = "Unauthorized", body = crate::error::AppError),
        (status = 404, description = "Notification not found", body = crate::error::AppError),
    ),
    tag = "notifications"
)]
pub async fn delete_notification(
    Extension(store): Extension<SharedStore>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_notification_id(&id)?;
    let service = NotificationService::new(store);
    service.delete(id, auth_user.user_id).await?;
    Ok(SuccessResponse::ok())
}
