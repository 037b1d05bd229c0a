use crate::{
    error::{AppError, AppResult},
    models::{NotificationModel, NotificationType},
    response::Pagination,
    store::{ListFilter, NewNotification, SharedStore},
};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 50;
/// Highest page whose row offset still fits the database's signed 64-bit range.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

/// Normalized list parameters. Malformed values fall back to defaults and
/// unknown types are dropped; filters never reject a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub page: u64,
    pub limit: u64,
    pub filter: ListFilter,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            filter: ListFilter::default(),
        }
    }
}

impl ListParams {
    pub fn resolve(
        page: Option<&str>,
        limit: Option<&str>,
        unread: Option<&str>,
        kind: Option<&str>,
    ) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<u64>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_PAGE);
        let limit = limit
            .and_then(|l| l.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let unread_only = unread.is_some_and(|u| u.trim() == "true");
        let kind = kind.and_then(NotificationType::parse);

        Self {
            page,
            limit,
            filter: ListFilter {
                is_read: unread_only.then_some(false),
                kind,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationPage {
    pub items: Vec<NotificationModel>,
    pub pagination: Pagination,
    pub unread_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationStats {
    pub total: u64,
    pub unread: u64,
    pub unread_by_type: BTreeMap<NotificationType, u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkAllOutcome {
    pub updated_count: u64,
    pub unread_count: u64,
}

/// One message delivered to a list of recipients.
#[derive(Debug, Clone)]
pub struct FanOut {
    pub kind: NotificationType,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub target_user_ids: Vec<Uuid>,
}

pub struct NotificationService {
    store: SharedStore,
}

impl NotificationService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: Uuid, params: ListParams) -> AppResult<NotificationPage> {
        let (items, total) = self
            .store
            .list(user_id, params.filter, params.page, params.limit)
            .await?;
        // Always the global figure, independent of the page filter.
        let unread_count = self.store.count_unread(user_id).await?;

        Ok(NotificationPage {
            items,
            pagination: Pagination::new(params.page, params.limit, total),
            unread_count,
        })
    }

    pub async fn stats(&self, user_id: Uuid) -> AppResult<NotificationStats> {
        let total = self.store.count(user_id).await?;
        let unread = self.store.count_unread(user_id).await?;
        let unread_by_type = self.store.count_unread_by_type(user_id).await?;

        Ok(NotificationStats {
            total,
            unread,
            unread_by_type,
        })
    }

    /// Idempotent: an already-read notification is returned unchanged.
    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> AppResult<NotificationModel> {
        self.store
            .update_read_state(id, user_id, true)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn mark_all_read(
        &self,
        user_id: Uuid,
        kind: Option<NotificationType>,
    ) -> AppResult<MarkAllOutcome> {
        let updated_count = self
            .store
            .update_many_read_state(user_id, kind, true)
            .await?;
        let unread_count = self.store.count_unread(user_id).await?;

        tracing::debug!(
            %user_id,
            kind = kind.map(|k| k.as_str()),
            updated_count,
            unread_count,
            "marked notifications as read"
        );

        Ok(MarkAllOutcome {
            updated_count,
            unread_count,
        })
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> AppResult<()> {
        if self.store.delete(id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    /// Cleanup after the referenced entity is destroyed. Not user-invocable.
    pub async fn delete_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        kind: Option<NotificationType>,
    ) -> AppResult<u64> {
        let deleted = self
            .store
            .delete_by_entity(entity_type, entity_id, kind)
            .await?;
        tracing::debug!(entity_type, entity_id, deleted, "removed notifications for entity");
        Ok(deleted)
    }

    /// Creates one row per distinct recipient.
    pub async fn fan_out(&self, fan_out: FanOut) -> AppResult<u64> {
        let targets: BTreeSet<Uuid> = fan_out.target_user_ids.into_iter().collect();
        if targets.is_empty() {
            return Ok(0);
        }

        let records = targets
            .into_iter()
            .map(|user_id| NewNotification {
                kind: fan_out.kind,
                message: fan_out.message.clone(),
                entity_type: fan_out.entity_type.clone(),
                entity_id: fan_out.entity_id.clone(),
                user_id,
            })
            .collect();

        self.store.create_many(records).await
    }
}
