//! Durable notification records, scoped to a single recipient.
//!
//! The store is passed around as [`SharedStore`] so the HTTP layer, the
//! trigger rules and tests can all run against either backend.

pub mod database;
pub mod memory;

use crate::{
    error::AppResult,
    models::{NotificationModel, NotificationType},
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub use database::DatabaseStore;
pub use memory::MemoryStore;

pub type SharedStore = Arc<dyn NotificationStore>;

/// A row to be inserted. Ids, `is_read` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub kind: NotificationType,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub user_id: Uuid,
}

impl NewNotification {
    pub(crate) fn into_model(self, now: chrono::NaiveDateTime) -> NotificationModel {
        NotificationModel {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            kind: self.kind,
            message: self.message,
            is_read: false,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub is_read: Option<bool>,
    pub kind: Option<NotificationType>,
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, record: NewNotification) -> AppResult<NotificationModel>;

    /// Batch insert used by fan-out. Returns the number of rows written.
    async fn create_many(&self, records: Vec<NewNotification>) -> AppResult<u64>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<NotificationModel>>;

    /// One page ordered by `created_at` descending, plus the total for the filter.
    /// `page` is 1-based.
    async fn list(
        &self,
        user_id: Uuid,
        filter: ListFilter,
        page: u64,
        limit: u64,
    ) -> AppResult<(Vec<NotificationModel>, u64)>;

    async fn count(&self, user_id: Uuid) -> AppResult<u64>;

    async fn count_unread(&self, user_id: Uuid) -> AppResult<u64>;

    /// Types with zero unread rows are absent from the map.
    async fn count_unread_by_type(
        &self,
        user_id: Uuid,
    ) -> AppResult<BTreeMap<NotificationType, u64>>;

    /// `None` when the row is missing or owned by another user.
    async fn update_read_state(
        &self,
        id: Uuid,
        user_id: Uuid,
        is_read: bool,
    ) -> AppResult<Option<NotificationModel>>;

    /// Flips every row of `user_id` (optionally of one type) whose state differs
    /// from `is_read`. Returns the number of rows changed.
    async fn update_many_read_state(
        &self,
        user_id: Uuid,
        kind: Option<NotificationType>,
        is_read: bool,
    ) -> AppResult<u64>;

    /// `false` when nothing owned by `user_id` matched.
    async fn delete(&self, id: Uuid, user_id: Uuid) -> AppResult<bool>;

    async fn delete_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        kind: Option<NotificationType>,
    ) -> AppResult<u64>;

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
