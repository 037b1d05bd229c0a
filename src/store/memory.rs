use super::{ListFilter, NewNotification, NotificationStore};
use crate::{
    error::AppResult,
    models::{NotificationModel, NotificationType},
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-process store. Each row sits behind its own dashmap shard lock, which
/// gives the same per-row atomicity the database store relies on.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<DashMap<Uuid, NotificationModel>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts a fully formed row, keeping its id and timestamp.
    pub fn insert_raw(&self, model: NotificationModel) {
        self.rows.insert(model.id, model);
    }

    fn owned_by(&self, user_id: Uuid) -> Vec<NotificationModel> {
        self.rows
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create(&self, record: NewNotification) -> AppResult<NotificationModel> {
        let model = record.into_model(chrono::Utc::now().naive_utc());
        self.rows.insert(model.id, model.clone());
        Ok(model)
    }

    async fn create_many(&self, records: Vec<NewNotification>) -> AppResult<u64> {
        let now = chrono::Utc::now().naive_utc();
        let mut inserted = 0;
        for record in records {
            let model = record.into_model(now);
            self.rows.insert(model.id, model);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<NotificationModel>> {
        Ok(self.rows.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(
        &self,
        user_id: Uuid,
        filter: ListFilter,
        page: u64,
        limit: u64,
    ) -> AppResult<(Vec<NotificationModel>, u64)> {
        let mut matching: Vec<NotificationModel> = self
            .owned_by(user_id)
            .into_iter()
            .filter(|n| filter.is_read.map_or(true, |r| n.is_read == r))
            .filter(|n| filter.kind.map_or(true, |k| n.kind == k))
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let skip = page.saturating_sub(1).saturating_mul(limit) as usize;
        let items = matching
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn count(&self, user_id: Uuid) -> AppResult<u64> {
        Ok(self.rows.iter().filter(|e| e.user_id == user_id).count() as u64)
    }

    async fn count_unread(&self, user_id: Uuid) -> AppResult<u64> {
        Ok(self
            .rows
            .iter()
            .filter(|e| e.user_id == user_id && !e.is_read)
            .count() as u64)
    }

    async fn count_unread_by_type(
        &self,
        user_id: Uuid,
    ) -> AppResult<BTreeMap<NotificationType, u64>> {
        let mut counts = BTreeMap::new();
        for entry in self.rows.iter() {
            if entry.user_id == user_id && !entry.is_read {
                *counts.entry(entry.kind).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn update_read_state(
        &self,
        id: Uuid,
        user_id: Uuid,
        is_read: bool,
    ) -> AppResult<Option<NotificationModel>> {
        match self.rows.get_mut(&id) {
            Some(mut entry) if entry.user_id == user_id => {
                entry.is_read = is_read;
                Ok(Some(entry.value().clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_many_read_state(
        &self,
        user_id: Uuid,
        kind: Option<NotificationType>,
        is_read: bool,
    ) -> AppResult<u64> {
        let mut changed = 0;
        for mut entry in self.rows.iter_mut() {
            if entry.user_id != user_id || entry.is_read == is_read {
                continue;
            }
            if kind.is_some_and(|k| entry.kind != k) {
                continue;
            }
            entry.is_read = is_read;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        Ok(self
            .rows
            .remove_if(&id, |_, row| row.user_id == user_id)
            .is_some())
    }

    async fn delete_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        kind: Option<NotificationType>,
    ) -> AppResult<u64> {
        let mut removed = 0;
        self.rows.retain(|_, row| {
            let matches = row.entity_type.as_deref() == Some(entity_type)
                && row.entity_id.as_deref() == Some(entity_id)
                && kind.map_or(true, |k| row.kind == k);
            if matches {
                removed += 1;
            }
            !matches
        });
        Ok(removed)
    }
}
