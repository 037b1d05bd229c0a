use super::{ListFilter, NewNotification, NotificationStore};
use crate::{
    error::AppResult,
    models::{notification, Notification, NotificationModel, NotificationType},
};
use async_trait::async_trait;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement,
};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Postgres-backed store. Every user-scoped statement carries the owner in its
/// `WHERE` clause so ownership is enforced by the query itself.
#[derive(Clone)]
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_active(model: NotificationModel) -> notification::ActiveModel {
    notification::ActiveModel {
        id: sea_orm::ActiveValue::Set(model.id),
        user_id: sea_orm::ActiveValue::Set(model.user_id),
        kind: sea_orm::ActiveValue::Set(model.kind),
        message: sea_orm::ActiveValue::Set(model.message),
        is_read: sea_orm::ActiveValue::Set(model.is_read),
        entity_type: sea_orm::ActiveValue::Set(model.entity_type),
        entity_id: sea_orm::ActiveValue::Set(model.entity_id),
        created_at: sea_orm::ActiveValue::Set(model.created_at),
    }
}

#[async_trait]
impl NotificationStore for DatabaseStore {
    async fn create(&self, record: NewNotification) -> AppResult<NotificationModel> {
        let now = chrono::Utc::now().naive_utc();
        let saved = to_active(record.into_model(now)).insert(&self.db).await?;
        Ok(saved)
    }

    async fn create_many(&self, records: Vec<NewNotification>) -> AppResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().naive_utc();
        let rows = records
            .into_iter()
            .map(|r| to_active(r.into_model(now)))
            .collect::<Vec<_>>();

        let inserted = Notification::insert_many(rows)
            .exec_without_returning(&self.db)
            .await?;
        Ok(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<NotificationModel>> {
        Ok(Notification::find_by_id(id).one(&self.db).await?)
    }

    async fn list(
        &self,
        user_id: Uuid,
        filter: ListFilter,
        page: u64,
        limit: u64,
    ) -> AppResult<(Vec<NotificationModel>, u64)> {
        let mut query = Notification::find().filter(notification::Column::UserId.eq(user_id));
        if let Some(is_read) = filter.is_read {
            query = query.filter(notification::Column::IsRead.eq(is_read));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(notification::Column::Kind.eq(kind));
        }

        let paginator = query
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .paginate(&self.db, limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    async fn count(&self, user_id: Uuid) -> AppResult<u64> {
        let count = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn count_unread(&self, user_id: Uuid) -> AppResult<u64> {
        let count = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn count_unread_by_type(
        &self,
        user_id: Uuid,
    ) -> AppResult<BTreeMap<NotificationType, u64>> {
        let rows: Vec<(NotificationType, i64)> = Notification::find()
            .select_only()
            .column(notification::Column::Kind)
            .column_as(notification::Column::Id.count(), "unread")
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .group_by(notification::Column::Kind)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(kind, count)| (kind, count as u64))
            .collect())
    }

    async fn update_read_state(
        &self,
        id: Uuid,
        user_id: Uuid,
        is_read: bool,
    ) -> AppResult<Option<NotificationModel>> {
        let Some(existing) = Notification::find_by_id(id)
            .filter(notification::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        if existing.is_read == is_read {
            return Ok(Some(existing));
        }

        let mut active: notification::ActiveModel = existing.into();
        active.is_read = sea_orm::ActiveValue::Set(is_read);
        let updated = active.update(&self.db).await?;
        Ok(Some(updated))
    }

    async fn update_many_read_state(
        &self,
        user_id: Uuid,
        kind: Option<NotificationType>,
        is_read: bool,
    ) -> AppResult<u64> {
        let mut update = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(is_read))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(!is_read));
        if let Some(kind) = kind {
            update = update.filter(notification::Column::Kind.eq(kind));
        }

        let result = update.exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = Notification::delete_many()
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        kind: Option<NotificationType>,
    ) -> AppResult<u64> {
        let mut delete = Notification::delete_many()
            .filter(notification::Column::EntityType.eq(entity_type))
            .filter(notification::Column::EntityId.eq(entity_id));
        if let Some(kind) = kind {
            delete = delete.filter(notification::Column::Kind.eq(kind));
        }

        let result = delete.exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    async fn ping(&self) -> AppResult<()> {
        self.db
            .query_one(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}
