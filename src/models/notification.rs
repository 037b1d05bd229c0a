use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of notification categories. Stored and serialized in snake_case.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[sea_orm(string_value = "mention")]
    Mention,
    #[sea_orm(string_value = "comment")]
    Comment,
    #[sea_orm(string_value = "assignment")]
    Assignment,
    #[sea_orm(string_value = "project_update")]
    ProjectUpdate,
    #[sea_orm(string_value = "task_update")]
    TaskUpdate,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Mention => "mention",
            NotificationType::Comment => "comment",
            NotificationType::Assignment => "assignment",
            NotificationType::ProjectUpdate => "project_update",
            NotificationType::TaskUpdate => "task_update",
        }
    }

    /// Lenient parse used for optional filters: unknown values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::iter().find(|t| t.as_str() == raw.trim())
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(column_name = "type")]
    pub kind: NotificationType,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub is_read: bool,
    #[sea_orm(column_type = "String(StringLen::N(50))", nullable)]
    pub entity_type: Option<String>,
    #[sea_orm(column_type = "String(StringLen::N(64))", nullable)]
    pub entity_id: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_every_known_type() {
        for kind in NotificationType::iter() {
            assert_eq!(NotificationType::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn parse_ignores_unknown_values() {
        assert_eq!(NotificationType::parse("reaction"), None);
        assert_eq!(NotificationType::parse(""), None);
        assert_eq!(NotificationType::parse("Comment"), None);
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&NotificationType::ProjectUpdate).unwrap();
        assert_eq!(json, "\"project_update\"");
    }
}
