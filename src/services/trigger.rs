//! Fan-out rules: which users hear about which domain event, and what they read.
//!
//! Notification is best-effort. Nothing in here returns an error to the code
//! that performed the triggering write; failures end up in the log.

use crate::{
    models::NotificationType,
    services::notification::{FanOut, NotificationService},
    store::SharedStore,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const TASK_ENTITY: &str = "task";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

impl Actor {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: String,
    pub title: String,
    pub assignee_id: Option<Uuid>,
}

/// Read access to the task/user collaborators that own the data we render from.
#[async_trait]
pub trait TaskDirectory: Send + Sync {
    async fn task(&self, task_id: &str) -> anyhow::Result<TaskSnapshot>;

    /// Distinct authors of comments on the task, in any order.
    async fn prior_commenters(&self, task_id: &str) -> anyhow::Result<Vec<Uuid>>;

    async fn actor(&self, user_id: Uuid) -> anyhow::Result<Actor>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    CommentCreated {
        task_id: String,
        actor_id: Uuid,
    },
    TaskCreated {
        task_id: String,
        actor_id: Uuid,
    },
    TaskAssigned {
        task_id: String,
        actor_id: Uuid,
        previous_assignee_id: Option<Uuid>,
        new_assignee_id: Option<Uuid>,
    },
    CommentDeleted {
        task_id: String,
    },
    TaskDeleted {
        task_id: String,
    },
}

impl DomainEvent {
    fn name(&self) -> &'static str {
        match self {
            DomainEvent::CommentCreated { .. } => "comment_created",
            DomainEvent::TaskCreated { .. } => "task_created",
            DomainEvent::TaskAssigned { .. } => "task_assigned",
            DomainEvent::CommentDeleted { .. } => "comment_deleted",
            DomainEvent::TaskDeleted { .. } => "task_deleted",
        }
    }
}

/// Assignee plus every distinct prior commenter, never the actor.
pub fn comment_targets(
    assignee_id: Option<Uuid>,
    prior_commenters: &[Uuid],
    actor_id: Uuid,
) -> BTreeSet<Uuid> {
    assignee_id
        .into_iter()
        .chain(prior_commenters.iter().copied())
        .filter(|id| *id != actor_id)
        .collect()
}

/// The new assignee, unless the assignment did not change or is self-inflicted.
pub fn assignment_target(
    new_assignee_id: Option<Uuid>,
    previous_assignee_id: Option<Uuid>,
    actor_id: Uuid,
) -> Option<Uuid> {
    new_assignee_id.filter(|id| Some(*id) != previous_assignee_id && *id != actor_id)
}

pub fn comment_message(actor: &Actor, task_title: &str) -> String {
    format!(
        "{} commented on task \"{}\"",
        actor.display_name(),
        task_title
    )
}

pub fn assignment_message(actor: &Actor, task_title: &str) -> String {
    format!(
        "You were assigned to task \"{}\" by {}",
        task_title,
        actor.display_name()
    )
}

enum Plan {
    Notify(FanOut),
    Cleanup {
        entity_id: String,
        kind: Option<NotificationType>,
    },
    Nothing,
}

#[derive(Clone)]
pub struct NotificationTrigger {
    store: SharedStore,
    directory: Arc<dyn TaskDirectory>,
}

impl NotificationTrigger {
    pub fn new(store: SharedStore, directory: Arc<dyn TaskDirectory>) -> Self {
        Self { store, directory }
    }

    /// Runs the event to completion and returns how many rows were created or
    /// removed. Any failure is logged and reported as 0.
    pub async fn dispatch(&self, event: DomainEvent) -> u64 {
        let name = event.name();
        let plan = match self.plan(event).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(event = name, "failed to resolve notification targets: {:#}", e);
                return 0;
            }
        };

        let service = NotificationService::new(self.store.clone());
        let result = match plan {
            Plan::Nothing => return 0,
            Plan::Notify(fan_out) => service.fan_out(fan_out).await,
            Plan::Cleanup { entity_id, kind } => {
                service.delete_by_entity(TASK_ENTITY, &entity_id, kind).await
            }
        };

        match result {
            Ok(affected) => {
                tracing::debug!(event = name, affected, "notification event handled");
                affected
            }
            Err(e) => {
                tracing::error!(event = name, "failed to write notifications: {}", e);
                0
            }
        }
    }

    /// Fire-and-forget variant for request handlers.
    pub fn spawn(&self, event: DomainEvent) -> JoinHandle<u64> {
        let trigger = self.clone();
        tokio::spawn(async move { trigger.dispatch(event).await })
    }

    async fn plan(&self, event: DomainEvent) -> anyhow::Result<Plan> {
        match event {
            DomainEvent::CommentCreated { task_id, actor_id } => {
                let task = self.directory.task(&task_id).await?;
                let commenters = self.directory.prior_commenters(&task_id).await?;
                let targets = comment_targets(task.assignee_id, &commenters, actor_id);
                if targets.is_empty() {
                    return Ok(Plan::Nothing);
                }

                let actor = self.directory.actor(actor_id).await?;
                Ok(Plan::Notify(FanOut {
                    kind: NotificationType::Comment,
                    message: comment_message(&actor, &task.title),
                    entity_type: Some(TASK_ENTITY.to_string()),
                    entity_id: Some(task.id),
                    target_user_ids: targets.into_iter().collect(),
                }))
            }
            DomainEvent::TaskCreated { task_id, actor_id } => {
                let task = self.directory.task(&task_id).await?;
                self.assignment_plan(task, None, actor_id).await
            }
            DomainEvent::TaskAssigned {
                task_id,
                actor_id,
                previous_assignee_id,
                new_assignee_id,
            } => {
                let mut task = self.directory.task(&task_id).await?;
                task.assignee_id = new_assignee_id;
                self.assignment_plan(task, previous_assignee_id, actor_id)
                    .await
            }
            DomainEvent::CommentDeleted { task_id } => Ok(Plan::Cleanup {
                entity_id: task_id,
                kind: Some(NotificationType::Comment),
            }),
            DomainEvent::TaskDeleted { task_id } => Ok(Plan::Cleanup {
                entity_id: task_id,
                kind: None,
            }),
        }
    }

    async fn assignment_plan(
        &self,
        task: TaskSnapshot,
        previous_assignee_id: Option<Uuid>,
        actor_id: Uuid,
    ) -> anyhow::Result<Plan> {
        let Some(target) = assignment_target(task.assignee_id, previous_assignee_id, actor_id)
        else {
            return Ok(Plan::Nothing);
        };

        let actor = self.directory.actor(actor_id).await?;
        Ok(Plan::Notify(FanOut {
            kind: NotificationType::Assignment,
            message: assignment_message(&actor, &task.title),
            entity_type: Some(TASK_ENTITY.to_string()),
            entity_id: Some(task.id),
            target_user_ids: vec![target],
        }))
    }
}
