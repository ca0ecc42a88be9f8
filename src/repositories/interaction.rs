//! Interaction event repository
//!
//! Append-only records of per-edge activity; the strength scorer replays
//! them during full recalculation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;

use crate::models::interaction_event::{self, Entity as InteractionEvent, InteractionKind};

/// Repository for interaction event operations
#[derive(Debug, Clone)]
pub struct InteractionRepository {
    pub db: Arc<DatabaseConnection>,
}

impl InteractionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        connection_id: Uuid,
        actor_id: Uuid,
        kind: InteractionKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<interaction_event::Model, DbErr> {
        let id = Uuid::new_v4();
        let active = interaction_event::ActiveModel {
            id: Set(id),
            connection_id: Set(connection_id),
            actor_id: Set(actor_id),
            kind: Set(kind),
            occurred_at: Set(occurred_at.into()),
        };

        active.insert(&*self.db).await?;

        let fetched = InteractionEvent::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| DbErr::RecordNotFound(format!("interaction event {} not persisted", id)))
    }

    /// Events for an edge within the scoring window, oldest first.
    pub async fn events_since(
        &self,
        connection_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<interaction_event::Model>, DbErr> {
        InteractionEvent::find()
            .filter(interaction_event::Column::ConnectionId.eq(connection_id))
            .filter(interaction_event::Column::OccurredAt.gte(since))
            .order_by_asc(interaction_event::Column::OccurredAt)
            .all(&*self.db)
            .await
    }
}
