//! Interaction event entity model
//!
//! Per-edge activity records feeding the strength scorer. The incremental
//! path applies each event's fixed increment atomically in SQL; full
//! recalculation replays the events within the scoring window.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "interaction_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub connection_id: Uuid,

    /// Which endpoint performed the interaction
    pub actor_id: Uuid,

    pub kind: InteractionKind,

    pub occurred_at: DateTimeWithTimeZone,
}

/// Interaction types recognised by the strength scorer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    #[sea_orm(string_value = "message")]
    Message,
    #[sea_orm(string_value = "profile_view")]
    ProfileView,
    #[sea_orm(string_value = "opportunity")]
    Opportunity,
    #[sea_orm(string_value = "endorsement")]
    Endorsement,
    #[sea_orm(string_value = "recommendation")]
    Recommendation,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::connection::Entity",
        from = "Column::ConnectionId",
        to = "super::connection::Column::Id",
        on_delete = "Cascade"
    )]
    Connection,
}

impl Related<super::connection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Connection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
