//! Connection entity model
//!
//! A connection is an undirected edge between two profiles. The endpoints
//! are stored in canonical order (`user_lo < user_hi`) so the composite
//! unique index on the pair makes edge uniqueness a store-level constraint;
//! `initiator_id` preserves which side actually sent the request.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "connections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Canonically smaller endpoint
    pub user_lo: Uuid,

    /// Canonically larger endpoint
    pub user_hi: Uuid,

    /// The endpoint that created the request (one of user_lo/user_hi)
    pub initiator_id: Uuid,

    pub status: ConnectionStatus,

    /// Optional free text attached at creation (<= 500 chars)
    pub message: Option<String>,

    /// Strength score, 0..=100
    pub strength: i32,

    pub strength_trend: StrengthTrend,

    pub last_calculated_at: Option<DateTimeWithTimeZone>,

    /// Free-form tags, stored as a JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Option<JsonValue>,

    /// Private notes, scoped per side
    pub initiator_notes: Option<String>,
    pub recipient_notes: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    /// Set once, the first time the edge becomes accepted
    pub connected_at: Option<DateTimeWithTimeZone>,

    pub last_interaction_at: Option<DateTimeWithTimeZone>,

    pub updated_at: DateTimeWithTimeZone,
}

/// Edge lifecycle status. `rejected` is terminal; `accepted` edges stay
/// mutable (strength, notes) until removed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Direction of the strength score since the previous calculation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum StrengthTrend {
    #[sea_orm(string_value = "increasing")]
    Increasing,
    #[sea_orm(string_value = "stable")]
    Stable,
    #[sea_orm(string_value = "decreasing")]
    Decreasing,
}

/// Pair status translated to a caller's perspective, as returned by
/// `status_between` and carried in `ALREADY_EXISTS` failures so clients can
/// render the correct next action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    None,
    PendingSent,
    PendingReceived,
    Connected,
    Rejected,
}

impl PairStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PendingSent => "pending_sent",
            Self::PendingReceived => "pending_received",
            Self::Connected => "connected",
            Self::Rejected => "rejected",
        }
    }
}

impl Model {
    /// The endpoint other than `user_id`; `None` when `user_id` is not an
    /// endpoint of this edge.
    pub fn other_endpoint(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.user_lo {
            Some(self.user_hi)
        } else if user_id == self.user_hi {
            Some(self.user_lo)
        } else {
            None
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        user_id == self.user_lo || user_id == self.user_hi
    }

    /// The side that did not initiate the request.
    pub fn recipient_id(&self) -> Uuid {
        if self.initiator_id == self.user_lo {
            self.user_hi
        } else {
            self.user_lo
        }
    }

    /// Translate the edge status into `viewer`'s perspective.
    pub fn status_for(&self, viewer: Uuid) -> PairStatus {
        match self.status {
            ConnectionStatus::Accepted => PairStatus::Connected,
            ConnectionStatus::Rejected => PairStatus::Rejected,
            ConnectionStatus::Pending if self.initiator_id == viewer => PairStatus::PendingSent,
            ConnectionStatus::Pending => PairStatus::PendingReceived,
        }
    }
}

/// Canonical unordered-pair key: the smaller UUID first. Both creation and
/// lookup go through this so direction never matters.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::interaction_event::Entity")]
    InteractionEvents,
}

impl Related<super::interaction_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InteractionEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn edge(initiator: Uuid, recipient: Uuid, status: ConnectionStatus) -> Model {
        let (user_lo, user_hi) = canonical_pair(initiator, recipient);
        Model {
            id: Uuid::new_v4(),
            user_lo,
            user_hi,
            initiator_id: initiator,
            status,
            message: None,
            strength: 0,
            strength_trend: StrengthTrend::Stable,
            last_calculated_at: None,
            tags: None,
            initiator_notes: None,
            recipient_notes: None,
            created_at: Utc::now().into(),
            connected_at: None,
            last_interaction_at: None,
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn canonical_pair_is_direction_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
        let (lo, hi) = canonical_pair(a, b);
        assert!(lo <= hi);
    }

    #[test]
    fn pending_status_depends_on_perspective() {
        let initiator = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let edge = edge(initiator, recipient, ConnectionStatus::Pending);

        assert_eq!(edge.status_for(initiator), PairStatus::PendingSent);
        assert_eq!(edge.status_for(recipient), PairStatus::PendingReceived);
    }

    #[test]
    fn accepted_and_rejected_read_the_same_from_both_sides() {
        let initiator = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let accepted = edge(initiator, recipient, ConnectionStatus::Accepted);
        assert_eq!(accepted.status_for(initiator), PairStatus::Connected);
        assert_eq!(accepted.status_for(recipient), PairStatus::Connected);

        let rejected = edge(initiator, recipient, ConnectionStatus::Rejected);
        assert_eq!(rejected.status_for(initiator), PairStatus::Rejected);
        assert_eq!(rejected.status_for(recipient), PairStatus::Rejected);
    }

    #[test]
    fn other_endpoint_and_recipient() {
        let initiator = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let edge = edge(initiator, recipient, ConnectionStatus::Pending);

        assert_eq!(edge.other_endpoint(initiator), Some(recipient));
        assert_eq!(edge.other_endpoint(recipient), Some(initiator));
        assert_eq!(edge.other_endpoint(Uuid::new_v4()), None);
        assert_eq!(edge.recipient_id(), recipient);
    }
}
