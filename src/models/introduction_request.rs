//! Introduction request entity model
//!
//! Three-party brokering records (requester -> introducer -> target) with a
//! time-bounded pending window. Expiry is evaluated lazily wherever a
//! transition guard runs; rows never flip to an "expired" status.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "introduction_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub requester_id: Uuid,
    pub introducer_id: Uuid,
    pub target_id: Uuid,

    /// <= 200 chars
    pub subject: String,

    /// <= 1000 chars, woven into the generated introduction message
    pub message: String,

    pub purpose: IntroductionPurpose,

    pub status: IntroductionStatus,

    /// Introducer's response, set on accept/decline
    pub introducer_message: Option<String>,
    pub introducer_responded_at: Option<DateTimeWithTimeZone>,

    /// Generated introduction message, set when the introducer accepts
    pub intro_subject: Option<String>,
    pub intro_message: Option<String>,
    pub intro_sent_at: Option<DateTimeWithTimeZone>,

    /// Optional final acknowledgment from the target
    pub target_accepted: Option<bool>,
    pub target_message: Option<String>,
    pub target_responded_at: Option<DateTimeWithTimeZone>,

    pub expires_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

/// Workflow status: `pending -> {accepted -> completed, declined, cancelled}`.
/// `accepted` never persists: accepting renders the introduction message and
/// lands the record directly in `completed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum IntroductionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "declined")]
    Declined,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl IntroductionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Canonical introduction purposes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "kebab-case")]
pub enum IntroductionPurpose {
    #[sea_orm(string_value = "business-opportunity")]
    BusinessOpportunity,
    #[sea_orm(string_value = "collaboration")]
    Collaboration,
    #[sea_orm(string_value = "mentorship")]
    Mentorship,
    #[sea_orm(string_value = "career-advice")]
    CareerAdvice,
    #[sea_orm(string_value = "creative-project")]
    CreativeProject,
    #[sea_orm(string_value = "networking")]
    Networking,
    #[sea_orm(string_value = "other")]
    Other,
}

impl IntroductionPurpose {
    /// Human phrasing substituted into introduction message templates.
    pub fn label(self) -> &'static str {
        match self {
            Self::BusinessOpportunity => "a business opportunity",
            Self::Collaboration => "a collaboration",
            Self::Mentorship => "mentorship",
            Self::CareerAdvice => "career advice",
            Self::CreativeProject => "a creative project",
            Self::Networking => "networking",
            Self::Other => "getting acquainted",
        }
    }
}

impl Model {
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at < now
    }

    pub fn participants(&self) -> [Uuid; 3] {
        [self.requester_id, self.introducer_id, self.target_id]
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
