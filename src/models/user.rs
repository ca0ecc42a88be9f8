//! User entity model
//!
//! The users table is the graph engine's replica of the User Directory
//! collaborator: the profile attributes needed for strength scoring,
//! suggestion ranking, and participant existence checks. Profile ownership
//! stays with the directory; this service only reads the replica.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Profile identifier (primary key, issued by the directory)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name used in introduction messages
    pub display_name: String,

    /// Professional type slug (e.g. "model", "photographer", "designer",
    /// "stylist", "makeup-artist"); vocabulary is owned by the directory
    pub professional_type: String,

    /// Declared location, if any
    pub location: Option<String>,

    /// Skill slugs, stored as a JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub skills: Option<JsonValue>,

    /// Verification tier assigned by the directory
    pub verification_tier: VerificationTier,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

/// Verification tiers recognised by the suggestion scorer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum VerificationTier {
    #[sea_orm(string_value = "none")]
    None,
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "identity")]
    Identity,
    #[sea_orm(string_value = "professional")]
    Professional,
}

impl VerificationTier {
    /// Whether the tier counts as non-trivial for suggestion ranking.
    /// Email self-verification carries no signal about the profile's
    /// professional standing.
    pub fn is_non_trivial(self) -> bool {
        matches!(self, Self::Identity | Self::Professional)
    }
}

impl Model {
    /// Skill slugs as a string vector; tolerates missing or malformed JSON.
    pub fn skill_slugs(&self) -> Vec<String> {
        self.skills
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|s| s.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
