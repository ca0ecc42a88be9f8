//! # Seed Data
//!
//! Development-profile seeding: a handful of directory replica rows so the
//! graph endpoints are exercisable against an empty database. Production
//! deployments receive directory rows from the platform sync instead.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::user::{self, VerificationTier};
use crate::repositories::UserRepository;

/// Seed demo profiles when the users table is empty. Idempotent.
pub async fn seed_dev_profiles(db: &DatabaseConnection) -> Result<()> {
    let existing = user::Entity::find().count(db).await?;
    if existing > 0 {
        tracing::debug!(existing, "Skipping dev profile seeding");
        return Ok(());
    }

    let repo = UserRepository::new(Arc::new(db.clone()));
    let now = Utc::now();

    let profiles = [
        (
            "Anouk Devos",
            "model",
            Some("Antwerp"),
            vec!["runway", "editorial"],
            VerificationTier::Identity,
        ),
        (
            "Jules Marchetti",
            "photographer",
            Some("Paris"),
            vec!["editorial", "studio-lighting"],
            VerificationTier::Professional,
        ),
        (
            "Mara Lindqvist",
            "designer",
            Some("Copenhagen"),
            vec!["knitwear", "sustainable-textiles"],
            VerificationTier::Identity,
        ),
        (
            "Sofia Reyes",
            "stylist",
            Some("Paris"),
            vec!["editorial", "celebrity"],
            VerificationTier::Email,
        ),
        (
            "Lena Okafor",
            "makeup-artist",
            None,
            vec!["editorial", "sfx"],
            VerificationTier::None,
        ),
    ];

    for (name, professional_type, location, skills, tier) in profiles {
        repo.upsert(user::Model {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
            professional_type: professional_type.to_string(),
            location: location.map(str::to_string),
            skills: Some(serde_json::json!(skills)),
            verification_tier: tier,
            created_at: now.into(),
            updated_at: now.into(),
        })
        .await?;
    }

    tracing::info!("Seeded dev profiles");
    Ok(())
}
