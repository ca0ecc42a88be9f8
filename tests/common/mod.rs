//! Shared helpers for integration tests: an in-memory migrated database and
//! directory seeding shortcuts.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use maison_graph::graph::{ConnectionLifecycle, LoggingNotifier};
use maison_graph::models::user::{self, VerificationTier};
use maison_graph::repositories::UserRepository;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory database connects");
    migration::Migrator::up(&db, None)
        .await
        .expect("migrations apply");
    db
}

pub fn lifecycle(db: &DatabaseConnection) -> ConnectionLifecycle {
    ConnectionLifecycle::new(Arc::new(db.clone()), Arc::new(LoggingNotifier))
}

pub async fn seed_user(db: &DatabaseConnection, name: &str, professional_type: &str) -> user::Model {
    seed_user_full(db, name, professional_type, None, &[], VerificationTier::None).await
}

pub async fn seed_user_full(
    db: &DatabaseConnection,
    name: &str,
    professional_type: &str,
    location: Option<&str>,
    skills: &[&str],
    verification_tier: VerificationTier,
) -> user::Model {
    let repo = UserRepository::new(Arc::new(db.clone()));
    let now = Utc::now();
    repo.upsert(user::Model {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        professional_type: professional_type.to_string(),
        location: location.map(str::to_string),
        skills: if skills.is_empty() {
            None
        } else {
            Some(serde_json::json!(skills))
        },
        verification_tier,
        created_at: now.into(),
        updated_at: now.into(),
    })
    .await
    .expect("user seeds")
}

/// Create and accept an edge between two users, returning the accepted model.
pub async fn connect(
    db: &DatabaseConnection,
    a: &user::Model,
    b: &user::Model,
) -> maison_graph::models::connection::Model {
    let lifecycle = lifecycle(db);
    let edge = lifecycle
        .create_request(a.id, b.id, None)
        .await
        .expect("request creates");
    lifecycle.accept(edge.id, b.id).await.expect("request accepts")
}
