//! User repository for database operations
//!
//! Read access to the directory replica, plus the upsert used by directory
//! sync and seeding.

use std::collections::HashSet;
use std::sync::Arc;

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::models::user::{self, Entity as User};

/// Repository for user directory replica operations
#[derive(Debug, Clone)]
pub struct UserRepository {
    pub db: Arc<DatabaseConnection>,
}

impl UserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>, DbErr> {
        User::find_by_id(id).one(&*self.db).await
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, DbErr> {
        let count = User::find()
            .filter(user::Column::Id.eq(id))
            .count(&*self.db)
            .await?;
        Ok(count > 0)
    }

    /// All profiles except the given set; the candidate pool for suggestions.
    pub async fn all_except(&self, exclude: &HashSet<Uuid>) -> Result<Vec<user::Model>, DbErr> {
        let excluded: Vec<Uuid> = exclude.iter().copied().collect();
        let mut query = User::find();
        if !excluded.is_empty() {
            query = query.filter(user::Column::Id.is_not_in(excluded));
        }
        query.all(&*self.db).await
    }

    /// Insert or refresh a directory replica row.
    pub async fn upsert(&self, profile: user::Model) -> Result<user::Model, DbErr> {
        let id = profile.id;
        let active = user::ActiveModel {
            id: Set(profile.id),
            display_name: Set(profile.display_name),
            professional_type: Set(profile.professional_type),
            location: Set(profile.location),
            skills: Set(profile.skills),
            verification_tier: Set(profile.verification_tier),
            created_at: Set(profile.created_at),
            updated_at: Set(profile.updated_at),
        };

        User::insert(active)
            .on_conflict(
                OnConflict::column(user::Column::Id)
                    .update_columns([
                        user::Column::DisplayName,
                        user::Column::ProfessionalType,
                        user::Column::Location,
                        user::Column::Skills,
                        user::Column::VerificationTier,
                        user::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&*self.db)
            .await?;

        let fetched = User::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| DbErr::RecordNotFound(format!("user {} not persisted", id)))
    }
}
