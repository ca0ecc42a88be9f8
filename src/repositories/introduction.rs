//! Introduction request repository
//!
//! Store operations for the three-party brokering workflow: creation,
//! duplicate-window lookups, state-machine updates, and the sweeper's
//! stale-row cleanup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::cursor::{CursorData, encode_cursor};
use crate::models::introduction_request::{
    self, Entity as IntroductionRequest, IntroductionStatus,
};

/// Which seat the caller occupies when listing introduction requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Requester,
    Introducer,
    Target,
}

/// Repository for introduction request operations
#[derive(Debug, Clone)]
pub struct IntroductionRepository {
    pub db: Arc<DatabaseConnection>,
}

impl IntroductionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        active: introduction_request::ActiveModel,
    ) -> Result<introduction_request::Model, DbErr> {
        let id = match &active.id {
            sea_orm::ActiveValue::Set(id) => *id,
            _ => return Err(DbErr::Custom("introduction request id must be set".to_string())),
        };

        active.insert(&*self.db).await?;

        let fetched = IntroductionRequest::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| {
            DbErr::RecordNotFound(format!("introduction request {} not persisted", id))
        })
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<introduction_request::Model>, DbErr> {
        IntroductionRequest::find_by_id(id).one(&*self.db).await
    }

    /// The request blocking a new `(requester, target)` attempt, if any:
    /// created within the duplicate window, not yet expired, and not in a
    /// terminal-declined state. Declined and cancelled requests do not block
    /// a retry.
    pub async fn find_blocking_for_pair(
        &self,
        requester: Uuid,
        target: Uuid,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<introduction_request::Model>, DbErr> {
        IntroductionRequest::find()
            .filter(introduction_request::Column::RequesterId.eq(requester))
            .filter(introduction_request::Column::TargetId.eq(target))
            .filter(introduction_request::Column::CreatedAt.gte(window_start))
            .filter(introduction_request::Column::ExpiresAt.gt(now))
            .filter(
                introduction_request::Column::Status
                    .is_in([IntroductionStatus::Pending, IntroductionStatus::Completed]),
            )
            .order_by_desc(introduction_request::Column::CreatedAt)
            .one(&*self.db)
            .await
    }

    pub async fn save(
        &self,
        active: introduction_request::ActiveModel,
    ) -> Result<introduction_request::Model, DbErr> {
        active.update(&*self.db).await
    }

    /// Keyset-paginated listing of requests involving `user`, optionally in
    /// one specific seat.
    pub async fn list_involving(
        &self,
        user: Uuid,
        role: Option<ParticipantRole>,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<(Vec<introduction_request::Model>, Option<String>), DbErr> {
        if limit == 0 {
            return Ok((Vec::new(), None));
        }

        let involvement = match role {
            Some(ParticipantRole::Requester) => {
                Condition::all().add(introduction_request::Column::RequesterId.eq(user))
            }
            Some(ParticipantRole::Introducer) => {
                Condition::all().add(introduction_request::Column::IntroducerId.eq(user))
            }
            Some(ParticipantRole::Target) => {
                Condition::all().add(introduction_request::Column::TargetId.eq(user))
            }
            None => Condition::any()
                .add(introduction_request::Column::RequesterId.eq(user))
                .add(introduction_request::Column::IntroducerId.eq(user))
                .add(introduction_request::Column::TargetId.eq(user)),
        };

        let mut query = IntroductionRequest::find()
            .filter(involvement)
            .order_by_asc(introduction_request::Column::CreatedAt)
            .order_by_asc(introduction_request::Column::Id);

        if let Some(cursor) = cursor {
            let condition = Condition::any()
                .add(introduction_request::Column::CreatedAt.gt(cursor.created_at))
                .add(
                    Condition::all()
                        .add(introduction_request::Column::CreatedAt.eq(cursor.created_at))
                        .add(introduction_request::Column::Id.gt(cursor.id)),
                );
            query = query.filter(condition);
        }

        let mut rows = query.limit(limit + 1).all(&*self.db).await?;

        let next_cursor = if rows.len() as u64 > limit {
            rows.pop();
            rows.last()
                .map(|last| encode_cursor(&last.created_at.with_timezone(&Utc), &last.id))
        } else {
            None
        };

        Ok((rows, next_cursor))
    }

    /// Delete pending requests that expired before `cutoff`. Only the
    /// sweeper calls this; lazy guard checks remain the source of truth for
    /// expiry semantics.
    pub async fn delete_expired_pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let result = IntroductionRequest::delete_many()
            .filter(introduction_request::Column::Status.eq(IntroductionStatus::Pending))
            .filter(introduction_request::Column::ExpiresAt.lt(cutoff))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
