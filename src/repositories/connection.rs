//! Connection repository for database operations
//!
//! This module provides the ConnectionRepository struct which encapsulates
//! SeaORM operations for the connections table: canonical-pair lookups,
//! indexed neighbor queries, atomic strength updates, and keyset-paginated
//! listings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{decode_cursor, encode_cursor};
use crate::models::connection::{
    self, ConnectionStatus, Entity as Connection, StrengthTrend, canonical_pair,
};

/// Repository for connection edge operations
#[derive(Debug, Clone)]
pub struct ConnectionRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ConnectionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a new pending edge. The canonical-pair unique index is the
    /// only duplicate check: concurrent creations race on the index, not on
    /// an application-level existence probe, so callers must map the
    /// resulting unique-violation `DbErr`.
    pub async fn insert_pending(
        &self,
        initiator: Uuid,
        recipient: Uuid,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<connection::Model, DbErr> {
        let (user_lo, user_hi) = canonical_pair(initiator, recipient);
        let id = Uuid::new_v4();

        let active = connection::ActiveModel {
            id: Set(id),
            user_lo: Set(user_lo),
            user_hi: Set(user_hi),
            initiator_id: Set(initiator),
            status: Set(ConnectionStatus::Pending),
            message: Set(message),
            strength: Set(0),
            strength_trend: Set(StrengthTrend::Stable),
            last_calculated_at: Set(None),
            tags: Set(None),
            initiator_notes: Set(None),
            recipient_notes: Set(None),
            created_at: Set(now.into()),
            connected_at: Set(None),
            last_interaction_at: Set(None),
            updated_at: Set(now.into()),
        };

        active.insert(&*self.db).await?;

        let fetched = Connection::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| DbErr::RecordNotFound(format!("connection {} not persisted", id)))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<connection::Model>, DbErr> {
        Connection::find_by_id(id).one(&*self.db).await
    }

    /// Look up the edge for an unordered pair, independent of direction.
    pub async fn find_by_pair(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<connection::Model>, DbErr> {
        let (user_lo, user_hi) = canonical_pair(a, b);
        Connection::find()
            .filter(connection::Column::UserLo.eq(user_lo))
            .filter(connection::Column::UserHi.eq(user_hi))
            .one(&*self.db)
            .await
    }

    /// Transition an edge to accepted, stamping `connected_at` only the
    /// first time.
    pub async fn mark_accepted(
        &self,
        edge: connection::Model,
        now: DateTime<Utc>,
    ) -> Result<connection::Model, DbErr> {
        let first_accept = edge.connected_at.is_none();
        let mut active: connection::ActiveModel = edge.into();
        active.status = Set(ConnectionStatus::Accepted);
        if first_accept {
            active.connected_at = Set(Some(now.into()));
        }
        active.updated_at = Set(now.into());
        active.update(&*self.db).await
    }

    pub async fn mark_rejected(
        &self,
        edge: connection::Model,
        now: DateTime<Utc>,
    ) -> Result<connection::Model, DbErr> {
        let mut active: connection::ActiveModel = edge.into();
        active.status = Set(ConnectionStatus::Rejected);
        active.updated_at = Set(now.into());
        active.update(&*self.db).await
    }

    /// Hard delete; removal is not a soft state.
    pub async fn delete_by_id(&self, id: Uuid) -> Result<u64, DbErr> {
        let result = Connection::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected)
    }

    /// IDs of `user`'s neighbors, optionally restricted to one edge status.
    /// Served by the endpoint indexes, so cost is O(degree).
    pub async fn neighbor_ids(
        &self,
        user: Uuid,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Uuid>, DbErr> {
        let mut query = Connection::find().filter(
            Condition::any()
                .add(connection::Column::UserLo.eq(user))
                .add(connection::Column::UserHi.eq(user)),
        );

        if let Some(status) = status {
            query = query.filter(connection::Column::Status.eq(status));
        }

        let edges = query.all(&*self.db).await?;
        Ok(edges
            .into_iter()
            .filter_map(|edge| edge.other_endpoint(user))
            .collect())
    }

    /// All accepted edges with at least one endpoint in `users`. Used to
    /// count mutual connections for a whole candidate set in one query.
    pub async fn accepted_edges_touching(
        &self,
        users: &[Uuid],
    ) -> Result<Vec<connection::Model>, DbErr> {
        if users.is_empty() {
            return Ok(Vec::new());
        }

        Connection::find()
            .filter(connection::Column::Status.eq(ConnectionStatus::Accepted))
            .filter(
                Condition::any()
                    .add(connection::Column::UserLo.is_in(users.to_vec()))
                    .add(connection::Column::UserHi.is_in(users.to_vec())),
            )
            .all(&*self.db)
            .await
    }

    /// Apply an interaction increment in place. The clamp-to-100 runs inside
    /// the UPDATE expression, so concurrent increments on the same edge are
    /// never lost to a stale read-modify-write.
    pub async fn apply_interaction_increment(
        &self,
        id: Uuid,
        increment: i32,
        now: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let result = Connection::update_many()
            .col_expr(
                connection::Column::Strength,
                Expr::cust_with_values(
                    "CASE WHEN strength + ? > 100 THEN 100 ELSE strength + ? END",
                    [increment, increment],
                ),
            )
            .col_expr(
                connection::Column::LastInteractionAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(now)),
            )
            .col_expr(
                connection::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(now)),
            )
            .filter(connection::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Persist a recalculated score, its trend, and the calculation stamp.
    pub async fn persist_score(
        &self,
        id: Uuid,
        score: i32,
        trend: StrengthTrend,
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        Connection::update_many()
            .col_expr(connection::Column::Strength, Expr::value(score))
            .col_expr(connection::Column::StrengthTrend, Expr::value(trend))
            .col_expr(
                connection::Column::LastCalculatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(now)),
            )
            .col_expr(
                connection::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(now)),
            )
            .filter(connection::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    /// Keyset-paginated listing of `user`'s edges, ordered by creation time
    /// then ID.
    pub async fn list_for_user(
        &self,
        user: Uuid,
        status: Option<ConnectionStatus>,
        limit: u64,
        cursor: Option<crate::cursor::CursorData>,
    ) -> Result<(Vec<connection::Model>, Option<String>), DbErr> {
        if limit == 0 {
            return Ok((Vec::new(), None));
        }

        let mut query = Connection::find()
            .filter(
                Condition::any()
                    .add(connection::Column::UserLo.eq(user))
                    .add(connection::Column::UserHi.eq(user)),
            )
            .order_by_asc(connection::Column::CreatedAt)
            .order_by_asc(connection::Column::Id);

        if let Some(status) = status {
            query = query.filter(connection::Column::Status.eq(status));
        }

        if let Some(cursor) = cursor {
            let condition = Condition::any()
                .add(connection::Column::CreatedAt.gt(cursor.created_at))
                .add(
                    Condition::all()
                        .add(connection::Column::CreatedAt.eq(cursor.created_at))
                        .add(connection::Column::Id.gt(cursor.id)),
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
}

/// Parse an opaque cursor string into keyset data, if present.
pub fn parse_cursor_param(
    cursor: Option<&str>,
) -> Result<Option<crate::cursor::CursorData>, crate::error::ApiError> {
    cursor.map(decode_cursor).transpose()
}
