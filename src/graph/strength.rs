//! # Connection Strength Scorer
//!
//! Computes the 0-100 strength score per edge. `recalculate` is the
//! deterministic full pass over a point-in-time snapshot of signals;
//! `record_interaction` is the incremental path, applying a fixed per-type
//! increment atomically in the store so concurrent interaction sources never
//! lose updates to each other.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::config::GraphPolicyConfig;
use crate::error::GraphError;
use crate::models::connection::{self, ConnectionStatus, StrengthTrend};
use crate::models::interaction_event::{self, InteractionKind};
use crate::models::user;
use crate::repositories::{ConnectionRepository, InteractionRepository, UserRepository};

/// Per-signal contributions of a strength calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrengthBreakdown {
    pub attribute: i32,
    pub mutual: i32,
    pub interaction: i32,
    pub duration: i32,
    pub total: i32,
}

/// Strength scorer over the graph store.
#[derive(Clone)]
pub struct StrengthScorer {
    connections: ConnectionRepository,
    interactions: InteractionRepository,
    users: UserRepository,
    policy: GraphPolicyConfig,
}

impl StrengthScorer {
    pub fn new(db: Arc<DatabaseConnection>, policy: GraphPolicyConfig) -> Self {
        Self {
            connections: ConnectionRepository::new(Arc::clone(&db)),
            interactions: InteractionRepository::new(Arc::clone(&db)),
            users: UserRepository::new(db),
            policy,
        }
    }

    /// Recompute an edge's strength from scratch and persist score, trend,
    /// and calculation stamp. Deterministic given a snapshot of signals.
    pub async fn recalculate(
        &self,
        connection_id: Uuid,
    ) -> Result<connection::Model, GraphError> {
        let edge = self.require(connection_id).await?;
        let now = Utc::now();

        let side_lo = self.require_profile(edge.user_lo).await?;
        let side_hi = self.require_profile(edge.user_hi).await?;

        let mutual_count = self.mutual_count(edge.user_lo, edge.user_hi).await?;

        let window_start = now - Duration::days(self.policy.strength.interaction_window_days);
        let events = self
            .interactions
            .events_since(connection_id, window_start)
            .await?;

        let breakdown = compute_breakdown(
            &self.policy,
            &edge,
            &side_lo,
            &side_hi,
            mutual_count,
            &events,
            now,
        );
        let trend = derive_trend(
            edge.strength,
            breakdown.total,
            self.policy.strength.trend_epsilon,
        );

        self.connections
            .persist_score(connection_id, breakdown.total, trend, now)
            .await?;

        self.require(connection_id).await
    }

    /// Record a single interaction event and apply its fixed increment.
    ///
    /// The increment is an atomic in-place update clamped to 100; no full
    /// recalculation happens on this path.
    pub async fn record_interaction(
        &self,
        connection_id: Uuid,
        actor: Uuid,
        kind: InteractionKind,
    ) -> Result<connection::Model, GraphError> {
        let edge = self.require(connection_id).await?;

        if !edge.involves(actor) {
            return Err(GraphError::Forbidden {
                action: "record interactions on this connection",
            });
        }

        // Interactions presume an active relationship; pending and rejected
        // edges do not accumulate strength.
        if edge.status != ConnectionStatus::Accepted {
            return Err(GraphError::InvalidTransition {
                current: match edge.status {
                    ConnectionStatus::Pending => "pending",
                    ConnectionStatus::Rejected => "rejected",
                    ConnectionStatus::Accepted => unreachable!(),
                },
            });
        }

        let now = Utc::now();
        let increment = self.policy.interaction.increment_for(kind);

        self.interactions
            .insert(connection_id, actor, kind, now)
            .await?;

        let rows = self
            .connections
            .apply_interaction_increment(connection_id, increment, now)
            .await?;
        if rows == 0 {
            // Edge removed between the load and the increment.
            return Err(GraphError::NotFound {
                resource: "connection",
            });
        }

        self.require(connection_id).await
    }

    async fn mutual_count(&self, a: Uuid, b: Uuid) -> Result<usize, GraphError> {
        let neighbors_a: HashSet<Uuid> = self
            .connections
            .neighbor_ids(a, Some(ConnectionStatus::Accepted))
            .await?
            .into_iter()
            .collect();
        let neighbors_b: HashSet<Uuid> = self
            .connections
            .neighbor_ids(b, Some(ConnectionStatus::Accepted))
            .await?
            .into_iter()
            .collect();

        Ok(neighbors_a
            .intersection(&neighbors_b)
            .filter(|id| **id != a && **id != b)
            .count())
    }

    async fn require(&self, connection_id: Uuid) -> Result<connection::Model, GraphError> {
        self.connections
            .find_by_id(connection_id)
            .await?
            .ok_or(GraphError::NotFound {
                resource: "connection",
            })
    }

    async fn require_profile(&self, user_id: Uuid) -> Result<user::Model, GraphError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(GraphError::NotFound { resource: "profile" })
    }
}

/// Pure scoring pass; separated from the I/O so the formula is testable on
/// its own.
pub fn compute_breakdown(
    policy: &GraphPolicyConfig,
    edge: &connection::Model,
    side_lo: &user::Model,
    side_hi: &user::Model,
    mutual_count: usize,
    events: &[interaction_event::Model],
    now: DateTime<Utc>,
) -> StrengthBreakdown {
    let strength = &policy.strength;

    // Attribute similarity, capped.
    let mut attribute = 0;
    if side_lo.professional_type == side_hi.professional_type {
        attribute += 10;
    }
    if let (Some(loc_lo), Some(loc_hi)) = (&side_lo.location, &side_hi.location)
        && loc_lo.eq_ignore_ascii_case(loc_hi)
    {
        attribute += 8;
    }
    let skills_lo: HashSet<String> = side_lo
        .skill_slugs()
        .into_iter()
        .map(|s| s.to_lowercase())
        .collect();
    let common_skills = side_hi
        .skill_slugs()
        .iter()
        .filter(|s| skills_lo.contains(&s.to_lowercase()))
        .count();
    attribute += ((common_skills as i32) * 2).min(12);
    let attribute = attribute.min(strength.attribute_cap);

    // Mutual connections: full weight up to the threshold, a single point
    // each beyond it, capped. Keeps hub users from dominating the score.
    let full = mutual_count.min(strength.mutual_full_weight_threshold) as i32;
    let extra = mutual_count.saturating_sub(strength.mutual_full_weight_threshold) as i32;
    let mutual = (full * 3 + extra).min(strength.mutual_cap);

    // Interaction events within the window, each at its fixed increment.
    let interaction: i64 = events
        .iter()
        .map(|event| policy.interaction.increment_for(event.kind) as i64)
        .sum();
    let interaction = interaction.clamp(0, 100) as i32;

    // Small bounded bonus for older, still-accepted relationships.
    let duration = match (&edge.status, &edge.connected_at) {
        (ConnectionStatus::Accepted, Some(connected_at)) => {
            let days = (now - connected_at.with_timezone(&Utc)).num_days().max(0);
            ((days / 90) as i32).min(strength.duration_bonus_cap)
        }
        _ => 0,
    };

    let total = (attribute + mutual + interaction + duration).clamp(0, 100);

    StrengthBreakdown {
        attribute,
        mutual,
        interaction,
        duration,
        total,
    }
}

/// Trend of the new score relative to the stored one, within an epsilon.
pub fn derive_trend(previous: i32, current: i32, epsilon: i32) -> StrengthTrend {
    let delta = current - previous;
    if delta.abs() <= epsilon {
        StrengthTrend::Stable
    } else if delta > 0 {
        StrengthTrend::Increasing
    } else {
        StrengthTrend::Decreasing
    }
}
