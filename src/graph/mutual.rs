//! # Mutual Connection & Suggestion Engine
//!
//! Computes the intersection of two profiles' accepted-connection sets and
//! ranks non-connected candidates by a weighted relevance score. Neighbor
//! lookups are served by the endpoint indexes, so mutual computation costs
//! O(degree(x) + degree(y)) rather than a scan over the whole graph.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::config::GraphPolicyConfig;
use crate::error::GraphError;
use crate::models::connection::ConnectionStatus;
use crate::models::user;
use crate::repositories::{ConnectionRepository, UserRepository};

/// A ranked suggestion candidate with the signals behind its score.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub profile: user::Model,
    pub score: i64,
    pub mutual_connections: usize,
    pub shared_location: bool,
    pub shared_professional_type: bool,
    pub common_skills: usize,
    pub verified: bool,
}

/// Mutual-connection and suggestion queries over the graph store.
#[derive(Clone)]
pub struct MutualGraph {
    connections: ConnectionRepository,
    users: UserRepository,
    policy: GraphPolicyConfig,
}

impl MutualGraph {
    pub fn new(db: Arc<DatabaseConnection>, policy: GraphPolicyConfig) -> Self {
        Self {
            connections: ConnectionRepository::new(Arc::clone(&db)),
            users: UserRepository::new(db),
            policy,
        }
    }

    /// Profiles connected (accepted) to both `x` and `y`, excluding the two
    /// endpoints themselves. Symmetric in its arguments by construction.
    pub async fn mutual_connections(&self, x: Uuid, y: Uuid) -> Result<Vec<Uuid>, GraphError> {
        let neighbors_x: HashSet<Uuid> = self
            .connections
            .neighbor_ids(x, Some(ConnectionStatus::Accepted))
            .await?
            .into_iter()
            .collect();
        let neighbors_y: HashSet<Uuid> = self
            .connections
            .neighbor_ids(y, Some(ConnectionStatus::Accepted))
            .await?
            .into_iter()
            .collect();

        let mut mutual: Vec<Uuid> = neighbors_x
            .intersection(&neighbors_y)
            .copied()
            .filter(|id| *id != x && *id != y)
            .collect();
        mutual.sort();

        Ok(mutual)
    }

    /// Whether an accepted edge exists between `x` and `y`, in either
    /// direction.
    pub async fn are_connected(&self, x: Uuid, y: Uuid) -> Result<bool, GraphError> {
        Ok(self
            .connections
            .find_by_pair(x, y)
            .await?
            .is_some_and(|edge| edge.status == ConnectionStatus::Accepted))
    }

    /// Ranked connection suggestions for `user`.
    ///
    /// Candidate pool: every profile except the caller and anyone already
    /// linked by an edge of any status. Candidates scoring zero or below are
    /// discarded; ties break by most recently joined.
    pub async fn suggestions(
        &self,
        user_id: Uuid,
        limit: Option<u64>,
    ) -> Result<Vec<Suggestion>, GraphError> {
        let limit = limit
            .unwrap_or(self.policy.suggestion_limit)
            .clamp(1, 100) as usize;

        let me = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(GraphError::NotFound { resource: "profile" })?;

        let linked: HashSet<Uuid> = self
            .connections
            .neighbor_ids(user_id, None)
            .await?
            .into_iter()
            .collect();

        let mut excluded = linked.clone();
        excluded.insert(user_id);
        let candidates = self.users.all_except(&excluded).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Mutual counts for the whole candidate set in one pass: every
        // accepted edge from one of my accepted neighbors to a non-neighbor
        // is a mutual connection for that endpoint.
        let accepted_neighbors: HashSet<Uuid> = self
            .connections
            .neighbor_ids(user_id, Some(ConnectionStatus::Accepted))
            .await?
            .into_iter()
            .collect();
        let neighbor_vec: Vec<Uuid> = accepted_neighbors.iter().copied().collect();
        let mut mutual_counts: HashMap<Uuid, usize> = HashMap::new();
        for edge in self.connections.accepted_edges_touching(&neighbor_vec).await? {
            for (near, far) in [
                (edge.user_lo, edge.user_hi),
                (edge.user_hi, edge.user_lo),
            ] {
                if accepted_neighbors.contains(&near)
                    && !accepted_neighbors.contains(&far)
                    && far != user_id
                {
                    *mutual_counts.entry(far).or_default() += 1;
                }
            }
        }

        let my_skills: HashSet<String> = me
            .skill_slugs()
            .into_iter()
            .map(|s| s.to_lowercase())
            .collect();
        let weights = &self.policy.suggestion;

        let mut ranked: Vec<Suggestion> = candidates
            .into_iter()
            .map(|candidate| {
                let mutual_connections =
                    mutual_counts.get(&candidate.id).copied().unwrap_or(0);

                let shared_location = match (&me.location, &candidate.location) {
                    (Some(mine), Some(theirs)) => mine.eq_ignore_ascii_case(theirs),
                    _ => false,
                };
                let shared_professional_type =
                    me.professional_type == candidate.professional_type;
                let common_skills = candidate
                    .skill_slugs()
                    .iter()
                    .filter(|s| my_skills.contains(&s.to_lowercase()))
                    .count();
                let verified = candidate.verification_tier.is_non_trivial();

                let score = weights.mutual_connection * mutual_connections as i64
                    + if shared_location { weights.shared_location } else { 0 }
                    + if shared_professional_type {
                        weights.shared_professional_type
                    } else {
                        0
                    }
                    + weights.common_skill * common_skills as i64
                    + if verified { weights.verified_profile } else { 0 };

                Suggestion {
                    profile: candidate,
                    score,
                    mutual_connections,
                    shared_location,
                    shared_professional_type,
                    common_skills,
                    verified,
                }
            })
            .filter(|suggestion| suggestion.score > 0)
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.profile.created_at.cmp(&a.profile.created_at))
                .then_with(|| a.profile.id.cmp(&b.profile.id))
        });
        ranked.truncate(limit);

        Ok(ranked)
    }
}
