//! # Connection Lifecycle Manager
//!
//! Creates, accepts, rejects, and removes connection edges, enforcing the
//! self-connection and pair-uniqueness invariants. Uniqueness is delegated
//! entirely to the store's canonical-pair index: creation inserts first and
//! interprets a duplicate-key failure afterwards, so two concurrent requests
//! for the same pair leave exactly one surviving edge.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::error::{GraphError, is_unique_violation};
use crate::graph::notify::ActivityNotifier;
use crate::models::connection::{self, ConnectionStatus, PairStatus};
use crate::repositories::{ConnectionRepository, UserRepository};

/// Maximum length of the free-text message attached at creation.
const MAX_REQUEST_MESSAGE_CHARS: usize = 500;

/// Pair status plus the edge it refers to, as returned by `status_between`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairStatusView {
    pub status: PairStatus,
    pub connection_id: Option<Uuid>,
}

/// Lifecycle manager for connection edges.
#[derive(Clone)]
pub struct ConnectionLifecycle {
    connections: ConnectionRepository,
    users: UserRepository,
    notifier: Arc<dyn ActivityNotifier>,
}

impl ConnectionLifecycle {
    pub fn new(db: Arc<DatabaseConnection>, notifier: Arc<dyn ActivityNotifier>) -> Self {
        Self {
            connections: ConnectionRepository::new(Arc::clone(&db)),
            users: UserRepository::new(db),
            notifier,
        }
    }

    /// Create a pending connection request from `initiator` to `recipient`.
    ///
    /// Fails `SelfReference` for a self-edge and `AlreadyExists` when any
    /// edge for the pair exists in either direction; the failure carries the
    /// current status from the initiator's perspective.
    pub async fn create_request(
        &self,
        initiator: Uuid,
        recipient: Uuid,
        message: Option<String>,
    ) -> Result<connection::Model, GraphError> {
        if initiator == recipient {
            return Err(GraphError::SelfReference);
        }

        if let Some(text) = &message
            && text.chars().count() > MAX_REQUEST_MESSAGE_CHARS
        {
            return Err(GraphError::InvalidInput {
                field: "message",
                message: format!(
                    "message must be at most {} characters",
                    MAX_REQUEST_MESSAGE_CHARS
                ),
            });
        }

        if !self.users.exists(recipient).await? {
            return Err(GraphError::NotFound {
                resource: "recipient profile",
            });
        }

        let message = message.filter(|text| !text.trim().is_empty());

        match self
            .connections
            .insert_pending(initiator, recipient, message, Utc::now())
            .await
        {
            Ok(edge) => {
                self.notifier.connection_requested(&edge);
                Ok(edge)
            }
            Err(err) if is_unique_violation(&err) => {
                match self.connections.find_by_pair(initiator, recipient).await? {
                    Some(existing) => Err(GraphError::AlreadyExists {
                        connection_id: existing.id,
                        status: existing.status_for(initiator),
                    }),
                    // The competing edge vanished before we could read it
                    // back; surface the original failure.
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Accept a pending request. Only the non-initiating side may accept;
    /// `connected_at` is stamped the first time the edge becomes accepted.
    pub async fn accept(
        &self,
        connection_id: Uuid,
        actor: Uuid,
    ) -> Result<connection::Model, GraphError> {
        let edge = self.require(connection_id).await?;

        if actor != edge.recipient_id() {
            return Err(GraphError::Forbidden {
                action: "accept this connection request",
            });
        }

        match edge.status {
            ConnectionStatus::Pending => {}
            ConnectionStatus::Accepted => return Err(GraphError::AlreadyAccepted),
            ConnectionStatus::Rejected => {
                return Err(GraphError::InvalidTransition { current: "rejected" });
            }
        }

        let edge = self.connections.mark_accepted(edge, Utc::now()).await?;
        self.notifier.connection_accepted(&edge);
        Ok(edge)
    }

    /// Reject a pending request; terminal. Same authorization rule as accept.
    pub async fn reject(
        &self,
        connection_id: Uuid,
        actor: Uuid,
    ) -> Result<connection::Model, GraphError> {
        let edge = self.require(connection_id).await?;

        if actor != edge.recipient_id() {
            return Err(GraphError::Forbidden {
                action: "reject this connection request",
            });
        }

        match edge.status {
            ConnectionStatus::Pending => {}
            ConnectionStatus::Accepted => {
                return Err(GraphError::InvalidTransition { current: "accepted" });
            }
            ConnectionStatus::Rejected => {
                return Err(GraphError::InvalidTransition { current: "rejected" });
            }
        }

        Ok(self.connections.mark_rejected(edge, Utc::now()).await?)
    }

    /// Remove an edge entirely; works for any status, from either endpoint.
    /// No soft-delete: removal erases the edge and its interaction history.
    pub async fn remove(&self, connection_id: Uuid, actor: Uuid) -> Result<(), GraphError> {
        let edge = self.require(connection_id).await?;

        if !edge.involves(actor) {
            return Err(GraphError::Forbidden {
                action: "remove this connection",
            });
        }

        self.connections.delete_by_id(connection_id).await?;
        Ok(())
    }

    /// The pair status between `caller` and `other`, from the caller's
    /// perspective (`pending_sent` vs `pending_received`).
    pub async fn status_between(
        &self,
        caller: Uuid,
        other: Uuid,
    ) -> Result<PairStatusView, GraphError> {
        if caller == other {
            return Err(GraphError::SelfReference);
        }

        let view = match self.connections.find_by_pair(caller, other).await? {
            Some(edge) => PairStatusView {
                status: edge.status_for(caller),
                connection_id: Some(edge.id),
            },
            None => PairStatusView {
                status: PairStatus::None,
                connection_id: None,
            },
        };

        Ok(view)
    }

    async fn require(&self, connection_id: Uuid) -> Result<connection::Model, GraphError> {
        self.connections
            .find_by_id(connection_id)
            .await?
            .ok_or(GraphError::NotFound {
                resource: "connection",
            })
    }
}
