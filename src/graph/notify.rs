//! # Activity Notifications
//!
//! The engine emits logical activity events at the seams where the platform's
//! notification collaborator hooks in. Delivery and formatting are that
//! collaborator's concern; the default implementation here records structured
//! log events and bumps counters so the events are observable without it.

use crate::models::connection;
use crate::models::introduction_request;
use metrics::counter;

/// Logical activity events emitted by the graph engine.
pub trait ActivityNotifier: Send + Sync {
    fn connection_requested(&self, edge: &connection::Model);
    fn connection_accepted(&self, edge: &connection::Model);
    fn introduction_requested(&self, request: &introduction_request::Model);
    fn introduction_responded(&self, request: &introduction_request::Model, accepted: bool);
}

/// Default notifier: structured logs plus metrics counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl ActivityNotifier for LoggingNotifier {
    fn connection_requested(&self, edge: &connection::Model) {
        counter!("graph_connection_requests_total").increment(1);
        tracing::info!(
            connection_id = %edge.id,
            initiator_id = %edge.initiator_id,
            recipient_id = %edge.recipient_id(),
            "Connection request created"
        );
    }

    fn connection_accepted(&self, edge: &connection::Model) {
        counter!("graph_connections_accepted_total").increment(1);
        tracing::info!(
            connection_id = %edge.id,
            initiator_id = %edge.initiator_id,
            "Connection accepted"
        );
    }

    fn introduction_requested(&self, request: &introduction_request::Model) {
        counter!("graph_introduction_requests_total").increment(1);
        tracing::info!(
            request_id = %request.id,
            requester_id = %request.requester_id,
            introducer_id = %request.introducer_id,
            target_id = %request.target_id,
            "Introduction request created"
        );
    }

    fn introduction_responded(&self, request: &introduction_request::Model, accepted: bool) {
        counter!("graph_introduction_responses_total", "accepted" => accepted.to_string())
            .increment(1);
        tracing::info!(
            request_id = %request.id,
            introducer_id = %request.introducer_id,
            accepted,
            "Introduction request responded"
        );
    }
}
