//! Integration tests for the connection lifecycle, mutual-connection
//! computation, suggestion ranking, and strength scoring, run against an
//! in-memory store with the real migrations applied.

mod common;

use std::sync::Arc;

use common::{connect, lifecycle, seed_user, seed_user_full, setup_db};
use maison_graph::config::GraphPolicyConfig;
use maison_graph::error::GraphError;
use maison_graph::graph::{MutualGraph, StrengthScorer};
use maison_graph::models::connection::{ConnectionStatus, PairStatus};
use maison_graph::models::interaction_event::InteractionKind;
use maison_graph::models::user::VerificationTier;
use uuid::Uuid;

fn mutual_graph(db: &sea_orm::DatabaseConnection) -> MutualGraph {
    MutualGraph::new(Arc::new(db.clone()), GraphPolicyConfig::default())
}

fn scorer(db: &sea_orm::DatabaseConnection) -> StrengthScorer {
    StrengthScorer::new(Arc::new(db.clone()), GraphPolicyConfig::default())
}

#[tokio::test]
async fn request_and_accept_flow() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let lifecycle = lifecycle(&db);

    // No edge yet.
    let view = lifecycle.status_between(u1.id, u2.id).await.unwrap();
    assert_eq!(view.status, PairStatus::None);
    assert!(view.connection_id.is_none());

    let edge = lifecycle
        .create_request(u1.id, u2.id, Some("Loved your editorial work".to_string()))
        .await
        .unwrap();
    assert_eq!(edge.status, ConnectionStatus::Pending);
    assert_eq!(edge.initiator_id, u1.id);
    assert!(edge.connected_at.is_none());

    // Perspective translation.
    let from_initiator = lifecycle.status_between(u1.id, u2.id).await.unwrap();
    assert_eq!(from_initiator.status, PairStatus::PendingSent);
    let from_recipient = lifecycle.status_between(u2.id, u1.id).await.unwrap();
    assert_eq!(from_recipient.status, PairStatus::PendingReceived);

    let accepted = lifecycle.accept(edge.id, u2.id).await.unwrap();
    assert_eq!(accepted.status, ConnectionStatus::Accepted);
    assert!(accepted.connected_at.is_some());

    // A second accept fails AlreadyAccepted.
    let err = lifecycle.accept(edge.id, u2.id).await.unwrap_err();
    assert!(matches!(err, GraphError::AlreadyAccepted));
}

#[tokio::test]
async fn self_connection_is_rejected() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;

    let err = lifecycle(&db)
        .create_request(u1.id, u1.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::SelfReference));
}

#[tokio::test]
async fn duplicate_edge_is_rejected_in_both_directions() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let lifecycle = lifecycle(&db);

    let edge = lifecycle.create_request(u1.id, u2.id, None).await.unwrap();

    // Same direction.
    let err = lifecycle.create_request(u1.id, u2.id, None).await.unwrap_err();
    match err {
        GraphError::AlreadyExists {
            connection_id,
            status,
        } => {
            assert_eq!(connection_id, edge.id);
            assert_eq!(status, PairStatus::PendingSent);
        }
        other => panic!("expected AlreadyExists, got {:?}", other),
    }

    // Reverse direction: same edge, recipient perspective.
    let err = lifecycle.create_request(u2.id, u1.id, None).await.unwrap_err();
    match err {
        GraphError::AlreadyExists { status, .. } => {
            assert_eq!(status, PairStatus::PendingReceived);
        }
        other => panic!("expected AlreadyExists, got {:?}", other),
    }

    // Still exactly one edge after acceptance, reported as connected.
    lifecycle.accept(edge.id, u2.id).await.unwrap();
    let err = lifecycle.create_request(u2.id, u1.id, None).await.unwrap_err();
    assert!(matches!(
        err,
        GraphError::AlreadyExists {
            status: PairStatus::Connected,
            ..
        }
    ));
}

#[tokio::test]
async fn only_the_recipient_may_accept_or_reject() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let outsider = seed_user(&db, "Mara Lindqvist", "designer").await;
    let lifecycle = lifecycle(&db);

    let edge = lifecycle.create_request(u1.id, u2.id, None).await.unwrap();

    // The initiator cannot accept their own request.
    assert!(matches!(
        lifecycle.accept(edge.id, u1.id).await.unwrap_err(),
        GraphError::Forbidden { .. }
    ));
    // Neither can a third party.
    assert!(matches!(
        lifecycle.accept(edge.id, outsider.id).await.unwrap_err(),
        GraphError::Forbidden { .. }
    ));
    assert!(matches!(
        lifecycle.reject(edge.id, outsider.id).await.unwrap_err(),
        GraphError::Forbidden { .. }
    ));
}

#[tokio::test]
async fn rejected_edges_are_terminal() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let lifecycle = lifecycle(&db);

    let edge = lifecycle.create_request(u1.id, u2.id, None).await.unwrap();
    let rejected = lifecycle.reject(edge.id, u2.id).await.unwrap();
    assert_eq!(rejected.status, ConnectionStatus::Rejected);

    assert!(matches!(
        lifecycle.accept(edge.id, u2.id).await.unwrap_err(),
        GraphError::InvalidTransition { .. }
    ));
    assert!(matches!(
        lifecycle.reject(edge.id, u2.id).await.unwrap_err(),
        GraphError::InvalidTransition { .. }
    ));

    // A rejected pair reports status rejected to both sides.
    let view = lifecycle.status_between(u1.id, u2.id).await.unwrap();
    assert_eq!(view.status, PairStatus::Rejected);
}

#[tokio::test]
async fn removal_erases_the_edge_for_any_status() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let outsider = seed_user(&db, "Mara Lindqvist", "designer").await;
    let lifecycle = lifecycle(&db);

    let edge = connect(&db, &u1, &u2).await;

    assert!(matches!(
        lifecycle.remove(edge.id, outsider.id).await.unwrap_err(),
        GraphError::Forbidden { .. }
    ));

    lifecycle.remove(edge.id, u1.id).await.unwrap();

    let view = lifecycle.status_between(u1.id, u2.id).await.unwrap();
    assert_eq!(view.status, PairStatus::None);

    // Removal is not a soft state: a fresh request is allowed again.
    assert!(lifecycle.create_request(u2.id, u1.id, None).await.is_ok());

    assert!(matches!(
        lifecycle.remove(edge.id, u1.id).await.unwrap_err(),
        GraphError::NotFound { .. }
    ));
}

#[tokio::test]
async fn oversized_request_message_is_rejected() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;

    let err = lifecycle(&db)
        .create_request(u1.id, u2.id, Some("x".repeat(501)))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidInput { field: "message", .. }));
}

#[tokio::test]
async fn mutual_connections_intersect_accepted_neighbors() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let u3 = seed_user(&db, "Mara Lindqvist", "designer").await;
    let graph = mutual_graph(&db);

    // U1-U2 accepted, U2-U3 accepted, U1-U3 none.
    connect(&db, &u1, &u2).await;
    connect(&db, &u2, &u3).await;

    let mutual = graph.mutual_connections(u1.id, u3.id).await.unwrap();
    assert_eq!(mutual, vec![u2.id]);

    // Symmetric in its arguments.
    let reversed = graph.mutual_connections(u3.id, u1.id).await.unwrap();
    assert_eq!(mutual, reversed);

    assert!(graph.are_connected(u1.id, u2.id).await.unwrap());
    assert!(!graph.are_connected(u1.id, u3.id).await.unwrap());
}

#[tokio::test]
async fn pending_edges_do_not_count_as_mutual() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let u3 = seed_user(&db, "Mara Lindqvist", "designer").await;
    let graph = mutual_graph(&db);

    connect(&db, &u1, &u2).await;
    // U2-U3 stays pending.
    lifecycle(&db).create_request(u2.id, u3.id, None).await.unwrap();

    let mutual = graph.mutual_connections(u1.id, u3.id).await.unwrap();
    assert!(mutual.is_empty());

    assert!(!graph.are_connected(u2.id, u3.id).await.unwrap());
}

#[tokio::test]
async fn suggestions_rank_and_exclude_linked_profiles() {
    let db = setup_db().await;
    let me = seed_user_full(
        &db,
        "Anouk Devos",
        "model",
        Some("Paris"),
        &["runway", "editorial"],
        VerificationTier::Identity,
    )
    .await;
    let friend = seed_user(&db, "Jules Marchetti", "photographer").await;

    // Candidate sharing location, type, skills, and verification.
    let strong = seed_user_full(
        &db,
        "Mara Lindqvist",
        "model",
        Some("Paris"),
        &["runway"],
        VerificationTier::Professional,
    )
    .await;
    // Candidate with only a mutual connection through `friend`.
    let via_mutual = seed_user(&db, "Sofia Reyes", "stylist").await;
    // Candidate with no overlapping signals at all.
    let _stranger = seed_user(&db, "Lena Okafor", "makeup-artist").await;
    // Pending request: excluded from the pool despite not being accepted.
    let pending = seed_user(&db, "Iris Tanaka", "stylist").await;

    connect(&db, &me, &friend).await;
    connect(&db, &friend, &via_mutual).await;
    lifecycle(&db)
        .create_request(me.id, pending.id, None)
        .await
        .unwrap();

    let graph = mutual_graph(&db);
    let suggestions = graph.suggestions(me.id, None).await.unwrap();

    let ids: Vec<Uuid> = suggestions.iter().map(|s| s.profile.id).collect();
    assert!(!ids.contains(&me.id));
    assert!(!ids.contains(&friend.id));
    assert!(!ids.contains(&pending.id));

    // strong: 20 (location) + 15 (type) + 5 (skill) + 10 (verified) = 50.
    // via_mutual: 10 (one mutual through friend).
    // stranger: 0 signals, discarded.
    assert_eq!(ids, vec![strong.id, via_mutual.id]);

    let top = &suggestions[0];
    assert_eq!(top.score, 50);
    assert!(top.shared_location);
    assert!(top.shared_professional_type);
    assert_eq!(top.common_skills, 1);
    assert!(top.verified);

    let second = &suggestions[1];
    assert_eq!(second.score, 10);
    assert_eq!(second.mutual_connections, 1);
}

#[tokio::test]
async fn suggestions_respect_limit() {
    let db = setup_db().await;
    let me = seed_user_full(
        &db,
        "Anouk Devos",
        "model",
        Some("Paris"),
        &[],
        VerificationTier::None,
    )
    .await;

    for i in 0..5 {
        seed_user_full(
            &db,
            &format!("Candidate {}", i),
            "model",
            Some("Paris"),
            &[],
            VerificationTier::None,
        )
        .await;
    }

    let graph = mutual_graph(&db);
    let suggestions = graph.suggestions(me.id, Some(3)).await.unwrap();
    assert_eq!(suggestions.len(), 3);
}

#[tokio::test]
async fn record_interaction_applies_increment_and_clamps() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let edge = connect(&db, &u1, &u2).await;
    let scorer = scorer(&db);

    let after_message = scorer
        .record_interaction(edge.id, u1.id, InteractionKind::Message)
        .await
        .unwrap();
    assert_eq!(after_message.strength, 2);
    assert!(after_message.last_interaction_at.is_some());

    let after_recommendation = scorer
        .record_interaction(edge.id, u2.id, InteractionKind::Recommendation)
        .await
        .unwrap();
    assert_eq!(after_recommendation.strength, 12);

    // Pile on recommendations; the score clamps at 100.
    for _ in 0..12 {
        scorer
            .record_interaction(edge.id, u1.id, InteractionKind::Recommendation)
            .await
            .unwrap();
    }
    let final_edge = scorer
        .record_interaction(edge.id, u1.id, InteractionKind::Message)
        .await
        .unwrap();
    assert_eq!(final_edge.strength, 100);
}

#[tokio::test]
async fn interactions_require_an_accepted_edge_and_an_endpoint_actor() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let outsider = seed_user(&db, "Mara Lindqvist", "designer").await;
    let scorer = scorer(&db);

    let pending = lifecycle(&db)
        .create_request(u1.id, u2.id, None)
        .await
        .unwrap();

    assert!(matches!(
        scorer
            .record_interaction(pending.id, u1.id, InteractionKind::Message)
            .await
            .unwrap_err(),
        GraphError::InvalidTransition { .. }
    ));

    let accepted = lifecycle(&db).accept(pending.id, u2.id).await.unwrap();
    assert!(matches!(
        scorer
            .record_interaction(accepted.id, outsider.id, InteractionKind::Message)
            .await
            .unwrap_err(),
        GraphError::Forbidden { .. }
    ));
}

#[tokio::test]
async fn recalculate_scores_signals_and_derives_trend() {
    let db = setup_db().await;
    let u1 = seed_user_full(
        &db,
        "Anouk Devos",
        "model",
        Some("Paris"),
        &["runway", "editorial"],
        VerificationTier::Identity,
    )
    .await;
    let u2 = seed_user_full(
        &db,
        "Mara Lindqvist",
        "model",
        Some("Paris"),
        &["runway"],
        VerificationTier::Identity,
    )
    .await;
    let shared = seed_user(&db, "Jules Marchetti", "photographer").await;

    let edge = connect(&db, &u1, &u2).await;
    // One mutual connection through `shared`.
    connect(&db, &u1, &shared).await;
    connect(&db, &u2, &shared).await;

    let scorer = scorer(&db);
    scorer
        .record_interaction(edge.id, u1.id, InteractionKind::Endorsement)
        .await
        .unwrap();

    let recalculated = scorer.recalculate(edge.id).await.unwrap();

    // Attribute: 10 (type) + 8 (location) + 2 (one shared skill) = 20.
    // Mutual: one mutual at full weight = 3. Interaction: endorsement = 5.
    // Duration: connected moments ago = 0.
    assert_eq!(recalculated.strength, 28);
    assert!(recalculated.last_calculated_at.is_some());

    // Strength within bounds no matter what.
    assert!((0..=100).contains(&recalculated.strength));
}

#[tokio::test]
async fn concurrent_increments_are_not_lost() {
    let db = setup_db().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let edge = connect(&db, &u1, &u2).await;

    // Fire increments from both sides concurrently; the atomic in-place
    // update must apply every one of them.
    let mut handles = Vec::new();
    for i in 0..10 {
        let scorer = scorer(&db);
        let actor = if i % 2 == 0 { u1.id } else { u2.id };
        let edge_id = edge.id;
        handles.push(tokio::spawn(async move {
            scorer
                .record_interaction(edge_id, actor, InteractionKind::Message)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let final_edge = maison_graph::repositories::ConnectionRepository::new(Arc::new(db.clone()))
        .find_by_id(edge.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(final_edge.strength, 20);
}
