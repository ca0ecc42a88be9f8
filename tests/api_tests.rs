//! End-to-end tests of the HTTP surface: routing, auth, status codes, and
//! problem+json error bodies, driven through the real router with an
//! in-memory migrated store.

mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::{seed_user, setup_db};
use maison_graph::config::AppConfig;
use maison_graph::models::user;
use maison_graph::server::{AppState, create_app};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const TOKEN: &str = "test-service-token";

async fn test_app() -> (Router, DatabaseConnection) {
    let db = setup_db().await;
    let config = Arc::new(AppConfig {
        service_tokens: vec![TOKEN.to_string()],
        ..Default::default()
    });
    (create_app(AppState::new(config, db.clone())), db)
}

fn authed(method: &str, uri: &str, user: Uuid, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", TOKEN))
        .header("X-User-Id", user.to_string());

    match body {
        Some(value) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_pending(
    app: &Router,
    initiator: &user::Model,
    recipient: &user::Model,
) -> Value {
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/connections",
            initiator.id,
            Some(json!({ "recipient_id": recipient.id })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn protected_routes_require_bearer_auth() {
    let (app, _db) = test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/connections")
        .header("X-User-Id", Uuid::new_v4().to_string())
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn root_and_health_are_public() {
    let (app, _db) = test_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "maison-graph");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn connection_request_lifecycle_over_http() {
    let (app, db) = test_app().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;

    let created = create_pending(&app, &u1, &u2).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["initiator_id"], u1.id.to_string());
    assert_eq!(created["recipient_id"], u2.id.to_string());
    let connection_id = created["id"].as_str().unwrap().to_string();

    // Duplicate attempt reports the pair status for the caller.
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/connections",
            u2.id,
            Some(json!({ "recipient_id": u1.id })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "ALREADY_EXISTS");
    assert_eq!(error["details"]["status"], "pending_received");

    // Status endpoint, both perspectives.
    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/connections/status/{}", u2.id),
            u1.id,
            None,
        ))
        .await
        .unwrap();
    let status = body_json(response).await;
    assert_eq!(status["status"], "pending_sent");
    assert_eq!(status["connection_id"], connection_id);

    // Initiator cannot accept their own request.
    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/connections/{}/accept", connection_id),
            u1.id,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Recipient accepts.
    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/connections/{}/accept", connection_id),
            u2.id,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let accepted = body_json(response).await;
    assert_eq!(accepted["status"], "accepted");
    assert!(accepted["connected_at"].is_string());

    // Second accept fails with the typed code.
    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/connections/{}/accept", connection_id),
            u2.id,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "ALREADY_ACCEPTED");

    // Listing returns the edge for either endpoint.
    let response = app
        .clone()
        .oneshot(authed("GET", "/connections?status=accepted", u1.id, None))
        .await
        .unwrap();
    let listing = body_json(response).await;
    assert_eq!(listing["connections"].as_array().unwrap().len(), 1);
    assert!(listing["next_cursor"].is_null());

    // Removal from either side.
    let response = app
        .clone()
        .oneshot(authed(
            "DELETE",
            &format!("/connections/{}", connection_id),
            u1.id,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/connections/status/{}", u2.id),
            u1.id,
            None,
        ))
        .await
        .unwrap();
    let status = body_json(response).await;
    assert_eq!(status["status"], "none");
}

#[tokio::test]
async fn self_connection_is_a_typed_error() {
    let (app, db) = test_app().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;

    let response = app
        .oneshot(authed(
            "POST",
            "/connections",
            u1.id,
            Some(json!({ "recipient_id": u1.id })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "SELF_REFERENCE");
    assert!(error["trace_id"].is_string());
}

#[tokio::test]
async fn mutual_and_suggestion_endpoints() {
    let (app, db) = test_app().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let u3 = seed_user(&db, "Mara Lindqvist", "designer").await;

    // U1-U2 and U2-U3 accepted through the API.
    for (a, b) in [(&u1, &u2), (&u2, &u3)] {
        let created = create_pending(&app, a, b).await;
        let id = created["id"].as_str().unwrap();
        let response = app
            .clone()
            .oneshot(authed(
                "PUT",
                &format!("/connections/{}/accept", id),
                b.id,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/connections/mutual/{}", u3.id),
            u1.id,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mutual = body_json(response).await;
    assert_eq!(mutual["count"], 1);
    assert_eq!(mutual["mutual_connections"][0], u2.id.to_string());

    // U3 is a mutual-of-mutual candidate for U1.
    let response = app
        .clone()
        .oneshot(authed("GET", "/connections/suggestions?limit=5", u1.id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let suggestions = body_json(response).await;
    let entries = suggestions["suggestions"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["user_id"], u3.id.to_string());
    assert_eq!(entries[0]["mutual_connections"], 1);
}

#[tokio::test]
async fn interaction_endpoint_applies_increment() {
    let (app, db) = test_app().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;

    let created = create_pending(&app, &u1, &u2).await;
    let id = created["id"].as_str().unwrap().to_string();
    app.clone()
        .oneshot(authed(
            "PUT",
            &format!("/connections/{}/accept", id),
            u2.id,
            None,
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/connections/{}/interactions", id),
            u1.id,
            Some(json!({ "kind": "endorsement" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["strength"], 5);
    assert!(updated["last_interaction_at"].is_string());

    // Recalculation stays within bounds and stamps the calculation time.
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/connections/{}/strength/recalculate", id),
            u1.id,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let recalculated = body_json(response).await;
    let strength = recalculated["strength"].as_i64().unwrap();
    assert!((0..=100).contains(&strength));
    assert!(recalculated["last_calculated_at"].is_string());
}

#[tokio::test]
async fn introduction_workflow_over_http() {
    let (app, db) = test_app().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;
    let u2 = seed_user(&db, "Jules Marchetti", "photographer").await;
    let u3 = seed_user(&db, "Mara Lindqvist", "designer").await;

    for (a, b) in [(&u1, &u2), (&u2, &u3)] {
        let created = create_pending(&app, a, b).await;
        let id = created["id"].as_str().unwrap();
        app.clone()
            .oneshot(authed(
                "PUT",
                &format!("/connections/{}/accept", id),
                b.id,
                None,
            ))
            .await
            .unwrap();
    }

    let payload = json!({
        "introducer_id": u2.id,
        "target_id": u3.id,
        "subject": "Introduction please",
        "message": "I admire your knitwear line.",
        "purpose": "collaboration",
    });

    // Ineligible introducer first: U3 doesn't know U1.
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/introductions",
            u1.id,
            Some(json!({
                "introducer_id": u3.id,
                "target_id": u2.id,
                "subject": "Hello",
                "message": "Hi there",
                "purpose": "networking",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "INTRODUCER_NOT_ELIGIBLE");

    // Valid request.
    let response = app
        .clone()
        .oneshot(authed("POST", "/introductions", u1.id, Some(payload.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "pending");
    let request_id = created["id"].as_str().unwrap().to_string();

    // Immediate duplicate.
    let response = app
        .clone()
        .oneshot(authed("POST", "/introductions", u1.id, Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "DUPLICATE_REQUEST");

    // Only the introducer may respond.
    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/introductions/{}/respond", request_id),
            u1.id,
            Some(json!({ "action": "accept" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Introducer accepts; message is generated and the request completes.
    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/introductions/{}/respond", request_id),
            u2.id,
            Some(json!({ "action": "accept", "message": "With pleasure" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let completed = body_json(response).await;
    assert_eq!(completed["status"], "completed");
    let intro_message = completed["introduction_message"]["message"].as_str().unwrap();
    assert!(intro_message.contains("Anouk Devos"));
    assert!(intro_message.contains("Mara Lindqvist"));
    assert!(!intro_message.contains("{{"));

    // Target acknowledges.
    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/introductions/{}/target-response", request_id),
            u3.id,
            Some(json!({ "accepted": true, "message": "Great to meet!" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let acknowledged = body_json(response).await;
    assert_eq!(acknowledged["status"], "completed");
    assert_eq!(acknowledged["target_response"]["accepted"], true);

    // Cancellation is no longer possible.
    let response = app
        .clone()
        .oneshot(authed(
            "DELETE",
            &format!("/introductions/{}", request_id),
            u1.id,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "NOT_CANCELLABLE");

    // Listing by role.
    let response = app
        .clone()
        .oneshot(authed("GET", "/introductions?role=introducer", u2.id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response).await;
    assert_eq!(listing["introductions"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(authed("GET", "/introductions?role=banana", u2.id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn limit_validation_applies_to_listings() {
    let (app, db) = test_app().await;
    let u1 = seed_user(&db, "Anouk Devos", "model").await;

    for uri in ["/connections?limit=0", "/connections?limit=101"] {
        let response = app
            .clone()
            .oneshot(authed("GET", uri, u1.id, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = body_json(response).await;
        assert_eq!(error["code"], "VALIDATION_FAILED");
    }

    let response = app
        .clone()
        .oneshot(authed("GET", "/connections?cursor=%21%21bad", u1.id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
