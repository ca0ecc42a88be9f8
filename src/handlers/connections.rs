//! # Connections API Handlers
//!
//! HTTP surface of the connection lifecycle, strength scorer, and
//! mutual/suggestion engine. All routes act as the authenticated caller
//! supplied by the identity layer.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{Caller, CallerHeader, ServiceAuth};
use crate::error::ApiError;
use crate::models::connection::{self, ConnectionStatus, PairStatus, StrengthTrend};
use crate::models::interaction_event::InteractionKind;
use crate::repositories::connection::parse_cursor_param;
use crate::server::AppState;

/// Connection edge as exposed over the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionDto {
    #[schema(value_type = String)]
    pub id: Uuid,
    /// The side that sent the request
    #[schema(value_type = String)]
    pub initiator_id: Uuid,
    /// The side that received it
    #[schema(value_type = String)]
    pub recipient_id: Uuid,
    pub status: ConnectionStatus,
    /// Free text attached at creation, if any
    pub message: Option<String>,
    /// Strength score, 0..=100
    pub strength: i32,
    pub strength_trend: StrengthTrend,
    pub last_calculated_at: Option<String>,
    pub tags: Option<serde_json::Value>,
    pub created_at: String,
    pub connected_at: Option<String>,
    pub last_interaction_at: Option<String>,
}

impl From<connection::Model> for ConnectionDto {
    fn from(model: connection::Model) -> Self {
        let recipient_id = model.recipient_id();
        Self {
            id: model.id,
            initiator_id: model.initiator_id,
            recipient_id,
            status: model.status,
            message: model.message,
            strength: model.strength,
            strength_trend: model.strength_trend,
            last_calculated_at: model.last_calculated_at.map(to_rfc3339),
            tags: model.tags,
            created_at: to_rfc3339(model.created_at),
            connected_at: model.connected_at.map(to_rfc3339),
            last_interaction_at: model.last_interaction_at.map(to_rfc3339),
        }
    }
}

fn to_rfc3339(dt: sea_orm::prelude::DateTimeWithTimeZone) -> String {
    let utc: DateTime<Utc> = dt.with_timezone(&Utc);
    utc.to_rfc3339()
}

/// Request payload for creating a connection request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateConnectionRequestDto {
    /// Profile to connect with
    #[schema(value_type = String)]
    pub recipient_id: Uuid,
    /// Optional free text (<= 500 characters)
    pub message: Option<String>,
}

/// Create a new pending connection request
#[utoipa::path(
    post,
    path = "/connections",
    security(("bearer_auth" = [])),
    params(CallerHeader),
    request_body = CreateConnectionRequestDto,
    responses(
        (status = 201, description = "Connection request created", body = ConnectionDto),
        (status = 400, description = "Self reference, duplicate edge, or validation failure", body = ApiError),
        (status = 404, description = "Recipient not found", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn create_connection(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Json(request): Json<CreateConnectionRequestDto>,
) -> Result<(StatusCode, Json<ConnectionDto>), ApiError> {
    let edge = state
        .lifecycle()
        .create_request(caller.user_id(), request.recipient_id, request.message)
        .await?;

    Ok((StatusCode::CREATED, Json(edge.into())))
}

/// Accept a pending connection request
#[utoipa::path(
    put,
    path = "/connections/{id}/accept",
    security(("bearer_auth" = [])),
    params(CallerHeader, ("id" = Uuid, Path, description = "Connection ID")),
    responses(
        (status = 200, description = "Connection accepted", body = ConnectionDto),
        (status = 400, description = "Already accepted or invalid transition", body = ApiError),
        (status = 403, description = "Caller is not the recipient", body = ApiError),
        (status = 404, description = "Connection not found", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn accept_connection(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionDto>, ApiError> {
    let edge = state.lifecycle().accept(id, caller.user_id()).await?;
    Ok(Json(edge.into()))
}

/// Reject a pending connection request (terminal)
#[utoipa::path(
    put,
    path = "/connections/{id}/reject",
    security(("bearer_auth" = [])),
    params(CallerHeader, ("id" = Uuid, Path, description = "Connection ID")),
    responses(
        (status = 200, description = "Connection rejected", body = ConnectionDto),
        (status = 403, description = "Caller is not the recipient", body = ApiError),
        (status = 404, description = "Connection not found", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn reject_connection(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionDto>, ApiError> {
    let edge = state.lifecycle().reject(id, caller.user_id()).await?;
    Ok(Json(edge.into()))
}

/// Response for deletions
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// Remove a connection edge entirely
#[utoipa::path(
    delete,
    path = "/connections/{id}",
    security(("bearer_auth" = [])),
    params(CallerHeader, ("id" = Uuid, Path, description = "Connection ID")),
    responses(
        (status = 200, description = "Connection removed", body = DeletedResponse),
        (status = 403, description = "Caller is not an endpoint", body = ApiError),
        (status = 404, description = "Connection not found", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn remove_connection(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.lifecycle().remove(id, caller.user_id()).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}

/// Pair status from the caller's perspective
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PairStatusDto {
    pub status: PairStatus,
    #[schema(value_type = Option<String>)]
    pub connection_id: Option<Uuid>,
}

/// Connection status between the caller and another profile
#[utoipa::path(
    get,
    path = "/connections/status/{user_id}",
    security(("bearer_auth" = [])),
    params(CallerHeader, ("user_id" = Uuid, Path, description = "The other profile")),
    responses(
        (status = 200, description = "Pair status from the caller's perspective", body = PairStatusDto),
        (status = 400, description = "Self reference", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn connection_status(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PairStatusDto>, ApiError> {
    let view = state
        .lifecycle()
        .status_between(caller.user_id(), user_id)
        .await?;

    Ok(Json(PairStatusDto {
        status: view.status,
        connection_id: view.connection_id,
    }))
}

/// Query parameters for connection listing
#[derive(Debug, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ListConnectionsQuery {
    /// Optional status filter
    pub status: Option<ConnectionStatus>,
    /// Maximum number of connections to return (default: 50, max: 100)
    pub limit: Option<i64>,
    /// Opaque cursor for pagination continuation
    pub cursor: Option<String>,
}

/// Response wrapper for connection listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionsResponse {
    pub connections: Vec<ConnectionDto>,
    /// Opaque cursor for fetching the next page (null on the last page)
    pub next_cursor: Option<String>,
}

/// List the caller's connection edges
#[utoipa::path(
    get,
    path = "/connections",
    security(("bearer_auth" = [])),
    params(CallerHeader, ListConnectionsQuery),
    responses(
        (status = 200, description = "Caller's connections", body = ConnectionsResponse),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn list_connections(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Query(query): Query<ListConnectionsQuery>,
) -> Result<Json<ConnectionsResponse>, ApiError> {
    let limit = validate_limit(query.limit)?;
    let cursor = parse_cursor_param(query.cursor.as_deref())?;

    let (edges, next_cursor) = state
        .connections()
        .list_for_user(caller.user_id(), query.status, limit, cursor)
        .await?;

    Ok(Json(ConnectionsResponse {
        connections: edges.into_iter().map(ConnectionDto::from).collect(),
        next_cursor,
    }))
}

/// Response for mutual-connection queries
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MutualConnectionsResponse {
    #[schema(value_type = Vec<String>)]
    pub mutual_connections: Vec<Uuid>,
    pub count: usize,
}

/// Mutual connections between the caller and another profile
#[utoipa::path(
    get,
    path = "/connections/mutual/{user_id}",
    security(("bearer_auth" = [])),
    params(CallerHeader, ("user_id" = Uuid, Path, description = "The other profile")),
    responses(
        (status = 200, description = "Accepted connections shared by both profiles", body = MutualConnectionsResponse)
    ),
    tag = "connections"
)]
pub async fn mutual_connections(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Path(user_id): Path<Uuid>,
) -> Result<Json<MutualConnectionsResponse>, ApiError> {
    let mutual = state
        .mutual()
        .mutual_connections(caller.user_id(), user_id)
        .await?;

    Ok(Json(MutualConnectionsResponse {
        count: mutual.len(),
        mutual_connections: mutual,
    }))
}

/// Query parameters for suggestions
#[derive(Debug, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct SuggestionsQuery {
    /// Maximum number of suggestions to return (default from policy, max: 100)
    pub limit: Option<i64>,
}

/// A ranked suggestion entry
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuggestionDto {
    #[schema(value_type = String)]
    pub user_id: Uuid,
    pub display_name: String,
    pub professional_type: String,
    pub location: Option<String>,
    pub score: i64,
    pub mutual_connections: usize,
    pub shared_location: bool,
    pub shared_professional_type: bool,
    pub common_skills: usize,
    pub verified: bool,
}

/// Response wrapper for suggestions
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<SuggestionDto>,
}

/// Ranked connection suggestions for the caller
#[utoipa::path(
    get,
    path = "/connections/suggestions",
    security(("bearer_auth" = [])),
    params(CallerHeader, SuggestionsQuery),
    responses(
        (status = 200, description = "Ranked non-connected candidates", body = SuggestionsResponse),
        (status = 404, description = "Caller profile not found", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn suggestions(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Query(query): Query<SuggestionsQuery>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let limit = match query.limit {
        Some(limit) => Some(validate_limit(Some(limit))?),
        None => None,
    };

    let ranked = state
        .mutual()
        .suggestions(caller.user_id(), limit)
        .await?;

    let suggestions = ranked
        .into_iter()
        .map(|s| SuggestionDto {
            user_id: s.profile.id,
            display_name: s.profile.display_name,
            professional_type: s.profile.professional_type,
            location: s.profile.location,
            score: s.score,
            mutual_connections: s.mutual_connections,
            shared_location: s.shared_location,
            shared_professional_type: s.shared_professional_type,
            common_skills: s.common_skills,
            verified: s.verified,
        })
        .collect();

    Ok(Json(SuggestionsResponse { suggestions }))
}

/// Request payload for recording an interaction
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordInteractionDto {
    pub kind: InteractionKind,
}

/// Record an interaction event on a connection, applying its strength
/// increment atomically
#[utoipa::path(
    put,
    path = "/connections/{id}/interactions",
    security(("bearer_auth" = [])),
    params(CallerHeader, ("id" = Uuid, Path, description = "Connection ID")),
    request_body = RecordInteractionDto,
    responses(
        (status = 200, description = "Interaction recorded", body = ConnectionDto),
        (status = 400, description = "Edge is not accepted", body = ApiError),
        (status = 403, description = "Caller is not an endpoint", body = ApiError),
        (status = 404, description = "Connection not found", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn record_interaction(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordInteractionDto>,
) -> Result<Json<ConnectionDto>, ApiError> {
    let edge = state
        .scorer()
        .record_interaction(id, caller.user_id(), request.kind)
        .await?;

    Ok(Json(edge.into()))
}

/// Recalculate a connection's strength score from scratch
#[utoipa::path(
    post,
    path = "/connections/{id}/strength/recalculate",
    security(("bearer_auth" = [])),
    params(CallerHeader, ("id" = Uuid, Path, description = "Connection ID")),
    responses(
        (status = 200, description = "Strength recalculated", body = ConnectionDto),
        (status = 403, description = "Caller is not an endpoint", body = ApiError),
        (status = 404, description = "Connection not found", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn recalculate_strength(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionDto>, ApiError> {
    // Only an endpoint may force a recalculation.
    let edge = state
        .connections()
        .find_by_id(id)
        .await
        .map_err(crate::error::GraphError::from)?
        .ok_or(crate::error::GraphError::NotFound {
            resource: "connection",
        })?;
    if !edge.involves(caller.user_id()) {
        return Err(crate::error::GraphError::Forbidden {
            action: "recalculate this connection's strength",
        }
        .into());
    }

    let edge = state.scorer().recalculate(id).await?;
    Ok(Json(edge.into()))
}

pub(crate) fn validate_limit(limit: Option<i64>) -> Result<u64, ApiError> {
    let limit = limit.unwrap_or(50);
    if !(1..=100).contains(&limit) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "limit must be between 1 and 100",
        ));
    }
    Ok(limit as u64)
}
