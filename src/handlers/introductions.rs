//! # Introductions API Handlers
//!
//! HTTP surface of the three-party introduction brokering workflow.

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
use crate::graph::introductions::{IntroducerDecision, IntroductionInput};
use crate::handlers::connections::validate_limit;
use crate::models::introduction_request::{self, IntroductionPurpose, IntroductionStatus};
use crate::repositories::connection::parse_cursor_param;
use crate::repositories::introduction::ParticipantRole;
use crate::server::AppState;

/// Introducer's response to a request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IntroducerResponseDto {
    pub message: Option<String>,
    pub responded_at: String,
}

/// Generated introduction message
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IntroductionMessageDto {
    pub subject: String,
    pub message: String,
    pub sent_at: String,
}

/// Target's acknowledgment of a completed introduction
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TargetResponseDto {
    pub accepted: Option<bool>,
    pub message: Option<String>,
    pub responded_at: String,
}

/// Introduction request as exposed over the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IntroductionDto {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub requester_id: Uuid,
    #[schema(value_type = String)]
    pub introducer_id: Uuid,
    #[schema(value_type = String)]
    pub target_id: Uuid,
    pub subject: String,
    pub message: String,
    pub purpose: IntroductionPurpose,
    pub status: IntroductionStatus,
    pub introducer_response: Option<IntroducerResponseDto>,
    pub introduction_message: Option<IntroductionMessageDto>,
    pub target_response: Option<TargetResponseDto>,
    pub expires_at: String,
    pub created_at: String,
}

impl From<introduction_request::Model> for IntroductionDto {
    fn from(model: introduction_request::Model) -> Self {
        let introducer_response =
            model
                .introducer_responded_at
                .map(|responded_at| IntroducerResponseDto {
                    message: model.introducer_message.clone(),
                    responded_at: to_rfc3339(responded_at),
                });

        let introduction_message = match (&model.intro_subject, &model.intro_message) {
            (Some(subject), Some(message)) => Some(IntroductionMessageDto {
                subject: subject.clone(),
                message: message.clone(),
                sent_at: model.intro_sent_at.map(to_rfc3339).unwrap_or_default(),
            }),
            _ => None,
        };

        let target_response = model
            .target_responded_at
            .map(|responded_at| TargetResponseDto {
                accepted: model.target_accepted,
                message: model.target_message.clone(),
                responded_at: to_rfc3339(responded_at),
            });

        Self {
            id: model.id,
            requester_id: model.requester_id,
            introducer_id: model.introducer_id,
            target_id: model.target_id,
            subject: model.subject,
            message: model.message,
            purpose: model.purpose,
            status: model.status,
            introducer_response,
            introduction_message,
            target_response,
            expires_at: to_rfc3339(model.expires_at),
            created_at: to_rfc3339(model.created_at),
        }
    }
}

fn to_rfc3339(dt: sea_orm::prelude::DateTimeWithTimeZone) -> String {
    let utc: DateTime<Utc> = dt.with_timezone(&Utc);
    utc.to_rfc3339()
}

/// Request payload for creating an introduction request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateIntroductionDto {
    /// Mutual connection asked to broker the introduction
    #[schema(value_type = String)]
    pub introducer_id: Uuid,
    /// Profile the requester wants to be introduced to
    #[schema(value_type = String)]
    pub target_id: Uuid,
    /// <= 200 characters
    pub subject: String,
    /// <= 1000 characters
    pub message: String,
    pub purpose: IntroductionPurpose,
}

/// Create an introduction request
#[utoipa::path(
    post,
    path = "/introductions",
    security(("bearer_auth" = [])),
    params(CallerHeader),
    request_body = CreateIntroductionDto,
    responses(
        (status = 201, description = "Introduction request created", body = IntroductionDto),
        (status = 400, description = "Ineligible introducer, duplicate, already connected, or validation failure", body = ApiError),
        (status = 404, description = "Participant not found", body = ApiError)
    ),
    tag = "introductions"
)]
pub async fn create_introduction(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Json(request): Json<CreateIntroductionDto>,
) -> Result<(StatusCode, Json<IntroductionDto>), ApiError> {
    let created = state
        .introductions()
        .request(
            caller.user_id(),
            IntroductionInput {
                introducer: request.introducer_id,
                target: request.target_id,
                subject: request.subject,
                message: request.message,
                purpose: request.purpose,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Introducer action on a pending request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RespondAction {
    Accept,
    Decline,
}

/// Request payload for the introducer's response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RespondIntroductionDto {
    pub action: RespondAction,
    /// Optional note back to the requester
    pub message: Option<String>,
    /// Optional template override for the generated introduction message
    pub custom_intro_message: Option<String>,
}

/// Introducer accepts or declines a pending request
#[utoipa::path(
    put,
    path = "/introductions/{id}/respond",
    security(("bearer_auth" = [])),
    params(CallerHeader, ("id" = Uuid, Path, description = "Introduction request ID")),
    request_body = RespondIntroductionDto,
    responses(
        (status = 200, description = "Response recorded; on accept the introduction message is generated", body = IntroductionDto),
        (status = 400, description = "Request is not pending or has expired", body = ApiError),
        (status = 403, description = "Caller is not the introducer", body = ApiError),
        (status = 404, description = "Request not found", body = ApiError)
    ),
    tag = "introductions"
)]
pub async fn respond_introduction(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(request): Json<RespondIntroductionDto>,
) -> Result<Json<IntroductionDto>, ApiError> {
    let decision = match request.action {
        RespondAction::Accept => IntroducerDecision::Accept,
        RespondAction::Decline => IntroducerDecision::Decline,
    };

    let updated = state
        .introductions()
        .respond(
            id,
            caller.user_id(),
            decision,
            request.message,
            request.custom_intro_message,
        )
        .await?;

    Ok(Json(updated.into()))
}

/// Request payload for the target's acknowledgment
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TargetResponseRequestDto {
    pub accepted: bool,
    pub message: Option<String>,
}

/// Target records an acknowledgment on a completed introduction
#[utoipa::path(
    put,
    path = "/introductions/{id}/target-response",
    security(("bearer_auth" = [])),
    params(CallerHeader, ("id" = Uuid, Path, description = "Introduction request ID")),
    request_body = TargetResponseRequestDto,
    responses(
        (status = 200, description = "Acknowledgment recorded; status unchanged", body = IntroductionDto),
        (status = 400, description = "Introduction not completed yet", body = ApiError),
        (status = 403, description = "Caller is not the target", body = ApiError),
        (status = 404, description = "Request not found", body = ApiError)
    ),
    tag = "introductions"
)]
pub async fn target_response(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(request): Json<TargetResponseRequestDto>,
) -> Result<Json<IntroductionDto>, ApiError> {
    let updated = state
        .introductions()
        .record_target_response(id, caller.user_id(), request.accepted, request.message)
        .await?;

    Ok(Json(updated.into()))
}

/// Cancel a pending introduction request (requester only)
#[utoipa::path(
    delete,
    path = "/introductions/{id}",
    security(("bearer_auth" = [])),
    params(CallerHeader, ("id" = Uuid, Path, description = "Introduction request ID")),
    responses(
        (status = 200, description = "Request cancelled", body = IntroductionDto),
        (status = 400, description = "Request is no longer cancellable", body = ApiError),
        (status = 403, description = "Caller is not the requester", body = ApiError),
        (status = 404, description = "Request not found", body = ApiError)
    ),
    tag = "introductions"
)]
pub async fn cancel_introduction(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<IntroductionDto>, ApiError> {
    let cancelled = state
        .introductions()
        .cancel(id, caller.user_id())
        .await?;

    Ok(Json(cancelled.into()))
}

/// Query parameters for introduction listing
#[derive(Debug, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ListIntroductionsQuery {
    /// Restrict to one seat: requester, introducer, or target
    pub role: Option<String>,
    /// Maximum number of requests to return (default: 50, max: 100)
    pub limit: Option<i64>,
    /// Opaque cursor for pagination continuation
    pub cursor: Option<String>,
}

/// Response wrapper for introduction listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IntroductionsResponse {
    pub introductions: Vec<IntroductionDto>,
    pub next_cursor: Option<String>,
}

/// List introduction requests involving the caller
#[utoipa::path(
    get,
    path = "/introductions",
    security(("bearer_auth" = [])),
    params(CallerHeader, ListIntroductionsQuery),
    responses(
        (status = 200, description = "Requests involving the caller", body = IntroductionsResponse),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "introductions"
)]
pub async fn list_introductions(
    State(state): State<AppState>,
    _auth: ServiceAuth,
    caller: Caller,
    Query(query): Query<ListIntroductionsQuery>,
) -> Result<Json<IntroductionsResponse>, ApiError> {
    let limit = validate_limit(query.limit)?;
    let cursor = parse_cursor_param(query.cursor.as_deref())?;

    let role = match query.role.as_deref() {
        None => None,
        Some("requester") => Some(ParticipantRole::Requester),
        Some("introducer") => Some(ParticipantRole::Introducer),
        Some("target") => Some(ParticipantRole::Target),
        Some(other) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                &format!(
                    "role must be requester, introducer, or target (got '{}')",
                    other
                ),
            ));
        }
    };

    let (requests, next_cursor) = state
        .introduction_repo()
        .list_involving(caller.user_id(), role, limit, cursor)
        .await
        .map_err(crate::error::GraphError::from)?;

    Ok(Json(IntroductionsResponse {
        introductions: requests.into_iter().map(IntroductionDto::from).collect(),
        next_cursor,
    }))
}
