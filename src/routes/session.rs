use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::session_dto::{
        EndSessionResponse, SessionAttemptsResponse, SessionIdRequest, StartSessionRequest,
        StartSessionResponse,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    AppState,
};

pub(crate) fn require_session_id(payload: &SessionIdRequest) -> Result<Uuid> {
    payload
        .session_id
        .ok_or_else(|| Error::BadRequest("Missing sessionId".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/session/start",
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Session started", body = Json<StartSessionResponse>),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let started = state
        .session_service
        .start(&claims.sub, payload.interview_role, payload.difficulty)
        .await?;

    Ok(Json(StartSessionResponse {
        session_id: started.session.id,
        status: started.session.status,
        interview_role: started.session.interview_role,
        difficulty: started.session.difficulty,
        question_available: started.question.is_some(),
        current_question: started.question,
        filter: started.filter,
    }))
}

#[utoipa::path(
    post,
    path = "/api/session/end",
    request_body = SessionIdRequest,
    responses(
        (status = 200, description = "Session completed", body = Json<EndSessionResponse>),
        (status = 400, description = "Missing sessionId"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session was abandoned")
    )
)]
#[axum::debug_handler]
pub async fn end_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SessionIdRequest>,
) -> Result<impl IntoResponse> {
    let session_id = require_session_id(&payload)?;
    let session = state.session_service.end(&claims.sub, session_id).await?;

    Ok(Json(EndSessionResponse {
        success: true,
        session_id: session.id,
        status: session.status,
        final_score: session.overall_score.unwrap_or(0),
        total_duration: session.total_duration,
        ended_at: session.ended_at,
    }))
}

#[utoipa::path(
    get,
    path = "/api/session/stats",
    responses(
        (status = 200, description = "Completed session count and average score")
    )
)]
#[axum::debug_handler]
pub async fn session_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let stats = state.analytics_service.stats(&claims.sub).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/session/{id}/attempts",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Best attempt per question", body = Json<SessionAttemptsResponse>),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn session_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let attempts = state
        .attempt_service
        .list_session_attempts(&claims.sub, id)
        .await?;
    Ok(Json(SessionAttemptsResponse { attempts }))
}
