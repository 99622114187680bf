use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::session_dto::{NextQuestionResponse, SessionIdRequest, SessionStateResponse},
    error::Result,
    middleware::auth::Claims,
    models::question::QuestionSummary,
    models::session::SessionStatus,
    routes::session::require_session_id,
    services::session_service::{AdvanceOutcome, QUESTIONS_PER_SESSION},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/practice/next",
    request_body = SessionIdRequest,
    responses(
        (status = 200, description = "Next question, completion or exhausted pool", body = Json<NextQuestionResponse>),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session was abandoned")
    )
)]
#[axum::debug_handler]
pub async fn next_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SessionIdRequest>,
) -> Result<impl IntoResponse> {
    let session_id = require_session_id(&payload)?;
    let outcome = state.session_service.advance(&claims.sub, session_id).await?;

    let body = match outcome {
        AdvanceOutcome::Next(question) => NextQuestionResponse {
            ok: true,
            status: SessionStatus::InProgress,
            next_question: Some(question),
            final_score: None,
            message: None,
        },
        AdvanceOutcome::Completed(session) => NextQuestionResponse {
            ok: false,
            status: session.status,
            next_question: None,
            final_score: session.overall_score,
            message: Some("Session completed".to_string()),
        },
        AdvanceOutcome::NoQuestionAvailable => NextQuestionResponse {
            ok: false,
            status: SessionStatus::InProgress,
            next_question: None,
            final_score: None,
            message: Some("No more questions available for this role and difficulty".to_string()),
        },
    };
    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/api/practice/session/{id}",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session status and current question", body = Json<SessionStateResponse>),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn get_session_state(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let current = state.session_service.get_state(&claims.sub, id).await?;
    Ok(Json(SessionStateResponse {
        id: current.session.id,
        status: current.session.status,
        interview_role: current.session.interview_role,
        difficulty: current.session.difficulty,
        current_question_id: current.session.current_question_id,
        current_question: current.current_question.as_ref().map(QuestionSummary::from),
        questions_answered: current.questions_answered,
        max_questions: QUESTIONS_PER_SESSION,
    }))
}
