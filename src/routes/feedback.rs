use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use bytes::Bytes;
use uuid::Uuid;

use crate::{
    dto::feedback_dto::SubmitFeedbackResponse,
    error::{Error, Result},
    middleware::auth::Claims,
    services::evaluation_service::{AnswerInput, Submission},
    AppState,
};

const DEFAULT_AUDIO_MIME: &str = "audio/webm";

fn parse_id(raw: Option<String>, field: &str) -> Result<Option<Uuid>> {
    match raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Uuid::parse_str(&s)
            .map(Some)
            .map_err(|_| Error::BadRequest(format!("Invalid {}", field))),
    }
}

#[utoipa::path(
    post,
    path = "/api/feedback/submit",
    responses(
        (status = 200, description = "Attempt evaluated and stored", body = Json<SubmitFeedbackResponse>),
        (status = 400, description = "Missing sessionId or questionId"),
        (status = 404, description = "Session or question not found"),
        (status = 409, description = "Session already completed")
    )
)]
#[axum::debug_handler]
pub async fn submit_feedback(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut session_id: Option<String> = None;
    let mut question_id: Option<String> = None;
    let mut mode: Option<String> = None;
    let mut answer_text: Option<String> = None;
    let mut duration: Option<String> = None;
    let mut audio: Option<(Bytes, String)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "sessionId" | "session_id" => session_id = Some(field.text().await?),
            "questionId" | "question_id" => question_id = Some(field.text().await?),
            "mode" => mode = Some(field.text().await?),
            "answerText" | "answer_text" => answer_text = Some(field.text().await?),
            "duration" => duration = Some(field.text().await?),
            "audio" => {
                let mime = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_string());
                let data = field.bytes().await?;
                if !data.is_empty() {
                    audio = Some((data, mime));
                }
            }
            _ => {}
        }
    }

    let answer = match (audio, mode.as_deref()) {
        (Some((data, mime_type)), mode) if mode != Some("text") => AnswerInput::Audio {
            bytes: data.to_vec(),
            mime_type,
        },
        _ => AnswerInput::Text(answer_text.unwrap_or_default()),
    };

    let submission = Submission {
        session_id: parse_id(session_id, "sessionId")?,
        question_id: parse_id(question_id, "questionId")?,
        answer,
        duration: duration
            .and_then(|d| d.trim().parse::<f64>().ok())
            .map(|d| d.round() as i32)
            .unwrap_or(0),
    };

    let evaluation = state.evaluation_service.submit(&claims.sub, submission).await?;
    Ok(Json(SubmitFeedbackResponse {
        ok: true,
        attempt_id: evaluation.attempt.id,
        degraded: evaluation.degraded.is_some(),
        analysis: evaluation.attempt,
    }))
}

#[utoipa::path(
    get,
    path = "/api/feedback/attempt/{id}",
    params(
        ("id" = Uuid, Path, description = "Attempt ID")
    ),
    responses(
        (status = 200, description = "Attempt with its question and ordinal"),
        (status = 404, description = "Attempt not found")
    )
)]
#[axum::debug_handler]
pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state.attempt_service.get_attempt(&claims.sub, id).await?;
    Ok(Json(detail))
}
