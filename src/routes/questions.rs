use axum::{
    extract::State,
    response::{IntoResponse, Json},
};

use crate::{dto::session_dto::QuestionListResponse, error::Result, AppState};

#[utoipa::path(
    get,
    path = "/api/questions",
    responses(
        (status = 200, description = "Reference question pool", body = Json<QuestionListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_questions(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let questions = state.questions.list_questions().await?;
    Ok(Json(QuestionListResponse { questions }))
}
