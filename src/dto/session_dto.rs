use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::{Question, QuestionSummary};
use crate::models::session::SessionStatus;
use crate::services::attempt_service::ReviewedAttempt;
use crate::services::question_selector::FilterChoice;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[serde(default, alias = "interviewType")]
    #[validate(length(max = 100))]
    pub interview_role: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub interview_role: String,
    pub difficulty: String,
    pub question_available: bool,
    pub current_question: Option<Question>,
    pub filter: FilterChoice,
}

/// Body of the endpoints that act on one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionIdRequest {
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndSessionResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub final_score: i32,
    pub total_duration: i32,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextQuestionResponse {
    /// False once the session is over or the pool is exhausted.
    pub ok: bool,
    pub status: SessionStatus,
    pub next_question: Option<Question>,
    pub final_score: Option<i32>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateResponse {
    pub id: Uuid,
    pub status: SessionStatus,
    pub interview_role: String,
    pub difficulty: String,
    pub current_question_id: Option<Uuid>,
    pub current_question: Option<QuestionSummary>,
    pub questions_answered: usize,
    pub max_questions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionAttemptsResponse {
    pub attempts: Vec<ReviewedAttempt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionListResponse {
    pub questions: Vec<Question>,
}
