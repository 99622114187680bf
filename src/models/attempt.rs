use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One scored submission. Rows are only ever inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub session_id: Uuid,
    pub question_id: Uuid,
    pub transcription: String,
    pub audio_url: Option<String>,
    pub duration: i32,
    pub score: Option<i32>,
    pub checklist: Option<Checklist>,
    pub feedback: Option<String>,
    pub improved_version: Option<String>,
    pub actionable_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checklist {
    pub specific_examples_provided: bool,
    pub no_negative_language_detected: bool,
    pub no_filler_words_detected: bool,
    pub technical_detail_present: bool,
    pub appropriate_length: bool,
}

#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub session_id: Uuid,
    pub question_id: Uuid,
    pub transcription: String,
    pub audio_url: Option<String>,
    pub duration: i32,
    pub score: Option<i32>,
    pub checklist: Option<Checklist>,
    pub feedback: Option<String>,
    pub improved_version: Option<String>,
    pub actionable_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}
