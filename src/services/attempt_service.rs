use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::attempt::{Attempt, NewAttempt};
use crate::models::question::{Question, QuestionSummary};
use crate::models::session::Session;
use crate::repository::Repositories;
use crate::services::score_service;
use crate::services::session_service::QUESTIONS_PER_SESSION;

#[derive(Debug, Clone, Serialize)]
pub struct ReviewedAttempt {
    #[serde(flatten)]
    pub attempt: Attempt,
    pub question: Option<QuestionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: Attempt,
    pub question: Option<Question>,
    /// First-appearance position of the question within its session.
    pub question_number: usize,
    pub is_last_question: bool,
}

/// Append-only attempt log plus the read views built on it.
#[derive(Clone)]
pub struct AttemptService {
    repos: Repositories,
}

impl AttemptService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Every submission becomes a new row; retries never overwrite.
    pub async fn record(&self, new: NewAttempt) -> Result<Attempt> {
        let attempt = self.repos.attempts.insert_attempt(new).await?;
        info!(
            attempt_id = %attempt.id,
            session_id = %attempt.session_id,
            question_id = %attempt.question_id,
            score = ?attempt.score,
            "Attempt recorded"
        );
        Ok(attempt)
    }

    async fn owned_session(&self, owner_id: &str, session_id: Uuid) -> Result<Session> {
        match self.repos.sessions.get_session(session_id).await? {
            Some(s) if s.owner_id == owner_id => Ok(s),
            _ => Err(Error::NotFound("Session not found".to_string())),
        }
    }

    /// Best attempt per question, oldest first, for the review screen.
    pub async fn list_session_attempts(
        &self,
        owner_id: &str,
        session_id: Uuid,
    ) -> Result<Vec<ReviewedAttempt>> {
        self.owned_session(owner_id, session_id).await?;
        let attempts = self.repos.attempts.list_attempts(session_id).await?;

        let mut out = Vec::new();
        for attempt in score_service::best_attempts(&attempts) {
            let question = self
                .repos
                .questions
                .get_question(attempt.question_id)
                .await?
                .as_ref()
                .map(QuestionSummary::from);
            out.push(ReviewedAttempt { attempt, question });
        }
        Ok(out)
    }

    pub async fn get_attempt(&self, owner_id: &str, attempt_id: Uuid) -> Result<AttemptDetail> {
        let attempt = self
            .repos
            .attempts
            .get_attempt(attempt_id)
            .await?
            .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))?;
        self.owned_session(owner_id, attempt.session_id)
            .await
            .map_err(|_| Error::NotFound("Attempt not found".to_string()))?;

        let siblings = self.repos.attempts.list_attempts(attempt.session_id).await?;
        let question_number =
            score_service::question_ordinal(&siblings, attempt.question_id).unwrap_or(1);
        let question = self.repos.questions.get_question(attempt.question_id).await?;

        Ok(AttemptDetail {
            attempt,
            question,
            question_number,
            is_last_question: question_number >= QUESTIONS_PER_SESSION,
        })
    }
}
