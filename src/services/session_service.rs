//! Session lifecycle: IN_PROGRESS -> COMPLETED (fourth distinct question or
//! explicit end) and IN_PROGRESS -> ABANDONED (superseded by a new start).
//! Both terminal states are final.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::preferences::{DEFAULT_DIFFICULTY, DEFAULT_ROLE};
use crate::models::question::Question;
use crate::models::session::{NewSession, Session, SessionStatus};
use crate::repository::Repositories;
use crate::services::question_selector::{FilterChoice, QuestionSelector};
use crate::services::score_service;
use crate::utils::time::Clock;

pub const QUESTIONS_PER_SESSION: usize = 4;

#[derive(Debug, Clone)]
pub struct StartedSession {
    pub session: Session,
    pub question: Option<Question>,
    pub filter: FilterChoice,
    pub abandoned: u64,
}

#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    Completed(Session),
    Next(Question),
    NoQuestionAvailable,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub session: Session,
    pub current_question: Option<Question>,
    pub questions_answered: usize,
}

#[derive(Clone)]
pub struct SessionService {
    repos: Repositories,
    selector: QuestionSelector,
    clock: Arc<dyn Clock>,
}

fn pick(explicit: Option<String>, preferred: &str, fallback: &str) -> String {
    explicit
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| Some(preferred.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| fallback.to_string())
}

impl SessionService {
    pub fn new(repos: Repositories, selector: QuestionSelector, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            selector,
            clock,
        }
    }

    /// Loads a session owned by `owner_id`. Sessions of other owners are
    /// reported as missing.
    pub async fn load_owned(&self, owner_id: &str, session_id: Uuid) -> Result<Session> {
        match self.repos.sessions.get_session(session_id).await? {
            Some(s) if s.owner_id == owner_id => Ok(s),
            _ => Err(Error::NotFound("Session not found".to_string())),
        }
    }

    pub async fn start(
        &self,
        owner_id: &str,
        role: Option<String>,
        difficulty: Option<String>,
    ) -> Result<StartedSession> {
        let now = self.clock.now();
        let prefs = self
            .repos
            .preferences
            .get_or_create_preferences(owner_id, now)
            .await?;
        let role = pick(role, &prefs.default_role, DEFAULT_ROLE);
        let difficulty = pick(difficulty, &prefs.default_difficulty, DEFAULT_DIFFICULTY);

        let (mut session, abandoned) = self
            .repos
            .sessions
            .replace_in_progress(NewSession {
                owner_id: owner_id.to_string(),
                interview_role: role.clone(),
                difficulty: difficulty.clone(),
                created_at: now,
            })
            .await?;

        let selection = self
            .selector
            .select(&role, &difficulty, &[], Some(&prefs))
            .await?;
        if let Some(q) = &selection.question {
            self.repos.sessions.set_current_question(session.id, q.id).await?;
            session.current_question_id = Some(q.id);
        }

        info!(
            session_id = %session.id,
            owner_id,
            role = %role,
            difficulty = %difficulty,
            abandoned,
            has_question = selection.question.is_some(),
            "New session started"
        );

        Ok(StartedSession {
            session,
            question: selection.question,
            filter: selection.choice,
            abandoned,
        })
    }

    /// Moves to the next unattempted question, or completes the session once
    /// four distinct questions have attempts.
    pub async fn advance(&self, owner_id: &str, session_id: Uuid) -> Result<AdvanceOutcome> {
        let session = self.load_owned(owner_id, session_id).await?;
        match session.status {
            SessionStatus::Completed => return Ok(AdvanceOutcome::Completed(session)),
            SessionStatus::Abandoned => {
                return Err(Error::Conflict("Session was abandoned".to_string()))
            }
            SessionStatus::InProgress => {}
        }

        let attempts = self.repos.attempts.list_attempts(session_id).await?;
        let attempted = score_service::distinct_question_ids(&attempts);
        if attempted.len() >= QUESTIONS_PER_SESSION {
            let done = self.finalize(&session).await?;
            return Ok(AdvanceOutcome::Completed(done));
        }

        let prefs = self.repos.preferences.find_preferences(owner_id).await?;
        let selection = self
            .selector
            .select(
                &session.interview_role,
                &session.difficulty,
                &attempted,
                prefs.as_ref(),
            )
            .await?;

        match selection.question {
            Some(q) => {
                self.repos.sessions.set_current_question(session_id, q.id).await?;
                info!(session_id = %session_id, question_id = %q.id, answered = attempted.len(), "Advanced session");
                Ok(AdvanceOutcome::Next(q))
            }
            None => Ok(AdvanceOutcome::NoQuestionAvailable),
        }
    }

    /// Early termination. Ending a COMPLETED session returns it unchanged.
    pub async fn end(&self, owner_id: &str, session_id: Uuid) -> Result<Session> {
        let session = self.load_owned(owner_id, session_id).await?;
        match session.status {
            SessionStatus::Completed => Ok(session),
            SessionStatus::Abandoned => Err(Error::Conflict("Session was abandoned".to_string())),
            SessionStatus::InProgress => self.finalize(&session).await,
        }
    }

    pub async fn get_state(&self, owner_id: &str, session_id: Uuid) -> Result<SessionState> {
        let session = self.load_owned(owner_id, session_id).await?;
        let current_question = match session.current_question_id {
            Some(id) => self.repos.questions.get_question(id).await?,
            None => None,
        };
        let attempts = self.repos.attempts.list_attempts(session_id).await?;
        Ok(SessionState {
            questions_answered: score_service::distinct_question_ids(&attempts).len(),
            session,
            current_question,
        })
    }

    async fn finalize(&self, session: &Session) -> Result<Session> {
        let attempts = self.repos.attempts.list_attempts(session.id).await?;
        let totals = score_service::aggregate(&attempts);

        let completed = self
            .repos
            .sessions
            .complete_session(
                session.id,
                totals.overall_score,
                totals.total_duration,
                self.clock.now(),
            )
            .await?;

        match completed {
            Some(done) => {
                info!(
                    session_id = %done.id,
                    overall_score = totals.overall_score,
                    total_duration = totals.total_duration,
                    questions = totals.distinct_questions,
                    "Session completed"
                );
                Ok(done)
            }
            // Lost a race with another finalize or a new start.
            None => match self.repos.sessions.get_session(session.id).await? {
                Some(s) if s.status == SessionStatus::Completed => Ok(s),
                _ => Err(Error::Conflict("Session is no longer in progress".to_string())),
            },
        }
    }
}
