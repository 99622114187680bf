use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::{AttemptStore, PreferenceStore, QuestionStore, SessionStore};
use crate::error::{Error, Result};
use crate::models::attempt::{Attempt, NewAttempt};
use crate::models::preferences::{Preferences, PreferencesUpdate};
use crate::models::question::{NewQuestion, Question, QuestionFilter};
use crate::models::session::{NewSession, Session, SessionStatus};

#[derive(Default)]
struct Inner {
    // Questions are kept serialized so reads go through a real decode step.
    questions: Vec<(Uuid, JsonValue)>,
    sessions: HashMap<Uuid, Session>,
    attempts: Vec<Attempt>,
    preferences: HashMap<String, Preferences>,
}

/// Process-local store for tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Internal("in-memory store mutex poisoned".to_string()))
    }

    /// Ingestion hook; the service itself never writes questions.
    pub fn insert_question(&self, new: NewQuestion, created_at: DateTime<Utc>) -> Result<Question> {
        let question = Question {
            id: Uuid::new_v4(),
            category: new.category,
            role: new.role,
            difficulty: new.difficulty,
            focus: new.focus,
            question: new.question,
            sample_answer: new.sample_answer,
            created_at,
        };
        let encoded = serde_json::to_value(&question)?;
        self.lock()?.questions.push((question.id, encoded));
        Ok(question)
    }

    fn decoded_questions(&self) -> Result<Vec<Question>> {
        let guard = self.lock()?;
        guard
            .questions
            .iter()
            .map(|(_, v)| serde_json::from_value(v.clone()).map_err(Error::from))
            .collect()
    }

    fn filtered(&self, filter: &QuestionFilter) -> Result<Vec<Question>> {
        let mut matching: Vec<Question> = self
            .decoded_questions()?
            .into_iter()
            .filter(|q| filter.matches(q))
            .collect();
        matching.sort_by_key(|q| q.id);
        Ok(matching)
    }
}

#[async_trait]
impl QuestionStore for InMemoryStore {
    async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        let raw = {
            let guard = self.lock()?;
            guard
                .questions
                .iter()
                .find(|(qid, _)| *qid == id)
                .map(|(_, v)| v.clone())
        };
        match raw {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    async fn list_questions(&self) -> Result<Vec<Question>> {
        self.decoded_questions()
    }

    async fn count_questions(&self, filter: &QuestionFilter) -> Result<i64> {
        Ok(self.filtered(filter)?.len() as i64)
    }

    async fn question_at(&self, filter: &QuestionFilter, offset: i64) -> Result<Option<Question>> {
        if offset < 0 {
            return Ok(None);
        }
        Ok(self.filtered(filter)?.into_iter().nth(offset as usize))
    }
}

fn open_session(new: NewSession) -> Session {
    Session {
        id: Uuid::new_v4(),
        owner_id: new.owner_id,
        interview_role: new.interview_role,
        difficulty: new.difficulty,
        status: SessionStatus::InProgress,
        current_question_id: None,
        overall_score: None,
        total_duration: 0,
        created_at: new.created_at,
        ended_at: None,
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn replace_in_progress(&self, new: NewSession) -> Result<(Session, u64)> {
        let mut guard = self.lock()?;
        let mut abandoned = 0;
        for session in guard.sessions.values_mut() {
            if session.owner_id == new.owner_id && session.status == SessionStatus::InProgress {
                session.status = SessionStatus::Abandoned;
                session.ended_at = Some(new.created_at);
                abandoned += 1;
            }
        }
        let session = open_session(new);
        guard.sessions.insert(session.id, session.clone());
        Ok((session, abandoned))
    }

    async fn create_session(&self, new: NewSession) -> Result<Session> {
        let session = open_session(new);
        self.lock()?.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn set_current_question(&self, id: Uuid, question_id: Uuid) -> Result<()> {
        let mut guard = self.lock()?;
        let session = guard
            .sessions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Session not found".to_string()))?;
        session.current_question_id = Some(question_id);
        Ok(())
    }

    async fn complete_session(
        &self,
        id: Uuid,
        overall_score: i32,
        total_duration: i32,
        ended_at: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        let mut guard = self.lock()?;
        let Some(session) = guard.sessions.get_mut(&id) else {
            return Ok(None);
        };
        if session.status != SessionStatus::InProgress {
            return Ok(None);
        }
        session.status = SessionStatus::Completed;
        session.overall_score = Some(overall_score);
        session.total_duration = total_duration;
        session.ended_at = Some(ended_at);
        Ok(Some(session.clone()))
    }

    async fn list_completed_sessions(&self, owner_id: &str) -> Result<Vec<Session>> {
        let guard = self.lock()?;
        let mut sessions: Vec<Session> = guard
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id && s.status == SessionStatus::Completed)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

#[async_trait]
impl AttemptStore for InMemoryStore {
    async fn insert_attempt(&self, new: NewAttempt) -> Result<Attempt> {
        let attempt = Attempt {
            id: Uuid::new_v4(),
            session_id: new.session_id,
            question_id: new.question_id,
            transcription: new.transcription,
            audio_url: new.audio_url,
            duration: new.duration,
            score: new.score,
            checklist: new.checklist,
            feedback: new.feedback,
            improved_version: new.improved_version,
            actionable_feedback: new.actionable_feedback,
            created_at: new.created_at,
        };
        self.lock()?.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn get_attempt(&self, id: Uuid) -> Result<Option<Attempt>> {
        Ok(self.lock()?.attempts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_attempts(&self, session_id: Uuid) -> Result<Vec<Attempt>> {
        let guard = self.lock()?;
        let mut attempts: Vec<Attempt> = guard
            .attempts
            .iter()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect();
        // stable: insertion order breaks equal timestamps
        attempts.sort_by_key(|a| a.created_at);
        Ok(attempts)
    }

    async fn list_attempts_for_sessions(&self, session_ids: &[Uuid]) -> Result<Vec<Attempt>> {
        let guard = self.lock()?;
        let mut attempts: Vec<Attempt> = guard
            .attempts
            .iter()
            .filter(|a| session_ids.contains(&a.session_id))
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.created_at);
        Ok(attempts)
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn find_preferences(&self, owner_id: &str) -> Result<Option<Preferences>> {
        Ok(self.lock()?.preferences.get(owner_id).cloned())
    }

    async fn get_or_create_preferences(&self, owner_id: &str, now: DateTime<Utc>) -> Result<Preferences> {
        let mut guard = self.lock()?;
        let prefs = guard
            .preferences
            .entry(owner_id.to_string())
            .or_insert_with(|| Preferences::defaults_for(owner_id, now));
        Ok(prefs.clone())
    }

    async fn update_preferences(
        &self,
        owner_id: &str,
        update: PreferencesUpdate,
        now: DateTime<Utc>,
    ) -> Result<Preferences> {
        let mut guard = self.lock()?;
        let prefs = guard
            .preferences
            .entry(owner_id.to_string())
            .or_insert_with(|| Preferences::defaults_for(owner_id, now));
        prefs.apply(update);
        prefs.updated_at = now;
        Ok(prefs.clone())
    }
}
