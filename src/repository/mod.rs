//! Storage contracts for the practice core.
//!
//! Services depend only on these traits. `PgStore` backs production,
//! `InMemoryStore` backs tests and local prototyping.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::attempt::{Attempt, NewAttempt};
use crate::models::preferences::{Preferences, PreferencesUpdate};
use crate::models::question::{Question, QuestionFilter};
use crate::models::session::{NewSession, Session};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Read access to the reference question pool.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn get_question(&self, id: Uuid) -> Result<Option<Question>>;

    async fn list_questions(&self) -> Result<Vec<Question>>;

    async fn count_questions(&self, filter: &QuestionFilter) -> Result<i64>;

    /// Row `offset` of the filtered pool under a stable ordering.
    async fn question_at(&self, filter: &QuestionFilter, offset: i64) -> Result<Option<Question>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Moves every IN_PROGRESS session of the new session's owner to
    /// ABANDONED and inserts `new`, as one atomic step. Returns the new
    /// session and how many sessions were abandoned.
    async fn replace_in_progress(&self, new: NewSession) -> Result<(Session, u64)>;

    async fn create_session(&self, new: NewSession) -> Result<Session>;

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;

    async fn set_current_question(&self, id: Uuid, question_id: Uuid) -> Result<()>;

    /// IN_PROGRESS -> COMPLETED. Returns `None` when the session was not
    /// IN_PROGRESS, leaving it untouched.
    async fn complete_session(
        &self,
        id: Uuid,
        overall_score: i32,
        total_duration: i32,
        ended_at: DateTime<Utc>,
    ) -> Result<Option<Session>>;

    /// COMPLETED sessions of an owner, newest first.
    async fn list_completed_sessions(&self, owner_id: &str) -> Result<Vec<Session>>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn insert_attempt(&self, new: NewAttempt) -> Result<Attempt>;

    async fn get_attempt(&self, id: Uuid) -> Result<Option<Attempt>>;

    /// All attempts of a session, oldest first.
    async fn list_attempts(&self, session_id: Uuid) -> Result<Vec<Attempt>>;

    async fn list_attempts_for_sessions(&self, session_ids: &[Uuid]) -> Result<Vec<Attempt>>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn find_preferences(&self, owner_id: &str) -> Result<Option<Preferences>>;

    /// Returns stored preferences, inserting defaults on first access.
    async fn get_or_create_preferences(&self, owner_id: &str, now: DateTime<Utc>) -> Result<Preferences>;

    async fn update_preferences(
        &self,
        owner_id: &str,
        update: PreferencesUpdate,
        now: DateTime<Utc>,
    ) -> Result<Preferences>;
}

/// The four stores as shared trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub questions: Arc<dyn QuestionStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub attempts: Arc<dyn AttemptStore>,
    pub preferences: Arc<dyn PreferenceStore>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: QuestionStore + SessionStore + AttemptStore + PreferenceStore + 'static,
    {
        Self {
            questions: store.clone(),
            sessions: store.clone(),
            attempts: store.clone(),
            preferences: store,
        }
    }
}
