use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{AttemptStore, PreferenceStore, QuestionStore, SessionStore};
use crate::error::{Error, Result};
use crate::models::attempt::{Attempt, Checklist, NewAttempt};
use crate::models::preferences::{
    FeedbackDetail, FeedbackEmphasis, FeedbackTone, Preferences, PreferencesUpdate,
};
use crate::models::question::{Question, QuestionFilter, SampleAnswer};
use crate::models::session::{NewSession, Session, SessionStatus};

const QUESTION_COLUMNS: &str = "id, category, role, difficulty, focus, question, \
    sample_situation, sample_task, sample_action, sample_result, created_at";

const SESSION_COLUMNS: &str = "id, owner_id, interview_role, difficulty, status, \
    current_question_id, overall_score, total_duration, created_at, ended_at";

const ATTEMPT_COLUMNS: &str = "id, session_id, question_id, transcription, audio_url, duration, \
    score, checklist, feedback, improved_version, actionable_feedback, created_at";

const PREFERENCE_COLUMNS: &str = "owner_id, default_role, default_difficulty, focus_behavioral, \
    focus_technical, focus_system_design, feedback_tone, feedback_detail, feedback_emphasis, \
    auto_start_next, show_sample_answer, enable_timer, countdown_seconds, auto_submit_on_silence, \
    updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn question_from_row(row: &PgRow) -> Result<Question> {
    let situation: Option<String> = row.try_get("sample_situation")?;
    let task: Option<String> = row.try_get("sample_task")?;
    let action: Option<String> = row.try_get("sample_action")?;
    let result: Option<String> = row.try_get("sample_result")?;
    // The four parts live in their own columns; a partial set is treated as absent.
    let sample_answer = match (situation, task, action, result) {
        (Some(situation), Some(task), Some(action), Some(result)) => Some(SampleAnswer {
            situation,
            task,
            action,
            result,
        }),
        _ => None,
    };

    Ok(Question {
        id: row.try_get("id")?,
        category: row.try_get("category")?,
        role: row.try_get("role")?,
        difficulty: row.try_get("difficulty")?,
        focus: row.try_get("focus")?,
        question: row.try_get("question")?,
        sample_answer,
        created_at: row.try_get("created_at")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<Session> {
    let status: String = row.try_get("status")?;
    Ok(Session {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        interview_role: row.try_get("interview_role")?,
        difficulty: row.try_get("difficulty")?,
        status: status.parse::<SessionStatus>().map_err(Error::Internal)?,
        current_question_id: row.try_get("current_question_id")?,
        overall_score: row.try_get("overall_score")?,
        total_duration: row.try_get("total_duration")?,
        created_at: row.try_get("created_at")?,
        ended_at: row.try_get("ended_at")?,
    })
}

fn attempt_from_row(row: &PgRow) -> Result<Attempt> {
    let checklist: Option<Json<Checklist>> = row.try_get("checklist")?;
    Ok(Attempt {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        question_id: row.try_get("question_id")?,
        transcription: row.try_get("transcription")?,
        audio_url: row.try_get("audio_url")?,
        duration: row.try_get("duration")?,
        score: row.try_get("score")?,
        checklist: checklist.map(|c| c.0),
        feedback: row.try_get("feedback")?,
        improved_version: row.try_get("improved_version")?,
        actionable_feedback: row.try_get("actionable_feedback")?,
        created_at: row.try_get("created_at")?,
    })
}

fn preferences_from_row(row: &PgRow) -> Result<Preferences> {
    let tone: String = row.try_get("feedback_tone")?;
    let detail: String = row.try_get("feedback_detail")?;
    let emphasis: String = row.try_get("feedback_emphasis")?;
    Ok(Preferences {
        owner_id: row.try_get("owner_id")?,
        default_role: row.try_get("default_role")?,
        default_difficulty: row.try_get("default_difficulty")?,
        focus_behavioral: row.try_get("focus_behavioral")?,
        focus_technical: row.try_get("focus_technical")?,
        focus_system_design: row.try_get("focus_system_design")?,
        feedback_tone: FeedbackTone::parse_lenient(&tone),
        feedback_detail: FeedbackDetail::parse_lenient(&detail),
        feedback_emphasis: FeedbackEmphasis::parse_lenient(&emphasis),
        auto_start_next: row.try_get("auto_start_next")?,
        show_sample_answer: row.try_get("show_sample_answer")?,
        enable_timer: row.try_get("enable_timer")?,
        countdown_seconds: row.try_get("countdown_seconds")?,
        auto_submit_on_silence: row.try_get("auto_submit_on_silence")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        let row = sqlx::query(&format!("SELECT {} FROM questions WHERE id = $1", QUESTION_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(question_from_row).transpose()
    }

    async fn list_questions(&self) -> Result<Vec<Question>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM questions ORDER BY category, created_at",
            QUESTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(question_from_row).collect()
    }

    async fn count_questions(&self, filter: &QuestionFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM questions
            WHERE role = ANY($1)
              AND difficulty = $2
              AND NOT (id = ANY($3))
              AND ($4::text[] IS NULL OR focus = ANY($4))
            "#,
        )
        .bind(&filter.roles)
        .bind(&filter.difficulty)
        .bind(&filter.exclude)
        .bind(&filter.focuses)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn question_at(&self, filter: &QuestionFilter, offset: i64) -> Result<Option<Question>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM questions
            WHERE role = ANY($1)
              AND difficulty = $2
              AND NOT (id = ANY($3))
              AND ($4::text[] IS NULL OR focus = ANY($4))
            ORDER BY id
            OFFSET $5 LIMIT 1
            "#,
            QUESTION_COLUMNS
        ))
        .bind(&filter.roles)
        .bind(&filter.difficulty)
        .bind(&filter.exclude)
        .bind(&filter.focuses)
        .bind(offset)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(question_from_row).transpose()
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn replace_in_progress(&self, new: NewSession) -> Result<(Session, u64)> {
        let mut tx = self.pool.begin().await?;

        // Concurrent starts for one owner queue here until the first commits.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&new.owner_id)
            .execute(&mut *tx)
            .await?;

        let abandoned = sqlx::query(
            r#"UPDATE sessions SET status = 'ABANDONED', ended_at = $2
               WHERE owner_id = $1 AND status = 'IN_PROGRESS'"#,
        )
        .bind(&new.owner_id)
        .bind(new.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO sessions (owner_id, interview_role, difficulty, status, total_duration, created_at)
            VALUES ($1, $2, $3, 'IN_PROGRESS', 0, $4)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(&new.owner_id)
        .bind(&new.interview_role)
        .bind(&new.difficulty)
        .bind(new.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((session_from_row(&row)?, abandoned))
    }

    async fn create_session(&self, new: NewSession) -> Result<Session> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO sessions (owner_id, interview_role, difficulty, status, total_duration, created_at)
            VALUES ($1, $2, $3, 'IN_PROGRESS', 0, $4)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(&new.owner_id)
        .bind(&new.interview_role)
        .bind(&new.difficulty)
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await?;
        session_from_row(&row)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        let row = sqlx::query(&format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn set_current_question(&self, id: Uuid, question_id: Uuid) -> Result<()> {
        let res = sqlx::query(r#"UPDATE sessions SET current_question_id = $2 WHERE id = $1"#)
            .bind(id)
            .bind(question_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Session not found".to_string()));
        }
        Ok(())
    }

    async fn complete_session(
        &self,
        id: Uuid,
        overall_score: i32,
        total_duration: i32,
        ended_at: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE sessions
            SET status = 'COMPLETED', overall_score = $2, total_duration = $3, ended_at = $4
            WHERE id = $1 AND status = 'IN_PROGRESS'
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(id)
        .bind(overall_score)
        .bind(total_duration)
        .bind(ended_at)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn list_completed_sessions(&self, owner_id: &str) -> Result<Vec<Session>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM sessions WHERE owner_id = $1 AND status = 'COMPLETED'
               ORDER BY created_at DESC"#,
            SESSION_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(session_from_row).collect()
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn insert_attempt(&self, new: NewAttempt) -> Result<Attempt> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO session_attempts (
                session_id, question_id, transcription, audio_url, duration, score,
                checklist, feedback, improved_version, actionable_feedback, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(new.session_id)
        .bind(new.question_id)
        .bind(&new.transcription)
        .bind(&new.audio_url)
        .bind(new.duration)
        .bind(new.score)
        .bind(new.checklist.map(Json))
        .bind(&new.feedback)
        .bind(&new.improved_version)
        .bind(&new.actionable_feedback)
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await?;
        attempt_from_row(&row)
    }

    async fn get_attempt(&self, id: Uuid) -> Result<Option<Attempt>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM session_attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(attempt_from_row).transpose()
    }

    async fn list_attempts(&self, session_id: Uuid) -> Result<Vec<Attempt>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM session_attempts WHERE session_id = $1 ORDER BY created_at ASC, id ASC",
            ATTEMPT_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(attempt_from_row).collect()
    }

    async fn list_attempts_for_sessions(&self, session_ids: &[Uuid]) -> Result<Vec<Attempt>> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT {} FROM session_attempts WHERE session_id = ANY($1) ORDER BY created_at ASC",
            ATTEMPT_COLUMNS
        ))
        .bind(session_ids)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(attempt_from_row).collect()
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    async fn find_preferences(&self, owner_id: &str) -> Result<Option<Preferences>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM preferences WHERE owner_id = $1",
            PREFERENCE_COLUMNS
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(preferences_from_row).transpose()
    }

    async fn get_or_create_preferences(&self, owner_id: &str, now: DateTime<Utc>) -> Result<Preferences> {
        let defaults = Preferences::defaults_for(owner_id, now);
        self.write_preferences(&defaults, false).await?;
        self.find_preferences(owner_id)
            .await?
            .ok_or_else(|| Error::Internal("preferences row missing after insert".to_string()))
    }

    async fn update_preferences(
        &self,
        owner_id: &str,
        update: PreferencesUpdate,
        now: DateTime<Utc>,
    ) -> Result<Preferences> {
        let mut prefs = match self.find_preferences(owner_id).await? {
            Some(p) => p,
            None => Preferences::defaults_for(owner_id, now),
        };
        prefs.apply(update);
        prefs.updated_at = now;
        self.write_preferences(&prefs, true).await?;
        Ok(prefs)
    }
}

impl PgStore {
    async fn write_preferences(&self, prefs: &Preferences, overwrite: bool) -> Result<()> {
        let conflict = if overwrite {
            r#"ON CONFLICT (owner_id) DO UPDATE SET
                default_role = EXCLUDED.default_role,
                default_difficulty = EXCLUDED.default_difficulty,
                focus_behavioral = EXCLUDED.focus_behavioral,
                focus_technical = EXCLUDED.focus_technical,
                focus_system_design = EXCLUDED.focus_system_design,
                feedback_tone = EXCLUDED.feedback_tone,
                feedback_detail = EXCLUDED.feedback_detail,
                feedback_emphasis = EXCLUDED.feedback_emphasis,
                auto_start_next = EXCLUDED.auto_start_next,
                show_sample_answer = EXCLUDED.show_sample_answer,
                enable_timer = EXCLUDED.enable_timer,
                countdown_seconds = EXCLUDED.countdown_seconds,
                auto_submit_on_silence = EXCLUDED.auto_submit_on_silence,
                updated_at = EXCLUDED.updated_at"#
        } else {
            "ON CONFLICT (owner_id) DO NOTHING"
        };

        sqlx::query(&format!(
            r#"
            INSERT INTO preferences ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            {}
            "#,
            PREFERENCE_COLUMNS, conflict
        ))
        .bind(&prefs.owner_id)
        .bind(&prefs.default_role)
        .bind(&prefs.default_difficulty)
        .bind(prefs.focus_behavioral)
        .bind(prefs.focus_technical)
        .bind(prefs.focus_system_design)
        .bind(prefs.feedback_tone.as_str())
        .bind(prefs.feedback_detail.as_str())
        .bind(prefs.feedback_emphasis.as_str())
        .bind(prefs.auto_start_next)
        .bind(prefs.show_sample_answer)
        .bind(prefs.enable_timer)
        .bind(prefs.countdown_seconds)
        .bind(prefs.auto_submit_on_silence)
        .bind(prefs.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
