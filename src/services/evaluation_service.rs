//! Turns a submitted answer into a persisted, scored attempt.
//!
//! Validation failures are reported before anything is written. Past that
//! point every path ends in an inserted attempt: collaborator failures and
//! unreadable model output produce a degraded attempt (score 0, no
//! checklist, fixed feedback) instead of an error.

use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::attempt::{Attempt, NewAttempt};
use crate::models::preferences::{FeedbackDetail, FeedbackEmphasis, FeedbackTone};
use crate::models::session::SessionStatus;
use crate::repository::Repositories;
use crate::services::ai_service::{FeedbackModel, Transcriber};
use crate::services::alert_service::AlertService;
use crate::services::attempt_service::AttemptService;
use crate::services::audio_store::AudioStore;
use crate::services::feedback_parser::{self, ScoredFeedback};
use crate::services::prompts;
use crate::services::score_service;
use crate::services::session_service::QUESTIONS_PER_SESSION;
use crate::utils::time::Clock;

pub const FORMAT_ERROR_FEEDBACK: &str = "AI response format error. Please try again.";
pub const UNAVAILABLE_FEEDBACK: &str = "AI feedback is temporarily unavailable. Please try again.";

#[derive(Debug, Clone)]
pub enum AnswerInput {
    Text(String),
    Audio { bytes: Vec<u8>, mime_type: String },
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub session_id: Option<Uuid>,
    pub question_id: Option<Uuid>,
    pub answer: AnswerInput,
    pub duration: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    ScoringUnavailable,
    UnreadableOutput,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub attempt: Attempt,
    pub degraded: Option<Degradation>,
}

#[derive(Clone)]
pub struct EvaluationService {
    repos: Repositories,
    attempts: AttemptService,
    transcriber: Arc<dyn Transcriber>,
    model: Arc<dyn FeedbackModel>,
    audio: Arc<dyn AudioStore>,
    alerts: Arc<AlertService>,
    clock: Arc<dyn Clock>,
}

impl EvaluationService {
    pub fn new(
        repos: Repositories,
        transcriber: Arc<dyn Transcriber>,
        model: Arc<dyn FeedbackModel>,
        audio: Arc<dyn AudioStore>,
        alerts: Arc<AlertService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            attempts: AttemptService::new(repos.clone()),
            repos,
            transcriber,
            model,
            audio,
            alerts,
            clock,
        }
    }

    pub async fn submit(&self, owner_id: &str, submission: Submission) -> Result<Evaluation> {
        let (Some(session_id), Some(question_id)) = (submission.session_id, submission.question_id)
        else {
            return Err(Error::BadRequest("Missing sessionId or questionId".to_string()));
        };

        let question = self
            .repos
            .questions
            .get_question(question_id)
            .await?
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;
        let session = match self.repos.sessions.get_session(session_id).await? {
            Some(s) if s.owner_id == owner_id => s,
            _ => return Err(Error::NotFound("Session not found".to_string())),
        };
        // The stored overall score is frozen at completion.
        if session.status == SessionStatus::Completed {
            return Err(Error::Conflict("Session is already completed".to_string()));
        }

        let existing = self.repos.attempts.list_attempts(session_id).await?;
        let attempted = score_service::distinct_question_ids(&existing);
        if !attempted.contains(&question_id) && attempted.len() >= QUESTIONS_PER_SESSION {
            return Err(Error::BadRequest(format!(
                "Session already has {} answered questions",
                QUESTIONS_PER_SESSION
            )));
        }

        let prefs = self.repos.preferences.find_preferences(&session.owner_id).await?;
        let (tone, detail, emphasis) = prefs
            .map(|p| (p.feedback_tone, p.feedback_detail, p.feedback_emphasis))
            .unwrap_or((
                FeedbackTone::default(),
                FeedbackDetail::default(),
                FeedbackEmphasis::default(),
            ));

        let (transcription, audio_url) = self.resolve_answer(session_id, submission.answer).await;
        if transcription.is_empty() {
            warn!(session_id = %session_id, question_id = %question_id, "Scoring an empty answer");
        }

        let instructions = prompts::feedback_instructions(emphasis, tone, detail);
        let (scored, degraded) = match self
            .model
            .score_answer(&instructions, &question.question, &transcription)
            .await
        {
            Ok(raw) => match feedback_parser::parse_feedback(&raw) {
                Ok(parsed) => (parsed, None),
                Err(e) => {
                    error!(
                        session_id = %session_id,
                        raw_len = raw.len(),
                        error = %e,
                        "Unreadable scoring output; storing degraded attempt"
                    );
                    (degraded_feedback(FORMAT_ERROR_FEEDBACK), Some(Degradation::UnreadableOutput))
                }
            },
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Scoring call failed; storing degraded attempt");
                self.alert_on_quota("scoring", &e).await;
                (degraded_feedback(UNAVAILABLE_FEEDBACK), Some(Degradation::ScoringUnavailable))
            }
        };

        let attempt = self
            .attempts
            .record(NewAttempt {
                session_id,
                question_id,
                transcription,
                audio_url,
                duration: submission.duration.max(0),
                score: Some(scored.score),
                checklist: scored.checklist,
                feedback: scored.feedback,
                improved_version: scored.improved_version,
                actionable_feedback: scored.actionable_feedback,
                created_at: self.clock.now(),
            })
            .await?;

        info!(
            attempt_id = %attempt.id,
            score = scored.score,
            degraded = degraded.is_some(),
            "Answer evaluated"
        );
        Ok(Evaluation { attempt, degraded })
    }

    /// Answer text plus the stored audio reference. Storage and
    /// transcription failures leave the respective part empty.
    async fn resolve_answer(&self, session_id: Uuid, answer: AnswerInput) -> (String, Option<String>) {
        match answer {
            AnswerInput::Text(text) => (text.trim().to_string(), None),
            AnswerInput::Audio { bytes, mime_type } => {
                let audio_url = match self.audio.save(&bytes, &mime_type).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Could not store answer audio");
                        None
                    }
                };
                let text = match self.transcriber.transcribe(&bytes, &mime_type).await {
                    Ok(text) => text.trim().to_string(),
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Transcription failed; continuing with empty text");
                        self.alert_on_quota("transcription", &e).await;
                        String::new()
                    }
                };
                (text, audio_url)
            }
        }
    }

    async fn alert_on_quota(&self, service: &str, err: &Error) {
        if matches!(err, Error::QuotaExceeded(_)) {
            self.alerts.quota_exhausted(service, &err.to_string()).await;
        }
    }
}

fn degraded_feedback(message: &str) -> ScoredFeedback {
    ScoredFeedback {
        score: 0,
        checklist: None,
        feedback: Some(message.to_string()),
        improved_version: None,
        actionable_feedback: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::Checklist;
    use crate::models::preferences::PreferencesUpdate;
    use crate::models::question::NewQuestion;
    use crate::models::session::NewSession;
    use crate::repository::{AttemptStore, InMemoryStore, PreferenceStore, SessionStore};
    use crate::services::ai_service::{MockFeedbackModel, MockTranscriber};
    use crate::services::alert_service::{AlertRateLimiter, MockAlertSender};
    use crate::services::audio_store::MockAudioStore;
    use crate::utils::time::ManualClock;
    use chrono::{DateTime, Duration, Utc};

    const GOOD_OUTPUT: &str = r#"{"score": 82, "checklist": {"specific_examples_provided": true, "apologizing_negative_language_detected": false, "no_filler_words_detected": true, "technical_detail_present": true, "appropriate_length": true}, "analysis_highlighting": "<green>Clear ownership</green>", "actionable_feedback": "Add metrics.", "improved_version": "Situation: ..."}"#;

    struct Fixture {
        store: Arc<InMemoryStore>,
        clock: ManualClock,
        session_id: Uuid,
        questions: Vec<Uuid>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let clock = ManualClock::new(DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap());
        let questions = (0..5)
            .map(|i| {
                store
                    .insert_question(
                        NewQuestion {
                            category: "Ownership".into(),
                            role: "General".into(),
                            difficulty: "Basic".into(),
                            focus: "Behavioral".into(),
                            question: format!("Tell me about challenge {}", i),
                            sample_answer: None,
                        },
                        clock.now(),
                    )
                    .unwrap()
                    .id
            })
            .collect();
        let session = store
            .create_session(NewSession {
                owner_id: "owner".into(),
                interview_role: "General".into(),
                difficulty: "Basic".into(),
                created_at: clock.now(),
            })
            .await
            .unwrap();
        Fixture {
            store,
            clock,
            session_id: session.id,
            questions,
        }
    }

    fn service(
        f: &Fixture,
        transcriber: MockTranscriber,
        model: MockFeedbackModel,
        audio: MockAudioStore,
        alert_sender: Option<MockAlertSender>,
    ) -> EvaluationService {
        let clock: Arc<dyn Clock> = Arc::new(f.clock.clone());
        let alerts = AlertService::new(
            AlertRateLimiter::new(clock.clone(), Duration::minutes(5)),
            alert_sender.map(|s| Arc::new(s) as Arc<dyn crate::services::alert_service::AlertSender>),
        );
        EvaluationService::new(
            Repositories::from_store(f.store.clone()),
            Arc::new(transcriber),
            Arc::new(model),
            Arc::new(audio),
            Arc::new(alerts),
            clock,
        )
    }

    fn text_submission(f: &Fixture, question: usize, text: &str) -> Submission {
        Submission {
            session_id: Some(f.session_id),
            question_id: Some(f.questions[question]),
            answer: AnswerInput::Text(text.to_string()),
            duration: 42,
        }
    }

    fn idle_transcriber() -> MockTranscriber {
        let mut t = MockTranscriber::new();
        t.expect_transcribe().never();
        t
    }

    fn idle_audio() -> MockAudioStore {
        let mut a = MockAudioStore::new();
        a.expect_save().never();
        a
    }

    fn model_returning(raw: &'static str) -> MockFeedbackModel {
        let mut m = MockFeedbackModel::new();
        m.expect_score_answer()
            .returning(move |_, _, _| Ok(raw.to_string()));
        m
    }

    #[tokio::test]
    async fn text_answer_is_scored_and_persisted() {
        let f = fixture().await;
        let svc = service(&f, idle_transcriber(), model_returning(GOOD_OUTPUT), idle_audio(), None);

        let eval = svc
            .submit("owner", text_submission(&f, 0, "  I led the migration.  "))
            .await
            .unwrap();
        assert!(eval.degraded.is_none());
        assert_eq!(eval.attempt.score, Some(82));
        assert_eq!(eval.attempt.transcription, "I led the migration.");
        assert_eq!(eval.attempt.duration, 42);
        assert_eq!(
            eval.attempt.checklist,
            Some(Checklist {
                specific_examples_provided: true,
                no_negative_language_detected: true,
                no_filler_words_detected: true,
                technical_detail_present: true,
                appropriate_length: true,
            })
        );
        assert_eq!(eval.attempt.feedback.as_deref(), Some("<green>Clear ownership</green>"));

        let stored = f.store.list_attempts(f.session_id).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn audio_answer_is_stored_and_transcribed() {
        let f = fixture().await;
        let mut audio = MockAudioStore::new();
        audio
            .expect_save()
            .times(1)
            .returning(|_, _| Ok("/uploads/abc.webm".to_string()));
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .withf(|bytes, mime| bytes.len() == 3 && mime.contains("webm"))
            .times(1)
            .returning(|_, _| Ok(" I shipped it. ".to_string()));
        let mut model = MockFeedbackModel::new();
        model
            .expect_score_answer()
            .withf(|_, question, answer| question.contains("challenge 1") && answer.contains("I shipped it."))
            .times(1)
            .returning(|_, _, _| Ok(GOOD_OUTPUT.to_string()));

        let svc = service(&f, transcriber, model, audio, None);
        let eval = svc
            .submit(
                "owner",
                Submission {
                    session_id: Some(f.session_id),
                    question_id: Some(f.questions[1]),
                    answer: AnswerInput::Audio {
                        bytes: vec![1, 2, 3],
                        mime_type: "audio/webm".into(),
                    },
                    duration: 15,
                },
            )
            .await
            .unwrap();
        assert_eq!(eval.attempt.audio_url.as_deref(), Some("/uploads/abc.webm"));
        assert_eq!(eval.attempt.transcription, "I shipped it.");
    }

    #[tokio::test]
    async fn failed_transcription_and_storage_still_reach_scoring() {
        let f = fixture().await;
        let mut audio = MockAudioStore::new();
        audio
            .expect_save()
            .returning(|_, _| Err(Error::Internal("disk full".into())));
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(|_, _| Err(Error::Upstream("timeout".into())));
        let mut model = MockFeedbackModel::new();
        model
            .expect_score_answer()
            .withf(|_, _, answer| answer.is_empty())
            .times(1)
            .returning(|_, _, _| Ok(r#"{"score": 5}"#.to_string()));

        let svc = service(&f, transcriber, model, audio, None);
        let eval = svc
            .submit(
                "owner",
                Submission {
                    session_id: Some(f.session_id),
                    question_id: Some(f.questions[0]),
                    answer: AnswerInput::Audio {
                        bytes: vec![9],
                        mime_type: "audio/webm".into(),
                    },
                    duration: 3,
                },
            )
            .await
            .unwrap();
        assert_eq!(eval.attempt.score, Some(5));
        assert!(eval.attempt.audio_url.is_none());
        assert_eq!(eval.attempt.transcription, "");
    }

    #[tokio::test]
    async fn malformed_output_persists_a_degraded_attempt() {
        let f = fixture().await;
        let svc = service(
            &f,
            idle_transcriber(),
            model_returning("Sorry, I cannot grade this right now."),
            idle_audio(),
            None,
        );

        let eval = svc.submit("owner", text_submission(&f, 0, "answer")).await.unwrap();
        assert_eq!(eval.degraded, Some(Degradation::UnreadableOutput));
        assert_eq!(eval.attempt.score, Some(0));
        assert!(eval.attempt.checklist.is_none());
        assert_eq!(eval.attempt.feedback.as_deref(), Some(FORMAT_ERROR_FEEDBACK));
        assert_eq!(f.store.list_attempts(f.session_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quota_failure_degrades_and_alerts_once() {
        let f = fixture().await;
        let mut model = MockFeedbackModel::new();
        model
            .expect_score_answer()
            .times(2)
            .returning(|_, _, _| Err(Error::QuotaExceeded("429".into())));
        let mut sender = MockAlertSender::new();
        sender.expect_send().times(1).returning(|_| Ok(()));

        let svc = service(&f, idle_transcriber(), model, idle_audio(), Some(sender));
        for _ in 0..2 {
            let eval = svc.submit("owner", text_submission(&f, 0, "answer")).await.unwrap();
            assert_eq!(eval.degraded, Some(Degradation::ScoringUnavailable));
            assert_eq!(eval.attempt.score, Some(0));
            assert_eq!(eval.attempt.feedback.as_deref(), Some(UNAVAILABLE_FEEDBACK));
        }
        assert_eq!(f.store.list_attempts(f.session_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_input_writes_nothing() {
        let f = fixture().await;
        let mut model = MockFeedbackModel::new();
        model.expect_score_answer().never();
        let svc = service(&f, idle_transcriber(), model, idle_audio(), None);

        let mut missing = text_submission(&f, 0, "answer");
        missing.question_id = None;
        assert!(matches!(svc.submit("owner", missing).await, Err(Error::BadRequest(_))));

        let mut unknown = text_submission(&f, 0, "answer");
        unknown.question_id = Some(Uuid::new_v4());
        assert!(matches!(svc.submit("owner", unknown).await, Err(Error::NotFound(_))));

        let mut no_session = text_submission(&f, 0, "answer");
        no_session.session_id = Some(Uuid::new_v4());
        assert!(matches!(svc.submit("owner", no_session).await, Err(Error::NotFound(_))));

        assert!(matches!(
            svc.submit("intruder", text_submission(&f, 0, "answer")).await,
            Err(Error::NotFound(_))
        ));

        assert!(f.store.list_attempts(f.session_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fifth_distinct_question_is_rejected_but_retries_are_not() {
        let f = fixture().await;
        let svc = service(&f, idle_transcriber(), model_returning(GOOD_OUTPUT), idle_audio(), None);
        for q in 0..4 {
            f.clock.advance(Duration::seconds(1));
            svc.submit("owner", text_submission(&f, q, "answer")).await.unwrap();
        }

        let err = svc.submit("owner", text_submission(&f, 4, "answer")).await;
        assert!(matches!(err, Err(Error::BadRequest(_))));

        f.clock.advance(Duration::seconds(1));
        svc.submit("owner", text_submission(&f, 2, "better answer")).await.unwrap();
        assert_eq!(f.store.list_attempts(f.session_id).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn completed_session_rejects_further_attempts() {
        let f = fixture().await;
        let svc = service(&f, idle_transcriber(), model_returning(GOOD_OUTPUT), idle_audio(), None);
        svc.submit("owner", text_submission(&f, 0, "answer")).await.unwrap();
        f.store
            .complete_session(f.session_id, 82, 42, f.clock.now())
            .await
            .unwrap()
            .unwrap();

        let retry = svc.submit("owner", text_submission(&f, 0, "much better answer")).await;
        assert!(matches!(retry, Err(Error::Conflict(_))));
        assert_eq!(f.store.list_attempts(f.session_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn attempts_on_an_abandoned_session_are_still_recorded() {
        let f = fixture().await;
        let svc = service(&f, idle_transcriber(), model_returning(GOOD_OUTPUT), idle_audio(), None);
        f.store
            .replace_in_progress(NewSession {
                owner_id: "owner".into(),
                interview_role: "General".into(),
                difficulty: "Basic".into(),
                created_at: f.clock.now(),
            })
            .await
            .unwrap();

        svc.submit("owner", text_submission(&f, 0, "late answer")).await.unwrap();
        assert_eq!(f.store.list_attempts(f.session_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn instructions_follow_owner_preferences() {
        let f = fixture().await;
        f.store
            .update_preferences(
                "owner",
                PreferencesUpdate {
                    feedback_tone: Some(FeedbackTone::Strict),
                    feedback_emphasis: Some(FeedbackEmphasis::Confidence),
                    ..Default::default()
                },
                f.clock.now(),
            )
            .await
            .unwrap();
        let mut model = MockFeedbackModel::new();
        model
            .expect_score_answer()
            .withf(|instructions, _, _| {
                instructions.contains("bar raiser") && instructions.contains("hedging words")
            })
            .times(1)
            .returning(|_, _, _| Ok(GOOD_OUTPUT.to_string()));

        let svc = service(&f, idle_transcriber(), model, idle_audio(), None);
        svc.submit("owner", text_submission(&f, 0, "answer")).await.unwrap();
    }
}
