pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod utils;

use crate::error::Result;
use crate::repository::{PgStore, QuestionStore, Repositories};
use crate::services::{
    ai_service::{FeedbackModel, OpenAIService, Transcriber},
    alert_service::{AlertRateLimiter, AlertSender, AlertService, WebhookAlertSender},
    analytics_service::AnalyticsService,
    attempt_service::AttemptService,
    audio_store::{AudioStore, LocalAudioStore},
    evaluation_service::EvaluationService,
    preference_service::PreferenceService,
    question_selector::QuestionSelector,
    session_service::SessionService,
};
use crate::utils::time::{Clock, SystemClock};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;

/// External collaborators of the evaluation pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub feedback_model: Arc<dyn FeedbackModel>,
    pub audio_store: Arc<dyn AudioStore>,
    pub alert_sender: Option<Arc<dyn AlertSender>>,
}

#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,
    pub questions: Arc<dyn QuestionStore>,
    pub session_service: SessionService,
    pub attempt_service: AttemptService,
    pub evaluation_service: EvaluationService,
    pub preference_service: PreferenceService,
    pub analytics_service: AnalyticsService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Result<Self> {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(150))
            .build()?;

        let openai = Arc::new(OpenAIService::new(
            config.openai_api_key.clone(),
            config.scoring_model.clone(),
            config.transcription_model.clone(),
            http_client.clone(),
        ));
        let alert_sender = config.alert_webhook_url.clone().map(|url| {
            Arc::new(WebhookAlertSender::new(url, http_client.clone())) as Arc<dyn AlertSender>
        });

        Ok(Self::with_parts(
            Repositories::from_store(Arc::new(PgStore::new(pool))),
            Collaborators {
                transcriber: openai.clone(),
                feedback_model: openai,
                audio_store: Arc::new(LocalAudioStore::new(config.uploads_dir.clone())),
                alert_sender,
            },
            Arc::new(SystemClock),
            config.jwt_secret.clone(),
            chrono::Duration::minutes(config.alert_cooldown_minutes),
        ))
    }

    pub fn with_parts(
        repos: Repositories,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
        jwt_secret: String,
        alert_cooldown: chrono::Duration,
    ) -> Self {
        let selector = QuestionSelector::new(repos.questions.clone());
        let alerts = Arc::new(AlertService::new(
            AlertRateLimiter::new(clock.clone(), alert_cooldown),
            collaborators.alert_sender,
        ));

        Self {
            jwt_secret,
            questions: repos.questions.clone(),
            session_service: SessionService::new(repos.clone(), selector, clock.clone()),
            attempt_service: AttemptService::new(repos.clone()),
            evaluation_service: EvaluationService::new(
                repos.clone(),
                collaborators.transcriber,
                collaborators.feedback_model,
                collaborators.audio_store,
                alerts,
                clock.clone(),
            ),
            preference_service: PreferenceService::new(repos.preferences.clone(), clock),
            analytics_service: AnalyticsService::new(repos),
        }
    }
}
