use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::services::audio_store::audio_extension;
use crate::services::prompts;

/// Speech-to-text collaborator. Output is best-effort and may be empty.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String>;
}

/// Answer-scoring collaborator. Returns the model's raw text; parsing is
/// left to `feedback_parser`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackModel: Send + Sync {
    async fn score_answer(&self, instructions: &str, question: &str, answer: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct OpenAIService {
    client: Client,
    api_key: String,
    scoring_model: String,
    transcription_model: String,
}

impl OpenAIService {
    pub fn new(api_key: String, scoring_model: String, transcription_model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            scoring_model,
            transcription_model,
        }
    }

    async fn check_status(res: reqwest::Response, api: &str) -> Result<reqwest::Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let text = res.text().await.unwrap_or_default();
        if status == StatusCode::TOO_MANY_REQUESTS || text.contains("insufficient_quota") {
            return Err(Error::QuotaExceeded(format!("{} {}: {}", api, status, text)));
        }
        Err(Error::Upstream(format!("{} {}: {}", api, status, text)))
    }

    async fn chat_openai(&self, payload: JsonValue) -> Result<String> {
        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;
        let res = Self::check_status(res, "OpenAI chat").await?;

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Upstream("Invalid OpenAI response format".to_string()))
    }
}

fn audio_file_name(mime_type: &str) -> String {
    format!("answer.{}", audio_extension(mime_type))
}

#[async_trait]
impl Transcriber for OpenAIService {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String> {
        let part = multipart::Part::bytes(audio.to_vec())
            .file_name(audio_file_name(mime_type))
            .mime_str(mime_type)?;
        let form = multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        let res = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;
        let res = Self::check_status(res, "OpenAI transcription").await?;

        let body: JsonValue = res.json().await?;
        Ok(body
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

#[async_trait]
impl FeedbackModel for OpenAIService {
    async fn score_answer(&self, instructions: &str, question: &str, answer: &str) -> Result<String> {
        let payload = json!({
            "model": self.scoring_model,
            "messages": [
                { "role": "system", "content": instructions },
                { "role": "user", "content": prompts::answer_message(question, answer) }
            ],
            "temperature": 0.3,
            "response_format": { "type": "json_object" }
        });
        self.chat_openai(payload).await
    }
}
