use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use practice_backend::{
    error::Result,
    middleware::auth::Claims,
    models::question::{NewQuestion, SampleAnswer},
    repository::{InMemoryStore, Repositories},
    routes,
    services::{
        ai_service::{FeedbackModel, Transcriber},
        audio_store::AudioStore,
    },
    utils::time::SystemClock,
    AppState, Collaborators,
};

const SECRET: &str = "test_secret_key";
const BOUNDARY: &str = "XPRACTICEBOUNDARY";

struct FixedModel(&'static str);

#[async_trait]
impl FeedbackModel for FixedModel {
    async fn score_answer(&self, _instructions: &str, _question: &str, _answer: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

struct EchoTranscriber;

#[async_trait]
impl Transcriber for EchoTranscriber {
    async fn transcribe(&self, audio: &[u8], _mime_type: &str) -> Result<String> {
        Ok(String::from_utf8_lossy(audio).to_string())
    }
}

struct DiscardAudio;

#[async_trait]
impl AudioStore for DiscardAudio {
    async fn save(&self, _audio: &[u8], _mime_type: &str) -> Result<String> {
        Ok(format!("/uploads/{}.webm", Uuid::new_v4()))
    }
}

fn app_with_model(model_output: &'static str) -> Router {
    let store = Arc::new(InMemoryStore::new());
    for i in 0..6 {
        store
            .insert_question(
                NewQuestion {
                    category: "Problem Solving".into(),
                    role: if i % 2 == 0 { "General" } else { "Software Engineering" }.into(),
                    difficulty: "Basic".into(),
                    focus: "Behavioral".into(),
                    question: format!("Describe a hard bug you fixed ({})", i),
                    sample_answer: Some(SampleAnswer {
                        situation: "Prod outage".into(),
                        task: "Restore service".into(),
                        action: "Bisected the deploy".into(),
                        result: "Recovered in 20 minutes".into(),
                    }),
                },
                Utc::now(),
            )
            .expect("seed question");
    }

    let state = AppState::with_parts(
        Repositories::from_store(store),
        Collaborators {
            transcriber: Arc::new(EchoTranscriber),
            feedback_model: Arc::new(FixedModel(model_output)),
            audio_store: Arc::new(DiscardAudio),
            alert_sender: None,
        },
        Arc::new(SystemClock),
        SECRET.to_string(),
        chrono::Duration::minutes(5),
    );

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(routes::api_router(state.clone()))
        .with_state(state)
}

fn token(owner: &str) -> String {
    encode(
        &Header::default(),
        &Claims {
            sub: owner.to_string(),
            exp: (Utc::now().timestamp() + 3600) as usize,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, owner: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token(owner)))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, owner: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token(owner)))
        .body(Body::empty())
        .unwrap()
}

fn submit_request(owner: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method("POST")
        .uri("/api/feedback/submit")
        .header("authorization", format!("Bearer {}", token(owner)))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

const GOOD_OUTPUT: &str = r#"```json
{"score": 80, "checklist": {"specific_examples_provided": true, "no_negative_language_detected": true, "no_filler_words_detected": false, "technical_detail_present": true, "appropriate_length": true}, "analysis_highlighting": "<green>Clear ownership</green>", "actionable_feedback": "Quantify the result.", "improved_version": "Situation: ...",}
```"#;

#[tokio::test]
async fn health_is_public_and_api_requires_token() {
    let app = app_with_model(GOOD_OUTPUT);

    let (status, body) = call(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = call(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/session/start")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_session_flow() {
    let app = app_with_model(GOOD_OUTPUT);
    let owner = "user-42";

    let (status, started) = call(
        &app,
        json_request("POST", "/api/session/start", owner, json!({ "interviewType": "Software Engineering" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "IN_PROGRESS");
    assert_eq!(started["question_available"], true);
    let session_id = started["session_id"].as_str().unwrap().to_string();
    let mut question_id = started["current_question"]["id"].as_str().unwrap().to_string();

    let sample = &started["current_question"]["sample_answer"];
    let keys: Vec<&String> = sample.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 4);

    let (status, state) = call(&app, get_request(&format!("/api/practice/session/{}", session_id), owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["current_question_id"].as_str().unwrap(), question_id);
    assert_eq!(state["questions_answered"], 0);

    // a retry on the first question, then one answer each for three more
    for round in 0..5 {
        let (status, submitted) = call(
            &app,
            submit_request(
                owner,
                &[
                    ("sessionId", &session_id),
                    ("questionId", &question_id),
                    ("mode", "text"),
                    ("answerText", "I traced the leak to a cache."),
                    ("duration", "30"),
                ],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "submit failed: {}", submitted);
        assert_eq!(submitted["degraded"], false);
        assert_eq!(submitted["analysis"]["score"], 80);

        if round == 0 {
            let attempt_id = submitted["attempt_id"].as_str().unwrap();
            let (status, detail) =
                call(&app, get_request(&format!("/api/feedback/attempt/{}", attempt_id), owner)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(detail["question_number"], 1);
            assert_eq!(detail["is_last_question"], false);
            continue;
        }

        let (status, next) = call(
            &app,
            json_request("POST", "/api/practice/next", owner, json!({ "sessionId": session_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        if round < 4 {
            assert_eq!(next["ok"], true);
            question_id = next["next_question"]["id"].as_str().unwrap().to_string();
        } else {
            assert_eq!(next["ok"], false);
            assert_eq!(next["status"], "COMPLETED");
            assert_eq!(next["final_score"], 80);
        }
    }

    let (status, listed) =
        call(&app, get_request(&format!("/api/session/{}/attempts", session_id), owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["attempts"].as_array().unwrap().len(), 4);

    let (status, analytics) = call(&app, get_request("/api/analytics", owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analytics["sessions"].as_array().unwrap().len(), 1);
    assert_eq!(analytics["sessions"][0]["duration"], "02:30");
    assert_eq!(analytics["checklist_failures"][0]["name"], "Filler Words");
    assert_eq!(analytics["checklist_failures"][0]["count"], 5);

    let (status, stats) = call(&app, get_request("/api/session/stats", owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_sessions"], 1);
    assert_eq!(stats["average_score"], 80);

    let (status, ended) = call(
        &app,
        json_request("POST", "/api/session/end", owner, json!({ "sessionId": session_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["final_score"], 80);

    let (status, _) = call(
        &app,
        submit_request(
            owner,
            &[
                ("sessionId", &session_id),
                ("questionId", &question_id),
                ("answerText", "One more go."),
                ("duration", "10"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        get_request(&format!("/api/practice/session/{}", session_id), "someone-else"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreadable_model_output_is_stored_as_degraded() {
    let app = app_with_model("The model is overloaded, please retry later.");
    let owner = "user-7";

    let (_, started) = call(&app, json_request("POST", "/api/session/start", owner, json!({}))).await;
    let session_id = started["session_id"].as_str().unwrap().to_string();
    let question_id = started["current_question"]["id"].as_str().unwrap().to_string();

    let (status, submitted) = call(
        &app,
        submit_request(
            owner,
            &[
                ("sessionId", &session_id),
                ("questionId", &question_id),
                ("answerText", "Some answer"),
                ("duration", "12"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["degraded"], true);
    assert_eq!(submitted["analysis"]["score"], 0);
    assert!(submitted["analysis"]["checklist"].is_null());
    assert_eq!(
        submitted["analysis"]["feedback"],
        "AI response format error. Please try again."
    );
}

#[tokio::test]
async fn submit_validates_before_writing() {
    let app = app_with_model(GOOD_OUTPUT);
    let owner = "user-9";
    let (_, started) = call(&app, json_request("POST", "/api/session/start", owner, json!({}))).await;
    let session_id = started["session_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        submit_request(owner, &[("sessionId", &session_id), ("answerText", "hi")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing sessionId or questionId");

    let (status, _) = call(
        &app,
        submit_request(
            owner,
            &[("sessionId", &session_id), ("questionId", &Uuid::new_v4().to_string())],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) =
        call(&app, get_request(&format!("/api/session/{}/attempts", session_id), owner)).await;
    assert!(listed["attempts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn preferences_are_created_lazily_and_validated() {
    let app = app_with_model(GOOD_OUTPUT);
    let owner = "user-3";

    let (status, body) = call(&app, get_request("/api/profile/preferences", owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["preferences"]["default_role"], "Software Engineering");
    assert_eq!(body["preferences"]["feedback_tone"], "Encouraging");

    let (status, _) = call(
        &app,
        json_request("PATCH", "/api/profile/preferences", owner, json!({ "countdownSeconds": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        json_request(
            "PATCH",
            "/api/profile/preferences",
            owner,
            json!({ "feedbackTone": "Strict", "focusTechnical": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["preferences"]["feedback_tone"], "Strict");
    assert_eq!(body["preferences"]["focus_technical"], true);

    let (status, questions) = call(&app, get_request("/api/questions", owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(questions["questions"].as_array().unwrap().len(), 6);
}
