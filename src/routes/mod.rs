pub mod analytics;
pub mod feedback;
pub mod health;
pub mod practice;
pub mod preferences;
pub mod questions;
pub mod session;

use axum::{
    routing::{get, post},
    Router,
};

use crate::{middleware::auth::require_bearer_auth, AppState};

/// The authenticated `/api` surface.
pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/session/start", post(session::start_session))
        .route("/api/session/end", post(session::end_session))
        .route("/api/session/stats", get(session::session_stats))
        .route("/api/session/:id/attempts", get(session::session_attempts))
        .route("/api/practice/next", post(practice::next_question))
        .route("/api/practice/session/:id", get(practice::get_session_state))
        .route("/api/feedback/submit", post(feedback::submit_feedback))
        .route("/api/feedback/attempt/:id", get(feedback::get_attempt))
        .route("/api/analytics", get(analytics::get_analytics))
        .route(
            "/api/profile/preferences",
            get(preferences::get_preferences).patch(preferences::update_preferences),
        )
        .route("/api/questions", get(questions::list_questions))
        .layer(axum::middleware::from_fn_with_state(state, require_bearer_auth))
}
