use serde::Serialize;
use uuid::Uuid;

use crate::models::attempt::Attempt;

#[derive(Debug, Clone, Serialize)]
pub struct SubmitFeedbackResponse {
    pub ok: bool,
    pub attempt_id: Uuid,
    /// True when the stored attempt carries placeholder feedback.
    pub degraded: bool,
    pub analysis: Attempt,
}
