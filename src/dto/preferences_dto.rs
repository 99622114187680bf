use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::preferences::{
    FeedbackDetail, FeedbackEmphasis, FeedbackTone, Preferences, PreferencesUpdate,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UpdatePreferencesRequest {
    #[serde(alias = "defaultRole")]
    #[validate(length(min = 1, max = 100))]
    pub default_role: Option<String>,
    #[serde(alias = "defaultDifficulty")]
    #[validate(length(min = 1, max = 50))]
    pub default_difficulty: Option<String>,
    #[serde(alias = "focusBehavioral")]
    pub focus_behavioral: Option<bool>,
    #[serde(alias = "focusTechnical")]
    pub focus_technical: Option<bool>,
    #[serde(alias = "focusSystemDesign")]
    pub focus_system_design: Option<bool>,
    #[serde(alias = "feedbackTone")]
    pub feedback_tone: Option<FeedbackTone>,
    #[serde(alias = "feedbackDetail")]
    pub feedback_detail: Option<FeedbackDetail>,
    #[serde(alias = "feedbackEmphasize", alias = "feedbackEmphasis")]
    pub feedback_emphasis: Option<FeedbackEmphasis>,
    #[serde(alias = "autoStartNext")]
    pub auto_start_next: Option<bool>,
    #[serde(alias = "showSampleAnswer")]
    pub show_sample_answer: Option<bool>,
    #[serde(alias = "enableTimer")]
    pub enable_timer: Option<bool>,
    #[serde(alias = "countdownSeconds")]
    #[validate(range(min = 10, max = 600))]
    pub countdown_seconds: Option<i32>,
    #[serde(alias = "autoSubmitOnSilence")]
    pub auto_submit_on_silence: Option<bool>,
}

impl From<UpdatePreferencesRequest> for PreferencesUpdate {
    fn from(req: UpdatePreferencesRequest) -> Self {
        Self {
            default_role: req.default_role,
            default_difficulty: req.default_difficulty,
            focus_behavioral: req.focus_behavioral,
            focus_technical: req.focus_technical,
            focus_system_design: req.focus_system_design,
            feedback_tone: req.feedback_tone,
            feedback_detail: req.feedback_detail,
            feedback_emphasis: req.feedback_emphasis,
            auto_start_next: req.auto_start_next,
            show_sample_answer: req.show_sample_answer,
            enable_timer: req.enable_timer,
            countdown_seconds: req.countdown_seconds,
            auto_submit_on_silence: req.auto_submit_on_silence,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferencesResponse {
    pub ok: bool,
    pub preferences: Preferences,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_outside_bounds_is_rejected() {
        let req: UpdatePreferencesRequest =
            serde_json::from_str(r#"{"countdownSeconds": 5}"#).unwrap();
        assert!(req.validate().is_err());

        let req: UpdatePreferencesRequest =
            serde_json::from_str(r#"{"countdown_seconds": 601}"#).unwrap();
        assert!(req.validate().is_err());

        let req: UpdatePreferencesRequest =
            serde_json::from_str(r#"{"countdown_seconds": 600, "feedbackEmphasize": "Technical Depth"}"#)
                .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.feedback_emphasis, Some(FeedbackEmphasis::TechnicalDepth));
    }

    #[test]
    fn absent_fields_stay_untouched() {
        let req: UpdatePreferencesRequest = serde_json::from_str(r#"{"enableTimer": false}"#).unwrap();
        let update = PreferencesUpdate::from(req);
        assert_eq!(update.enable_timer, Some(false));
        assert!(update.default_role.is_none());
        assert!(update.feedback_tone.is_none());
    }
}
