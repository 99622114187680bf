use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::question::Focus;

pub const DEFAULT_ROLE: &str = "Software Engineering";
pub const DEFAULT_DIFFICULTY: &str = "Basic";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackTone {
    #[default]
    Encouraging,
    Direct,
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackDetail {
    Brief,
    #[default]
    Standard,
    Deep,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackEmphasis {
    #[default]
    Balance,
    Clarity,
    Storytelling,
    Confidence,
    #[serde(rename = "Technical Depth")]
    TechnicalDepth,
}

impl FeedbackTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackTone::Encouraging => "Encouraging",
            FeedbackTone::Direct => "Direct",
            FeedbackTone::Strict => "Strict",
        }
    }

    /// Unknown values fall back to the default tone.
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "Direct" => FeedbackTone::Direct,
            "Strict" => FeedbackTone::Strict,
            _ => FeedbackTone::Encouraging,
        }
    }
}

impl FeedbackDetail {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackDetail::Brief => "Brief",
            FeedbackDetail::Standard => "Standard",
            FeedbackDetail::Deep => "Deep",
        }
    }

    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "Brief" => FeedbackDetail::Brief,
            "Deep" => FeedbackDetail::Deep,
            _ => FeedbackDetail::Standard,
        }
    }
}

impl FeedbackEmphasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackEmphasis::Balance => "Balance",
            FeedbackEmphasis::Clarity => "Clarity",
            FeedbackEmphasis::Storytelling => "Storytelling",
            FeedbackEmphasis::Confidence => "Confidence",
            FeedbackEmphasis::TechnicalDepth => "Technical Depth",
        }
    }

    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "Clarity" => FeedbackEmphasis::Clarity,
            "Storytelling" => FeedbackEmphasis::Storytelling,
            "Confidence" => FeedbackEmphasis::Confidence,
            "Technical Depth" => FeedbackEmphasis::TechnicalDepth,
            _ => FeedbackEmphasis::Balance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub owner_id: String,
    pub default_role: String,
    pub default_difficulty: String,
    pub focus_behavioral: bool,
    pub focus_technical: bool,
    pub focus_system_design: bool,
    pub feedback_tone: FeedbackTone,
    pub feedback_detail: FeedbackDetail,
    pub feedback_emphasis: FeedbackEmphasis,
    pub auto_start_next: bool,
    pub show_sample_answer: bool,
    pub enable_timer: bool,
    pub countdown_seconds: i32,
    pub auto_submit_on_silence: bool,
    pub updated_at: DateTime<Utc>,
}

impl Preferences {
    pub fn defaults_for(owner_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            default_role: DEFAULT_ROLE.to_string(),
            default_difficulty: DEFAULT_DIFFICULTY.to_string(),
            focus_behavioral: false,
            focus_technical: false,
            focus_system_design: false,
            feedback_tone: FeedbackTone::default(),
            feedback_detail: FeedbackDetail::default(),
            feedback_emphasis: FeedbackEmphasis::default(),
            auto_start_next: false,
            show_sample_answer: true,
            enable_timer: true,
            countdown_seconds: 120,
            auto_submit_on_silence: false,
            updated_at: now,
        }
    }

    /// Focus tags switched on, in a stable order.
    pub fn enabled_focuses(&self) -> Vec<Focus> {
        let mut out = Vec::new();
        if self.focus_behavioral {
            out.push(Focus::Behavioral);
        }
        if self.focus_technical {
            out.push(Focus::Technical);
        }
        if self.focus_system_design {
            out.push(Focus::SystemDesign);
        }
        out
    }

    pub fn apply(&mut self, update: PreferencesUpdate) {
        if let Some(v) = update.default_role {
            self.default_role = v;
        }
        if let Some(v) = update.default_difficulty {
            self.default_difficulty = v;
        }
        if let Some(v) = update.focus_behavioral {
            self.focus_behavioral = v;
        }
        if let Some(v) = update.focus_technical {
            self.focus_technical = v;
        }
        if let Some(v) = update.focus_system_design {
            self.focus_system_design = v;
        }
        if let Some(v) = update.feedback_tone {
            self.feedback_tone = v;
        }
        if let Some(v) = update.feedback_detail {
            self.feedback_detail = v;
        }
        if let Some(v) = update.feedback_emphasis {
            self.feedback_emphasis = v;
        }
        if let Some(v) = update.auto_start_next {
            self.auto_start_next = v;
        }
        if let Some(v) = update.show_sample_answer {
            self.show_sample_answer = v;
        }
        if let Some(v) = update.enable_timer {
            self.enable_timer = v;
        }
        if let Some(v) = update.countdown_seconds {
            self.countdown_seconds = v;
        }
        if let Some(v) = update.auto_submit_on_silence {
            self.auto_submit_on_silence = v;
        }
    }
}

/// Partial update; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct PreferencesUpdate {
    pub default_role: Option<String>,
    pub default_difficulty: Option<String>,
    pub focus_behavioral: Option<bool>,
    pub focus_technical: Option<bool>,
    pub focus_system_design: Option<bool>,
    pub feedback_tone: Option<FeedbackTone>,
    pub feedback_detail: Option<FeedbackDetail>,
    pub feedback_emphasis: Option<FeedbackEmphasis>,
    pub auto_start_next: Option<bool>,
    pub show_sample_answer: Option<bool>,
    pub enable_timer: Option<bool>,
    pub countdown_seconds: Option<i32>,
    pub auto_submit_on_silence: Option<bool>,
}
