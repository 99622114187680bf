use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const GENERAL_ROLE: &str = "General";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub category: String,
    pub role: String,
    pub difficulty: String,
    pub focus: String,
    pub question: String,
    pub sample_answer: Option<SampleAnswer>,
    pub created_at: DateTime<Utc>,
}

/// STAR-structured model answer. Field order is part of the contract:
/// situation, task, action, result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleAnswer {
    pub situation: String,
    pub task: String,
    pub action: String,
    pub result: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarStep {
    Situation,
    Task,
    Action,
    Result,
}

impl StarStep {
    pub const ORDER: [StarStep; 4] = [
        StarStep::Situation,
        StarStep::Task,
        StarStep::Action,
        StarStep::Result,
    ];
}

impl SampleAnswer {
    /// Sections in STAR order.
    pub fn sections(&self) -> [(StarStep, &str); 4] {
        [
            (StarStep::Situation, self.situation.as_str()),
            (StarStep::Task, self.task.as_str()),
            (StarStep::Action, self.action.as_str()),
            (StarStep::Result, self.result.as_str()),
        ]
    }
}

/// Topical tags the selector can narrow on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Focus {
    Behavioral,
    Technical,
    #[serde(rename = "System Design")]
    SystemDesign,
}

impl Focus {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Focus::Behavioral => "Behavioral",
            Focus::Technical => "Technical",
            Focus::SystemDesign => "System Design",
        }
    }
}

/// Reference-data row as handed over by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub category: String,
    pub role: String,
    pub difficulty: String,
    pub focus: String,
    pub question: String,
    pub sample_answer: Option<SampleAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: Uuid,
    pub question: String,
    pub category: String,
}

impl From<&Question> for QuestionSummary {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question: q.question.clone(),
            category: q.category.clone(),
        }
    }
}

/// Constraints for picking from the reference pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionFilter {
    pub roles: Vec<String>,
    pub difficulty: String,
    pub exclude: Vec<Uuid>,
    pub focuses: Option<Vec<String>>,
}

impl QuestionFilter {
    /// Requested role or "General", exact difficulty, minus excluded ids.
    pub fn base(role: &str, difficulty: &str, exclude: &[Uuid]) -> Self {
        let mut roles = vec![role.to_string()];
        if role != GENERAL_ROLE {
            roles.push(GENERAL_ROLE.to_string());
        }
        Self {
            roles,
            difficulty: difficulty.to_string(),
            exclude: exclude.to_vec(),
            focuses: None,
        }
    }

    pub fn with_focuses(&self, focuses: &[Focus]) -> Self {
        Self {
            focuses: Some(focuses.iter().map(|f| f.as_tag().to_string()).collect()),
            ..self.clone()
        }
    }

    pub fn matches(&self, q: &Question) -> bool {
        self.roles.iter().any(|r| r == &q.role)
            && q.difficulty == self.difficulty
            && !self.exclude.contains(&q.id)
            && self
                .focuses
                .as_ref()
                .map_or(true, |fs| fs.iter().any(|f| f == &q.focus))
    }
}
