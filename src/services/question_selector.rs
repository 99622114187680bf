use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::preferences::Preferences;
use crate::models::question::{Focus, Question, QuestionFilter};
use crate::repository::QuestionStore;

/// Which filter a selection actually ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterChoice {
    /// No focus toggles enabled.
    Base,
    /// Focus-narrowed pool was non-empty.
    Focused,
    /// Focus-narrowed pool was empty; reverted to the base filter.
    FocusFallback,
}

/// Second step of the focus decision: given the size of the narrowed pool,
/// keep it or revert to base.
pub fn choose_filter(
    base: &QuestionFilter,
    focused: Option<QuestionFilter>,
    focused_count: i64,
) -> (QuestionFilter, FilterChoice) {
    match focused {
        None => (base.clone(), FilterChoice::Base),
        Some(filter) if focused_count > 0 => (filter, FilterChoice::Focused),
        Some(_) => (base.clone(), FilterChoice::FocusFallback),
    }
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub question: Option<Question>,
    pub choice: FilterChoice,
}

#[derive(Clone)]
pub struct QuestionSelector {
    questions: Arc<dyn QuestionStore>,
}

impl QuestionSelector {
    pub fn new(questions: Arc<dyn QuestionStore>) -> Self {
        Self { questions }
    }

    /// Counts the focus-narrowed pool and decides which filter to use.
    /// Counts are read fresh on every call.
    pub async fn resolve_filter(
        &self,
        base: &QuestionFilter,
        focuses: &[Focus],
    ) -> Result<(QuestionFilter, FilterChoice)> {
        if focuses.is_empty() {
            return Ok(choose_filter(base, None, 0));
        }
        let focused = base.with_focuses(focuses);
        let focused_count = self.questions.count_questions(&focused).await?;
        let (filter, choice) = choose_filter(base, Some(focused), focused_count);
        if choice == FilterChoice::FocusFallback {
            warn!(
                roles = ?base.roles,
                difficulty = %base.difficulty,
                focuses = ?focuses,
                "No questions match preferred focus; falling back to base filter"
            );
        }
        Ok((filter, choice))
    }

    /// Uniform pick among questions for `role`/`difficulty` (or "General")
    /// not in `exclude`, narrowed by the owner's focus toggles when possible.
    pub async fn select(
        &self,
        role: &str,
        difficulty: &str,
        exclude: &[Uuid],
        preferences: Option<&Preferences>,
    ) -> Result<Selection> {
        let base = QuestionFilter::base(role, difficulty, exclude);
        let focuses = preferences.map(|p| p.enabled_focuses()).unwrap_or_default();
        let (filter, choice) = self.resolve_filter(&base, &focuses).await?;

        let count = self.questions.count_questions(&filter).await?;
        if count <= 0 {
            info!(role, difficulty, excluded = exclude.len(), "No question available");
            return Ok(Selection { question: None, choice });
        }

        let offset = rand::thread_rng().gen_range(0..count);
        let question = self.questions.question_at(&filter, offset).await?;

        // The filter already excludes these; a store that ignores it must not leak one.
        let question = question.filter(|q| !exclude.contains(&q.id));
        Ok(Selection { question, choice })
    }
}
