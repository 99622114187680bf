use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::models::attempt::Attempt;
use crate::repository::Repositories;
use crate::utils::time::format_duration;

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub category: String,
    pub duration: String,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureCount {
    pub name: &'static str,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub sessions: Vec<SessionSummary>,
    pub checklist_failures: Vec<FailureCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total_sessions: usize,
    pub average_score: i32,
}

/// Per-criterion failure counts over every attempt with a checklist.
pub fn count_checklist_failures(attempts: &[Attempt]) -> Vec<FailureCount> {
    let (mut filler, mut negative, mut detail, mut vague, mut length) = (0, 0, 0, 0, 0);
    for checklist in attempts.iter().filter_map(|a| a.checklist.as_ref()) {
        if !checklist.no_filler_words_detected {
            filler += 1;
        }
        if !checklist.no_negative_language_detected {
            negative += 1;
        }
        if !checklist.technical_detail_present {
            detail += 1;
        }
        if !checklist.specific_examples_provided {
            vague += 1;
        }
        if !checklist.appropriate_length {
            length += 1;
        }
    }
    vec![
        FailureCount { name: "Filler Words", count: filler },
        FailureCount { name: "Apologizing", count: negative },
        FailureCount { name: "Lack of Detail", count: detail },
        FailureCount { name: "Vague Answers", count: vague },
        FailureCount { name: "Too Concise", count: length },
    ]
}

/// Read-only views over COMPLETED sessions. In-progress and abandoned
/// sessions never contribute.
#[derive(Clone)]
pub struct AnalyticsService {
    repos: Repositories,
}

impl AnalyticsService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn summary(&self, owner_id: &str) -> Result<AnalyticsSummary> {
        let sessions = self.repos.sessions.list_completed_sessions(owner_id).await?;
        let ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
        let attempts = if ids.is_empty() {
            Vec::new()
        } else {
            self.repos.attempts.list_attempts_for_sessions(&ids).await?
        };

        Ok(AnalyticsSummary {
            sessions: sessions
                .iter()
                .map(|s| SessionSummary {
                    id: s.id,
                    date: s.created_at,
                    category: s.interview_role.clone(),
                    duration: format_duration(s.total_duration as i64),
                    score: s.overall_score.unwrap_or(0),
                })
                .collect(),
            checklist_failures: count_checklist_failures(&attempts),
        })
    }

    /// Count and rounded mean score of scored, completed sessions.
    pub async fn stats(&self, owner_id: &str) -> Result<SessionStats> {
        let scores: Vec<i32> = self
            .repos
            .sessions
            .list_completed_sessions(owner_id)
            .await?
            .into_iter()
            .filter_map(|s| s.overall_score)
            .collect();
        let average_score = if scores.is_empty() {
            0
        } else {
            let sum: i64 = scores.iter().map(|s| *s as i64).sum();
            (sum as f64 / scores.len() as f64).round() as i32
        };
        Ok(SessionStats {
            total_sessions: scores.len(),
            average_score,
        })
    }
}
