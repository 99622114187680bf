//! Session-level numbers derived from the attempt set.
//!
//! Scoring is "best attempt wins": each distinct question counts once, with
//! the highest score any of its attempts reached. Duration is practice time
//! and sums every attempt, retries included.

use std::collections::HashMap;
use uuid::Uuid;

use crate::models::attempt::Attempt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTotals {
    pub overall_score: i32,
    pub total_duration: i32,
    pub distinct_questions: usize,
}

/// Distinct question ids in order of first appearance. Expects attempts
/// sorted oldest first.
pub fn distinct_question_ids(attempts: &[Attempt]) -> Vec<Uuid> {
    let mut seen = Vec::new();
    for attempt in attempts {
        if !seen.contains(&attempt.question_id) {
            seen.push(attempt.question_id);
        }
    }
    seen
}

/// 1-based display position of a question; retries of question 1 are still
/// "Question 1".
pub fn question_ordinal(attempts: &[Attempt], question_id: Uuid) -> Option<usize> {
    distinct_question_ids(attempts)
        .iter()
        .position(|id| *id == question_id)
        .map(|idx| idx + 1)
}

pub fn aggregate(attempts: &[Attempt]) -> SessionTotals {
    let mut best: HashMap<Uuid, i32> = HashMap::new();
    let mut total_duration: i32 = 0;

    for attempt in attempts {
        total_duration = total_duration.saturating_add(attempt.duration.max(0));
        let score = attempt.score.unwrap_or(0);
        let entry = best.entry(attempt.question_id).or_insert(score);
        if score > *entry {
            *entry = score;
        }
    }

    let overall_score = if best.is_empty() {
        0
    } else {
        let sum: i64 = best.values().map(|s| *s as i64).sum();
        (sum as f64 / best.len() as f64).round() as i32
    };

    SessionTotals {
        overall_score,
        total_duration,
        distinct_questions: best.len(),
    }
}

/// One attempt per question for review: highest score, ties going to the
/// most recent. Output is ordered by creation time.
pub fn best_attempts(attempts: &[Attempt]) -> Vec<Attempt> {
    let mut chosen: HashMap<Uuid, &Attempt> = HashMap::new();
    for attempt in attempts {
        match chosen.get(&attempt.question_id) {
            None => {
                chosen.insert(attempt.question_id, attempt);
            }
            Some(existing) => {
                let new_score = attempt.score.unwrap_or(0);
                let old_score = existing.score.unwrap_or(0);
                if new_score > old_score
                    || (new_score == old_score && attempt.created_at >= existing.created_at)
                {
                    chosen.insert(attempt.question_id, attempt);
                }
            }
        }
    }

    let mut out: Vec<Attempt> = chosen.into_values().cloned().collect();
    out.sort_by_key(|a| a.created_at);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn base_time() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn attempt(question_id: Uuid, score: Option<i32>, duration: i32, offset_secs: i64) -> Attempt {
        Attempt {
            id: Uuid::new_v4(),
            session_id: Uuid::nil(),
            question_id,
            transcription: String::new(),
            audio_url: None,
            duration,
            score,
            checklist: None,
            feedback: None,
            improved_version: None,
            actionable_feedback: None,
            created_at: base_time() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn best_score_per_question_is_averaged() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let attempts = vec![
            attempt(q1, Some(70), 0, 0),
            attempt(q1, Some(90), 0, 1),
            attempt(q2, Some(80), 0, 2),
        ];
        let totals = aggregate(&attempts);
        assert_eq!(totals.overall_score, 85);
        assert_eq!(totals.distinct_questions, 2);
    }

    #[test]
    fn duration_counts_every_attempt() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let attempts = vec![
            attempt(q1, Some(10), 30, 0),
            attempt(q1, Some(20), 45, 1),
            attempt(q2, Some(30), 60, 2),
        ];
        assert_eq!(aggregate(&attempts).total_duration, 135);
    }

    #[test]
    fn no_attempts_means_zero() {
        let totals = aggregate(&[]);
        assert_eq!(totals.overall_score, 0);
        assert_eq!(totals.total_duration, 0);
        assert_eq!(totals.distinct_questions, 0);
    }

    #[test]
    fn unscored_attempts_count_as_zero() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let attempts = vec![attempt(q1, None, 5, 0), attempt(q2, Some(75), 5, 1)];
        // (0 + 75) / 2 = 37.5 -> 38
        assert_eq!(aggregate(&attempts).overall_score, 38);
    }

    #[test]
    fn later_lower_retry_does_not_lower_the_score() {
        let q1 = Uuid::new_v4();
        let attempts = vec![attempt(q1, Some(90), 0, 0), attempt(q1, Some(40), 0, 1)];
        assert_eq!(aggregate(&attempts).overall_score, 90);
        let best = best_attempts(&attempts);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].score, Some(90));
    }

    #[test]
    fn ties_show_the_most_recent_attempt() {
        let q1 = Uuid::new_v4();
        let first = attempt(q1, Some(80), 0, 0);
        let second = attempt(q1, Some(80), 0, 10);
        let attempts = vec![first.clone(), second.clone()];

        let best = best_attempts(&attempts);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].id, second.id);
        assert_eq!(aggregate(&attempts).overall_score, 80);
    }

    #[test]
    fn ordinal_uses_first_appearance() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let attempts = vec![
            attempt(q1, Some(50), 0, 0),
            attempt(q1, Some(60), 0, 1),
            attempt(q1, Some(70), 0, 2),
            attempt(q2, Some(70), 0, 3),
        ];
        assert_eq!(question_ordinal(&attempts, q1), Some(1));
        assert_eq!(question_ordinal(&attempts, q2), Some(2));
        assert_eq!(question_ordinal(&attempts, Uuid::new_v4()), None);
        assert_eq!(distinct_question_ids(&attempts), vec![q1, q2]);
    }

    #[test]
    fn review_listing_is_ordered_by_creation() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let attempts = vec![
            attempt(q1, Some(50), 0, 0),
            attempt(q2, Some(60), 0, 5),
            attempt(q1, Some(95), 0, 9),
        ];
        let best = best_attempts(&attempts);
        let order: Vec<Uuid> = best.iter().map(|a| a.question_id).collect();
        assert_eq!(order, vec![q2, q1]);
    }
}
