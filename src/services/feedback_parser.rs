//! Lenient reading of scoring-model output.
//!
//! Models are asked for a bare JSON object but regularly wrap it in fences,
//! leave trailing commas, put raw newlines inside strings or stop mid-object.
//! `repair_json` patches those up; `parse_feedback` turns the result into a
//! `ScoredFeedback` or reports why it could not. Both are pure.

use serde_json::{Map, Value as JsonValue};

use crate::models::attempt::Checklist;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FeedbackParseError {
    #[error("model output is not valid JSON after repair: {0}")]
    Malformed(String),

    #[error("model output is not a JSON object")]
    NotAnObject,

    #[error("model output has no score")]
    MissingScore,

    #[error("model output has a non-numeric score: {0}")]
    InvalidScore(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredFeedback {
    pub score: i32,
    pub checklist: Option<Checklist>,
    pub feedback: Option<String>,
    pub improved_version: Option<String>,
    pub actionable_feedback: Option<String>,
}

pub fn parse_feedback(raw: &str) -> Result<ScoredFeedback, FeedbackParseError> {
    let repaired = repair_json(raw);
    let value: JsonValue = serde_json::from_str(&repaired)
        .map_err(|e| FeedbackParseError::Malformed(e.to_string()))?;
    let obj = value.as_object().ok_or(FeedbackParseError::NotAnObject)?;

    Ok(ScoredFeedback {
        score: read_score(obj.get("score"))?,
        checklist: obj
            .get("checklist")
            .and_then(|v| v.as_object())
            .map(read_checklist),
        feedback: read_text(obj, "analysis_highlighting").or_else(|| read_text(obj, "feedback")),
        improved_version: read_text(obj, "improved_version"),
        actionable_feedback: read_text(obj, "actionable_feedback"),
    })
}

/// Best-effort syntactic repair of near-JSON text. Text that has no object
/// or array in it is returned trimmed and will fail to parse.
pub fn repair_json(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    let Some(start) = trimmed.find(|c: char| c == '{' || c == '[') else {
        return trimmed.to_string();
    };
    let body = &trimmed[start..];

    let mut out = String::with_capacity(body.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    // Output length and open brackets just before the last top-level-safe comma.
    let mut checkpoint: Option<(usize, Vec<char>)> = None;

    for ch in body.chars() {
        if in_string {
            if escaped {
                out.push(ch);
                escaped = false;
                continue;
            }
            match ch {
                '\\' => {
                    out.push(ch);
                    escaped = true;
                }
                '"' => {
                    out.push(ch);
                    in_string = false;
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
            continue;
        }

        match ch {
            '"' => {
                out.push(ch);
                in_string = true;
            }
            '{' => {
                out.push(ch);
                stack.push('}');
            }
            '[' => {
                out.push(ch);
                stack.push(']');
            }
            '}' | ']' => {
                drop_trailing_comma(&mut out);
                out.push(ch);
                stack.pop();
                if stack.is_empty() {
                    break;
                }
            }
            ',' => {
                checkpoint = Some((out.len(), stack.clone()));
                out.push(ch);
            }
            c => out.push(c),
        }
    }

    if in_string && escaped {
        out.pop();
    }
    let primary = close_open(out.clone(), in_string, &stack);
    if serde_json::from_str::<JsonValue>(&primary).is_ok() {
        return primary;
    }

    // A half-written member at the end; cut back to the last complete one.
    match checkpoint {
        Some((len, open)) => close_open(out[..len].to_string(), false, &open),
        None => primary,
    }
}

fn drop_trailing_comma(out: &mut String) {
    while out.ends_with(char::is_whitespace) {
        out.pop();
    }
    if out.ends_with(',') {
        out.pop();
    }
}

fn close_open(mut out: String, in_string: bool, open: &[char]) -> String {
    if in_string {
        out.push('"');
    }
    drop_trailing_comma(&mut out);
    if out.ends_with(':') {
        out.push_str(" null");
    }
    for closer in open.iter().rev() {
        out.push(*closer);
    }
    out
}

fn read_score(value: Option<&JsonValue>) -> Result<i32, FeedbackParseError> {
    let value = value.ok_or(FeedbackParseError::MissingScore)?;
    let number = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    let number = number
        .filter(|n| n.is_finite())
        .ok_or_else(|| FeedbackParseError::InvalidScore(value.to_string()))?;
    Ok(number.round().clamp(0.0, 100.0) as i32)
}

fn read_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        JsonValue::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn read_checklist(obj: &Map<String, JsonValue>) -> Checklist {
    let flag = |key: &str| obj.get(key).and_then(read_bool);

    // Some models answer the inverted question.
    let no_negative = flag("no_negative_language_detected")
        .or_else(|| flag("apologizing_negative_language_detected").map(|b| !b))
        .unwrap_or(false);

    Checklist {
        specific_examples_provided: flag("specific_examples_provided").unwrap_or(false),
        no_negative_language_detected: no_negative,
        no_filler_words_detected: flag("no_filler_words_detected").unwrap_or(false),
        technical_detail_present: flag("technical_detail_present").unwrap_or(false),
        appropriate_length: flag("appropriate_length").unwrap_or(false),
    }
}

fn read_text(obj: &Map<String, JsonValue>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
