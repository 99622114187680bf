use crate::models::preferences::{FeedbackDetail, FeedbackEmphasis, FeedbackTone};

fn tone_instruction(tone: FeedbackTone) -> &'static str {
    match tone {
        FeedbackTone::Encouraging => {
            "Be supportive and empathetic. Lead with strengths and point out flaws constructively."
        }
        FeedbackTone::Direct => {
            "Be professional, objective and direct. Stick to the facts and to how well the answer follows STAR."
        }
        FeedbackTone::Strict => {
            "Be demanding and critical, like a bar raiser at a large tech company. Do not soften weaknesses."
        }
    }
}

fn detail_instruction(detail: FeedbackDetail) -> &'static str {
    match detail {
        FeedbackDetail::Brief => {
            "Keep `analysis_highlighting` and `actionable_feedback` to at most two sentences each and address only the biggest issue."
        }
        FeedbackDetail::Standard => {
            "Give a balanced analysis covering the main strengths and weaknesses without being verbose."
        }
        FeedbackDetail::Deep => {
            "Give an in-depth analysis. In `actionable_feedback` explain the reason behind every suggestion and make `improved_version` detailed."
        }
    }
}

fn emphasis_instruction(emphasis: FeedbackEmphasis) -> &'static str {
    match emphasis {
        FeedbackEmphasis::Balance => {
            "Weight communication, technical accuracy and structure equally."
        }
        FeedbackEmphasis::Clarity => {
            "PRIMARY FOCUS: clarity. Penalize rambling, jargon and unstructured thoughts; `improved_version` must be concise."
        }
        FeedbackEmphasis::Storytelling => {
            "PRIMARY FOCUS: narrative. The answer should paint the problem and its resolution and show emotional intelligence."
        }
        FeedbackEmphasis::Confidence => {
            "PRIMARY FOCUS: confidence. Flag hedging words (maybe, kind of, I think) and reward strong verbs and ownership of results."
        }
        FeedbackEmphasis::TechnicalDepth => {
            "PRIMARY FOCUS: engineering rigour. Penalize glossing over implementation; expect named technologies, algorithms and trade-offs."
        }
    }
}

/// System instructions for the scoring model, shaped by the owner's
/// feedback preferences.
pub fn feedback_instructions(
    emphasis: FeedbackEmphasis,
    tone: FeedbackTone,
    detail: FeedbackDetail,
) -> String {
    format!(
        r#"You are an interview coach preparing candidates for engineering roles.

{tone}
{detail}
{emphasis}

Review the candidate's answer to the interview question using the STAR method.
Weighting: Situation 20%, Task 10%, Action 60%, Result 10%.
Prefer specific past examples over hypotheticals and "I" statements over "we".

Respond with a single raw JSON object and nothing else (no markdown fences, no
surrounding prose). Use single quotes inside text values; never put unescaped
double quotes inside a value.

Keys:
- "score": integer 0-100.
- "checklist": object with boolean fields
  "specific_examples_provided", "no_negative_language_detected",
  "no_filler_words_detected", "technical_detail_present", "appropriate_length".
- "analysis_highlighting": narrative analysis. Wrap strong parts in
  <green>...</green> and weak parts in <red>...</red>.
- "actionable_feedback": concrete steps to improve, per STAR section.
- "improved_version": the answer rewritten as a strong STAR response.
"#,
        tone = tone_instruction(tone),
        detail = detail_instruction(detail),
        emphasis = emphasis_instruction(emphasis),
    )
}

/// User turn sent alongside the instructions.
pub fn answer_message(question: &str, answer: &str) -> String {
    format!("Question: {}\nAnswer: {}", question, answer)
}
