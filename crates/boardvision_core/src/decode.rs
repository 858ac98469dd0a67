//! crates/boardvision_core/src/decode.rs
//!
//! Validating decode of AI service responses. The text is untrusted: it is
//! deserialized into typed structs and checked, never used by shape alone.

use serde::Deserialize;

use crate::domain::{AnalysisResult, QuizQuestion};
use crate::ports::{PortError, PortResult};

pub const QUIZ_OPTION_COUNT: usize = 4;

/// A quiz question as the service returns it, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDraft {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    pub explanation: String,
}

impl QuizDraft {
    pub fn into_question(self, id: String) -> QuizQuestion {
        QuizQuestion {
            id,
            question: self.question,
            options: self.options,
            correct_answer_index: self.correct_answer_index,
            explanation: self.explanation,
        }
    }
}

/// Strips a surrounding Markdown code fence, if the model added one.
pub fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the opening fence together with its language tag.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn check_question(index: usize, options: &[String], correct: usize) -> PortResult<()> {
    if options.len() != QUIZ_OPTION_COUNT {
        return Err(PortError::MalformedResponse(format!(
            "quiz question {} has {} options, expected {}",
            index,
            options.len(),
            QUIZ_OPTION_COUNT
        )));
    }
    if correct >= options.len() {
        return Err(PortError::MalformedResponse(format!(
            "quiz question {} has answer index {} outside 0..{}",
            index,
            correct,
            options.len()
        )));
    }
    Ok(())
}

fn non_empty(text: &str) -> PortResult<&str> {
    let body = strip_markdown_fences(text);
    if body.is_empty() {
        return Err(PortError::EmptyResponse);
    }
    Ok(body)
}

/// Decodes the analysis JSON into an `AnalysisResult`.
pub fn decode_analysis(text: &str) -> PortResult<AnalysisResult> {
    let body = non_empty(text)?;
    let result: AnalysisResult = serde_json::from_str(body)
        .map_err(|e| PortError::MalformedResponse(format!("analysis: {}", e)))?;

    if let Some(quiz) = &result.quiz {
        for (i, q) in quiz.iter().enumerate() {
            check_question(i, &q.options, q.correct_answer_index)?;
        }
    }
    Ok(result)
}

/// Decodes the quiz JSON array and checks every question's invariants.
pub fn decode_quiz(text: &str) -> PortResult<Vec<QuizDraft>> {
    let body = non_empty(text)?;
    let drafts: Vec<QuizDraft> = serde_json::from_str(body)
        .map_err(|e| PortError::MalformedResponse(format!("quiz: {}", e)))?;

    for (i, draft) in drafts.iter().enumerate() {
        check_question(i, &draft.options, draft.correct_answer_index)?;
    }
    Ok(drafts)
}
