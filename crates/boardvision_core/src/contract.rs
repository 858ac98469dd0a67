//! crates/boardvision_core/src/contract.rs
//!
//! Builds the instruction text and structured-output schema for the three
//! operations sent to the generative-AI service: whiteboard analysis, quiz
//! generation and follow-up chat. Everything here is deterministic.

use serde_json::{json, Value};

use crate::domain::{ChatMessage, ChatRole, ImageAsset, OutputMode, ProgrammingLanguage};

/// Upper bound on explanation characters sent with a quiz request.
pub const QUIZ_CONTEXT_LIMIT: usize = 8000;
/// Upper bound on context characters embedded in the chat system instruction.
pub const CHAT_CONTEXT_LIMIT: usize = 10000;
pub const DEFAULT_THINKING_BUDGET: u32 = 32768;
pub const JSON_MIME_TYPE: &str = "application/json";

const ANALYSIS_SYSTEM_INSTRUCTION: &str = "You are BoardVision AI, an elite technical architect. Convert sketches to high-quality code and architectural diagrams. Always be precise, educational, and clean.";

const QUIZ_SYSTEM_INSTRUCTION: &str =
    "Create a rigorous but fair quiz based on the provided content.";

const ANALYSIS_TASKS: &str = r#"Tasks:
1. Transcribe what you see.
2. Explain the logic in simple terms (Student-friendly, use Markdown).
3. Generate WORKING CODE (even if it's a diagram, implement the logic).
4. Generate a MERMAID DIAGRAM (if applicable).
5. Create 3-5 high-quality Flashcards.
6. Fill all schema fields."#;

const CHAT_SYSTEM_TEMPLATE: &str = r#"You are BoardVision Copilot.
Context: {context}
Help the user refine their code, explain concepts, or troubleshoot."#;

//=========================================================================================
// Request Model
//=========================================================================================

/// One piece of a content turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// An inline image: raw base64 payload plus its MIME type.
    InlineData { mime_type: String, data: String },
}

/// A role-tagged turn of ordered parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: ChatRole,
    pub parts: Vec<Part>,
}

/// Everything a "generate content" call needs apart from the model identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateContentRequest {
    pub system_instruction: Option<String>,
    pub contents: Vec<Content>,
    /// Forces structured output when set.
    pub response_mime_type: Option<String>,
    pub response_schema: Option<Value>,
    pub thinking_budget: Option<u32>,
}

/// Bounds applied while assembling requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractLimits {
    pub quiz_context_chars: usize,
    pub chat_context_chars: usize,
    pub thinking_budget: Option<u32>,
}

impl Default for ContractLimits {
    fn default() -> Self {
        Self {
            quiz_context_chars: QUIZ_CONTEXT_LIMIT,
            chat_context_chars: CHAT_CONTEXT_LIMIT,
            thinking_budget: Some(DEFAULT_THINKING_BUDGET),
        }
    }
}

//=========================================================================================
// Schemas
//=========================================================================================

/// Structured-output schema for the analysis call.
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "detectedType": {
                "type": "STRING",
                "enum": ["code", "diagram", "math", "notes"],
                "description": "The identified content type of the whiteboard."
            },
            "suggestedLanguage": {
                "type": "STRING",
                "description": "The most appropriate programming language."
            },
            "reasoning": {
                "type": "STRING",
                "description": "Why this type and language were chosen."
            },
            "title": {
                "type": "STRING",
                "description": "A short, descriptive title."
            },
            "transcription": {
                "type": "STRING",
                "description": "Raw transcription of text and logic seen on the whiteboard."
            },
            "explanation": {
                "type": "STRING",
                "description": "Detailed natural language summary and walkthrough in Markdown format."
            },
            "code": {
                "type": "STRING",
                "description": "Executable code implementation (if applicable)."
            },
            "diagram": {
                "type": "STRING",
                "description": "Mermaid.js diagram code (if applicable)."
            },
            "flashcards": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "term": {
                            "type": "STRING",
                            "description": "Front of card: A specific question or concept name"
                        },
                        "definition": {
                            "type": "STRING",
                            "description": "Back of card: The answer/definition"
                        }
                    },
                    "required": ["term", "definition"]
                },
                "description": "3-5 key learning concepts formatted as Question/Answer pairs."
            },
            "secondaryInfo": {
                "type": "OBJECT",
                "properties": {
                    "complexity": { "type": "STRING" },
                    "edgeCases": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "relatedConcepts": { "type": "ARRAY", "items": { "type": "STRING" } }
                }
            }
        },
        "required": [
            "detectedType", "suggestedLanguage", "reasoning", "title",
            "transcription", "explanation", "secondaryInfo"
        ]
    })
}

/// Structured-output schema for quiz generation. Questions carry no ids.
pub fn quiz_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "Provide exactly 4 options."
                },
                "correctAnswerIndex": {
                    "type": "INTEGER",
                    "description": "The index (0-3) of the correct option."
                },
                "explanation": {
                    "type": "STRING",
                    "description": "Why this answer is correct."
                }
            },
            "required": ["question", "options", "correctAnswerIndex", "explanation"]
        }
    })
}

//=========================================================================================
// Instruction Fragments
//=========================================================================================

pub fn mode_instruction(mode: OutputMode) -> &'static str {
    match mode {
        OutputMode::Auto => "Detect the content type automatically.",
        OutputMode::Code => "Focus on extracting algorithms and generating clean code.",
        OutputMode::Diagram => {
            "Focus on system design. Generate a clear Mermaid diagram and explain the flow."
        }
        OutputMode::Math => "Solve the math problem step-by-step with LaTeX.",
        OutputMode::Notes => "Summarize the content as study notes.",
    }
}

pub fn language_instruction(language: ProgrammingLanguage) -> String {
    match language {
        ProgrammingLanguage::Auto => "Choose the best language for the code.".to_string(),
        other => format!("Output code in {}.", other),
    }
}

/// Whether a chat message seems to refer to the uploaded images.
///
/// A keyword heuristic: it matches "image" or "sketch" anywhere in the text,
/// case-insensitively. It will miss paraphrases and match unrelated uses.
pub fn should_attach_images(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("image") || lowered.contains("sketch")
}

/// Returns at most `limit` characters of `text` without splitting a character.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn image_parts(images: &[ImageAsset]) -> impl Iterator<Item = Part> + '_ {
    images.iter().map(|img| Part::InlineData {
        mime_type: img.mime_type.clone(),
        data: img.raw_base64.clone(),
    })
}

//=========================================================================================
// Request Builders
//=========================================================================================

/// Builds the analysis prompt text. A blank refinement is treated as absent.
pub fn analysis_prompt(
    language: ProgrammingLanguage,
    mode: OutputMode,
    refinement: Option<&str>,
) -> String {
    let mut prompt = String::from("Analyze these whiteboard images.\n");
    prompt.push_str(mode_instruction(mode));
    prompt.push('\n');
    prompt.push_str(&language_instruction(language));
    prompt.push('\n');
    if let Some(refinement) = refinement.map(str::trim).filter(|r| !r.is_empty()) {
        prompt.push_str(&format!("IMPORTANT REFINEMENT: {}\n", refinement));
    }
    prompt.push('\n');
    prompt.push_str(ANALYSIS_TASKS);
    prompt
}

pub fn build_analysis_request(
    images: &[ImageAsset],
    language: ProgrammingLanguage,
    mode: OutputMode,
    refinement: Option<&str>,
    limits: &ContractLimits,
) -> GenerateContentRequest {
    let mut parts: Vec<Part> = image_parts(images).collect();
    parts.push(Part::Text(analysis_prompt(language, mode, refinement)));

    GenerateContentRequest {
        system_instruction: Some(ANALYSIS_SYSTEM_INSTRUCTION.to_string()),
        contents: vec![Content {
            role: ChatRole::User,
            parts,
        }],
        response_mime_type: Some(JSON_MIME_TYPE.to_string()),
        response_schema: Some(analysis_schema()),
        thinking_budget: limits.thinking_budget,
    }
}

pub fn build_quiz_request(context: &str, limits: &ContractLimits) -> GenerateContentRequest {
    let prompt = format!(
        "Based on the following content, generate 5 multiple-choice questions to test understanding.\nContent:\n\"\"\"{}\"\"\"",
        truncate_chars(context, limits.quiz_context_chars)
    );

    GenerateContentRequest {
        system_instruction: Some(QUIZ_SYSTEM_INSTRUCTION.to_string()),
        contents: vec![Content {
            role: ChatRole::User,
            parts: vec![Part::Text(prompt)],
        }],
        response_mime_type: Some(JSON_MIME_TYPE.to_string()),
        response_schema: Some(quiz_schema()),
        thinking_budget: None,
    }
}

/// Builds a chat turn: prior messages as history, then the new message.
///
/// `history` must not already contain `message`.
pub fn build_chat_request(
    history: &[ChatMessage],
    message: &str,
    context: &str,
    images: &[ImageAsset],
    limits: &ContractLimits,
) -> GenerateContentRequest {
    let system_instruction = CHAT_SYSTEM_TEMPLATE
        .replace("{context}", truncate_chars(context, limits.chat_context_chars));

    let mut contents: Vec<Content> = history
        .iter()
        .map(|msg| Content {
            role: msg.role,
            parts: vec![Part::Text(msg.text.clone())],
        })
        .collect();

    let mut last_parts = vec![Part::Text(message.to_string())];
    if should_attach_images(message) {
        last_parts.extend(image_parts(images));
    }
    contents.push(Content {
        role: ChatRole::User,
        parts: last_parts,
    });

    GenerateContentRequest {
        system_instruction: Some(system_instruction),
        contents,
        response_mime_type: None,
        response_schema: None,
        thinking_budget: None,
    }
}
