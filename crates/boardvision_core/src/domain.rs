//! crates/boardvision_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Field names serialize in camelCase so the same types describe both the
//! AI service's JSON contract and the persisted snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Selections
//=========================================================================================

/// The kind of content the model recognised on the whiteboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedType {
    Code,
    Diagram,
    Math,
    Notes,
}

impl DetectedType {
    pub const ALL: [DetectedType; 4] = [Self::Code, Self::Diagram, Self::Math, Self::Notes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Diagram => "diagram",
            Self::Math => "math",
            Self::Notes => "notes",
        }
    }
}

/// The language the user wants generated code in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgrammingLanguage {
    #[default]
    Auto,
    Python,
    JavaScript,
    TypeScript,
    Java,
    #[serde(rename = "C++")]
    Cpp,
    Go,
    #[serde(rename = "LaTeX")]
    Latex,
    Markdown,
    #[serde(rename = "SQL")]
    Sql,
}

impl ProgrammingLanguage {
    pub const ALL: [ProgrammingLanguage; 10] = [
        Self::Auto,
        Self::Python,
        Self::JavaScript,
        Self::TypeScript,
        Self::Java,
        Self::Cpp,
        Self::Go,
        Self::Latex,
        Self::Markdown,
        Self::Sql,
    ];

    /// The display name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::Java => "Java",
            Self::Cpp => "C++",
            Self::Go => "Go",
            Self::Latex => "LaTeX",
            Self::Markdown => "Markdown",
            Self::Sql => "SQL",
        }
    }
}

impl fmt::Display for ProgrammingLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgrammingLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|lang| lang.as_str().eq_ignore_ascii_case(wanted))
            .or_else(|| match wanted.to_ascii_lowercase().as_str() {
                "cpp" => Some(Self::Cpp),
                "js" => Some(Self::JavaScript),
                "ts" => Some(Self::TypeScript),
                _ => None,
            })
            .ok_or_else(|| format!("unknown programming language '{}'", s))
    }
}

/// The output-mode directive that steers the analysis prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Auto,
    Code,
    Diagram,
    Math,
    Notes,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Code => "code",
            Self::Diagram => "diagram",
            Self::Math => "math",
            Self::Notes => "notes",
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "code" => Ok(Self::Code),
            "diagram" => Ok(Self::Diagram),
            "math" => Ok(Self::Math),
            "notes" => Ok(Self::Notes),
            _ => Err(format!("unknown output mode '{}'", s)),
        }
    }
}

/// Process-wide colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

//=========================================================================================
// Uploads
//=========================================================================================

/// An image the user selected for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub id: Uuid,
    pub raw_base64: String,
    pub mime_type: String,
    /// A `data:` URL usable directly as an `<img>` source.
    pub preview_ref: String,
}

//=========================================================================================
// Analysis Results
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_cases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_concepts: Option<Vec<String>>,
}

/// A multiple-choice question. `correct_answer_index` always indexes `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    pub explanation: String,
}

/// The structured content produced by one analysis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub detected_type: DetectedType,
    pub suggested_language: String,
    pub reasoning: String,
    pub title: String,
    pub transcription: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flashcards: Option<Vec<Flashcard>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Vec<QuizQuestion>>,
    pub secondary_info: SecondaryInfo,
}

impl AnalysisResult {
    /// The explanation followed by the generated code, used as chat context.
    pub fn chat_context(&self) -> String {
        let mut context = self.explanation.clone();
        if let Some(code) = &self.code {
            context.push_str(code);
        }
        context
    }
}

//=========================================================================================
// Conversation
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

//=========================================================================================
// Persisted Collections
//=========================================================================================

/// A result committed to the history list, with the selections that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub thumbnail: String,
    pub language: ProgrammingLanguage,
    pub mode: OutputMode,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFlashcard {
    pub id: Uuid,
    pub term: String,
    pub definition: String,
    pub deck_name: String,
    pub date_added: DateTime<Utc>,
}

impl SavedFlashcard {
    /// Whether this saved card is the same (term, definition, deck) triple.
    pub fn matches(&self, card: &Flashcard, deck_name: &str) -> bool {
        self.term == card.term && self.definition == card.definition && self.deck_name == deck_name
    }
}
