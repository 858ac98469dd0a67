//! services/api/src/web/protocol.rs
//!
//! Defines the JSON request and response bodies exchanged between a client and
//! the API server. Core types are passed through unchanged and documented as
//! plain objects.

use std::collections::HashMap;

use boardvision_core::domain::{
    AnalysisResult, ChatMessage, HistoryItem, ImageAsset, OutputMode, ProgrammingLanguage,
    QuizQuestion, SavedFlashcard, Theme,
};
use boardvision_core::quiz::{Grade, QuizScore};
use boardvision_core::review::ReviewView;
use boardvision_core::session::ActivityFlags;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Requests Sent FROM the Client TO the Server
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
pub struct SelectionRequest {
    #[schema(value_type = String, example = "Python")]
    pub language: ProgrammingLanguage,
    #[schema(value_type = String, example = "code")]
    pub mode: OutputMode,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct AnalyzeRequest {
    /// Extra direction for a re-analysis, e.g. "Make it iterative".
    #[serde(default)]
    pub refinement: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct QuizScoreRequest {
    /// Question id to the chosen option index.
    pub answers: HashMap<String, usize>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ChatRequest {
    pub message: String,
}

/// A quick action such as "explain this better"; sent as "Please {action}.".
#[derive(Deserialize, Debug, ToSchema)]
pub struct ChatActionRequest {
    pub action: String,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct SaveFlashcardsRequest {
    /// Indices into the current result's flashcards; all of them when absent.
    #[serde(default)]
    pub indices: Option<Vec<usize>>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ThemeRequest {
    #[schema(value_type = String, example = "dark")]
    pub theme: Theme,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct ReviewRequest {
    /// Review only this deck; every saved card when absent.
    #[serde(default)]
    pub deck: Option<String>,
}

//=========================================================================================
// Responses Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub id: Uuid,
    pub mime_type: String,
    pub preview_ref: String,
}

impl From<&ImageAsset> for UploadSummary {
    fn from(asset: &ImageAsset) -> Self {
        Self {
            id: asset.id,
            mime_type: asset.mime_type.clone(),
            preview_ref: asset.preview_ref.clone(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadsResponse {
    pub added: usize,
    pub uploads: Vec<UploadSummary>,
}

/// Everything a client needs to render the workspace chrome.
#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    #[schema(value_type = String)]
    pub theme: Theme,
    #[schema(value_type = String)]
    pub language: ProgrammingLanguage,
    #[schema(value_type = String)]
    pub mode: OutputMode,
    #[schema(value_type = Object)]
    pub flags: ActivityFlags,
    pub uploads: Vec<UploadSummary>,
    pub has_result: bool,
    pub chat_length: usize,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    #[schema(value_type = Object)]
    pub result: AnalysisResult,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub history_id: Uuid,
    #[schema(value_type = Object)]
    pub result: AnalysisResult,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct DiagramResponse {
    /// Mermaid source ready to render, if the result has a diagram.
    pub diagram: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct QuizResponse {
    #[schema(value_type = Vec<Object>)]
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct QuizScoreResponse {
    pub score: usize,
    pub total: usize,
    #[schema(value_type = String, example = "A")]
    pub grade: Grade,
}

impl From<QuizScore> for QuizScoreResponse {
    fn from(score: QuizScore) -> Self {
        Self {
            score: score.score,
            total: score.total,
            grade: score.grade,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ChatTranscript {
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ChatResponse {
    #[schema(value_type = Object)]
    pub reply: ChatMessage,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HistoryResponse {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<HistoryItem>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct FlashcardsResponse {
    #[schema(value_type = Vec<Object>)]
    pub cards: Vec<SavedFlashcard>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SaveFlashcardsResponse {
    pub added: usize,
    pub total: usize,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ThemeResponse {
    #[schema(value_type = String)]
    pub theme: Theme,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ReviewResponse {
    #[schema(value_type = Object)]
    pub review: ReviewView,
}
