//! crates/boardvision_core/src/gateway.rs
//!
//! The AI Gateway: the only place that talks to the generative-AI service and
//! turns its answers into typed results.
//!
//! Analysis and quiz failures are returned to the caller. Chat failures are
//! absorbed into a fixed apologetic reply so the conversation never breaks.
//! Nothing here retries.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::contract::{self, ContractLimits, GenerateContentRequest};
use crate::decode;
use crate::domain::{
    AnalysisResult, ChatMessage, ImageAsset, OutputMode, ProgrammingLanguage, QuizQuestion,
};
use crate::ports::{ContentGenerationService, PortError, PortResult};

/// Reply used when a chat turn fails for any reason.
pub const CHAT_FAILURE_REPLY: &str = "I encountered an error processing your request.";
/// Reply used when the model answers a chat turn with no text.
pub const CHAT_EMPTY_REPLY: &str = "I'm not sure how to respond to that.";

#[derive(Clone)]
pub struct AiGateway {
    client: Arc<dyn ContentGenerationService>,
    limits: ContractLimits,
}

impl AiGateway {
    pub fn new(client: Arc<dyn ContentGenerationService>) -> Self {
        Self::with_limits(client, ContractLimits::default())
    }

    pub fn with_limits(client: Arc<dyn ContentGenerationService>, limits: ContractLimits) -> Self {
        Self { client, limits }
    }

    pub fn limits(&self) -> &ContractLimits {
        &self.limits
    }

    /// Sends the request and insists on non-blank text.
    async fn generate_text(&self, request: &GenerateContentRequest) -> PortResult<String> {
        match self.client.generate_content(request).await? {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(PortError::EmptyResponse),
        }
    }

    /// Analyzes whiteboard images into an `AnalysisResult`.
    pub async fn analyze(
        &self,
        images: &[ImageAsset],
        language: ProgrammingLanguage,
        mode: OutputMode,
        refinement: Option<&str>,
    ) -> PortResult<AnalysisResult> {
        if images.is_empty() {
            return Err(PortError::InvalidInput(
                "at least one image is required for analysis".to_string(),
            ));
        }

        let request =
            contract::build_analysis_request(images, language, mode, refinement, &self.limits);
        let outcome = async {
            let text = self.generate_text(&request).await?;
            decode::decode_analysis(&text)
        }
        .await;

        match outcome {
            Ok(result) => {
                info!(
                    title = %result.title,
                    detected_type = result.detected_type.as_str(),
                    images = images.len(),
                    "Analysis completed"
                );
                Ok(result)
            }
            Err(e) => {
                error!("Analysis failed: {}", e);
                Err(e)
            }
        }
    }

    /// Generates a quiz from an explanation. Every question gets a fresh id.
    pub async fn generate_quiz(&self, context: &str) -> PortResult<Vec<QuizQuestion>> {
        let request = contract::build_quiz_request(context, &self.limits);
        let outcome = async {
            let text = self.generate_text(&request).await?;
            decode::decode_quiz(&text)
        }
        .await;

        match outcome {
            Ok(drafts) => {
                let questions: Vec<QuizQuestion> = drafts
                    .into_iter()
                    .map(|draft| draft.into_question(format!("q-{}", Uuid::new_v4())))
                    .collect();
                info!(questions = questions.len(), "Quiz generated");
                Ok(questions)
            }
            Err(e) => {
                error!("Quiz generation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Sends a follow-up chat turn. Always yields a reply.
    pub async fn send_follow_up(
        &self,
        history: &[ChatMessage],
        message: &str,
        context: &str,
        images: &[ImageAsset],
    ) -> String {
        let request =
            contract::build_chat_request(history, message, context, images, &self.limits);

        match self.client.generate_content(&request).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => CHAT_EMPTY_REPLY.to_string(),
            Err(e) => {
                warn!("Chat request failed, replying with fallback: {}", e);
                CHAT_FAILURE_REPLY.to_string()
            }
        }
    }
}
