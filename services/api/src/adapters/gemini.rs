//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini `generateContent` API.
//! It implements the `ContentGenerationService` port from the `core` crate.

use std::time::Duration;

use async_trait::async_trait;
use boardvision_core::{
    contract::{Content, GenerateContentRequest, Part},
    ports::{ContentGenerationService, PortError, PortResult},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

/// Longest slice of an error body carried into a `Transport` error.
const ERROR_BODY_EXCERPT: usize = 1024;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentGenerationService` against Gemini.
#[derive(Clone)]
pub struct GeminiAdapter {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiAdapter {
    /// Creates a new `GeminiAdapter`. A `timeout` of `None` leaves calls unbounded.
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            api_key,
            model,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

//=========================================================================================
// Wire Format
//=========================================================================================

fn part_to_json(part: &Part) -> Value {
    match part {
        Part::Text(text) => json!({ "text": text }),
        Part::InlineData { mime_type, data } => json!({
            "inlineData": { "mimeType": mime_type, "data": data }
        }),
    }
}

fn content_to_json(content: &Content) -> Value {
    json!({
        "role": content.role.as_str(),
        "parts": content.parts.iter().map(part_to_json).collect::<Vec<_>>(),
    })
}

/// Builds the JSON body of a `generateContent` call.
pub fn request_body(request: &GenerateContentRequest) -> Value {
    let mut body = json!({
        "contents": request.contents.iter().map(content_to_json).collect::<Vec<_>>(),
    });

    if let Some(instruction) = &request.system_instruction {
        body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }

    let mut generation_config = serde_json::Map::new();
    if let Some(mime) = &request.response_mime_type {
        generation_config.insert("responseMimeType".to_string(), json!(mime));
    }
    if let Some(schema) = &request.response_schema {
        generation_config.insert("responseSchema".to_string(), schema.clone());
    }
    if let Some(budget) = request.thinking_budget {
        generation_config.insert(
            "thinkingConfig".to_string(),
            json!({ "thinkingBudget": budget }),
        );
    }
    if !generation_config.is_empty() {
        body["generationConfig"] = Value::Object(generation_config);
    }

    body
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

/// Concatenates the answer text of the first candidate, skipping thought parts.
pub fn extract_text(body: &str) -> PortResult<Option<String>> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        PortError::Transport(format!("Failed to parse Gemini response wrapper: {}", e))
    })?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    Ok(if text.is_empty() { None } else { Some(text) })
}

/// The start of `body`, cut on a character boundary.
fn excerpt(body: &str) -> String {
    if body.len() <= ERROR_BODY_EXCERPT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_EXCERPT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

//=========================================================================================
// `ContentGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentGenerationService for GeminiAdapter {
    async fn generate_content(&self, request: &GenerateContentRequest) -> PortResult<Option<String>> {
        let body = request_body(request);
        debug!(model = %self.model, turns = request.contents.len(), "Calling Gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let msg = if e.is_timeout() {
                    "Gemini request timed out".to_string()
                } else {
                    format!("Gemini request failed: {}", e)
                };
                error!("{}", msg);
                PortError::Transport(msg)
            })?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| PortError::Transport(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            let msg = format!("Gemini API error: {} - {}", status, excerpt(&body_text));
            error!("{}", msg);
            return Err(PortError::Transport(msg));
        }

        extract_text(&body_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardvision_core::contract::{build_analysis_request, ContractLimits};
    use boardvision_core::domain::{ChatRole, ImageAsset, OutputMode, ProgrammingLanguage};
    use uuid::Uuid;

    #[test]
    fn test_request_body_for_analysis() {
        let image = ImageAsset {
            id: Uuid::new_v4(),
            raw_base64: "AAAA".to_string(),
            mime_type: "image/jpeg".to_string(),
            preview_ref: "data:image/jpeg;base64,AAAA".to_string(),
        };
        let request = build_analysis_request(
            &[image],
            ProgrammingLanguage::Python,
            OutputMode::Code,
            None,
            &ContractLimits::default(),
        );
        let body = request_body(&request);

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["data"], "AAAA");
        assert!(body["systemInstruction"]["parts"][0]["text"].is_string());
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 32768);
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_request_body_for_plain_chat() {
        let request = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content {
                role: ChatRole::Model,
                parts: vec![Part::Text("hi".to_string())],
            }],
            response_mime_type: None,
            response_schema: None,
            thinking_budget: None,
        };
        let body = request_body(&request);
        assert_eq!(body["contents"][0]["role"], "model");
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_extract_text_skips_thoughts() {
        let body = r#"{"candidates":[{"content":{"parts":[
            {"text":"thinking...","thought":true},
            {"text":"{\"a\":"},
            {"text":"1}"}
        ]}}]}"#;
        assert_eq!(extract_text(body).unwrap().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_extract_text_without_candidates() {
        assert_eq!(extract_text(r#"{"candidates":[]}"#).unwrap(), None);
        assert_eq!(extract_text(r#"{"promptFeedback":{}}"#).unwrap(), None);
        assert!(matches!(extract_text("<html>"), Err(PortError::Transport(_))));
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let body = "é".repeat(2000);
        let cut = excerpt(&body);
        assert!(cut.len() <= ERROR_BODY_EXCERPT + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn test_endpoint() {
        let adapter = GeminiAdapter::new(
            "key".to_string(),
            "gemini-3-pro-preview".to_string(),
            "https://example.test/".to_string(),
            None,
        )
        .unwrap();
        assert_eq!(
            adapter.endpoint(),
            "https://example.test/v1beta/models/gemini-3-pro-preview:generateContent"
        );
    }
}
