//! crates/boardvision_core/src/ports.rs
//!
//! Defines the service contracts (traits) at the boundary of the core.
//! The generative-AI service and the durable key-value store are the only
//! outside collaborators; everything behind these traits is replaceable.

use async_trait::async_trait;

use crate::contract::GenerateContentRequest;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The AI service was unreachable or answered with a non-success status.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The AI service answered but produced no text.
    #[error("The AI service returned an empty response")]
    EmptyResponse,
    /// Text was returned but it is not JSON matching the expected schema.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The same action is still outstanding.
    #[error("A {0} request is already in progress")]
    Busy(&'static str),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    /// Performs one "generate content" call.
    ///
    /// Returns `Ok(None)` when the model answered without any text.
    async fn generate_content(&self, request: &GenerateContentRequest) -> PortResult<Option<String>>;
}

/// A string-keyed, string-valued durable store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;
}
