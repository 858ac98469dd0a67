//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;

use boardvision_core::contract::{
    ContractLimits, CHAT_CONTEXT_LIMIT, DEFAULT_THINKING_BUDGET, QUIZ_CONTEXT_LIMIT,
};
use tracing::Level;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// `None` disables thinking configuration on analysis requests.
    pub thinking_budget: Option<u32>,
    pub quiz_context_limit: usize,
    pub chat_context_limit: usize,
    /// Unset means requests are never cut short.
    pub gemini_timeout: Option<Duration>,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and storage ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://boardvision.db?mode=rwc".to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- AI service ---
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;
        let gemini_model =
            lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let gemini_base_url = lookup("GEMINI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        // A budget of 0 turns thinking configuration off.
        let thinking_budget = match parse_var::<u32>(&lookup, "THINKING_BUDGET")? {
            Some(0) => None,
            Some(budget) => Some(budget),
            None => Some(DEFAULT_THINKING_BUDGET),
        };
        let quiz_context_limit =
            parse_var::<usize>(&lookup, "QUIZ_CONTEXT_LIMIT")?.unwrap_or(QUIZ_CONTEXT_LIMIT);
        let chat_context_limit =
            parse_var::<usize>(&lookup, "CHAT_CONTEXT_LIMIT")?.unwrap_or(CHAT_CONTEXT_LIMIT);
        let gemini_timeout =
            parse_var::<u64>(&lookup, "GEMINI_TIMEOUT_SECS")?.map(Duration::from_secs);

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            thinking_budget,
            quiz_context_limit,
            chat_context_limit,
            gemini_timeout,
            cors_origin,
        })
    }

    pub fn contract_limits(&self) -> ContractLimits {
        ContractLimits {
            quiz_context_chars: self.quiz_context_limit,
            chat_context_chars: self.chat_context_limit,
            thinking_budget: self.thinking_budget,
        }
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
        })
        .transpose()
}
