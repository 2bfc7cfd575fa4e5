//! Pluggable local language model abstraction
//!
//! This module provides a backend-agnostic interface for the model calls the
//! engine makes. All backends run locally (no cloud APIs).
//!
//! # Architecture
//!
//! - `LanguageModel` trait: single-shot `respond` plus stateful sessions
//! - `ModelClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - `Capability`: one-time availability probe consulted by every AI entry point
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = ModelClient::from_config(&config.ai);
//! let capability = Capability::new(client);
//!
//! if let Some(client) = capability.client().await {
//!     let text = client.respond("You are a data analyst.", "Explain...").await?;
//! }
//! ```
//!
//! # Configuration
//!
//! `[ai]` in `aura.toml`, overridable by environment variables:
//! - `AI_BACKEND`: Backend to use (ollama, mock, none). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)

mod capability;
mod mock;
mod ollama;
pub mod types;

pub use capability::Capability;
pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::AiConfig;
use crate::error::Result;

/// Trait defining the contract of a language model client
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Check if the backend can serve requests
    async fn is_available(&self) -> bool;

    /// Single-shot completion with system instructions
    async fn respond(&self, instructions: &str, prompt: &str) -> Result<String>;

    /// Open a multi-turn session seeded with system instructions followed by
    /// `context` turns the model should see before the first user message
    async fn open_session(
        &self,
        instructions: &str,
        context: &[ChatTurn],
    ) -> Result<SessionHandle>;

    /// Send a user message within a session and return the reply
    async fn session_send(&self, handle: SessionHandle, message: &str) -> Result<String>;

    /// Forget a session's history
    fn close_session(&self, handle: SessionHandle);

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete model client enum
#[derive(Clone)]
pub enum ModelClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl ModelClient {
    /// Create a model client from the `[ai]` configuration
    ///
    /// - `ollama` (default): Uses `host` and `model`
    /// - `mock`: Creates a mock backend
    /// - `none`: No model; every AI entry point reports unavailable
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        match config.backend.to_lowercase().as_str() {
            "ollama" => Some(Self::ollama(&config.host, &config.model, config.timeout())),
            "mock" => Some(ModelClient::Mock(MockBackend::new())),
            "none" | "off" | "disabled" => None,
            other => {
                tracing::warn!(backend = %other, "Unknown AI backend, falling back to ollama");
                Some(Self::ollama(&config.host, &config.model, config.timeout()))
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str, timeout: Duration) -> Self {
        ModelClient::Ollama(OllamaBackend::new(host, model, timeout))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        ModelClient::Mock(MockBackend::new())
    }
}

// Implement LanguageModel for ModelClient by delegating to the inner backend
#[async_trait]
impl LanguageModel for ModelClient {
    async fn is_available(&self) -> bool {
        match self {
            ModelClient::Ollama(b) => b.is_available().await,
            ModelClient::Mock(b) => b.is_available().await,
        }
    }

    async fn respond(&self, instructions: &str, prompt: &str) -> Result<String> {
        match self {
            ModelClient::Ollama(b) => b.respond(instructions, prompt).await,
            ModelClient::Mock(b) => b.respond(instructions, prompt).await,
        }
    }

    async fn open_session(
        &self,
        instructions: &str,
        context: &[ChatTurn],
    ) -> Result<SessionHandle> {
        match self {
            ModelClient::Ollama(b) => b.open_session(instructions, context).await,
            ModelClient::Mock(b) => b.open_session(instructions, context).await,
        }
    }

    async fn session_send(&self, handle: SessionHandle, message: &str) -> Result<String> {
        match self {
            ModelClient::Ollama(b) => b.session_send(handle, message).await,
            ModelClient::Mock(b) => b.session_send(handle, message).await,
        }
    }

    fn close_session(&self, handle: SessionHandle) {
        match self {
            ModelClient::Ollama(b) => b.close_session(handle),
            ModelClient::Mock(b) => b.close_session(handle),
        }
    }

    fn model(&self) -> &str {
        match self {
            ModelClient::Ollama(b) => b.model(),
            ModelClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ModelClient::Ollama(b) => b.host(),
            ModelClient::Mock(b) => b.host(),
        }
    }
}
