//! Ollama backend implementation
//!
//! HTTP client for the Ollama API. Single-shot prompts go to `/api/generate`;
//! sessions go to `/api/chat` with the history held client-side per handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::{ChatTurn, SessionHandle};
use super::LanguageModel;

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
    sessions: Arc<Mutex<HashMap<SessionHandle, Vec<ChatTurn>>>>,
    next_session: Arc<AtomicU64>,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    fn history(&self, handle: SessionHandle) -> Result<Vec<ChatTurn>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| Error::Model("session lock poisoned".into()))?;
        sessions
            .get(&handle)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{}", handle)))
    }
}

/// Request to /api/generate
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response from /api/generate
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Request to /api/chat
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
}

/// Response from /api/chat
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatTurn,
}

fn non_empty(text: String) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(Error::Model("empty response from model".into()))
    } else {
        Ok(trimmed.to_string())
    }
}

#[async_trait]
impl LanguageModel for OllamaBackend {
    async fn is_available(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn respond(&self, instructions: &str, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            system: instructions,
            prompt,
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let generated: GenerateResponse = response.json().await?;
        debug!(chars = generated.response.len(), "Ollama generate response");

        non_empty(generated.response)
    }

    async fn open_session(
        &self,
        instructions: &str,
        context: &[ChatTurn],
    ) -> Result<SessionHandle> {
        let handle = SessionHandle(self.next_session.fetch_add(1, Ordering::SeqCst));
        let mut history = vec![ChatTurn::system(instructions)];
        history.extend_from_slice(context);
        self.sessions
            .lock()
            .map_err(|_| Error::Model("session lock poisoned".into()))?
            .insert(handle, history);
        debug!(%handle, context = context.len(), "Opened Ollama chat session");
        Ok(handle)
    }

    async fn session_send(&self, handle: SessionHandle, message: &str) -> Result<String> {
        let mut messages = self.history(handle)?;
        messages.push(ChatTurn::user(message));

        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let chat: ChatResponse = response.json().await?;
        let reply = non_empty(chat.message.content)?;

        // History only advances when the exchange completed
        if let Ok(mut sessions) = self.sessions.lock() {
            if let Some(history) = sessions.get_mut(&handle) {
                history.push(ChatTurn::user(message));
                history.push(ChatTurn::assistant(reply.clone()));
            }
        }

        Ok(reply)
    }

    fn close_session(&self, handle: SessionHandle) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(&handle);
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
