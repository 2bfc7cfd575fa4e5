//! Mock backend for testing
//!
//! Provides configurable responses for every model operation.
//! Useful for unit tests and development without a running LLM server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::{Error, Result};

use super::types::{ChatTurn, SessionHandle};
use super::LanguageModel;

/// Mock language model for testing
///
/// Returns predictable responses. Clones share counters, sessions and the
/// optional gate, so a test can keep a handle while the engine owns another.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether is_available should return true
    pub available: bool,
    reply: Option<String>,
    fail: bool,
    gate: Option<Arc<Semaphore>>,
    calls: Arc<AtomicUsize>,
    probes: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
    sessions: Arc<Mutex<HashMap<SessionHandle, Vec<ChatTurn>>>>,
    next_session: Arc<AtomicU64>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (available by default)
    pub fn new() -> Self {
        Self {
            available: true,
            reply: None,
            fail: false,
            gate: None,
            calls: Arc::new(AtomicUsize::new(0)),
            probes: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create an unavailable mock backend
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Every call errors
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Fixed reply for `respond` and `session_send`
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Hold every model call until the semaphore grants a permit
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of model calls made (probes excluded)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of availability probes made
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Every prompt or message received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// History of an open session
    pub fn session_history(&self, handle: SessionHandle) -> Option<Vec<ChatTurn>> {
        self.sessions.lock().ok()?.get(&handle).cloned()
    }

    async fn enter(&self, prompt: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| Error::Model("mock gate closed".into()))?;
        }

        if self.fail {
            return Err(Error::Model("mock failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LanguageModel for MockBackend {
    async fn is_available(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.available
    }

    async fn respond(&self, _instructions: &str, prompt: &str) -> Result<String> {
        self.enter(prompt).await?;
        Ok(self.reply.clone().unwrap_or_else(|| {
            "These patterns may be related to your logged factors. This is not medical advice."
                .to_string()
        }))
    }

    async fn open_session(
        &self,
        instructions: &str,
        context: &[ChatTurn],
    ) -> Result<SessionHandle> {
        self.enter(instructions).await?;
        let handle = SessionHandle(self.next_session.fetch_add(1, Ordering::SeqCst));
        let mut history = vec![ChatTurn::system(instructions)];
        history.extend_from_slice(context);
        self.sessions
            .lock()
            .map_err(|_| Error::Model("mock session lock poisoned".into()))?
            .insert(handle, history);
        Ok(handle)
    }

    async fn session_send(&self, handle: SessionHandle, message: &str) -> Result<String> {
        self.enter(message).await?;
        let reply = self
            .reply
            .clone()
            .unwrap_or_else(|| format!("Mock reply to: {}", message));

        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| Error::Model("mock session lock poisoned".into()))?;
        let history = sessions
            .get_mut(&handle)
            .ok_or_else(|| Error::NotFound(format!("{}", handle)))?;
        history.push(ChatTurn::user(message));
        history.push(ChatTurn::assistant(reply.clone()));
        Ok(reply)
    }

    fn close_session(&self, handle: SessionHandle) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(&handle);
        }
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ChatRole;

    #[tokio::test]
    async fn test_mock_availability() {
        let available = MockBackend::new();
        assert!(available.is_available().await);

        let unavailable = MockBackend::unavailable();
        assert!(!unavailable.is_available().await);
        assert_eq!(unavailable.calls(), 0);
    }

    #[tokio::test]
    async fn test_mock_reply_and_counters() {
        let mock = MockBackend::new().with_reply("fixed");
        let clone = mock.clone();

        assert_eq!(mock.respond("sys", "hello").await.unwrap(), "fixed");
        assert_eq!(clone.calls(), 1);
        assert_eq!(clone.prompts(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockBackend::failing();
        assert!(mock.respond("sys", "hello").await.is_err());
        assert!(mock.open_session("sys", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_sessions_keep_history() {
        let mock = MockBackend::new();
        let handle = mock.open_session("be brief", &[]).await.unwrap();
        let reply = mock.session_send(handle, "hi").await.unwrap();
        assert_eq!(reply, "Mock reply to: hi");

        let history = mock.session_history(handle).unwrap();
        let roles: Vec<_> = history.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![ChatRole::System, ChatRole::User, ChatRole::Assistant]);

        mock.close_session(handle);
        assert!(mock.session_history(handle).is_none());
        assert!(mock.session_send(handle, "again").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_gate_holds_calls() {
        let gate = Arc::new(Semaphore::new(0));
        let mock = MockBackend::new().with_gate(gate.clone());

        let task = {
            let mock = mock.clone();
            tokio::spawn(async move { mock.respond("sys", "held").await })
        };

        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        gate.add_permits(1);
        assert!(task.await.unwrap().is_ok());
    }
}
