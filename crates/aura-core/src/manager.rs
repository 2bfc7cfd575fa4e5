//! Analysis Manager
//!
//! The engine instance a host app (or the CLI) holds on to. It owns the
//! session, runs refreshes, and is the single entry point for everything that
//! needs the language model.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  list_records   ┌────────────────┐  spawn_blocking x7  ┌───────────┐
//! │ RecordStore  │ ──────────────▶ │ AnalysisManager│ ──────────────────▶ │ Analyzers │
//! └──────────────┘                 │                │ ◀────────────────── └───────────┘
//!        │ RecordEvent::Created    │   session      │   declared order
//!        └───────────────────────▶ │   (single      │
//!                                  │    writer)     │ ── watch ──▶ SessionSnapshot
//!                                  └────────────────┘
//!                                     │ respond / open_session / session_send
//!                                     ▼
//!                                  ModelClient (Ollama | Mock)
//! ```
//!
//! All session mutation goes through `update`, which takes the session lock,
//! applies the change and publishes a fresh snapshot. The lock is never held
//! across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ai::{Capability, ChatTurn, LanguageModel, ModelClient};
use crate::chat::{self, ChatReply, ChatState, CounselorChat, CHAT_NOT_ACTIVE, CHAT_UNAVAILABLE};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::guidance::{self, generative_insight};
use crate::insights::{Insight, InsightEngine};
use crate::models::{Record, RecordId};
use crate::prompts::{Prompt, PromptId, PromptLibrary};
use crate::quickbit;
use crate::session::{AnalysisSession, ErrorKind, SessionSnapshot};
use crate::store::{ProfileProvider, RecordEvent, RecordStore};

/// Default number of records in the chat seed
pub const DEFAULT_CHAT_RECORDS: usize = 60;

/// What happened to an explanation request
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// The explanation was written back and surfaced
    Generated(String),
    /// Another generation was running; the request was dropped
    Busy { in_flight: RecordId },
    /// No usable language model
    Unavailable,
    /// The model call or the write-back failed
    Failed(String),
}

/// Applies `reset` to the session when dropped, including on early return
struct SessionReset<'a, F: FnOnce(&mut AnalysisSession)> {
    manager: &'a AnalysisManager,
    reset: Option<F>,
}

impl<'a, F: FnOnce(&mut AnalysisSession)> SessionReset<'a, F> {
    fn new(manager: &'a AnalysisManager, reset: F) -> Self {
        Self {
            manager,
            reset: Some(reset),
        }
    }
}

impl<F: FnOnce(&mut AnalysisSession)> Drop for SessionReset<'_, F> {
    fn drop(&mut self) {
        if let Some(reset) = self.reset.take() {
            self.manager.update(reset);
        }
    }
}

pub struct AnalysisManager {
    store: Arc<dyn RecordStore>,
    profile: Arc<dyn ProfileProvider>,
    capability: Capability,
    engine: InsightEngine,
    prompts: Mutex<PromptLibrary>,
    session: Mutex<AnalysisSession>,
    chat: tokio::sync::Mutex<CounselorChat>,
    updates: watch::Sender<SessionSnapshot>,
    chat_records: usize,
}

impl AnalysisManager {
    /// Create a manager with the built-in analyzers and embedded prompts
    pub fn new(
        store: Arc<dyn RecordStore>,
        profile: Arc<dyn ProfileProvider>,
        capability: Capability,
    ) -> Self {
        let (updates, _) = watch::channel(SessionSnapshot::default());
        Self {
            store,
            profile,
            capability,
            engine: InsightEngine::new(),
            prompts: Mutex::new(PromptLibrary::new()),
            session: Mutex::new(AnalysisSession::default()),
            chat: tokio::sync::Mutex::new(CounselorChat::new()),
            updates,
            chat_records: DEFAULT_CHAT_RECORDS,
        }
    }

    /// Create a manager wired up from configuration
    pub fn from_config(
        config: &Config,
        store: Arc<dyn RecordStore>,
        profile: Arc<dyn ProfileProvider>,
    ) -> Self {
        let capability = Capability::new(ModelClient::from_config(&config.ai));
        let prompts = match &config.prompts.override_dir {
            Some(dir) => PromptLibrary::with_override_dir(dir.clone()),
            None => PromptLibrary::new(),
        };
        Self::new(store, profile, capability)
            .with_prompts(prompts)
            .with_chat_records(config.chat.max_records)
    }

    /// Replace the analyzer set
    pub fn with_engine(mut self, engine: InsightEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Mutex::new(prompts);
        self
    }

    /// Cap the number of records seeded into a chat
    pub fn with_chat_records(mut self, max_records: usize) -> Self {
        self.chat_records = max_records.max(1);
        self
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Current state of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session().snapshot()
    }

    /// Receive a fresh snapshot after every session change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    fn session(&self) -> MutexGuard<'_, AnalysisSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the session and publish the result
    fn update<R>(&self, change: impl FnOnce(&mut AnalysisSession) -> R) -> R {
        let mut session = self.session();
        let result = change(&mut session);
        self.updates.send_replace(session.snapshot());
        result
    }

    fn prompt(&self, id: PromptId) -> Result<Prompt> {
        let mut library = self
            .prompts
            .lock()
            .map_err(|_| Error::InvalidData("prompt library lock poisoned".into()))?;
        library.get(id).cloned()
    }

    // ========== Refresh ==========

    /// Re-run every analyzer over the store's records as of `now`
    pub async fn refresh(&self, now: DateTime<Utc>) -> SessionSnapshot {
        self.refresh_from(|| self.store.list_records(), now).await
    }

    /// Re-run every analyzer over an explicit record list
    pub async fn refresh_records(&self, records: Vec<Record>, now: DateTime<Utc>) -> SessionSnapshot {
        self.refresh_from(move || Ok(records), now).await
    }

    async fn refresh_from<F>(&self, load: F, now: DateTime<Utc>) -> SessionSnapshot
    where
        F: FnOnce() -> Result<Vec<Record>>,
    {
        let already_running = self.update(|session| {
            if session.is_refreshing {
                return true;
            }
            session.is_refreshing = true;
            session.errors.clear();
            false
        });
        if already_running {
            tracing::debug!("Refresh already running, skipping");
            return self.snapshot();
        }
        let guard = SessionReset::new(self, |session: &mut AnalysisSession| {
            session.is_refreshing = false;
        });

        let records = match load() {
            Ok(records) => Arc::new(records),
            Err(e) => {
                tracing::warn!(error = %e, "Refresh failed, keeping previous insights");
                self.update(|session| session.push_error(ErrorKind::RefreshFailed, e.to_string()));
                drop(guard);
                return self.snapshot();
            }
        };

        let outcome = self.engine.analyze_all(Arc::clone(&records), now).await;
        let latest = records.iter().max_by_key(|r| r.start_date);

        self.update(|session| {
            let mut insights = outcome.insights;

            if let Some(record) = latest {
                let explanation = record
                    .explanation
                    .clone()
                    .or_else(|| session.guidance_cache.get(&record.id).cloned());
                if let Some(text) = explanation {
                    prepend(&mut insights, generative_insight(record, &text));
                }
            }

            for (kind, message) in outcome.failures {
                session.push_error(ErrorKind::for_analyzer(kind), message);
            }

            tracing::info!(
                records = records.len(),
                insights = insights.len(),
                errors = session.errors.len(),
                "Refresh complete"
            );

            session.insights = insights;
            session.last_refreshed_at = Some(now);
        });

        drop(guard);
        self.snapshot()
    }

    // ========== Explanation generation ==========

    /// Explain one record with the language model and surface the answer first.
    ///
    /// Only one generation runs at a time; a request arriving while another is
    /// in flight is dropped and reported as `Busy` without recording an error.
    pub async fn generate_explanation(&self, record: &Record) -> GenerationOutcome {
        let Some(client) = self.capability.client().await else {
            self.update(|session| {
                session.push_error(
                    ErrorKind::IntelligenceUnavailable,
                    "language model is not available",
                )
            });
            return GenerationOutcome::Unavailable;
        };

        let busy = self.update(|session| match session.generation_in_flight {
            Some(in_flight) => Some(in_flight),
            None => {
                session.generation_in_flight = Some(record.id);
                None
            }
        });
        if let Some(in_flight) = busy {
            tracing::info!(record = record.id, in_flight, "Generation already running, dropping request");
            return GenerationOutcome::Busy { in_flight };
        }
        let _in_flight = SessionReset::new(self, |session: &mut AnalysisSession| {
            session.generation_in_flight = None;
        });

        tracing::info!(record = record.id, model = client.model(), "Generating explanation");

        match self.explain_record(client, record).await {
            Ok(text) => {
                self.update(|session| {
                    session.guidance_cache.insert(record.id, text.clone());
                    prepend(&mut session.insights, generative_insight(record, &text));
                });
                GenerationOutcome::Generated(text)
            }
            Err(e) => {
                tracing::warn!(record = record.id, error = %e, "Explanation failed");
                self.update(|session| {
                    session.push_error(ErrorKind::IntelligenceAnalysisFailed, e.to_string())
                });
                GenerationOutcome::Failed(e.to_string())
            }
        }
    }

    /// Ask the model, then write the answer back onto the stored record
    async fn explain_record(&self, client: &ModelClient, record: &Record) -> Result<String> {
        let template = self.prompt(PromptId::ExplainRecord)?;
        let (instructions, prompt) = guidance::build_prompt(&template, record);

        let text = client.respond(&instructions, &prompt).await?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(Error::Model("empty explanation".into()));
        }

        // File-backed stores rewrite the whole log
        let store = Arc::clone(&self.store);
        let (id, explanation) = (record.id, text.clone());
        tokio::task::spawn_blocking(move || {
            store.update_record(id, &mut |stored: &mut Record| {
                stored.explanation = Some(explanation.clone())
            })
        })
        .await
        .map_err(|e| Error::Store(format!("write-back task failed: {}", e)))??;
        Ok(text)
    }

    /// Run the explanation generator for every record the store creates.
    ///
    /// Each event gets its own task, so events arriving during a generation
    /// meet the single-flight gate and are dropped.
    pub fn spawn_record_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.store.subscribe();
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(RecordEvent::Created(record)) => {
                        tracing::debug!(record = record.id, "Record created");
                        let manager = Arc::clone(&manager);
                        tokio::spawn(async move {
                            manager.generate_explanation(&record).await;
                        });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Record listener lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    // ========== QuickBit ==========

    /// Short explanation of one insight, cached by dedupe key
    pub async fn explain_insight(&self, insight: &Insight) -> Option<String> {
        let key = insight.dedupe_key.as_str();
        let cached = self.session().quickbits.get(key).map(str::to_string);
        if cached.is_some() {
            return cached;
        }

        let Some(client) = self.capability.client().await else {
            self.update(|session| {
                session.push_error(
                    ErrorKind::IntelligenceUnavailable,
                    "language model is not available",
                )
            });
            return None;
        };

        let answer = match self.prompt(PromptId::ExplainInsight) {
            Ok(template) => {
                let (instructions, prompt) = quickbit::build_prompt(&template, insight);
                client.respond(&instructions, &prompt).await
            }
            Err(e) => Err(e),
        };

        match answer {
            Ok(text) => {
                let text = text.trim().to_string();
                self.update(|session| session.quickbits.insert(key, text.clone()));
                Some(text)
            }
            Err(e) => {
                tracing::warn!(insight = key, error = %e, "QuickBit failed");
                self.update(|session| session.push_error(ErrorKind::QuickbitFailed, e.to_string()));
                None
            }
        }
    }

    // ========== Counselor chat ==========

    /// Start a fresh chat seeded with the log; returns the greeting
    pub async fn start_chat(&self) -> String {
        let Some(client) = self.capability.client().await else {
            return CHAT_UNAVAILABLE.to_string();
        };

        let records = match self.store.list_records() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load records for chat");
                self.update(|session| session.push_error(ErrorKind::ChatStartFailed, e.to_string()));
                return CHAT_NOT_ACTIVE.to_string();
            }
        };

        let template = match self.prompt(PromptId::CounselorChat) {
            Ok(template) => template,
            Err(e) => {
                self.update(|session| session.push_error(ErrorKind::ChatStartFailed, e.to_string()));
                return CHAT_NOT_ACTIVE.to_string();
            }
        };

        let profile = self.profile.current_profile();
        let seed = chat::build_seed(&template, &records, profile.as_ref(), self.chat_records);

        let mut chat = self.chat.lock().await;
        if let Err(e) = chat.start(client, seed).await {
            tracing::warn!(error = %e, "Could not open chat session");
            self.update(|session| session.push_error(ErrorKind::ChatStartFailed, e.to_string()));
        }

        chat.transcript()
            .last()
            .map(|turn| turn.content.clone())
            .unwrap_or_default()
    }

    /// Send one message; always returns text safe to show
    pub async fn send_chat(&self, message: &str) -> String {
        let Some(client) = self.capability.client().await else {
            return CHAT_UNAVAILABLE.to_string();
        };

        let reply = self.chat.lock().await.send(client, message).await;
        if let ChatReply::Failed(cause) = &reply {
            self.update(|session| session.push_error(ErrorKind::ChatSendFailed, cause.clone()));
        }
        reply.text().to_string()
    }

    pub async fn reset_chat(&self) {
        self.chat.lock().await.reset(self.capability.configured());
        tracing::debug!("Counselor chat reset");
    }

    pub async fn chat_state(&self) -> ChatState {
        self.chat.lock().await.state()
    }

    pub async fn chat_transcript(&self) -> Vec<ChatTurn> {
        self.chat.lock().await.transcript().to_vec()
    }

    /// Forget cached explanations and QuickBits
    pub fn reset_caches(&self) {
        self.update(|session| {
            session.guidance_cache.clear();
            session.quickbits.clear();
        });
    }
}

/// Put `insight` first, replacing any insight with the same dedupe key
fn prepend(insights: &mut Vec<Insight>, insight: Insight) {
    insights.retain(|existing| existing.dedupe_key != insight.dedupe_key);
    insights.insert(0, insight);
}
