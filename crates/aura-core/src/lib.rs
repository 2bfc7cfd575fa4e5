//! Aura Core Library
//!
//! Shared functionality for the Aura migraine log:
//! - Record, health and weather snapshot model
//! - Deterministic insight analyzers with parallel fan-out
//! - Analysis session with an aggregated error list and snapshots
//! - Pluggable local language model backends (Ollama, mock)
//! - Single-record explanations, QuickBit insight explanations and a counselor chat
//! - Prompt library for customizable prompts
//! - Record store and profile provider collaborators

pub mod ai;
pub mod chat;
pub mod config;
pub mod error;
pub mod guidance;
pub mod insights;
pub mod manager;
pub mod models;
pub mod prompts;
pub mod quickbit;
pub mod session;
pub mod store;
pub mod units;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    Capability, ChatRole, ChatTurn, LanguageModel, MockBackend, ModelClient, OllamaBackend,
    SessionHandle,
};
pub use chat::{ChatReply, ChatState, CounselorChat, CHAT_FAILED, CHAT_NOT_ACTIVE, CHAT_UNAVAILABLE};
pub use config::Config;
pub use error::{Error, Result};
pub use insights::{Insight, InsightCategory, InsightEngine, Priority, TagValue};
pub use manager::{AnalysisManager, GenerationOutcome};
pub use models::{HealthSnapshot, MenstrualPhase, Profile, Record, RecordId, Trigger, WeatherSnapshot};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use session::{EngineError, ErrorKind, SessionSnapshot};
pub use store::{
    InMemoryRecordStore, JsonFileRecordStore, ProfileProvider, RecordEvent, RecordStore,
    StaticProfile,
};
pub use units::UnitSystem;
