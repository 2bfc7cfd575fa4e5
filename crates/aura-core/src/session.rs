//! Analysis session state and the engine's error taxonomy
//!
//! The session is never persisted; it is rebuilt each run from the record log
//! plus process-lifetime caches. Consumers see it through `SessionSnapshot`.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::insights::{AnalyzerKind, Insight};
use crate::models::RecordId;
use crate::quickbit::QuickBitCache;

/// Stable codes for failures the engine recovers from and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TrendsFailed,
    TriggersFailed,
    FoodsFailed,
    IntakeFailed,
    SleepFailed,
    WeatherFailed,
    PhasesFailed,
    RefreshFailed,
    IntelligenceUnavailable,
    IntelligenceAnalysisFailed,
    ChatSendFailed,
    ChatStartFailed,
    QuickbitFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrendsFailed => "trends_failed",
            Self::TriggersFailed => "triggers_failed",
            Self::FoodsFailed => "foods_failed",
            Self::IntakeFailed => "intake_failed",
            Self::SleepFailed => "sleep_failed",
            Self::WeatherFailed => "weather_failed",
            Self::PhasesFailed => "phases_failed",
            Self::RefreshFailed => "refresh_failed",
            Self::IntelligenceUnavailable => "intelligence_unavailable",
            Self::IntelligenceAnalysisFailed => "intelligence_analysis_failed",
            Self::ChatSendFailed => "chat_send_failed",
            Self::ChatStartFailed => "chat_start_failed",
            Self::QuickbitFailed => "quickbit_failed",
        }
    }

    /// The failure code for an analyzer
    pub fn for_analyzer(kind: AnalyzerKind) -> Self {
        match kind {
            AnalyzerKind::Trends => Self::TrendsFailed,
            AnalyzerKind::Triggers => Self::TriggersFailed,
            AnalyzerKind::Foods => Self::FoodsFailed,
            AnalyzerKind::Intake => Self::IntakeFailed,
            AnalyzerKind::Sleep => Self::SleepFailed,
            AnalyzerKind::Weather => Self::WeatherFailed,
            AnalyzerKind::Phases => Self::PhasesFailed,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recovered failure, kept in the session's error list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Mutable engine state; only touched by the manager
#[derive(Debug, Default)]
pub struct AnalysisSession {
    pub insights: Vec<Insight>,
    pub is_refreshing: bool,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub errors: Vec<EngineError>,
    pub guidance_cache: HashMap<RecordId, String>,
    pub quickbits: QuickBitCache,
    pub generation_in_flight: Option<RecordId>,
}

impl AnalysisSession {
    pub fn push_error(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.errors.push(EngineError::new(kind, message));
    }

    pub fn is_generating_guidance(&self) -> bool {
        self.generation_in_flight.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            insights: self.insights.clone(),
            is_refreshing: self.is_refreshing,
            last_refreshed_at: self.last_refreshed_at,
            errors: self.errors.clone(),
            is_generating_guidance: self.is_generating_guidance(),
            generation_in_flight: self.generation_in_flight,
            guidance_cached: self.guidance_cache.len(),
            quickbits_cached: self.quickbits.len(),
        }
    }
}

/// Immutable view of the session handed to consumers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub insights: Vec<Insight>,
    pub is_refreshing: bool,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub errors: Vec<EngineError>,
    pub is_generating_guidance: bool,
    pub generation_in_flight: Option<RecordId>,
    pub guidance_cached: usize,
    pub quickbits_cached: usize,
}

impl SessionSnapshot {
    /// Errors of one kind
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &EngineError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}
