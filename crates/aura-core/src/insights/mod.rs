//! Insight Engine - Deterministic Migraine Pattern Analysis
//!
//! The Insight Engine is a pluggable set of analyzers that read an immutable
//! snapshot of the migraine log and surface what's interesting, actionable, or
//! concerning. Every analyzer is pure: same records and same `now` give the
//! same insights.
//!
//! ## Analyzers
//!
//! - **Trends** - Frequency, severity and duration over the last 14 days vs the 14 before
//! - **Triggers** / **Foods** - Most common labels and their share of migraines
//! - **Intake** - Hydration, sleep, energy, glucose and blood oxygen averages
//! - **Sleep** - Pain after short nights vs longer ones
//! - **Weather** - Pressure, humidity and temperature associations
//! - **Phases** - Pain across menstrual cycle phases
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aura_core::insights::InsightEngine;
//!
//! let engine = InsightEngine::new();
//! let outcome = engine.analyze_all(Arc::new(records), Utc::now()).await;
//! for insight in outcome.insights { ... }
//! ```

pub mod engine;
pub mod intake;
pub mod phase;
pub mod sleep;
pub mod stats;
pub mod trend;
pub mod triggers;
pub mod types;
pub mod weather;

pub use engine::{prioritize, AnalysisOutcome, Analyzer, AnalyzerKind, InsightEngine};
pub use intake::IntakeAnalyzer;
pub use phase::PhaseAnalyzer;
pub use sleep::SleepAnalyzer;
pub use trend::TrendAnalyzer;
pub use triggers::{FoodsAnalyzer, TriggersAnalyzer};
pub use types::{dedupe_key, Insight, InsightCategory, Priority, TagValue};
pub use weather::WeatherAnalyzer;
