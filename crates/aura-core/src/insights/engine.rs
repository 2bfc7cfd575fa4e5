//! Insight Engine - fans out to every analyzer and reassembles the results

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Record;

use super::types::Insight;
use super::{
    FoodsAnalyzer, IntakeAnalyzer, PhaseAnalyzer, SleepAnalyzer, TrendAnalyzer, TriggersAnalyzer,
    WeatherAnalyzer,
};

/// Analytical dimensions, in the order their output is concatenated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    Trends,
    Triggers,
    Foods,
    Intake,
    Sleep,
    Weather,
    Phases,
}

impl AnalyzerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::Trends => "trends",
            AnalyzerKind::Triggers => "triggers",
            AnalyzerKind::Foods => "foods",
            AnalyzerKind::Intake => "intake",
            AnalyzerKind::Sleep => "sleep",
            AnalyzerKind::Weather => "weather",
            AnalyzerKind::Phases => "phases",
        }
    }

    pub fn all() -> &'static [AnalyzerKind] {
        &[
            AnalyzerKind::Trends,
            AnalyzerKind::Triggers,
            AnalyzerKind::Foods,
            AnalyzerKind::Intake,
            AnalyzerKind::Sleep,
            AnalyzerKind::Weather,
            AnalyzerKind::Phases,
        ]
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pure, synchronous analysis over an immutable record snapshot.
///
/// Implementations must return an empty list (not an error) for empty or
/// insufficient input. Errors and panics are isolated by the engine.
pub trait Analyzer: Send + Sync {
    /// Which dimension this analyzer covers
    fn kind(&self) -> AnalyzerKind;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Derive insights from the records as of `now`
    fn analyze(&self, records: &[Record], now: DateTime<Utc>) -> Result<Vec<Insight>>;
}

/// Result of one fan-out pass
#[derive(Debug, Default)]
pub struct AnalysisOutcome {
    /// Deduplicated and priority-sorted insights
    pub insights: Vec<Insight>,
    /// Analyzers that failed, with the cause
    pub failures: Vec<(AnalyzerKind, String)>,
}

/// Runs all registered analyzers in parallel
pub struct InsightEngine {
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightEngine {
    /// Create an engine with the built-in analyzers in declared order
    pub fn new() -> Self {
        let mut engine = Self { analyzers: vec![] };

        engine.register(Arc::new(TrendAnalyzer::new()));
        engine.register(Arc::new(TriggersAnalyzer::new()));
        engine.register(Arc::new(FoodsAnalyzer::new()));
        engine.register(Arc::new(IntakeAnalyzer::new()));
        engine.register(Arc::new(SleepAnalyzer::new()));
        engine.register(Arc::new(WeatherAnalyzer::new()));
        engine.register(Arc::new(PhaseAnalyzer::new()));

        engine
    }

    /// Create an engine with an explicit analyzer list
    pub fn with_analyzers(analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        Self { analyzers }
    }

    /// Register an analyzer; output order follows registration order
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    /// Get list of registered analyzer kinds
    pub fn analyzer_kinds(&self) -> Vec<AnalyzerKind> {
        self.analyzers.iter().map(|a| a.kind()).collect()
    }

    /// Run every analyzer on the blocking pool and reassemble in registration
    /// order, independent of completion order.
    pub async fn analyze_all(&self, records: Arc<Vec<Record>>, now: DateTime<Utc>) -> AnalysisOutcome {
        let handles: Vec<_> = self
            .analyzers
            .iter()
            .map(|analyzer| {
                let analyzer = Arc::clone(analyzer);
                let records = Arc::clone(&records);
                let kind = analyzer.kind();
                let handle = tokio::task::spawn_blocking(move || analyzer.analyze(&records, now));
                (kind, handle)
            })
            .collect();

        let mut collected = vec![];
        let mut failures = vec![];

        for (kind, handle) in handles {
            match handle.await {
                Ok(Ok(insights)) => {
                    tracing::debug!(
                        analyzer = kind.as_str(),
                        count = insights.len(),
                        "Analyzer complete"
                    );
                    collected.extend(insights);
                }
                Ok(Err(e)) => {
                    tracing::warn!(analyzer = kind.as_str(), error = %e, "Analyzer failed");
                    failures.push((kind, e.to_string()));
                }
                Err(e) => {
                    tracing::warn!(analyzer = kind.as_str(), error = %e, "Analyzer panicked");
                    failures.push((kind, format!("analyzer task aborted: {}", e)));
                }
            }
        }

        AnalysisOutcome {
            insights: prioritize(collected),
            failures,
        }
    }
}

/// Drop repeated dedupe keys (first occurrence wins), then stable-sort by
/// priority descending so equal priorities keep analyzer order.
pub fn prioritize(insights: Vec<Insight>) -> Vec<Insight> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Insight> = insights
        .into_iter()
        .filter(|insight| seen.insert(insight.dedupe_key.clone()))
        .collect();

    unique.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::insights::types::{InsightCategory, Priority};
    use crate::test_utils::{days_ago, fixed_now};

    struct FixedAnalyzer {
        kind: AnalyzerKind,
        output: Vec<Insight>,
    }

    impl Analyzer for FixedAnalyzer {
        fn kind(&self) -> AnalyzerKind {
            self.kind
        }

        fn name(&self) -> &'static str {
            "Fixed"
        }

        fn analyze(&self, _records: &[Record], _now: DateTime<Utc>) -> Result<Vec<Insight>> {
            Ok(self.output.clone())
        }
    }

    struct FailingAnalyzer(AnalyzerKind);

    impl Analyzer for FailingAnalyzer {
        fn kind(&self) -> AnalyzerKind {
            self.0
        }

        fn name(&self) -> &'static str {
            "Failing"
        }

        fn analyze(&self, _records: &[Record], _now: DateTime<Utc>) -> Result<Vec<Insight>> {
            Err(Error::Analyzer("boom".into()))
        }
    }

    struct PanickingAnalyzer;

    impl Analyzer for PanickingAnalyzer {
        fn kind(&self) -> AnalyzerKind {
            AnalyzerKind::Sleep
        }

        fn name(&self) -> &'static str {
            "Panicking"
        }

        fn analyze(&self, _records: &[Record], _now: DateTime<Utc>) -> Result<Vec<Insight>> {
            panic!("analyzer bug")
        }
    }

    fn insight(category: InsightCategory, priority: Priority, title: &str) -> Insight {
        Insight::new(category, priority, title, "message")
    }

    #[test]
    fn test_engine_creation() {
        let engine = InsightEngine::new();
        assert_eq!(engine.analyzer_kinds(), AnalyzerKind::all().to_vec());
    }

    #[test]
    fn test_prioritize_dedupes_first_wins_and_sorts_stably() {
        let first = insight(InsightCategory::Triggers, Priority::Low, "Trigger: Stress");
        let mut duplicate = insight(InsightCategory::Triggers, Priority::High, "trigger stress");
        duplicate.message = "second".into();

        let result = prioritize(vec![
            first,
            insight(InsightCategory::Foods, Priority::Medium, "Food: Cheese"),
            duplicate,
            insight(InsightCategory::TrendFrequency, Priority::High, "A"),
            insight(InsightCategory::Biometrics, Priority::Medium, "B"),
            insight(InsightCategory::IntakeSleep, Priority::High, "C"),
        ]);

        let keys: Vec<_> = result.iter().map(|i| i.dedupe_key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "trend_frequency:a",
                "intake_sleep:c",
                "foods:food-cheese",
                "biometrics:b",
                "triggers:trigger-stress",
            ]
        );
        // The low-priority first occurrence survived, not the high duplicate
        assert_eq!(result[4].message, "message");
    }

    #[tokio::test]
    async fn test_analyze_empty_records() {
        let engine = InsightEngine::new();
        let outcome = engine.analyze_all(Arc::new(vec![]), fixed_now()).await;
        assert!(outcome.insights.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let engine = InsightEngine::with_analyzers(vec![
            Arc::new(FixedAnalyzer {
                kind: AnalyzerKind::Trends,
                output: vec![insight(InsightCategory::TrendFrequency, Priority::Medium, "T")],
            }),
            Arc::new(FailingAnalyzer(AnalyzerKind::Triggers)),
            Arc::new(PanickingAnalyzer),
            Arc::new(FixedAnalyzer {
                kind: AnalyzerKind::Weather,
                output: vec![insight(InsightCategory::WeatherAssociation, Priority::Low, "W")],
            }),
        ]);

        let records = Arc::new(vec![Record::new(1, days_ago(1), 5, 5)]);
        let outcome = engine.analyze_all(records, fixed_now()).await;

        assert_eq!(outcome.insights.len(), 2);
        let failed: Vec<_> = outcome.failures.iter().map(|(k, _)| *k).collect();
        assert_eq!(failed, vec![AnalyzerKind::Triggers, AnalyzerKind::Sleep]);
        assert!(outcome.failures[0].1.contains("boom"));
    }
}
