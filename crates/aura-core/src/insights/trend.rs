//! Trend Analyzer
//!
//! Compares the last 14 days against the 14 days before them:
//! - Frequency: number of records
//! - Severity: average pain
//! - Duration: average hours, finished records only

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Record;

use super::engine::{Analyzer, AnalyzerKind};
use super::stats::{mean, mean_pain, prior, recent, round_to};
use super::types::{Insight, InsightCategory, Priority};

pub struct TrendAnalyzer {
    /// Minimum change in average pain to report (default 0.5)
    min_severity_delta: f64,
    /// Minimum change in average hours to report (default 0.25)
    min_duration_delta_hours: f64,
}

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self {
            min_severity_delta: 0.5,
            min_duration_delta_hours: 0.25,
        }
    }

    fn frequency(&self, recent: &[&Record], prior: &[&Record]) -> Option<Insight> {
        let (recent_count, prior_count) = (recent.len(), prior.len());
        if recent_count == prior_count || recent_count + prior_count == 0 {
            return None;
        }

        let increased = recent_count > prior_count;
        let pct = if prior_count == 0 {
            100.0
        } else {
            let delta = recent_count.abs_diff(prior_count) as f64;
            (delta / prior_count.max(1) as f64 * 100.0).round()
        };
        let direction = if increased { "increased" } else { "decreased" };

        let insight = Insight::new(
            InsightCategory::TrendFrequency,
            if increased { Priority::High } else { Priority::Medium },
            format!("Migraine frequency {}", direction),
            format!(
                "You logged {} migraines in the last 14 days versus {} in the 14 days before, {} {:.0}%.",
                recent_count,
                prior_count,
                if increased { "up" } else { "down" },
                pct
            ),
        )
        .with_tag("recentCount", recent_count)
        .with_tag("priorCount", prior_count)
        .with_tag("pct", pct)
        .with_tag("direction", direction);

        Some(insight)
    }

    fn severity(&self, recent: &[&Record], prior: &[&Record]) -> Option<Insight> {
        let recent_avg = mean_pain(recent.iter().copied())?;
        let prior_avg = mean_pain(prior.iter().copied())?;
        let delta = recent_avg - prior_avg;
        if delta.abs() < self.min_severity_delta {
            return None;
        }

        let higher = delta > 0.0;
        let direction = if higher { "higher" } else { "lower" };

        let insight = Insight::new(
            InsightCategory::TrendSeverity,
            if higher { Priority::Medium } else { Priority::Low },
            format!("Average pain {}", direction),
            format!(
                "Average pain over the last 14 days was {:.1}/10, compared with {:.1}/10 in the previous 14 days.",
                recent_avg, prior_avg
            ),
        )
        .with_tag("recentAvgPain", round_to(recent_avg, 2))
        .with_tag("priorAvgPain", round_to(prior_avg, 2))
        .with_tag("delta", round_to(delta, 2))
        .with_tag("direction", direction);

        Some(insight)
    }

    fn duration(&self, recent: &[&Record], prior: &[&Record]) -> Option<Insight> {
        let recent_avg = mean(recent.iter().filter_map(|r| r.duration_hours()))?;
        let prior_avg = mean(prior.iter().filter_map(|r| r.duration_hours()))?;
        let delta = recent_avg - prior_avg;
        if delta.abs() < self.min_duration_delta_hours {
            return None;
        }

        let longer = delta > 0.0;
        let direction = if longer { "longer" } else { "shorter" };

        let insight = Insight::new(
            InsightCategory::TrendDuration,
            if longer { Priority::Medium } else { Priority::Low },
            format!("Migraines lasting {}", direction),
            format!(
                "Recent migraines lasted {:.1} hours on average, compared with {:.1} hours in the previous 14 days.",
                recent_avg, prior_avg
            ),
        )
        .with_tag("recentAvgHours", round_to(recent_avg, 2))
        .with_tag("priorAvgHours", round_to(prior_avg, 2))
        .with_tag("deltaHours", round_to(delta, 2))
        .with_tag("direction", direction);

        Some(insight)
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for TrendAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Trends
    }

    fn name(&self) -> &'static str {
        "Trends"
    }

    fn analyze(&self, records: &[Record], now: DateTime<Utc>) -> Result<Vec<Insight>> {
        let recent = recent(records, now);
        let prior = prior(records, now);

        Ok([
            self.frequency(&recent, &prior),
            self.severity(&recent, &prior),
            self.duration(&recent, &prior),
        ]
        .into_iter()
        .flatten()
        .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::TagValue;
    use crate::test_utils::{days_ago, fixed_now};
    use chrono::Duration;

    fn record(id: i64, days: i64, pain: u8) -> Record {
        Record::new(id, days_ago(days), pain, 3)
    }

    #[test]
    fn test_frequency_increase_scenario() {
        let mut records: Vec<_> = (0..5).map(|i| record(i, 1 + i, 5)).collect();
        records.push(record(10, 16, 5));
        records.push(record(11, 20, 5));

        let insights = TrendAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        let freq = insights
            .iter()
            .find(|i| i.category == InsightCategory::TrendFrequency)
            .unwrap();

        assert_eq!(freq.priority, Priority::High);
        assert_eq!(freq.tag("pct").and_then(TagValue::as_f64), Some(150.0));
        assert_eq!(freq.tag("direction").and_then(TagValue::as_str), Some("increased"));
    }

    #[test]
    fn test_frequency_from_empty_prior_is_100_pct() {
        let records = vec![record(1, 2, 5)];
        let insights = TrendAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].tag("pct").and_then(TagValue::as_f64), Some(100.0));
    }

    #[test]
    fn test_frequency_decrease_is_medium() {
        let records = vec![record(1, 2, 5), record(2, 15, 5), record(3, 16, 5)];
        let insights = TrendAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        let freq = &insights[0];
        assert_eq!(freq.priority, Priority::Medium);
        assert_eq!(freq.tag("pct").and_then(TagValue::as_f64), Some(50.0));
    }

    #[test]
    fn test_equal_counts_no_frequency() {
        let records = vec![record(1, 2, 5), record(2, 15, 5)];
        let insights = TrendAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        assert!(insights
            .iter()
            .all(|i| i.category != InsightCategory::TrendFrequency));
    }

    #[test]
    fn test_severity_threshold() {
        // 6.0 vs 5.5: exactly at threshold
        let records = vec![record(1, 2, 6), record(2, 15, 5), record(3, 16, 6), record(4, 3, 6)];
        let insights = TrendAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        let severity = insights
            .iter()
            .find(|i| i.category == InsightCategory::TrendSeverity)
            .unwrap();
        assert_eq!(severity.priority, Priority::Medium);

        let flat = vec![record(1, 2, 5), record(2, 15, 5)];
        let insights = TrendAnalyzer::new().analyze(&flat, fixed_now()).unwrap();
        assert!(insights.is_empty());
    }

    #[test]
    fn test_duration_uses_finished_records_only() {
        let records = vec![
            record(1, 2, 5).with_end(days_ago(2) + Duration::hours(6)),
            record(2, 3, 5),
            record(3, 15, 5).with_end(days_ago(15) + Duration::hours(4)),
        ];
        let insights = TrendAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        let duration = insights
            .iter()
            .find(|i| i.category == InsightCategory::TrendDuration)
            .unwrap();
        assert_eq!(duration.priority, Priority::Medium);
        assert_eq!(duration.tag("deltaHours").and_then(TagValue::as_f64), Some(2.0));
    }

    #[test]
    fn test_empty_input() {
        assert!(TrendAnalyzer::new().analyze(&[], fixed_now()).unwrap().is_empty());
    }
}
