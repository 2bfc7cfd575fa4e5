//! Sleep Association Analyzer
//!
//! Compares average pain after short nights (< 7 h) with average pain after
//! longer nights, across the whole log.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Record;

use super::engine::{Analyzer, AnalyzerKind};
use super::stats::{mean, round_to};
use super::types::{Insight, InsightCategory, Priority};

pub struct SleepAnalyzer {
    min_samples: usize,
    short_sleep_hours: f64,
    min_pain_gap: f64,
}

impl SleepAnalyzer {
    pub fn new() -> Self {
        Self {
            min_samples: 5,
            short_sleep_hours: 7.0,
            min_pain_gap: 1.0,
        }
    }
}

impl Default for SleepAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for SleepAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Sleep
    }

    fn name(&self) -> &'static str {
        "Sleep Association"
    }

    fn analyze(&self, records: &[Record], _now: DateTime<Utc>) -> Result<Vec<Insight>> {
        let samples: Vec<(f64, f64)> = records
            .iter()
            .filter_map(|r| {
                let sleep = r.health.as_ref()?.sleep_hours?;
                Some((sleep, r.pain_level as f64))
            })
            .collect();

        if samples.len() < self.min_samples {
            return Ok(vec![]);
        }

        let (short, long): (Vec<_>, Vec<_>) = samples
            .iter()
            .partition(|(sleep, _)| *sleep < self.short_sleep_hours);

        let (Some(short_avg), Some(long_avg)) = (
            mean(short.iter().map(|(_, pain)| *pain)),
            mean(long.iter().map(|(_, pain)| *pain)),
        ) else {
            return Ok(vec![]);
        };

        let gap = short_avg - long_avg;
        if gap < self.min_pain_gap {
            return Ok(vec![]);
        }

        let insight = Insight::new(
            InsightCategory::SleepAssociation,
            Priority::Medium,
            "Short sleep linked to stronger migraines",
            format!(
                "After nights under {:.0} hours, average pain was {:.1}/10 versus {:.1}/10 after longer nights.",
                self.short_sleep_hours, short_avg, long_avg
            ),
        )
        .with_tag("shortSleepAvgPain", round_to(short_avg, 2))
        .with_tag("longSleepAvgPain", round_to(long_avg, 2))
        .with_tag("thresholdHours", self.short_sleep_hours)
        .with_tag("shortSleepCount", short.len())
        .with_tag("longSleepCount", long.len());

        Ok(vec![insight])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HealthSnapshot;
    use crate::test_utils::{days_ago, fixed_now};

    fn record(id: i64, sleep: f64, pain: u8) -> Record {
        Record::new(id, days_ago(id), pain, 3).with_health(HealthSnapshot {
            sleep_hours: Some(sleep),
            ..Default::default()
        })
    }

    #[test]
    fn test_short_sleep_association() {
        let records = vec![
            record(1, 5.0, 8),
            record(2, 6.0, 7),
            record(3, 8.0, 4),
            record(4, 7.5, 5),
            record(5, 7.0, 5),
        ];
        let insights = SleepAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].priority, Priority::Medium);
        assert_eq!(insights[0].category, InsightCategory::SleepAssociation);
    }

    #[test]
    fn test_requires_five_samples() {
        let records = vec![record(1, 5.0, 9), record(2, 5.0, 9), record(3, 8.0, 1), record(4, 8.0, 1)];
        assert!(SleepAnalyzer::new().analyze(&records, fixed_now()).unwrap().is_empty());
    }

    #[test]
    fn test_requires_both_groups() {
        let records: Vec<_> = (1..=5).map(|i| record(i, 5.0, 8)).collect();
        assert!(SleepAnalyzer::new().analyze(&records, fixed_now()).unwrap().is_empty());
    }

    #[test]
    fn test_gap_below_threshold() {
        let records = vec![
            record(1, 5.0, 5),
            record(2, 6.0, 5),
            record(3, 8.0, 5),
            record(4, 7.5, 4),
            record(5, 7.0, 5),
        ];
        assert!(SleepAnalyzer::new().analyze(&records, fixed_now()).unwrap().is_empty());
    }
}
