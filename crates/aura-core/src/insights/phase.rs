//! Menstrual Phase Association Analyzer

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{MenstrualPhase, Record};

use super::engine::{Analyzer, AnalyzerKind};
use super::stats::{mean, round_to};
use super::types::{Insight, InsightCategory, Priority};

pub struct PhaseAnalyzer {
    min_samples: usize,
    min_pain_gap: f64,
}

impl PhaseAnalyzer {
    pub fn new() -> Self {
        Self {
            min_samples: 5,
            min_pain_gap: 1.0,
        }
    }
}

impl Default for PhaseAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for PhaseAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Phases
    }

    fn name(&self) -> &'static str {
        "Menstrual Phase Association"
    }

    fn analyze(&self, records: &[Record], _now: DateTime<Utc>) -> Result<Vec<Insight>> {
        let mut by_phase: BTreeMap<MenstrualPhase, Vec<f64>> = BTreeMap::new();
        let mut samples = 0usize;
        for record in records {
            if let Some(phase) = record.health.as_ref().and_then(|h| h.menstrual_phase) {
                by_phase
                    .entry(phase)
                    .or_default()
                    .push(record.pain_level as f64);
                samples += 1;
            }
        }

        if samples < self.min_samples || by_phase.len() < 2 {
            return Ok(vec![]);
        }

        let averages: Vec<(MenstrualPhase, f64)> = by_phase
            .into_iter()
            .filter_map(|(phase, pains)| mean(pains).map(|avg| (phase, avg)))
            .collect();

        // First phase in cycle order wins ties on either end
        let mut max = averages[0];
        let mut min = averages[0];
        for &(phase, avg) in &averages[1..] {
            if avg > max.1 {
                max = (phase, avg);
            }
            if avg < min.1 {
                min = (phase, avg);
            }
        }

        if max.1 - min.1 < self.min_pain_gap {
            return Ok(vec![]);
        }

        let insight = Insight::new(
            InsightCategory::Biometrics,
            Priority::Medium,
            "Cycle phase linked to migraine pain",
            format!(
                "Average pain was highest in the {} phase ({:.1}/10) and lowest in the {} phase ({:.1}/10).",
                max.0, max.1, min.0, min.1
            ),
        )
        .with_tag("highPhase", max.0.as_str())
        .with_tag("highPhaseAvgPain", round_to(max.1, 2))
        .with_tag("lowPhase", min.0.as_str())
        .with_tag("lowPhaseAvgPain", round_to(min.1, 2))
        .with_tag("samples", samples);

        Ok(vec![insight])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::TagValue;
    use crate::models::HealthSnapshot;
    use crate::test_utils::{days_ago, fixed_now};

    fn record(id: i64, phase: MenstrualPhase, pain: u8) -> Record {
        Record::new(id, days_ago(id), pain, 3).with_health(HealthSnapshot {
            menstrual_phase: Some(phase),
            ..Default::default()
        })
    }

    #[test]
    fn test_phase_gap_detected() {
        let records = vec![
            record(1, MenstrualPhase::Menstrual, 8),
            record(2, MenstrualPhase::Menstrual, 7),
            record(3, MenstrualPhase::Follicular, 3),
            record(4, MenstrualPhase::Luteal, 5),
            record(5, MenstrualPhase::Follicular, 4),
        ];
        let insights = PhaseAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        assert_eq!(insights.len(), 1);
        let insight = &insights[0];
        assert_eq!(insight.priority, Priority::Medium);
        assert_eq!(insight.tag("highPhase").and_then(TagValue::as_str), Some("menstrual"));
        assert_eq!(insight.tag("lowPhase").and_then(TagValue::as_str), Some("follicular"));
        assert!(insight.message.contains("menstrual"));
        assert!(insight.message.contains("follicular"));
    }

    #[test]
    fn test_single_phase_is_insufficient() {
        let records: Vec<_> = (1..=6).map(|i| record(i, MenstrualPhase::Luteal, 9)).collect();
        assert!(PhaseAnalyzer::new().analyze(&records, fixed_now()).unwrap().is_empty());
    }

    #[test]
    fn test_small_gap_ignored() {
        let records = vec![
            record(1, MenstrualPhase::Menstrual, 5),
            record(2, MenstrualPhase::Menstrual, 5),
            record(3, MenstrualPhase::Follicular, 5),
            record(4, MenstrualPhase::Luteal, 4),
            record(5, MenstrualPhase::Follicular, 5),
        ];
        assert!(PhaseAnalyzer::new().analyze(&records, fixed_now()).unwrap().is_empty());
    }
}
