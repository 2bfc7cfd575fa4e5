//! Intake & Biometrics Analyzer
//!
//! Averages health readings over the last 14 days. Each check only looks at
//! records that carry the relevant field.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{HealthSnapshot, Record};

use super::engine::{Analyzer, AnalyzerKind};
use super::stats::{mean, recent, round_to};
use super::types::{Insight, InsightCategory, Priority};

pub struct IntakeAnalyzer {
    min_water_liters: f64,
    min_sleep_hours: f64,
    min_energy_kcal: f64,
    high_glucose_mg_per_dl: f64,
    low_glucose_mg_per_dl: f64,
    /// SpO2 percent below which the reading is concerning
    critical_spo2_pct: f64,
    /// SpO2 percent below which the reading is worth attention
    low_spo2_pct: f64,
}

impl IntakeAnalyzer {
    pub fn new() -> Self {
        Self {
            min_water_liters: 1.2,
            min_sleep_hours: 6.5,
            min_energy_kcal: 1200.0,
            high_glucose_mg_per_dl: 140.0,
            low_glucose_mg_per_dl: 70.0,
            critical_spo2_pct: 92.0,
            low_spo2_pct: 95.0,
        }
    }
}

impl Default for IntakeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Average of one health field over the records that have it, with sample count
fn average_of<F>(records: &[&Record], field: F) -> Option<(f64, usize)>
where
    F: Fn(&HealthSnapshot) -> Option<f64>,
{
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.health.as_ref().and_then(&field))
        .collect();
    mean(values.iter().copied()).map(|avg| (avg, values.len()))
}

impl Analyzer for IntakeAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Intake
    }

    fn name(&self) -> &'static str {
        "Intake & Biometrics"
    }

    fn analyze(&self, records: &[Record], now: DateTime<Utc>) -> Result<Vec<Insight>> {
        let window = recent(records, now);
        let mut insights = Vec::new();

        if let Some((avg, samples)) = average_of(&window, |h| h.water_liters) {
            if avg < self.min_water_liters {
                insights.push(
                    Insight::new(
                        InsightCategory::IntakeHydration,
                        Priority::High,
                        "Low hydration",
                        format!(
                            "You averaged {:.2} L of water on migraine days over the last 14 days, below {:.1} L.",
                            avg, self.min_water_liters
                        ),
                    )
                    .with_tag("avgLiters", round_to(avg, 2))
                    .with_tag("thresholdLiters", self.min_water_liters)
                    .with_tag("samples", samples),
                );
            }
        }

        if let Some((avg, samples)) = average_of(&window, |h| h.sleep_hours) {
            if avg < self.min_sleep_hours {
                insights.push(
                    Insight::new(
                        InsightCategory::IntakeSleep,
                        Priority::Medium,
                        "Short sleep",
                        format!(
                            "You averaged {:.1} hours of sleep before recent migraines, below {:.1} hours.",
                            avg, self.min_sleep_hours
                        ),
                    )
                    .with_tag("avgSleepHours", round_to(avg, 2))
                    .with_tag("thresholdHours", self.min_sleep_hours)
                    .with_tag("samples", samples),
                );
            }
        }

        if let Some((avg, samples)) = average_of(&window, |h| h.energy_kcal) {
            if avg < self.min_energy_kcal {
                insights.push(
                    Insight::new(
                        InsightCategory::IntakeNutrition,
                        Priority::Medium,
                        "Low energy intake",
                        format!(
                            "Recorded energy intake averaged {:.0} kcal on recent migraine days, below {:.0} kcal.",
                            avg, self.min_energy_kcal
                        ),
                    )
                    .with_tag("avgKcal", avg.round())
                    .with_tag("thresholdKcal", self.min_energy_kcal)
                    .with_tag("samples", samples),
                );
            }
        }

        if let Some((avg, samples)) = average_of(&window, |h| h.glucose_mg_per_dl) {
            let glucose = if avg >= self.high_glucose_mg_per_dl {
                Some((
                    "Elevated blood glucose",
                    format!(
                        "Blood glucose averaged {:.0} mg/dL around recent migraines, at or above {:.0} mg/dL.",
                        avg, self.high_glucose_mg_per_dl
                    ),
                    "high",
                ))
            } else if avg <= self.low_glucose_mg_per_dl {
                Some((
                    "Low blood glucose",
                    format!(
                        "Blood glucose averaged {:.0} mg/dL around recent migraines, at or below {:.0} mg/dL.",
                        avg, self.low_glucose_mg_per_dl
                    ),
                    "low",
                ))
            } else {
                None
            };

            if let Some((title, message, level)) = glucose {
                insights.push(
                    Insight::new(InsightCategory::Biometrics, Priority::Low, title, message)
                        .with_tag("avgGlucoseMgPerDl", avg.round())
                        .with_tag("level", level)
                        .with_tag("samples", samples),
                );
            }
        }

        if let Some((avg, samples)) = average_of(&window, |h| h.blood_oxygen_fraction) {
            let pct = avg * 100.0;
            let priority = if pct < self.critical_spo2_pct {
                Some(Priority::High)
            } else if pct < self.low_spo2_pct {
                Some(Priority::Medium)
            } else {
                None
            };

            if let Some(priority) = priority {
                insights.push(
                    Insight::new(
                        InsightCategory::Biometrics,
                        priority,
                        "Low blood oxygen",
                        format!(
                            "Blood oxygen averaged {:.1}% around recent migraines, below {:.0}%.",
                            pct, self.low_spo2_pct
                        ),
                    )
                    .with_tag("avgSpO2Pct", round_to(pct, 1))
                    .with_tag("samples", samples),
                );
            }
        }

        Ok(insights)
    }
}
