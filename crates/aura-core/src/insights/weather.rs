//! Weather Association Analyzer
//!
//! - Pressure: pain under low pressure (< 1010 hPa) vs the rest
//! - Humidity: pain under high humidity (>= 70%) vs the rest
//! - Temperature: summary notes for cold (<= 5 °C) and hot (>= 28 °C) records

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Record, WeatherSnapshot};

use super::engine::{Analyzer, AnalyzerKind};
use super::stats::{mean, mean_pain, round_to};
use super::types::{Insight, InsightCategory, Priority};

pub struct WeatherAnalyzer {
    min_samples: usize,
    low_pressure_hpa: f64,
    high_humidity_pct: f64,
    cold_celsius: f64,
    hot_celsius: f64,
    min_pain_gap: f64,
}

impl WeatherAnalyzer {
    pub fn new() -> Self {
        Self {
            min_samples: 5,
            low_pressure_hpa: 1010.0,
            high_humidity_pct: 70.0,
            cold_celsius: 5.0,
            hot_celsius: 28.0,
            min_pain_gap: 1.0,
        }
    }

    /// Average pain of records matching `pred` vs the rest, when both sides exist
    fn split_pain<F>(samples: &[(&Record, &WeatherSnapshot)], pred: F) -> Option<(f64, f64, usize, usize)>
    where
        F: Fn(&WeatherSnapshot) -> bool,
    {
        let (matching, rest): (Vec<_>, Vec<_>) = samples.iter().partition(|(_, w)| pred(w));
        let matching_avg = mean_pain(matching.iter().map(|(r, _)| *r))?;
        let rest_avg = mean_pain(rest.iter().map(|(r, _)| *r))?;
        Some((matching_avg, rest_avg, matching.len(), rest.len()))
    }

    fn pressure(&self, samples: &[(&Record, &WeatherSnapshot)]) -> Option<Insight> {
        let (low_avg, high_avg, low_n, high_n) =
            Self::split_pain(samples, |w| w.pressure_hpa < self.low_pressure_hpa)?;
        if low_avg - high_avg < self.min_pain_gap {
            return None;
        }

        Some(
            Insight::new(
                InsightCategory::WeatherAssociation,
                Priority::Medium,
                "Low pressure linked to stronger migraines",
                format!(
                    "When pressure was below {:.0} hPa, average pain was {:.1}/10 versus {:.1}/10 otherwise.",
                    self.low_pressure_hpa, low_avg, high_avg
                ),
            )
            .with_tag("lowPressureAvgPain", round_to(low_avg, 2))
            .with_tag("highPressureAvgPain", round_to(high_avg, 2))
            .with_tag("thresholdHpa", self.low_pressure_hpa)
            .with_tag("lowPressureCount", low_n)
            .with_tag("highPressureCount", high_n),
        )
    }

    fn humidity(&self, samples: &[(&Record, &WeatherSnapshot)]) -> Option<Insight> {
        let (humid_avg, dry_avg, humid_n, dry_n) =
            Self::split_pain(samples, |w| w.humidity_percent >= self.high_humidity_pct)?;
        if humid_avg - dry_avg < self.min_pain_gap {
            return None;
        }

        Some(
            Insight::new(
                InsightCategory::WeatherAssociation,
                Priority::Low,
                "High humidity linked to stronger migraines",
                format!(
                    "With humidity at or above {:.0}%, average pain was {:.1}/10 versus {:.1}/10 otherwise.",
                    self.high_humidity_pct, humid_avg, dry_avg
                ),
            )
            .with_tag("highHumidityAvgPain", round_to(humid_avg, 2))
            .with_tag("lowHumidityAvgPain", round_to(dry_avg, 2))
            .with_tag("thresholdPct", self.high_humidity_pct)
            .with_tag("highHumidityCount", humid_n)
            .with_tag("lowHumidityCount", dry_n),
        )
    }

    fn temperature_note(
        samples: &[(&Record, &WeatherSnapshot)],
        title: &str,
        description: &str,
        threshold: f64,
        pred: impl Fn(f64) -> bool,
    ) -> Option<Insight> {
        let matching: Vec<_> = samples
            .iter()
            .filter(|(_, w)| pred(w.temperature_celsius))
            .collect();
        let avg_pain = mean_pain(matching.iter().map(|(r, _)| *r))?;
        let avg_temp = mean(matching.iter().map(|(_, w)| w.temperature_celsius))?;

        Some(
            Insight::new(
                InsightCategory::WeatherAssociation,
                Priority::Low,
                title,
                format!(
                    "{} of your migraines started in {} weather, with average pain {:.1}/10.",
                    matching.len(),
                    description,
                    avg_pain
                ),
            )
            .with_tag("count", matching.len())
            .with_tag("avgPain", round_to(avg_pain, 2))
            .with_tag("avgTemperatureCelsius", round_to(avg_temp, 1))
            .with_tag("thresholdCelsius", threshold),
        )
    }
}

impl Default for WeatherAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for WeatherAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Weather
    }

    fn name(&self) -> &'static str {
        "Weather Association"
    }

    fn analyze(&self, records: &[Record], _now: DateTime<Utc>) -> Result<Vec<Insight>> {
        let samples: Vec<(&Record, &WeatherSnapshot)> = records
            .iter()
            .filter_map(|r| r.weather.as_ref().map(|w| (r, w)))
            .collect();

        if samples.len() < self.min_samples {
            return Ok(vec![]);
        }

        let cold = self.cold_celsius;
        let hot = self.hot_celsius;

        Ok([
            self.pressure(&samples),
            self.humidity(&samples),
            Self::temperature_note(&samples, "Migraines in cold weather", "cold", cold, |t| {
                t <= cold
            }),
            Self::temperature_note(&samples, "Migraines in hot weather", "hot", hot, |t| t >= hot),
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

    fn record(id: i64, pressure: f64, humidity: f64, temp: f64, pain: u8) -> Record {
        Record::new(id, days_ago(id), pain, 3).with_weather(WeatherSnapshot {
            pressure_hpa: pressure,
            temperature_celsius: temp,
            humidity_percent: humidity,
            condition: "cloudy".into(),
        })
    }

    #[test]
    fn test_pressure_scenario() {
        let pressures = [1005.0, 1006.0, 1012.0, 1015.0, 1008.0];
        let pains = [7, 8, 3, 2, 6];
        let records: Vec<_> = pressures
            .iter()
            .zip(pains)
            .enumerate()
            .map(|(i, (p, pain))| record(i as i64, *p, 50.0, 15.0, pain))
            .collect();

        let insights = WeatherAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        assert_eq!(insights.len(), 1);
        let pressure = &insights[0];
        assert_eq!(pressure.priority, Priority::Medium);
        assert_eq!(pressure.category, InsightCategory::WeatherAssociation);
        assert_eq!(pressure.tag("lowPressureAvgPain").and_then(TagValue::as_f64), Some(7.0));
        assert_eq!(pressure.tag("highPressureAvgPain").and_then(TagValue::as_f64), Some(2.5));
    }

    #[test]
    fn test_humidity_association_is_low_priority() {
        let records = vec![
            record(1, 1013.0, 80.0, 15.0, 8),
            record(2, 1013.0, 75.0, 15.0, 7),
            record(3, 1013.0, 40.0, 15.0, 4),
            record(4, 1013.0, 50.0, 15.0, 5),
            record(5, 1013.0, 60.0, 15.0, 5),
        ];
        let insights = WeatherAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].priority, Priority::Low);
        assert!(insights[0].title.contains("humidity"));
    }

    #[test]
    fn test_temperature_notes_are_unconditional() {
        let records = vec![
            record(1, 1013.0, 50.0, 2.0, 5),
            record(2, 1013.0, 50.0, 30.0, 5),
            record(3, 1013.0, 50.0, 15.0, 5),
            record(4, 1013.0, 50.0, 15.0, 5),
            record(5, 1013.0, 50.0, 5.0, 5),
        ];
        let insights = WeatherAnalyzer::new().analyze(&records, fixed_now()).unwrap();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].title, "Migraines in cold weather");
        assert_eq!(insights[0].tag("count").and_then(TagValue::as_f64), Some(2.0));
        assert_eq!(insights[1].title, "Migraines in hot weather");
        assert!(insights.iter().all(|i| i.priority == Priority::Low));
    }

    #[test]
    fn test_requires_five_weather_records() {
        let mut records: Vec<_> = (1..=4).map(|i| record(i, 1000.0, 90.0, 0.0, 9)).collect();
        records.push(Record::new(9, days_ago(9), 1, 1));
        assert!(WeatherAnalyzer::new().analyze(&records, fixed_now()).unwrap().is_empty());
    }
}
