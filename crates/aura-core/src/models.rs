//! Domain models for Aura
//!
//! Records are owned by the record store; the analysis engine only reads them,
//! except for the `explanation` field which the explanation generator writes back.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a record in the record store
pub type RecordId = i64;

/// Canonical trigger tags offered by the logging UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Stress,
    LackOfSleep,
    Dehydration,
    SkippedMeal,
    Caffeine,
    Alcohol,
    BrightLight,
    LoudNoise,
    StrongSmell,
    WeatherChange,
    Hormonal,
    ScreenTime,
    PhysicalExertion,
    Travel,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stress => "stress",
            Self::LackOfSleep => "lack_of_sleep",
            Self::Dehydration => "dehydration",
            Self::SkippedMeal => "skipped_meal",
            Self::Caffeine => "caffeine",
            Self::Alcohol => "alcohol",
            Self::BrightLight => "bright_light",
            Self::LoudNoise => "loud_noise",
            Self::StrongSmell => "strong_smell",
            Self::WeatherChange => "weather_change",
            Self::Hormonal => "hormonal",
            Self::ScreenTime => "screen_time",
            Self::PhysicalExertion => "physical_exertion",
            Self::Travel => "travel",
        }
    }

    /// Name shown to the user (and used to group with custom triggers)
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Stress => "Stress",
            Self::LackOfSleep => "Lack of sleep",
            Self::Dehydration => "Dehydration",
            Self::SkippedMeal => "Skipped meal",
            Self::Caffeine => "Caffeine",
            Self::Alcohol => "Alcohol",
            Self::BrightLight => "Bright light",
            Self::LoudNoise => "Loud noise",
            Self::StrongSmell => "Strong smell",
            Self::WeatherChange => "Weather change",
            Self::Hormonal => "Hormonal",
            Self::ScreenTime => "Screen time",
            Self::PhysicalExertion => "Physical exertion",
            Self::Travel => "Travel",
        }
    }
}

impl std::str::FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '-'], "_").as_str() {
            "stress" => Ok(Self::Stress),
            "lack_of_sleep" => Ok(Self::LackOfSleep),
            "dehydration" => Ok(Self::Dehydration),
            "skipped_meal" => Ok(Self::SkippedMeal),
            "caffeine" => Ok(Self::Caffeine),
            "alcohol" => Ok(Self::Alcohol),
            "bright_light" => Ok(Self::BrightLight),
            "loud_noise" => Ok(Self::LoudNoise),
            "strong_smell" => Ok(Self::StrongSmell),
            "weather_change" => Ok(Self::WeatherChange),
            "hormonal" => Ok(Self::Hormonal),
            "screen_time" => Ok(Self::ScreenTime),
            "physical_exertion" => Ok(Self::PhysicalExertion),
            "travel" => Ok(Self::Travel),
            _ => Err(format!("Unknown trigger: {}", s)),
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Menstrual cycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenstrualPhase {
    Menstrual,
    Follicular,
    Ovulatory,
    Luteal,
}

impl MenstrualPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menstrual => "menstrual",
            Self::Follicular => "follicular",
            Self::Ovulatory => "ovulatory",
            Self::Luteal => "luteal",
        }
    }
}

impl std::fmt::Display for MenstrualPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Biometric readings captured alongside a record. Every field is independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    #[serde(default)]
    pub water_liters: Option<f64>,
    #[serde(default)]
    pub sleep_hours: Option<f64>,
    #[serde(default)]
    pub energy_kcal: Option<f64>,
    #[serde(default)]
    pub caffeine_mg: Option<f64>,
    #[serde(default)]
    pub glucose_mg_per_dl: Option<f64>,
    /// Fraction in 0.0..=1.0
    #[serde(default)]
    pub blood_oxygen_fraction: Option<f64>,
    #[serde(default)]
    pub menstrual_phase: Option<MenstrualPhase>,
}

impl HealthSnapshot {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Weather conditions at the start of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub pressure_hpa: f64,
    pub temperature_celsius: f64,
    /// Percent in 0..=100
    pub humidity_percent: f64,
    pub condition: String,
}

/// A single logged episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub start_date: DateTime<Utc>,
    /// `None` while the episode is ongoing
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub pain_level: u8,
    pub stress_level: u8,
    #[serde(default)]
    pub triggers: BTreeSet<Trigger>,
    #[serde(default)]
    pub custom_triggers: Vec<String>,
    #[serde(default)]
    pub foods_eaten: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub health: Option<HealthSnapshot>,
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    /// AI explanation written back by the explanation generator
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Record {
    pub fn new(id: RecordId, start_date: DateTime<Utc>, pain_level: u8, stress_level: u8) -> Self {
        Self {
            id,
            start_date,
            end_date: None,
            pain_level,
            stress_level,
            triggers: BTreeSet::new(),
            custom_triggers: Vec::new(),
            foods_eaten: Vec::new(),
            note: None,
            health: None,
            weather: None,
            explanation: None,
        }
    }

    pub fn with_end(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.insert(trigger);
        self
    }

    pub fn with_custom_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.custom_triggers.push(trigger.into());
        self
    }

    pub fn with_food(mut self, food: impl Into<String>) -> Self {
        self.foods_eaten.push(food.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_health(mut self, health: HealthSnapshot) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_weather(mut self, weather: WeatherSnapshot) -> Self {
        self.weather = Some(weather);
        self
    }

    /// Episode length; `None` while ongoing or when the end precedes the start
    pub fn duration(&self) -> Option<Duration> {
        let end = self.end_date?;
        let duration = end - self.start_date;
        (duration >= Duration::zero()).then_some(duration)
    }

    pub fn duration_hours(&self) -> Option<f64> {
        self.duration().map(|d| d.num_seconds() as f64 / 3600.0)
    }

    /// Canonical and custom triggers merged, case-insensitively deduplicated,
    /// in first-seen order (canonical first).
    pub fn trigger_names(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut names = Vec::new();
        let canonical = self.triggers.iter().map(|t| t.display_name().to_string());
        let custom = self
            .custom_triggers
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        for name in canonical.chain(custom) {
            if seen.insert(name.to_lowercase()) {
                names.push(name);
            }
        }
        names
    }

    /// Check the value ranges the analyzers rely on
    pub fn validate(&self) -> Result<()> {
        if self.pain_level > 10 {
            return Err(Error::InvalidData(format!(
                "record {}: pain level {} outside 0-10",
                self.id, self.pain_level
            )));
        }
        if self.stress_level > 10 {
            return Err(Error::InvalidData(format!(
                "record {}: stress level {} outside 0-10",
                self.id, self.stress_level
            )));
        }
        if let Some(spo2) = self.health.as_ref().and_then(|h| h.blood_oxygen_fraction) {
            if !(0.0..=1.0).contains(&spo2) {
                return Err(Error::InvalidData(format!(
                    "record {}: blood oxygen {} is not a fraction",
                    self.id, spo2
                )));
            }
        }
        if let Some(weather) = &self.weather {
            if !(0.0..=100.0).contains(&weather.humidity_percent) {
                return Err(Error::InvalidData(format!(
                    "record {}: humidity {} outside 0-100",
                    self.id, weather.humidity_percent
                )));
            }
        }
        Ok(())
    }
}

/// User profile supplied by the profile provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub average_sleep_hours: Option<f64>,
    #[serde(default)]
    pub average_caffeine_mg: Option<f64>,
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_duration_ongoing_and_finished() {
        let ongoing = Record::new(1, start(), 5, 3);
        assert!(ongoing.duration_hours().is_none());

        let finished = Record::new(2, start(), 5, 3).with_end(start() + Duration::minutes(150));
        assert_eq!(finished.duration_hours(), Some(2.5));

        let inverted = Record::new(3, start(), 5, 3).with_end(start() - Duration::hours(1));
        assert!(inverted.duration().is_none());
    }

    #[test]
    fn test_trigger_names_dedup_case_insensitive() {
        let record = Record::new(1, start(), 5, 3)
            .with_trigger(Trigger::Stress)
            .with_custom_trigger("  stress ")
            .with_custom_trigger("Red wine")
            .with_custom_trigger("red WINE")
            .with_custom_trigger("   ");

        assert_eq!(record.trigger_names(), vec!["Stress", "Red wine"]);
    }

    #[test]
    fn test_validate_ranges() {
        assert!(Record::new(1, start(), 10, 0).validate().is_ok());
        assert!(Record::new(1, start(), 11, 0).validate().is_err());

        let bad_spo2 = Record::new(1, start(), 4, 4).with_health(HealthSnapshot {
            blood_oxygen_fraction: Some(97.0),
            ..Default::default()
        });
        assert!(bad_spo2.validate().is_err());
    }

    #[test]
    fn test_record_json_defaults() {
        let json = r#"{
            "id": 7,
            "start_date": "2026-03-01T08:00:00Z",
            "pain_level": 6,
            "stress_level": 2,
            "triggers": ["lack_of_sleep", "stress"]
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 7);
        assert!(record.end_date.is_none());
        assert!(record.foods_eaten.is_empty());
        // BTreeSet keeps declaration order
        let triggers: Vec<_> = record.triggers.iter().copied().collect();
        assert_eq!(triggers, vec![Trigger::Stress, Trigger::LackOfSleep]);
    }

    #[test]
    fn test_trigger_from_str() {
        assert_eq!("Lack of sleep".parse::<Trigger>().unwrap(), Trigger::LackOfSleep);
        assert_eq!("bright-light".parse::<Trigger>().unwrap(), Trigger::BrightLight);
        assert!("gremlins".parse::<Trigger>().is_err());
    }
}
