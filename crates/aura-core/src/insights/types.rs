//! Core types for the insight engine

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::units::{self, UnitSystem};

/// Category of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    TrendFrequency,
    TrendSeverity,
    TrendDuration,
    Triggers,
    Foods,
    IntakeHydration,
    IntakeSleep,
    IntakeNutrition,
    SleepAssociation,
    WeatherAssociation,
    /// AI explanation of one specific record
    Generative,
    Biometrics,
}

impl InsightCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightCategory::TrendFrequency => "trend_frequency",
            InsightCategory::TrendSeverity => "trend_severity",
            InsightCategory::TrendDuration => "trend_duration",
            InsightCategory::Triggers => "triggers",
            InsightCategory::Foods => "foods",
            InsightCategory::IntakeHydration => "intake_hydration",
            InsightCategory::IntakeSleep => "intake_sleep",
            InsightCategory::IntakeNutrition => "intake_nutrition",
            InsightCategory::SleepAssociation => "sleep_association",
            InsightCategory::WeatherAssociation => "weather_association",
            InsightCategory::Generative => "generative",
            InsightCategory::Biometrics => "biometrics",
        }
    }
}

impl fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trend_frequency" => Ok(InsightCategory::TrendFrequency),
            "trend_severity" => Ok(InsightCategory::TrendSeverity),
            "trend_duration" => Ok(InsightCategory::TrendDuration),
            "triggers" => Ok(InsightCategory::Triggers),
            "foods" => Ok(InsightCategory::Foods),
            "intake_hydration" => Ok(InsightCategory::IntakeHydration),
            "intake_sleep" => Ok(InsightCategory::IntakeSleep),
            "intake_nutrition" => Ok(InsightCategory::IntakeNutrition),
            "sleep_association" => Ok(InsightCategory::SleepAssociation),
            "weather_association" => Ok(InsightCategory::WeatherAssociation),
            "generative" => Ok(InsightCategory::Generative),
            "biometrics" => Ok(InsightCategory::Biometrics),
            _ => Err(format!("Unknown insight category: {}", s)),
        }
    }
}

/// Priority of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Numeric rank for sorting (higher = more urgent)
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// Scalar attached to an insight for re-rendering by consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Number(f64),
    Text(String),
}

impl TagValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Number(n) => Some(*n),
            TagValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            TagValue::Number(_) => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            TagValue::Number(n) => write!(f, "{:.2}", n),
            TagValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Number(value)
    }
}

impl From<usize> for TagValue {
    fn from(value: usize) -> Self {
        TagValue::Number(value as f64)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Number(value as f64)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Text(value)
    }
}

/// A single observation produced by an analyzer or by the explanation generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub category: InsightCategory,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    /// Supporting values keyed by name (e.g. "avgLiters" -> 1.05)
    pub tags: BTreeMap<String, TagValue>,
    /// Identity used to collapse equivalent insights within a refresh
    pub dedupe_key: String,
}

impl Insight {
    /// Create an insight keyed by category and normalized title
    pub fn new(
        category: InsightCategory,
        priority: Priority,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let dedupe_key = dedupe_key(category, &title);
        Self {
            category,
            title,
            message: message.into(),
            priority,
            tags: BTreeMap::new(),
            dedupe_key,
        }
    }

    /// Attach a supporting value
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Replace the derived key when the title does not discriminate
    pub fn with_dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = key.into();
        self
    }

    pub fn tag(&self, key: &str) -> Option<&TagValue> {
        self.tags.get(key)
    }

    /// Tags formatted for display in the requested unit system
    pub fn display_tags(&self, system: UnitSystem) -> Vec<(String, String)> {
        self.tags
            .iter()
            .map(|(key, value)| (key.clone(), units::display_tag(key, value, system)))
            .collect()
    }
}

/// `<category>:<normalized title>`; stable for identical input
pub fn dedupe_key(category: InsightCategory, title: &str) -> String {
    format!("{}:{}", category.as_str(), normalize_title(title))
}

/// Lowercase, with every run of non-alphanumeric characters collapsed to `-`
pub fn normalize_title(title: &str) -> String {
    let mut normalized = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !normalized.is_empty() {
                normalized.push('-');
            }
            pending_dash = false;
            normalized.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serialization() {
        assert_eq!(InsightCategory::IntakeHydration.as_str(), "intake_hydration");
        assert_eq!(
            InsightCategory::from_str("weather_association").unwrap(),
            InsightCategory::WeatherAssociation
        );
        let json = serde_json::to_string(&InsightCategory::TrendFrequency).unwrap();
        assert_eq!(json, "\"trend_frequency\"");
    }

    #[test]
    fn test_priority_rank() {
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
        assert!(Priority::High > Priority::Low);
    }

    #[test]
    fn test_dedupe_key_normalization() {
        assert_eq!(
            dedupe_key(InsightCategory::Triggers, "Trigger: Lack of sleep!"),
            "triggers:trigger-lack-of-sleep"
        );
        assert_eq!(
            dedupe_key(InsightCategory::Triggers, "  trigger   LACK of-sleep "),
            "triggers:trigger-lack-of-sleep"
        );
    }

    #[test]
    fn test_insight_builder() {
        let insight = Insight::new(
            InsightCategory::IntakeHydration,
            Priority::High,
            "Low hydration",
            "Drink more",
        )
        .with_tag("avgLiters", 1.05)
        .with_tag("window", "14d");

        assert_eq!(insight.dedupe_key, "intake_hydration:low-hydration");
        assert_eq!(insight.tag("avgLiters").and_then(TagValue::as_f64), Some(1.05));
        assert_eq!(insight.tag("window").and_then(TagValue::as_str), Some("14d"));

        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["tags"]["avgLiters"], 1.05);
        assert_eq!(json["priority"], "high");
    }
}
