//! Single-record explanation prompts and the generative insight built from
//! their answers.

use std::collections::HashMap;

use crate::insights::{Insight, InsightCategory, Priority};
use crate::models::{HealthSnapshot, Record, RecordId, WeatherSnapshot};
use crate::prompts::Prompt;

/// Sentence every record explanation must end with
pub const DISCLAIMER: &str =
    "This is not medical advice; please consult a healthcare professional about your symptoms.";

/// Dedupe key of the generative insight for a record
pub fn generative_key(id: RecordId) -> String {
    format!("generative:record-{}", id)
}

/// "5.5 hours", or "ongoing" without a usable end date
pub fn describe_duration(record: &Record) -> String {
    match record.duration_hours() {
        Some(hours) => format!("{:.1} hours", hours),
        None => "ongoing".to_string(),
    }
}

/// Present health fields only; `None` when nothing was captured
pub fn health_summary(health: &HealthSnapshot) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(water) = health.water_liters {
        parts.push(format!("water {:.1} L", water));
    }
    if let Some(sleep) = health.sleep_hours {
        parts.push(format!("sleep {:.1} h", sleep));
    }
    if let Some(kcal) = health.energy_kcal {
        parts.push(format!("energy {:.0} kcal", kcal));
    }
    if let Some(caffeine) = health.caffeine_mg {
        parts.push(format!("caffeine {:.0} mg", caffeine));
    }
    if let Some(glucose) = health.glucose_mg_per_dl {
        parts.push(format!("glucose {:.0} mg/dL", glucose));
    }
    if let Some(spo2) = health.blood_oxygen_fraction {
        parts.push(format!("blood oxygen {:.0}%", spo2 * 100.0));
    }
    if let Some(phase) = health.menstrual_phase {
        parts.push(format!("cycle phase {}", phase));
    }

    (!parts.is_empty()).then(|| parts.join(", "))
}

pub fn weather_summary(weather: &WeatherSnapshot) -> String {
    let mut summary = format!(
        "{:.0} hPa, {:.1} °C, humidity {:.0}%",
        weather.pressure_hpa, weather.temperature_celsius, weather.humidity_percent
    );
    if !weather.condition.trim().is_empty() {
        summary.push_str(", ");
        summary.push_str(weather.condition.trim());
    }
    summary
}

/// `(instructions, prompt)` for explaining one record
pub fn build_prompt(template: &Prompt, record: &Record) -> (String, String) {
    let pain = record.pain_level.to_string();
    let stress = record.stress_level.to_string();
    let duration = describe_duration(record);
    let triggers = record.trigger_names().join(", ");
    let foods = record
        .foods_eaten
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let health = record
        .health
        .as_ref()
        .and_then(health_summary)
        .unwrap_or_default();
    let weather = record
        .weather
        .as_ref()
        .map(weather_summary)
        .unwrap_or_default();
    let note = record.note.as_deref().map(str::trim).unwrap_or_default();

    let vars = HashMap::from([
        ("pain", pain.as_str()),
        ("stress", stress.as_str()),
        ("duration", duration.as_str()),
        ("triggers", triggers.as_str()),
        ("foods", foods.as_str()),
        ("health", health.as_str()),
        ("weather", weather.as_str()),
        ("note", note),
        ("disclaimer", DISCLAIMER),
    ]);

    (template.render_system(&vars), template.render_user(&vars))
}

/// The insight surfaced for a record's explanation
pub fn generative_insight(record: &Record, explanation: &str) -> Insight {
    Insight::new(
        InsightCategory::Generative,
        Priority::High,
        format!(
            "About your migraine on {}",
            record.start_date.format("%b %-d")
        ),
        explanation,
    )
    .with_tag("recordId", record.id)
    .with_tag("painLevel", record.pain_level as f64)
    .with_dedupe_key(generative_key(record.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MenstrualPhase, Trigger};
    use crate::prompts::{PromptId, PromptLibrary};
    use crate::test_utils::{days_ago, sample_records};
    use chrono::Duration;

    fn render(record: &Record) -> (String, String) {
        let mut library = PromptLibrary::embedded_only();
        let template = library.get(PromptId::ExplainRecord).unwrap();
        build_prompt(template, record)
    }

    #[test]
    fn test_full_record_prompt() {
        let record = sample_records().remove(0);
        let (system, prompt) = render(&record);

        assert!(system.contains("data analyst"));
        assert!(system.contains("Do not give diagnoses"));
        assert!(prompt.contains("Pain level: 8/10"));
        assert!(prompt.contains("Stress level: 7/10"));
        assert!(prompt.contains("Duration: 6.0 hours"));
        assert!(prompt.contains("Triggers: Stress, Lack of sleep"));
        assert!(prompt.contains("Foods eaten: chocolate"));
        assert!(prompt.contains("water 0.9 L"));
        assert!(prompt.contains("cycle phase menstrual"));
        assert!(prompt.contains("1004 hPa"));
        assert!(prompt.contains("Note from the person: Woke up with it"));
        assert!(prompt.trim_end().ends_with(&format!("\"{}\"", DISCLAIMER)));
    }

    #[test]
    fn test_sparse_record_prompt() {
        let record = Record::new(9, days_ago(0), 4, 2);
        let (_, prompt) = render(&record);

        assert!(prompt.contains("Duration: ongoing"));
        assert!(!prompt.contains("Triggers:"));
        assert!(!prompt.contains("Foods eaten:"));
        assert!(!prompt.contains("Health:"));
        assert!(!prompt.contains("Weather:"));
        assert!(!prompt.contains("Note from"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_trigger_union_is_case_insensitive() {
        let record = Record::new(1, days_ago(0), 5, 5)
            .with_trigger(Trigger::Stress)
            .with_custom_trigger("stress")
            .with_custom_trigger("Perfume")
            .with_custom_trigger("perfume");
        let (_, prompt) = render(&record);
        assert!(prompt.contains("Triggers: Stress, Perfume\n"));
    }

    #[test]
    fn test_negative_duration_is_ongoing() {
        let record = Record::new(1, days_ago(0), 5, 5).with_end(days_ago(0) - Duration::hours(1));
        assert_eq!(describe_duration(&record), "ongoing");
    }

    #[test]
    fn test_health_summary_only_present_fields() {
        assert_eq!(health_summary(&HealthSnapshot::default()), None);
        let health = HealthSnapshot {
            blood_oxygen_fraction: Some(0.97),
            menstrual_phase: Some(MenstrualPhase::Luteal),
            ..Default::default()
        };
        assert_eq!(
            health_summary(&health).as_deref(),
            Some("blood oxygen 97%, cycle phase luteal")
        );
    }

    #[test]
    fn test_generative_insight() {
        let record = Record::new(12, days_ago(0), 7, 5);
        let insight = generative_insight(&record, "Possibly related to sleep.");
        assert_eq!(insight.category, InsightCategory::Generative);
        assert_eq!(insight.dedupe_key, "generative:record-12");
        assert_eq!(insight.message, "Possibly related to sleep.");
        assert_eq!(insight.title, "About your migraine on Mar 15");
    }
}
