//! Triggers and Foods Analyzers
//!
//! Both rank labels by the share of records mentioning them. A label counts at
//! most once per record.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Record, Trigger};

use super::engine::{Analyzer, AnalyzerKind};
use super::stats::{capitalize_words, round_to};
use super::types::{Insight, InsightCategory, Priority};

const TOP_N: usize = 5;

/// Count each label once per record and return the top `limit`, ranked by
/// count descending then label ascending.
fn rank_labels<F>(records: &[Record], limit: usize, labels_of: F) -> Vec<(String, usize)>
where
    F: Fn(&Record) -> BTreeSet<String>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        for label in labels_of(record) {
            *counts.entry(label).or_default() += 1;
        }
    }

    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

fn share_priority(share: f64, high: f64, medium: f64) -> Priority {
    if share >= high {
        Priority::High
    } else if share >= medium {
        Priority::Medium
    } else {
        Priority::Low
    }
}

pub struct TriggersAnalyzer {
    high_share: f64,
    medium_share: f64,
}

impl TriggersAnalyzer {
    pub fn new() -> Self {
        Self {
            high_share: 0.4,
            medium_share: 0.25,
        }
    }

    /// Case-folded keys for canonical and custom triggers, grouped the same
    /// way `Record::trigger_names` dedupes them
    fn labels(record: &Record) -> BTreeSet<String> {
        let canonical = record.triggers.iter().map(|t| t.display_name().to_lowercase());
        let custom = record
            .custom_triggers
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        canonical.chain(custom).collect()
    }

    /// Canonical name when the key names a canonical trigger, else title case
    fn display(key: &str) -> String {
        key.parse::<Trigger>()
            .ok()
            .map(|t| t.display_name())
            .filter(|name| name.to_lowercase() == key)
            .map(str::to_string)
            .unwrap_or_else(|| capitalize_words(key))
    }
}

impl Default for TriggersAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for TriggersAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Triggers
    }

    fn name(&self) -> &'static str {
        "Triggers"
    }

    fn analyze(&self, records: &[Record], _now: DateTime<Utc>) -> Result<Vec<Insight>> {
        if records.is_empty() {
            return Ok(vec![]);
        }
        let total = records.len();

        let insights = rank_labels(records, TOP_N, Self::labels)
            .into_iter()
            .map(|(key, count)| {
                let share = count as f64 / total as f64;
                let trigger = Self::display(&key);
                Insight::new(
                    InsightCategory::Triggers,
                    share_priority(share, self.high_share, self.medium_share),
                    format!("Trigger: {}", trigger),
                    format!(
                        "{} was logged in {} of {} migraines ({:.0}%).",
                        trigger,
                        count,
                        total,
                        share * 100.0
                    ),
                )
                .with_tag("trigger", trigger.as_str())
                .with_tag("count", count)
                .with_tag("total", total)
                .with_tag("share", round_to(share, 4))
                .with_tag("pct", (share * 100.0).round())
            })
            .collect();

        Ok(insights)
    }
}

pub struct FoodsAnalyzer {
    high_share: f64,
    medium_share: f64,
}

impl FoodsAnalyzer {
    pub fn new() -> Self {
        Self {
            high_share: 0.35,
            medium_share: 0.2,
        }
    }

    fn labels(record: &Record) -> BTreeSet<String> {
        record
            .foods_eaten
            .iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect()
    }
}

impl Default for FoodsAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for FoodsAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Foods
    }

    fn name(&self) -> &'static str {
        "Foods"
    }

    fn analyze(&self, records: &[Record], _now: DateTime<Utc>) -> Result<Vec<Insight>> {
        if records.is_empty() {
            return Ok(vec![]);
        }
        let total = records.len();

        let insights = rank_labels(records, TOP_N, Self::labels)
            .into_iter()
            .map(|(food, count)| {
                let share = count as f64 / total as f64;
                let display = capitalize_words(&food);
                Insight::new(
                    InsightCategory::Foods,
                    share_priority(share, self.high_share, self.medium_share),
                    format!("Food: {}", display),
                    format!(
                        "{} was eaten before {} of {} migraines ({:.0}%).",
                        display,
                        count,
                        total,
                        share * 100.0
                    ),
                )
                .with_tag("food", food.as_str())
                .with_tag("count", count)
                .with_tag("total", total)
                .with_tag("share", round_to(share, 4))
                .with_tag("pct", (share * 100.0).round())
            })
            .collect();

        Ok(insights)
    }
}
