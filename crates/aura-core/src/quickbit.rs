//! QuickBit - short cached explanations of individual insights

use std::collections::HashMap;

use crate::insights::Insight;
use crate::prompts::Prompt;

/// Explanations keyed by insight dedupe key
///
/// Unbounded for the life of the engine; only successful answers are stored,
/// so a failed explanation is retried on the next request.
#[derive(Debug, Default, Clone)]
pub struct QuickBitCache {
    entries: HashMap<String, String>,
}

impl QuickBitCache {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// `(instructions, prompt)` for explaining one insight
pub fn build_prompt(template: &Prompt, insight: &Insight) -> (String, String) {
    let tags = insight
        .tags
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(", ");

    let vars = HashMap::from([
        ("title", insight.title.as_str()),
        ("category", insight.category.as_str()),
        ("priority", insight.priority.as_str()),
        ("message", insight.message.as_str()),
        ("tags", tags.as_str()),
    ]);

    (template.render_system(&vars), template.render_user(&vars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::{InsightCategory, Priority};
    use crate::prompts::{PromptId, PromptLibrary};

    #[test]
    fn test_cache_basics() {
        let mut cache = QuickBitCache::default();
        assert!(cache.is_empty());
        cache.insert("foods:food-cheese", "Cheese shows up often.");
        assert_eq!(cache.get("foods:food-cheese"), Some("Cheese shows up often."));
        assert_eq!(cache.get("foods:food-wine"), None);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_prompt_mentions_insight() {
        let insight = Insight::new(
            InsightCategory::IntakeHydration,
            Priority::High,
            "Low hydration",
            "You averaged 1.05 L.",
        )
        .with_tag("avgLiters", 1.05);

        let mut library = PromptLibrary::embedded_only();
        let template = library.get(PromptId::ExplainInsight).unwrap();
        let (system, prompt) = build_prompt(template, &insight);

        assert!(system.contains("No diagnoses"));
        assert!(prompt.contains("Insight: Low hydration"));
        assert!(prompt.contains("Category: intake_hydration"));
        assert!(prompt.contains("avgLiters=1.05"));
        assert!(!prompt.contains("{{"));
    }
}
