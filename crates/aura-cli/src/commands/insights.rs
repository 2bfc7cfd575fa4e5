//! Insight listing and QuickBit explanations

use anyhow::{bail, Context, Result};
use aura_core::{Insight, Priority, SessionSnapshot, UnitSystem};
use chrono::Utc;

use super::{truncate, Workspace};

fn priority_icon(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "🔴",
        Priority::Medium => "🟠",
        Priority::Low => "🟢",
    }
}

pub(crate) fn print_insight(insight: &Insight, units: UnitSystem) {
    println!("{} {}", priority_icon(insight.priority), insight.title);
    println!("   {}", insight.message);

    let tags = insight.display_tags(units);
    if !tags.is_empty() {
        let rendered = tags
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("  ");
        println!("   {}", truncate(&rendered, 100));
    }
    println!("   key: {}", insight.dedupe_key);
}

fn print_errors(snapshot: &SessionSnapshot) {
    if snapshot.errors.is_empty() {
        return;
    }
    println!();
    println!("⚠️  Some parts of the analysis failed:");
    for error in &snapshot.errors {
        println!("   {}", error);
    }
}

/// Refresh and print insights
pub async fn cmd_insights(workspace: &Workspace, units: UnitSystem, json: bool) -> Result<()> {
    let snapshot = workspace.manager.refresh(Utc::now()).await;

    if json {
        let output =
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize insights")?;
        println!("{}", output);
        return Ok(());
    }

    println!();
    println!("🧠 Migraine Insights");
    println!("   ─────────────────────────────────────────────────────────────");

    if snapshot.insights.is_empty() {
        println!("   Nothing stands out yet. Keep logging and check back.");
    }
    for insight in &snapshot.insights {
        println!();
        print_insight(insight, units);
    }

    print_errors(&snapshot);
    println!();
    Ok(())
}

/// Refresh, then explain the insight with the given dedupe key
pub async fn cmd_quickbit(workspace: &Workspace, key: &str) -> Result<()> {
    let snapshot = workspace.manager.refresh(Utc::now()).await;

    let Some(insight) = snapshot.insights.iter().find(|i| i.dedupe_key == key) else {
        let known = snapshot
            .insights
            .iter()
            .map(|i| i.dedupe_key.as_str())
            .collect::<Vec<_>>();
        if known.is_empty() {
            bail!("No insight with key '{}' (there are no insights yet)", key);
        }
        bail!("No insight with key '{}'. Available keys: {}", key, known.join(", "));
    };

    println!();
    print_insight(insight, UnitSystem::default());
    println!();

    match workspace.manager.explain_insight(insight).await {
        Some(text) => {
            println!("💡 {}", text);
            println!();
            Ok(())
        }
        None => {
            print_errors(&workspace.manager.snapshot());
            bail!("Could not explain this insight")
        }
    }
}
