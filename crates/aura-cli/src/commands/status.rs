//! Status command implementation

use anyhow::{Context, Result};
use aura_core::{LanguageModel, RecordStore};

use super::Workspace;

pub async fn cmd_status(workspace: &Workspace) -> Result<()> {
    let config = &workspace.config;

    println!();
    println!("📊 Aura Status");
    println!("   ─────────────────────────────────────────────────────────────");

    println!("   Records file: {}", workspace.store.path().display());
    let records = workspace
        .store
        .list_records()
        .context("Failed to read records")?;
    println!("   Records: {}", records.len());
    let explained = records.iter().filter(|r| r.explanation.is_some()).count();
    println!("   Explained: {}", explained);

    println!();
    println!("   AI backend: {}", config.ai.backend);
    let capability = workspace.manager.capability();
    match capability.configured() {
        Some(client) => {
            println!("   Host: {}", client.host());
            println!("   Model: {}", client.model());
            if capability.is_available().await {
                println!("   ✅ Language model: available");
            } else {
                println!("   ❌ Language model: not reachable");
                println!("      💡 Tip: Start Ollama with `ollama serve` or set OLLAMA_HOST");
            }
        }
        None => println!("   ⚠️  Language model: disabled"),
    }

    println!();
    println!("   Chat seed size: {} records", config.chat.max_records);
    if let Some(dir) = &config.prompts.override_dir {
        println!("   Prompt overrides: {}", dir.display());
    }

    println!();
    Ok(())
}
