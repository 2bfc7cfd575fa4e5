//! Single-record explanation command

use anyhow::{bail, Context, Result};
use aura_core::{GenerationOutcome, Record, RecordId, RecordStore};

use super::Workspace;

/// Print what happened to an explanation request
pub(crate) fn report_outcome(workspace: &Workspace, outcome: GenerationOutcome) -> Result<()> {
    match outcome {
        GenerationOutcome::Generated(text) => {
            println!("💡 {}", text);
            println!();
            println!("   Saved to {}", workspace.store.path().display());
            Ok(())
        }
        GenerationOutcome::Busy { in_flight } => {
            println!("⏳ Already explaining record {}; try again shortly.", in_flight);
            Ok(())
        }
        GenerationOutcome::Unavailable => {
            println!("💤 The language model is not available.");
            println!(
                "   Backend: {} at {} (model {})",
                workspace.config.ai.backend, workspace.config.ai.host, workspace.config.ai.model
            );
            println!("   💡 Tip: Start Ollama with `ollama serve` or set OLLAMA_HOST");
            Ok(())
        }
        GenerationOutcome::Failed(cause) => bail!("Explanation failed: {}", cause),
    }
}

pub(crate) fn find_record(workspace: &Workspace, id: RecordId) -> Result<Record> {
    let records = workspace
        .store
        .list_records()
        .context("Failed to read records")?;
    match records.into_iter().find(|r| r.id == id) {
        Some(record) => Ok(record),
        None => bail!("No record with id {}", id),
    }
}

pub async fn cmd_explain(workspace: &Workspace, id: RecordId) -> Result<()> {
    let record = find_record(workspace, id)?;

    println!(
        "🔍 Explaining your migraine on {} (pain {}/10)...",
        record.start_date.format("%Y-%m-%d %H:%M"),
        record.pain_level
    );
    println!();

    let outcome = workspace.manager.generate_explanation(&record).await;
    report_outcome(workspace, outcome)
}
