//! Log a new migraine record

use anyhow::{bail, Context, Result};
use aura_core::Record;
use chrono::{Duration, Utc};

use super::explain::report_outcome;
use super::Workspace;
use crate::cli::LogArgs;

/// Build a record starting now from the command arguments
pub(crate) fn record_from_args(id: i64, args: &LogArgs) -> Result<Record> {
    let start = Utc::now();
    let mut record = Record::new(id, start, args.pain, args.stress);

    for trigger in &args.triggers {
        record = record.with_trigger(*trigger);
    }
    for trigger in &args.custom_triggers {
        record = record.with_custom_trigger(trigger.clone());
    }
    for food in &args.foods {
        record = record.with_food(food.clone());
    }
    if let Some(note) = &args.note {
        record = record.with_note(note.clone());
    }
    if let Some(hours) = args.hours {
        if !hours.is_finite() || hours < 0.0 {
            bail!("--hours must be a non-negative number");
        }
        record = record.with_end(start + Duration::seconds((hours * 3600.0).round() as i64));
    }

    Ok(record)
}

pub async fn cmd_log(workspace: &Workspace, args: &LogArgs) -> Result<()> {
    let id = workspace.store.next_id().context("Failed to read records")?;
    let record = record_from_args(id, args)?;
    let record = workspace
        .store
        .insert(record)
        .context("Failed to save record")?;

    println!("📝 Logged migraine #{} (pain {}/10)", record.id, record.pain_level);
    println!();

    let outcome = workspace.manager.generate_explanation(&record).await;
    report_outcome(workspace, outcome)
}
