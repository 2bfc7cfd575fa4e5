//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use aura_core::{RecordId, Trigger, UnitSystem};
use clap::{Parser, Subcommand};

/// Aura - Find patterns in your migraine log
#[derive(Parser)]
#[command(name = "aura")]
#[command(about = "Local-first migraine insights and on-device explanations", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Records file (JSON array)
    #[arg(long, default_value = "records.json", global = true)]
    pub records: PathBuf,

    /// Profile file (JSON)
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,

    /// Config file (defaults to ~/.config/aura/aura.toml, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze the log and print insights
    Insights {
        /// Unit system for tag values: metric, imperial
        #[arg(long, default_value = "metric")]
        units: UnitSystem,

        /// Print the session snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Explain one record with the language model and save the explanation
    Explain {
        /// Record ID
        id: RecordId,
    },

    /// Short explanation of one insight
    Quickbit {
        /// Insight dedupe key (shown by `aura insights`)
        key: String,
    },

    /// Log a new migraine, then explain it
    Log(LogArgs),

    /// Talk to the counselor about your log (/reset, /quit)
    Chat,

    /// Show configuration, model availability and record count
    Status,

    /// Manage prompt templates
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct LogArgs {
    /// Pain level (0-10)
    #[arg(long)]
    pub pain: u8,

    /// Stress level (0-10)
    #[arg(long)]
    pub stress: u8,

    /// Known trigger, repeatable (e.g. stress, lack_of_sleep, caffeine)
    #[arg(long = "trigger")]
    pub triggers: Vec<Trigger>,

    /// Free-form trigger, repeatable
    #[arg(long = "custom-trigger")]
    pub custom_triggers: Vec<String>,

    /// Food eaten beforehand, repeatable
    #[arg(long = "food")]
    pub foods: Vec<String>,

    /// Free-text note
    #[arg(long)]
    pub note: Option<String>,

    /// Hours the migraine lasted (omit while it is ongoing)
    #[arg(long)]
    pub hours: Option<f64>,
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (e.g., explain_record, counselor_chat)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
