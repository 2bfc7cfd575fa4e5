//! Aura CLI - Migraine log insights
//!
//! Usage:
//!   aura insights             Analyze the log and print insights
//!   aura explain 12           Explain one record with the local model
//!   aura log --pain 7 --stress 5 --trigger stress
//!   aura chat                 Talk to the counselor about your log

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;
    let workspace =
        || commands::Workspace::open(&cli.records, cli.profile.as_deref(), config.clone());

    match cli.command {
        Commands::Insights { units, json } => {
            commands::cmd_insights(&workspace()?, units, json).await
        }
        Commands::Explain { id } => commands::cmd_explain(&workspace()?, id).await,
        Commands::Quickbit { key } => commands::cmd_quickbit(&workspace()?, &key).await,
        Commands::Log(args) => commands::cmd_log(&workspace()?, &args).await,
        Commands::Chat => commands::cmd_chat(&workspace()?).await,
        Commands::Status => commands::cmd_status(&workspace()?).await,
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(&config),
            Some(PromptsAction::Show { prompt_id }) => {
                commands::cmd_prompts_show(&config, &prompt_id)
            }
            Some(PromptsAction::Path) => commands::cmd_prompts_path(&config),
        },
    }
}
