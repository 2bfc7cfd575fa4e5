//! Prompts-related command implementations

use anyhow::{bail, Result};
use aura_core::prompts::default_prompts_dir;
use aura_core::{Config, PromptId, PromptLibrary};

fn library(config: &Config) -> PromptLibrary {
    match &config.prompts.override_dir {
        Some(dir) => PromptLibrary::with_override_dir(dir.clone()),
        None => PromptLibrary::new(),
    }
}

fn override_dir_display(library: &PromptLibrary) -> String {
    match library.override_dir() {
        Some(dir) => dir.display().to_string(),
        None => default_prompts_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not available)".to_string()),
    }
}

/// List all available prompts and their override status
pub fn cmd_prompts_list(config: &Config) -> Result<()> {
    let mut library = library(config);
    let prompts = library.list();

    println!("Available Prompts:\n");

    println!("{:<20} {:>7}  {}", "ID", "VERSION", "OVERRIDE");
    println!("{}", "-".repeat(45));

    for info in prompts {
        let override_status = if info.has_override {
            "✓ Custom"
        } else {
            "Default"
        };
        println!("{:<20} {:>7}  {}", info.id, info.version, override_status);
    }

    println!();
    println!("Override directory: {}", override_dir_display(&library));

    println!();
    println!("To customize a prompt:");
    println!("  1. Copy the default to the override directory");
    println!("  2. Edit the file with your changes");
    println!("  3. Run the command again; overrides are read on each run");

    Ok(())
}

/// Show the content of a specific prompt
pub fn cmd_prompts_show(config: &Config, prompt_id: &str) -> Result<()> {
    let Some(id) = PromptId::all().iter().copied().find(|id| id.as_str() == prompt_id) else {
        let known = PromptId::all()
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        bail!("Unknown prompt '{}'. Available: {}", prompt_id, known);
    };

    let mut library = library(config);
    let prompt = library.get(id)?;

    println!("# {} (version {})", prompt.metadata.id, prompt.metadata.version);
    if let Some(path) = &prompt.override_path {
        println!("# override: {}", path.display());
    }
    if !prompt.metadata.description.is_empty() {
        println!("# {}", prompt.metadata.description);
    }
    println!();
    println!("{}", prompt.content);

    Ok(())
}

/// Show the path where prompt overrides should be placed
pub fn cmd_prompts_path(config: &Config) -> Result<()> {
    println!("{}", override_dir_display(&library(config)));
    Ok(())
}
