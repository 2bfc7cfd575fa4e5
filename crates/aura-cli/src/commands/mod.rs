//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config loading, `Workspace`)
//! - `insights` - Insight listing and QuickBit explanations
//! - `explain` - Single-record explanations
//! - `log` - Logging a new record
//! - `chat` - Interactive counselor chat
//! - `status` - Configuration and model status
//! - `prompts` - Prompt library management commands

pub mod chat;
pub mod core;
pub mod explain;
pub mod insights;
pub mod log;
pub mod prompts;
pub mod status;

// Re-export command functions for main.rs
pub use chat::*;
pub use core::*;
pub use explain::*;
pub use insights::*;
pub use log::*;
pub use prompts::*;
pub use status::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
