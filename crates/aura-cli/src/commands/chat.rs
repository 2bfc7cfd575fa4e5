//! Interactive counselor chat

use std::io::Write;

use anyhow::{Context, Result};
use aura_core::{ChatState, CHAT_UNAVAILABLE};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::Workspace;

/// Run a chat over any line source; `/reset` restarts, `/quit` or EOF ends
pub async fn run_chat<R, W>(workspace: &Workspace, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let manager = &workspace.manager;

    let greeting = manager.start_chat().await;
    writeln!(out, "🩺 {}", greeting)?;
    if greeting == CHAT_UNAVAILABLE {
        return Ok(());
    }
    if manager.chat_state().await == ChatState::Active {
        writeln!(out, "   (type /reset to start over, /quit to leave)")?;
    }

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let message = line.trim();

        match message {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                manager.reset_chat().await;
                let greeting = manager.start_chat().await;
                writeln!(out, "🩺 {}", greeting)?;
            }
            _ => {
                let reply = manager.send_chat(message).await;
                writeln!(out, "🩺 {}", reply)?;
            }
        }
    }

    manager.reset_chat().await;
    writeln!(out)?;
    Ok(())
}

pub async fn cmd_chat(workspace: &Workspace) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_chat(workspace, stdin, &mut stdout).await
}
