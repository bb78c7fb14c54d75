//! REPL commands
//!
//! Words typed at the prompt that are handled locally instead of being sent
//! to the bots.

use crate::cli::backend::ChatBackend;
use crate::core::Result;

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Not a command; send as a chat message
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Bot memory reset was requested; carries the outcome
    Clear(String),
    /// No output needed
    None,
}

/// Parse and handle special commands
pub async fn handle_command(input: &str, backend: &mut ChatBackend) -> Result<CommandResult> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(CommandResult::None);
    }

    let cmd = command_word(input);
    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "clear" | "reset" => Ok(CommandResult::Clear(backend.clear().await.to_string())),

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "bots" => {
            let bots = backend.bots();
            if bots.is_empty() {
                return Ok(CommandResult::Handled(
                    "The bot roster is managed by the remote service.".to_string(),
                ));
            }
            let lines: Vec<String> = bots
                .iter()
                .map(|(name, color)| format!("  {:<10} {}", name, color))
                .collect();
            Ok(CommandResult::Handled(format!("Bots:\n{}", lines.join("\n"))))
        }

        "status" => Ok(CommandResult::Handled(backend.status())),

        "connect" => Ok(CommandResult::Handled(backend.reconnect().await?)),

        _ => {
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

/// Lower-cased first word, without a leading slash
fn command_word(input: &str) -> String {
    let word = input.split_whitespace().next().unwrap_or("");
    let word = word.strip_prefix('/').unwrap_or(word);
    // only single-word inputs count as commands
    if input.split_whitespace().count() > 1 && !input.starts_with('/') {
        return String::new();
    }
    word.to_lowercase()
}

/// Generate help text
fn help_text() -> String {
    r#"Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Leave the chat
  clear, reset     Make the bots forget the conversation
  bots             List the bots in the room
  status           Show connection and backend status
  connect          Reconnect to the remote service

Anything else is sent to the room. Prefix with '/' to force a command.
─────────────────────────────────────────────"#
        .to_string()
}
