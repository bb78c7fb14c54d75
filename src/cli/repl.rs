//! Interactive REPL for multichat
//!
//! Input is read on the main task while a printer task renders
//! notifications as they arrive, so bot replies show up whenever they are
//! ready rather than only after the next prompt.

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cli::backend::{BackendOptions, ChatBackend, Mode};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{ChatMessage, Config, Notification, NotificationSink, Result};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    mode: Mode,
    backend: ChatBackend,
    printer: JoinHandle<()>,
}

impl Repl {
    /// Start the backend for `mode` and the notification printer
    pub async fn start(config: Config, mode: Mode, options: BackendOptions) -> Result<Self> {
        let (sink, rx) = NotificationSink::channel();
        let printer = tokio::spawn(print_notifications(rx));
        let backend = ChatBackend::start(mode, &config, &options, sink).await?;

        Ok(Self {
            config,
            mode,
            backend,
            printer,
        })
    }

    /// Run the REPL until `exit` or end of input
    pub async fn run(mut self) -> Result<()> {
        self.print_banner();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt()?;

            let Some(input) = lines.next_line().await? else {
                println!("\nGoodbye!");
                break;
            };

            match handle_command(&input, &mut self.backend).await {
                Ok(CommandResult::Exit) => {
                    println!("Goodbye!");
                    break;
                }
                Ok(CommandResult::Clear(outcome)) => println!("{}\n", outcome),
                Ok(CommandResult::Handled(output)) => println!("{}\n", output),
                Ok(CommandResult::None) => {}
                Ok(CommandResult::Continue(message)) => match self.backend.send(&message).await {
                    Ok(Some(line)) => println!("{}", line),
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {}\n", e),
                },
                Err(e) => eprintln!("Command error: {}\n", e),
            }
        }

        self.finish().await;
        Ok(())
    }

    /// Send one message, print whatever arrives in reply, and exit
    pub async fn run_once(mut self, message: &str) -> Result<()> {
        let sent = self.backend.send(message).await;
        match sent {
            Ok(Some(line)) => println!("{}", line),
            Ok(None) => {}
            Err(e) => {
                self.finish().await;
                return Err(e);
            }
        }

        self.backend.settle(&self.config).await;
        self.finish().await;
        Ok(())
    }

    async fn finish(self) {
        let Self {
            mut backend,
            printer,
            ..
        } = self;
        backend.shutdown().await;
        // dropping the backend closes the channel and ends the printer
        drop(backend);
        if let Err(e) = printer.await {
            tracing::warn!("printer task failed: {}", e);
        }
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!();
        println!("  multichat - one room, several bots");
        println!("─────────────────────────────────────────────");
        match self.mode {
            Mode::Local => {
                println!("Mode:    local ({} bots)", self.backend.bots().len());
                println!("Model:   {}", self.config.llm.model);
            }
            Mode::Remote => println!("Mode:    remote ({})", self.config.session.url),
            Mode::Bridge => println!("Mode:    bridge ({} bots)", self.backend.bots().len()),
        }
        println!("You are: {}", self.config.session.user_name);
        println!();
        println!("Commands: help, clear, bots, status, exit");
        println!("─────────────────────────────────────────────");
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

async fn print_notifications(mut rx: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        if let Some(text) = render(&notification) {
            println!("\r{}", text);
        }
    }
}

/// Terminal rendering of a notification; `None` for ones not shown
pub fn render(notification: &Notification) -> Option<String> {
    match notification {
        Notification::Reply { message, .. } | Notification::Message(message) => {
            Some(render_message(message))
        }
        Notification::AgentError {
            agent_name, error, ..
        } => Some(format!("  ! {} could not answer: {}", agent_name, error)),
        Notification::Connected { session_id } => {
            Some(format!("* connected (session {})", session_id))
        }
        Notification::History(messages) => {
            if messages.is_empty() {
                return None;
            }
            let mut lines = vec![format!("* {} earlier messages", messages.len())];
            lines.extend(messages.iter().map(render_message));
            Some(lines.join("\n"))
        }
        Notification::Error(error) => Some(format!("* error: {}", error)),
        Notification::Disconnected => Some("* disconnected (type 'connect' to retry)".to_string()),
        Notification::BridgeDegraded {
            consecutive_failures,
        } => Some(format!(
            "* bot runtime is not responding ({} failed polls)",
            consecutive_failures
        )),
    }
}

fn render_message(message: &ChatMessage) -> String {
    let time = chrono::DateTime::from_timestamp_millis(message.timestamp_ms)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "--:--:--".to_string());
    format!("[{}] {}: {}", time, message.sender_name, message.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AgentId;

    #[test]
    fn test_render_reply() {
        let message = ChatMessage::bot("Maimai", "#FF6B9D", "hi there");
        let text = render(&Notification::Reply {
            agent_id: AgentId::from("bot_0"),
            message,
        })
        .unwrap();
        assert!(text.ends_with("Maimai: hi there"));
    }

    #[test]
    fn test_render_empty_history_is_silent() {
        assert!(render(&Notification::History(Vec::new())).is_none());
    }

    #[test]
    fn test_render_degraded() {
        let text = render(&Notification::BridgeDegraded {
            consecutive_failures: 5,
        })
        .unwrap();
        assert!(text.contains("5 failed polls"));
    }
}
