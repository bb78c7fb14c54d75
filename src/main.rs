//! multichat - group chat with several AI bots
//!
//! Main entry point for the CLI application.

use clap::Parser;
use multichat::cli::{BackendOptions, Mode};
use multichat::core::logging::{init_logging, with_startup_logging};
use multichat::{Config, Repl};

/// multichat - group chat with several AI bots
#[derive(Parser, Debug)]
#[command(name = "multichat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Where bot replies come from
    #[arg(long, short = 'm', value_enum, default_value = "local")]
    mode: Mode,

    /// Remote service endpoint (ws:// or wss://)
    #[arg(long)]
    url: Option<String>,

    /// Display name in the room
    #[arg(long, short = 'u')]
    user_name: Option<String>,

    /// Number of bots in the room
    #[arg(long, short = 'b')]
    bots: Option<usize>,

    /// Seed for reproducible participation and templated replies
    #[arg(long)]
    seed: Option<u64>,

    /// Use templated replies instead of the chat-completion API
    #[arg(long)]
    offline: bool,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = with_startup_logging(Config::load);

    // Apply CLI overrides
    if let Some(ref url) = args.url {
        config.session.url = url.clone();
    }

    if let Some(ref user_name) = args.user_name {
        config.session.user_name = user_name.clone();
    }

    if let Some(bots) = args.bots {
        config.bots.count = bots;
    }

    if args.debug {
        config.general.debug = true;
    }

    init_logging(config.general.debug);

    if args.save_config {
        config.save()?;
        println!("Configuration written to {}", Config::config_file().display());
        return Ok(());
    }

    let options = BackendOptions {
        seed: args.seed,
        offline: args.offline,
    };
    let repl = Repl::start(config, args.mode, options).await?;

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        repl.run_once(&prompt).await?;
        return Ok(());
    }

    // Interactive REPL mode
    repl.run().await?;

    Ok(())
}
