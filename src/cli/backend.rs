//! Chat backends behind the REPL
//!
//! One of: local orchestration, a remote session, or an external worker
//! drained by the polling bridge. All three report through the same
//! notification channel.

use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::agent::{AgentRegistry, ParticipationPolicy, ResponseOrchestrator};
use crate::bridge::{PollingBridge, QueuedWorker};
use crate::core::config::BotsConfig;
use crate::core::{Config, NotificationSink, Result};
use crate::llm::{ChatCompletionClient, ResponseGenerator, TemplatedGenerator};
use crate::session::SessionClient;

/// How long a single-prompt run waits for a remote service to answer
const REMOTE_REPLY_WAIT: Duration = Duration::from_secs(10);

const CLEARED: &str = "The bots forgot everything.";

/// Where replies come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Bots run in this process
    Local,
    /// Bots live on a remote service reached over WebSocket
    Remote,
    /// Bots run in a worker whose results are polled
    Bridge,
}

/// Options that do not live in the config file
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Seed for participation draws and templates
    pub seed: Option<u64>,
    /// Use templated replies even when an API key is configured
    pub offline: bool,
}

/// A running chat backend
pub enum ChatBackend {
    Local(ResponseOrchestrator),
    Remote {
        client: SessionClient,
        user_id: String,
        user_name: String,
    },
    Bridge {
        worker: Arc<QueuedWorker>,
        bridge: PollingBridge,
    },
}

impl ChatBackend {
    /// Build and start the backend for `mode`
    pub async fn start(
        mode: Mode,
        config: &Config,
        options: &BackendOptions,
        sink: NotificationSink,
    ) -> Result<Self> {
        match mode {
            Mode::Local => {
                let registry = Arc::new(AgentRegistry::from_config(&config.bots)?);
                let policy = match options.seed {
                    Some(seed) => ParticipationPolicy::seeded(seed),
                    None => ParticipationPolicy::from_entropy(),
                };
                let generator = build_generator(config, options)?;
                Ok(Self::Local(ResponseOrchestrator::new(
                    registry,
                    generator,
                    policy,
                    sink,
                    config.history.window,
                )))
            }
            Mode::Remote => {
                let client = SessionClient::from_config(&config.session, sink);
                let user_id = Config::load_or_create_user_id()?;
                let user_name = config.session.user_name.clone();
                client.connect(&user_id, &user_name).await?;
                Ok(Self::Remote {
                    client,
                    user_id,
                    user_name,
                })
            }
            Mode::Bridge => {
                let roster = AgentRegistry::from_config(&BotsConfig {
                    count: config.bots.roster.len(),
                    ..config.bots.clone()
                })?;
                let worker = Arc::new(QueuedWorker::new(
                    roster,
                    build_generator(config, options)?,
                    config.history.window,
                ));
                worker.initialize(config.bots.count)?;

                let mut bridge = PollingBridge::new(worker.clone(), sink)
                    .with_degraded_after(config.bridge.degraded_after);
                bridge.start(Duration::from_millis(config.bridge.poll_interval_ms));
                Ok(Self::Bridge { worker, bridge })
            }
        }
    }

    /// Send a user message; returns a line to show immediately, if any
    pub async fn send(&mut self, text: &str) -> Result<Option<String>> {
        match self {
            Self::Local(orchestrator) => {
                let dispatches = orchestrator.submit(text);
                if dispatches.is_empty() {
                    return Ok(Some("(nobody felt like answering)".to_string()));
                }
                let names: Vec<_> = dispatches.iter().map(|d| d.agent_name.as_str()).collect();
                Ok(Some(format!("({} typing...)", names.join(", "))))
            }
            Self::Remote { client, .. } => {
                client.send(text)?;
                Ok(None)
            }
            Self::Bridge { worker, .. } => {
                worker.send_message(text)?;
                Ok(None)
            }
        }
    }

    /// Reset the bots' memory; returns what happened
    pub async fn clear(&mut self) -> &'static str {
        match self {
            Self::Local(orchestrator) => {
                orchestrator.clear_history().await;
                CLEARED
            }
            Self::Remote { .. } => "The remote service keeps its own memory; nothing cleared.",
            Self::Bridge { worker, .. } => {
                worker.clear_history().await;
                CLEARED
            }
        }
    }

    /// Reconnect a remote session after it dropped
    pub async fn reconnect(&mut self) -> Result<String> {
        match self {
            Self::Remote {
                client,
                user_id,
                user_name,
            } => {
                client.disconnect().await;
                client.connect(user_id, user_name).await?;
                Ok(format!("Connecting to {}...", client.endpoint()))
            }
            _ => Ok("Nothing to connect in this mode.".to_string()),
        }
    }

    /// Bot names and colors
    pub fn bots(&self) -> Vec<(String, String)> {
        match self {
            Self::Local(orchestrator) => orchestrator
                .registry()
                .iter()
                .map(|a| (a.name().to_string(), a.color().to_string()))
                .collect(),
            Self::Remote { .. } => Vec::new(),
            Self::Bridge { worker, .. } => worker
                .bot_list()
                .into_iter()
                .map(|b| (b.name, b.color))
                .collect(),
        }
    }

    /// Multi-line status report
    pub fn status(&self) -> String {
        match self {
            Self::Local(orchestrator) => format!(
                "Mode:       local\nGenerator:  {}\nBots:       {}\nPending:    {} replies",
                orchestrator.generator_name(),
                orchestrator.registry().len(),
                orchestrator.pending()
            ),
            Self::Remote {
                client, user_name, ..
            } => format!(
                "Mode:       remote\nEndpoint:   {}\nState:      {}\nSession:    {}\nUser:       {}",
                client.endpoint(),
                client.state(),
                client.session_id().unwrap_or_else(|| "-".to_string()),
                user_name
            ),
            Self::Bridge { worker, bridge } => format!(
                "Mode:       bridge\nBots:       {}\nPolling:    {}",
                worker.bot_list().len(),
                if bridge.is_running() { "running" } else { "stopped" }
            ),
        }
    }

    /// Wait for the replies to the last message (single-prompt mode)
    pub async fn settle(&mut self, config: &Config) {
        match self {
            Self::Local(orchestrator) => {
                let limit = Duration::from_millis(config.bots.max_delay_ms)
                    + Duration::from_secs(config.llm.timeout_secs);
                if tokio::time::timeout(limit, orchestrator.wait_idle())
                    .await
                    .is_err()
                {
                    tracing::warn!("gave up waiting for replies");
                }
            }
            Self::Remote { .. } => tokio::time::sleep(REMOTE_REPLY_WAIT).await,
            Self::Bridge { worker, .. } => {
                worker.wait_idle().await;
                // one more poll so the last results are forwarded
                tokio::time::sleep(Duration::from_millis(config.bridge.poll_interval_ms * 2)).await;
            }
        }
    }

    /// Cancel pending work and release the transport
    pub async fn shutdown(&mut self) {
        match self {
            Self::Local(orchestrator) => orchestrator.shutdown().await,
            Self::Remote { client, .. } => client.disconnect().await,
            Self::Bridge { worker, bridge } => {
                bridge.shutdown().await;
                worker.shutdown().await;
            }
        }
    }
}

fn build_generator(config: &Config, options: &BackendOptions) -> Result<Arc<dyn ResponseGenerator>> {
    if options.offline || !config.has_api_key() {
        if !options.offline {
            tracing::warn!("no API key configured; using templated replies");
        }
        let generator = match options.seed {
            Some(seed) => TemplatedGenerator::seeded(seed),
            None => TemplatedGenerator::new(StdRng::from_os_rng()),
        };
        return Ok(Arc::new(generator));
    }

    Ok(Arc::new(ChatCompletionClient::from_config(&config.llm)?))
}
