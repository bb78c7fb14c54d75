//! In-process external worker
//!
//! Stands in for an out-of-process bot runtime: messages are accepted
//! without waiting, every bot answers in the background, and replies sit in
//! a queue until someone drains it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::agent::{Agent, AgentRegistry, ConversationHistory};
use crate::bridge::polling::{PendingResult, ResultSource};
use crate::core::{MultichatError, Result};
use crate::llm::ResponseGenerator;

/// Public description of a bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub color: String,
}

struct WorkerBot {
    agent: Arc<Agent>,
    history: AsyncMutex<ConversationHistory>,
}

/// Queue-backed worker implementing [`ResultSource`]
pub struct QueuedWorker {
    roster: AgentRegistry,
    generator: Arc<dyn ResponseGenerator>,
    window: usize,
    bots: Mutex<Option<Arc<Vec<WorkerBot>>>>,
    queue: Arc<Mutex<VecDeque<PendingResult>>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl QueuedWorker {
    pub fn new(roster: AgentRegistry, generator: Arc<dyn ResponseGenerator>, window: usize) -> Self {
        Self {
            roster,
            generator,
            window,
            bots: Mutex::new(None),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Bring up the first `bot_count` bots of the roster
    pub fn initialize(&self, bot_count: usize) -> Result<Vec<BotInfo>> {
        if self.roster.is_empty() || bot_count == 0 {
            return Err(MultichatError::config("worker needs at least one bot"));
        }

        let bots: Vec<WorkerBot> = self
            .roster
            .iter()
            .take(bot_count)
            .map(|agent| WorkerBot {
                agent: agent.clone(),
                history: AsyncMutex::new(ConversationHistory::with_system_prompt(
                    self.window,
                    agent.system_prompt(),
                )),
            })
            .collect();

        tracing::info!(bots = bots.len(), "worker initialized");
        *self.bots.lock().unwrap_or_else(|p| p.into_inner()) = Some(Arc::new(bots));
        Ok(self.bot_list())
    }

    pub fn is_initialized(&self) -> bool {
        self.bots.lock().unwrap_or_else(|p| p.into_inner()).is_some()
    }

    /// Bots currently active; empty before `initialize`
    pub fn bot_list(&self) -> Vec<BotInfo> {
        match self.active_bots() {
            Some(bots) => bots
                .iter()
                .map(|bot| BotInfo {
                    id: bot.agent.id().to_string(),
                    name: bot.agent.name().to_string(),
                    color: bot.agent.color().to_string(),
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Hand a message to every bot; replies arrive on the queue later.
    ///
    /// Each bot contributes exactly one result per message, in bot order; a
    /// failed bot contributes an error text instead of a reply.
    pub fn send_message(&self, message: &str) -> Result<()> {
        let bots = self.active_bots().ok_or(MultichatError::NotInitialized)?;
        let generator = self.generator.clone();
        let queue = self.queue.clone();
        let cancel = self.cancel.clone();
        let message = message.to_string();

        self.tracker.spawn(async move {
            let replies = join_all(bots.iter().map(|bot| reply(bot, generator.as_ref(), &message)));

            let results = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                results = replies => results,
            };

            let mut queue = queue.lock().unwrap_or_else(|p| p.into_inner());
            queue.extend(results);
        });

        tracing::debug!("message handed to worker");
        Ok(())
    }

    /// Reset every bot's memory
    pub async fn clear_history(&self) {
        let Some(bots) = self.active_bots() else {
            return;
        };
        for bot in bots.iter() {
            bot.history.lock().await.reset();
        }
    }

    /// Wait until every message handed over so far has been answered
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancel in-flight work and wait for it to stop
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    fn active_bots(&self) -> Option<Arc<Vec<WorkerBot>>> {
        self.bots.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

async fn reply(bot: &WorkerBot, generator: &dyn ResponseGenerator, message: &str) -> PendingResult {
    let mut history = bot.history.lock().await;
    let snapshot = history.snapshot();

    let content = match generator.generate(&bot.agent, &snapshot, message).await {
        Ok(content) => {
            history.add_user(message);
            history.add_assistant(content.as_str());
            content
        }
        Err(e) => {
            tracing::warn!(agent = %bot.agent.id(), "worker generation failed: {}", e);
            format!("error: {}", e)
        }
    };

    PendingResult {
        bot_id: bot.agent.id().to_string(),
        bot_name: bot.agent.name().to_string(),
        color: bot.agent.color().to_string(),
        content,
    }
}

#[async_trait]
impl ResultSource for QueuedWorker {
    async fn drain_pending(&self) -> Result<Vec<PendingResult>> {
        let mut queue = self.queue.lock().unwrap_or_else(|p| p.into_inner());
        Ok(queue.drain(..).collect())
    }
}

impl Drop for QueuedWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
