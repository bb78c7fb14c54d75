//! Response orchestrator
//!
//! Fans a user message out to the bots. Each participating bot gets its own
//! delayed task; replies surface on the notification channel in whatever
//! order they finish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::agent::history::ConversationHistory;
use crate::agent::policy::ParticipationPolicy;
use crate::agent::registry::{Agent, AgentRegistry};
use crate::core::{
    AgentId, ChatMessage, MultichatError, Notification, NotificationSink, Result, Turn,
};
use crate::llm::ResponseGenerator;

/// A scheduled reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub delay: Duration,
}

/// Per-bot memory; the mutex makes each bot's history single-writer
type SharedHistory = Arc<AsyncMutex<ConversationHistory>>;

/// Schedules independent, cancellable reply tasks per bot
pub struct ResponseOrchestrator {
    /// Configured bots
    registry: Arc<AgentRegistry>,
    /// External generation capability
    generator: Arc<dyn ResponseGenerator>,
    /// Where replies and failures go
    sink: NotificationSink,
    /// Participation draws
    policy: Mutex<ParticipationPolicy>,
    /// One history per bot
    histories: HashMap<AgentId, SharedHistory>,
    /// Cancels every scheduled task on teardown
    cancel: CancellationToken,
    /// Tracks scheduled tasks so teardown can wait for them
    tracker: TaskTracker,
}

impl ResponseOrchestrator {
    /// Create an orchestrator; each bot's history is pinned to its system prompt
    pub fn new(
        registry: Arc<AgentRegistry>,
        generator: Arc<dyn ResponseGenerator>,
        policy: ParticipationPolicy,
        sink: NotificationSink,
        window: usize,
    ) -> Self {
        let histories = registry
            .iter()
            .map(|agent| {
                let history = ConversationHistory::with_system_prompt(window, agent.system_prompt());
                (agent.id().clone(), Arc::new(AsyncMutex::new(history)))
            })
            .collect();

        Self {
            registry,
            generator,
            sink,
            policy: Mutex::new(policy),
            histories,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Submit a user message to every bot.
    ///
    /// Returns the bots that decided to answer, with their delays. Must be
    /// called from within a tokio runtime.
    pub fn submit(&self, message: &str) -> Vec<Dispatch> {
        if self.cancel.is_cancelled() {
            tracing::warn!("submit after shutdown ignored");
            return Vec::new();
        }

        let decisions: Vec<_> = {
            let mut policy = self.policy.lock().unwrap_or_else(|p| p.into_inner());
            self.registry
                .iter()
                .map(|agent| (agent.clone(), policy.decide(agent, message)))
                .collect()
        };

        let mut dispatches = Vec::new();
        for (agent, decision) in decisions {
            if !decision.participates {
                tracing::debug!(agent = %agent.id(), "sitting this message out");
                continue;
            }

            let Some(history) = self.histories.get(agent.id()).cloned() else {
                continue;
            };

            tracing::debug!(agent = %agent.id(), delay_ms = decision.delay_ms, "reply scheduled");
            dispatches.push(Dispatch {
                agent_id: agent.id().clone(),
                agent_name: agent.name().to_string(),
                delay: decision.delay(),
            });

            let task = ReplyTask {
                agent,
                message: message.to_string(),
                delay: decision.delay(),
                history,
                generator: self.generator.clone(),
                sink: self.sink.clone(),
                cancel: self.cancel.child_token(),
            };
            self.tracker.spawn(task.run());
        }

        dispatches
    }

    /// Reset every bot's memory to its pinned system turn
    pub async fn clear_history(&self) {
        for history in self.histories.values() {
            history.lock().await.reset();
        }
        tracing::info!("conversation history cleared");
    }

    /// Snapshot of one bot's memory
    pub async fn history(&self, agent_id: &AgentId) -> Result<Vec<Turn>> {
        let history = self
            .histories
            .get(agent_id)
            .ok_or_else(|| MultichatError::AgentNotFound(agent_id.to_string()))?;
        Ok(history.lock().await.snapshot())
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Number of reply tasks still running
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task scheduled so far has finished
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancel every pending reply and wait for the tasks to exit.
    ///
    /// No notification fires once this returns.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::debug!("orchestrator shut down");
    }
}

impl Drop for ResponseOrchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// One bot's reply to one message
struct ReplyTask {
    agent: Arc<Agent>,
    message: String,
    delay: Duration,
    history: SharedHistory,
    generator: Arc<dyn ResponseGenerator>,
    sink: NotificationSink,
    cancel: CancellationToken,
}

impl ReplyTask {
    async fn run(self) {
        let cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(agent = %self.agent.id(), "reply cancelled");
            }
            _ = self.deliver() => {}
        }
    }

    async fn deliver(&self) {
        tokio::time::sleep(self.delay).await;

        // Held across generation so this bot's turns are appended in order
        let mut history = self.history.lock().await;
        let snapshot = history.snapshot();

        let outcome = self
            .generator
            .generate(&self.agent, &snapshot, &self.message)
            .await;

        if self.cancel.is_cancelled() {
            return;
        }

        match outcome {
            Ok(content) => {
                history.add_user(self.message.as_str());
                history.add_assistant(content.as_str());
                drop(history);

                tracing::debug!(agent = %self.agent.id(), "reply delivered");
                self.sink.notify(Notification::Reply {
                    agent_id: self.agent.id().clone(),
                    message: ChatMessage::bot(self.agent.name(), self.agent.color(), content),
                });
            }
            Err(e) => {
                drop(history);
                tracing::warn!(agent = %self.agent.id(), "generation failed: {}", e);
                self.sink.notify(Notification::AgentError {
                    agent_id: self.agent.id().clone(),
                    agent_name: self.agent.name().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}
