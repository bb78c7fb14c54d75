//! Polling bridge
//!
//! For bots computed by an external runtime that cannot push results: a
//! periodic task drains the runtime's pending-result queue and forwards each
//! item to the notification channel in the order drained.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::config::BridgeConfig;
use crate::core::{AgentId, ChatMessage, Notification, NotificationSink, Result};

/// A reply produced by the external runtime, forwarded at most once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResult {
    pub bot_id: String,
    pub bot_name: String,
    pub color: String,
    pub content: String,
}

impl From<PendingResult> for Notification {
    fn from(result: PendingResult) -> Self {
        Notification::Reply {
            agent_id: AgentId::new(result.bot_id),
            message: ChatMessage::bot(result.bot_name, result.color, result.content),
        }
    }
}

/// Request/poll interface of an external runtime
#[async_trait]
pub trait ResultSource: Send + Sync {
    /// Remove and return every result available right now (possibly none)
    async fn drain_pending(&self) -> Result<Vec<PendingResult>>;
}

/// Periodically drains a [`ResultSource`] into the notification channel
pub struct PollingBridge {
    source: Arc<dyn ResultSource>,
    sink: NotificationSink,
    /// Consecutive failures before `BridgeDegraded`; 0 disables it
    degraded_after: u32,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl PollingBridge {
    pub fn new(source: Arc<dyn ResultSource>, sink: NotificationSink) -> Self {
        Self {
            source,
            sink,
            degraded_after: BridgeConfig::default().degraded_after,
            running: None,
        }
    }

    pub fn with_degraded_after(mut self, failures: u32) -> Self {
        self.degraded_after = failures;
        self
    }

    /// Begin polling every `interval`; restarts the loop if already running.
    ///
    /// The first drain happens immediately. Must be called from within a
    /// tokio runtime.
    pub fn start(&mut self, interval: Duration) {
        self.stop();

        let interval = interval.max(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let poller = Poller {
            source: self.source.clone(),
            sink: self.sink.clone(),
            degraded_after: self.degraded_after,
            cancel: cancel.clone(),
        };

        tracing::info!(interval_ms = interval.as_millis() as u64, "polling bridge started");
        let handle = tokio::spawn(poller.run(interval));
        self.running = Some((cancel, handle));
    }

    /// Halt polling; safe in any state, including before `start`
    pub fn stop(&mut self) {
        if let Some((cancel, _handle)) = self.running.take() {
            cancel.cancel();
            tracing::info!("polling bridge stopped");
        }
    }

    /// Halt polling and wait for the loop to exit
    pub async fn shutdown(&mut self) {
        if let Some((cancel, handle)) = self.running.take() {
            cancel.cancel();
            if let Err(e) = handle.await {
                tracing::warn!("polling task ended abnormally: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|(cancel, handle)| !cancel.is_cancelled() && !handle.is_finished())
    }
}

impl Drop for PollingBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Poller {
    source: Arc<dyn ResultSource>,
    sink: NotificationSink,
    degraded_after: u32,
    cancel: CancellationToken,
}

impl Poller {
    async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let drained = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                drained = self.source.drain_pending() => drained,
            };

            match drained {
                Ok(results) => {
                    consecutive_failures = 0;
                    if !results.is_empty() {
                        tracing::debug!(count = results.len(), "forwarding drained results");
                    }
                    for result in results {
                        if self.cancel.is_cancelled() {
                            return;
                        }
                        self.sink.notify(result.into());
                    }
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    tracing::warn!(consecutive_failures, "drain failed, retrying next tick: {}", e);
                    if self.degraded_after > 0 && consecutive_failures == self.degraded_after {
                        self.sink
                            .notify(Notification::BridgeDegraded { consecutive_failures });
                    }
                }
            }
        }
    }
}
