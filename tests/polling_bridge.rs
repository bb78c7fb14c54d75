//! Polling bridge integration tests
//!
//! Drives the bridge against a scripted result source on a paused clock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use multichat::agent::AgentRegistry;
use multichat::bridge::{PendingResult, PollingBridge, QueuedWorker, ResultSource};
use multichat::core::config::BotsConfig;
use multichat::core::{MultichatError, Notification, NotificationSink, Result};
use multichat::llm::TemplatedGenerator;

/// One scripted response per drain; `None` means "fail this drain"
struct ScriptedSource {
    script: Mutex<VecDeque<Option<Vec<PendingResult>>>>,
    drains: Mutex<usize>,
}

impl ScriptedSource {
    fn new(script: Vec<Option<Vec<PendingResult>>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            drains: Mutex::new(0),
        })
    }

    fn drains(&self) -> usize {
        *self.drains.lock().unwrap()
    }
}

#[async_trait]
impl ResultSource for ScriptedSource {
    async fn drain_pending(&self) -> Result<Vec<PendingResult>> {
        *self.drains.lock().unwrap() += 1;
        match self.script.lock().unwrap().pop_front() {
            Some(Some(results)) => Ok(results),
            Some(None) => Err(MultichatError::drain("runtime unreachable")),
            None => Ok(Vec::new()),
        }
    }
}

fn result(bot: &str, content: &str) -> PendingResult {
    PendingResult {
        bot_id: bot.to_string(),
        bot_name: bot.to_uppercase(),
        color: "#FFFFFF".to_string(),
        content: content.to_string(),
    }
}

fn contents(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Notification>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        match notification {
            Notification::Reply { message, .. } => out.push(message.content),
            other => out.push(format!("{:?}", other)),
        }
    }
    out
}

#[tokio::test(start_paused = true)]
async fn test_results_forwarded_in_drain_order() {
    let source = ScriptedSource::new(vec![
        Some(vec![result("a", "one"), result("b", "two")]),
        Some(vec![]),
        Some(vec![result("a", "three")]),
    ]);
    let (sink, mut rx) = NotificationSink::channel();
    let mut bridge = PollingBridge::new(source.clone(), sink);

    bridge.start(Duration::from_millis(500));
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    bridge.shutdown().await;

    assert_eq!(contents(&mut rx), vec!["one", "two", "three"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_drain_does_not_stop_polling() {
    let source = ScriptedSource::new(vec![None, Some(vec![result("a", "recovered")])]);
    let (sink, mut rx) = NotificationSink::channel();
    let mut bridge = PollingBridge::new(source.clone(), sink);

    bridge.start(Duration::from_millis(100));
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(bridge.is_running());
    bridge.shutdown().await;

    assert_eq!(contents(&mut rx), vec!["recovered"]);
    assert!(source.drains() >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_degraded_fires_once_per_failure_streak() {
    let mut script: Vec<Option<Vec<PendingResult>>> = vec![None; 7];
    script.push(Some(vec![result("a", "back")]));
    let source = ScriptedSource::new(script);
    let (sink, mut rx) = NotificationSink::channel();
    let mut bridge = PollingBridge::new(source.clone(), sink).with_degraded_after(5);

    bridge.start(Duration::from_millis(100));
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    bridge.shutdown().await;

    let seen = contents(&mut rx);
    let degraded: Vec<_> = seen.iter().filter(|s| s.contains("BridgeDegraded")).collect();
    assert_eq!(degraded.len(), 1);
    assert!(degraded[0].contains("consecutive_failures: 5"));
    assert_eq!(seen.last().map(String::as_str), Some("back"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_safe_in_any_state() {
    let source = ScriptedSource::new(vec![]);
    let (sink, _rx) = NotificationSink::channel();
    let mut bridge = PollingBridge::new(source.clone(), sink);

    bridge.stop();
    assert!(!bridge.is_running());

    bridge.start(Duration::from_millis(100));
    bridge.stop();
    bridge.stop();
    assert!(!bridge.is_running());
    bridge.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_nothing_forwarded_after_shutdown() {
    let source = ScriptedSource::new(vec![
        Some(vec![]),
        Some(vec![]),
        Some(vec![]),
        Some(vec![result("a", "too late")]),
    ]);
    let (sink, mut rx) = NotificationSink::channel();
    let mut bridge = PollingBridge::new(source.clone(), sink);

    bridge.start(Duration::from_millis(1_000));
    tokio::time::sleep(Duration::from_millis(10)).await;
    bridge.shutdown().await;
    let drains = source.drains();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.drains(), drains);
    assert!(contents(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restart_keeps_a_single_loop() {
    let source = ScriptedSource::new(vec![]);
    let (sink, _rx) = NotificationSink::channel();
    let mut bridge = PollingBridge::new(source.clone(), sink);

    bridge.start(Duration::from_millis(100));
    bridge.start(Duration::from_millis(100));
    tokio::time::sleep(Duration::from_millis(450)).await;
    bridge.shutdown().await;

    // one loop: immediate drain plus one per 100ms
    assert_eq!(source.drains(), 5);
}

#[tokio::test]
async fn test_worker_replies_flow_through_bridge() {
    let bots = BotsConfig::default();
    let roster = AgentRegistry::from_config(&bots).unwrap();
    let worker = Arc::new(QueuedWorker::new(
        roster,
        Arc::new(TemplatedGenerator::seeded(3)),
        20,
    ));
    let infos = worker.initialize(2).unwrap();

    let (sink, mut rx) = NotificationSink::channel();
    let mut bridge = PollingBridge::new(worker.clone(), sink);
    bridge.start(Duration::from_millis(10));

    worker.send_message("good morning").unwrap();
    worker.wait_idle().await;

    let mut senders = Vec::new();
    while senders.len() < 2 {
        let notification = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if let Notification::Reply { message, .. } = notification {
            senders.push(message.sender_name);
        }
    }
    let expected: Vec<_> = infos.into_iter().map(|b| b.name).collect();
    assert_eq!(senders, expected);

    bridge.shutdown().await;
    worker.shutdown().await;
}
