//! Orchestrator integration tests
//!
//! Scheduling, failure isolation and teardown of reply tasks, driven by a
//! scripted generator on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use multichat::agent::{Agent, AgentRegistry, ParticipationPolicy, ResponseOrchestrator};
use multichat::core::{AgentId, MultichatError, Notification, NotificationSink, Result, Turn};
use multichat::llm::ResponseGenerator;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

/// Behavior keyed on the bot id
struct ScriptedGenerator;

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(&self, agent: &Agent, _history: &[Turn], message: &str) -> Result<String> {
        match agent.id().as_str() {
            "failing" => Err(MultichatError::generation("upstream returned 500")),
            "stuck" => std::future::pending::<Result<String>>().await,
            _ => {
                if message.starts_with("slow") {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                Ok(format!("re: {}", message))
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn bot(id: &str, participation: f64, min_ms: u64, max_ms: u64) -> Agent {
    Agent::builder(id, id.to_uppercase())
        .participation(participation)
        .delay_ms(min_ms, max_ms)
        .build()
        .unwrap()
}

fn orchestrator(agents: Vec<Agent>) -> (ResponseOrchestrator, UnboundedReceiver<Notification>) {
    let (sink, rx) = NotificationSink::channel();
    let orchestrator = ResponseOrchestrator::new(
        Arc::new(AgentRegistry::new(agents).unwrap()),
        Arc::new(ScriptedGenerator),
        ParticipationPolicy::seeded(42),
        sink,
        20,
    );
    (orchestrator, rx)
}

async fn next(rx: &mut UnboundedReceiver<Notification>) -> Notification {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a notification")
        .expect("channel closed")
}

#[tokio::test(start_paused = true)]
async fn test_failing_and_stuck_bots_do_not_block_others() {
    let (orchestrator, mut rx) = orchestrator(vec![
        bot("stuck", 1.0, 0, 0),
        bot("failing", 1.0, 0, 0),
        bot("good", 1.0, 10, 10),
    ]);

    let dispatches = orchestrator.submit("hello");
    assert_eq!(dispatches.len(), 3);

    let mut replied = false;
    let mut failed = false;
    for _ in 0..2 {
        match next(&mut rx).await {
            Notification::Reply { agent_id, message } => {
                assert_eq!(agent_id, AgentId::from("good"));
                assert_eq!(message.content, "re: hello");
                assert_eq!(message.sender_name, "GOOD");
                assert!(!message.is_user);
                replied = true;
            }
            Notification::AgentError {
                agent_id, error, ..
            } => {
                assert_eq!(agent_id, AgentId::from("failing"));
                assert!(error.contains("500"));
                failed = true;
            }
            other => panic!("unexpected notification: {:?}", other),
        }
    }
    assert!(replied && failed);
    assert_eq!(orchestrator.pending(), 1);

    // the failed bot remembers nothing of the exchange
    let failing = orchestrator.history(&AgentId::from("failing")).await.unwrap();
    assert_eq!(failing.len(), 1);

    let good = orchestrator.history(&AgentId::from("good")).await.unwrap();
    assert_eq!(good.len(), 3);
    assert_eq!(good[1], Turn::user("hello"));
    assert_eq!(good[2], Turn::assistant("re: hello"));

    orchestrator.shutdown().await;
    assert_eq!(orchestrator.pending(), 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_turns_are_appended_in_submission_order() {
    let (orchestrator, mut rx) = orchestrator(vec![bot("solo", 1.0, 100, 100)]);

    orchestrator.submit("slow one");
    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.submit("fast two");

    let first = next(&mut rx).await;
    let second = next(&mut rx).await;
    match (first, second) {
        (Notification::Reply { message: a, .. }, Notification::Reply { message: b, .. }) => {
            assert_eq!(a.content, "re: slow one");
            assert_eq!(b.content, "re: fast two");
        }
        other => panic!("unexpected notifications: {:?}", other),
    }

    let history = orchestrator.history(&AgentId::from("solo")).await.unwrap();
    let contents: Vec<_> = history.iter().skip(1).map(|t| t.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["slow one", "re: slow one", "fast two", "re: fast two"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_participation_rate_across_submissions() {
    let agents = (0..5).map(|i| bot(&format!("bot_{}", i), 0.5, 0, 0)).collect();
    let (orchestrator, _rx) = orchestrator(agents);

    let mut dispatched = 0usize;
    for i in 0..2_000 {
        dispatched += orchestrator.submit(&format!("message {}", i)).len();
    }
    orchestrator.wait_idle().await;

    let rate = dispatched as f64 / 10_000.0;
    assert!((rate - 0.5).abs() < 0.03, "rate was {}", rate);
}

#[tokio::test(start_paused = true)]
async fn test_delays_stay_within_range() {
    let (orchestrator, _rx) = orchestrator(vec![bot("ranged", 1.0, 1_000, 3_000)]);

    for _ in 0..200 {
        let dispatches = orchestrator.submit("hi");
        let delay = dispatches[0].delay;
        assert!(delay >= Duration::from_millis(1_000));
        assert!(delay < Duration::from_millis(3_000));
    }
    orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_notifications_after_shutdown() {
    let (orchestrator, mut rx) = orchestrator(vec![bot("late", 1.0, 1_000, 1_000)]);

    assert_eq!(orchestrator.submit("anyone?").len(), 1);
    orchestrator.shutdown().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rx.try_recv().is_err());
    assert!(orchestrator.submit("still there?").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clear_history_keeps_system_turn() {
    let (orchestrator, mut rx) = orchestrator(vec![bot("solo", 1.0, 0, 0)]);

    orchestrator.submit("remember me");
    next(&mut rx).await;
    orchestrator.clear_history().await;

    let history = orchestrator.history(&AgentId::from("solo")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, multichat::core::Role::System);
}

#[tokio::test]
async fn test_history_of_unknown_agent() {
    let (orchestrator, _rx) = orchestrator(vec![bot("solo", 1.0, 0, 0)]);

    assert!(matches!(
        orchestrator.history(&AgentId::from("ghost")).await,
        Err(MultichatError::AgentNotFound(id)) if id == "ghost"
    ));
}
