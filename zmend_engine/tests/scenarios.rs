//! End-to-end repair scenarios against a scripted interpreter and rewrite
//! service.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use zmend_engine::coordinator::ContextUpdate;
use zmend_engine::rewrite::service::RewriteFut;
use zmend_engine::{
    Coordinator, RepairConfig, RewriteError, RewriteResponse, RewriteService, SessionEvent, Vocabulary,
};
use zmend_story::decode_vocabulary;
use zmend_story::vocabulary::{FLAG_ADJECTIVE, FLAG_NOUN, FLAG_PREPOSITION, FLAG_VERB};
use zmend_story::StoryBuilder;

/// Replies are consumed in order; running out means a transport error.
struct ScriptedService {
    replies: Mutex<VecDeque<Result<RewriteResponse, RewriteError>>>,
    calls: AtomicUsize,
}

impl ScriptedService {
    fn new(replies: Vec<Result<RewriteResponse, RewriteError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn replying(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(RewriteResponse { text: text.to_string() })])
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RewriteService for ScriptedService {
    fn rewrite(&self, _request: zmend_engine::RewriteRequest) -> RewriteFut {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        Box::pin(async move { next.unwrap_or_else(|| Err(RewriteError::Transport("script exhausted".into()))) })
    }
}

/// Never resolves; exercises the timeout path.
struct StalledService {
    calls: AtomicUsize,
}

impl RewriteService for StalledService {
    fn rewrite(&self, _request: zmend_engine::RewriteRequest) -> RewriteFut {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::pending())
    }
}

/// Vocabulary built the way a real story carries it: through the decoder.
fn game_vocabulary() -> Vocabulary {
    let image = StoryBuilder::new(3)
        .word("take", FLAG_VERB)
        .word("drop", FLAG_VERB)
        .word("open", FLAG_VERB)
        .word("unlock", FLAG_VERB)
        .word("look", FLAG_VERB)
        .word("door", FLAG_NOUN)
        .word("key", FLAG_NOUN)
        .word("brass", FLAG_ADJECTIVE)
        .word("with", FLAG_PREPOSITION)
        .build();
    decode_vocabulary(&image).expect("fixture story image must decode")
}

struct Harness {
    coordinator: Coordinator,
    events: mpsc::Receiver<SessionEvent>,
    interpreter: mpsc::Receiver<String>,
}

fn harness(service: Arc<dyn RewriteService>, vocabulary: Option<Vocabulary>, config: RepairConfig) -> Harness {
    let (interpreter_tx, interpreter_rx) = mpsc::channel(8);
    let (coordinator, events) = Coordinator::spawn(config, vocabulary, service, interpreter_tx);
    Harness {
        coordinator,
        events,
        interpreter: interpreter_rx,
    }
}

async fn next_event(events: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

async fn next_command(interpreter: &mut mpsc::Receiver<String>) -> String {
    timeout(Duration::from_secs(5), interpreter.recv())
        .await
        .expect("timed out waiting for an interpreter command")
        .expect("interpreter channel closed")
}

const UNKNOWN_WORD_ERROR: &str = "I don't know the word \"grab\".\n\n";
const UNKNOWN_NOUN_ERROR: &str = "You can't see any such thing.\n\n";
const SUCCESS_OUTPUT: &str =
    "Taken. The brass lantern glows softly in your hands, pushing back the gloom of the cellar.\n\n";

#[tokio::test]
async fn unknown_verb_is_rewritten_and_resent() {
    // Scenario: "grab lamp" fails, the service proposes "take lamp", the
    // validator accepts it against visible objects, and it is resent.
    let service = ScriptedService::replying("take lamp");
    let mut h = harness(service.clone(), Some(game_vocabulary()), RepairConfig::default());

    h.coordinator.context_update(ContextUpdate::Object("lamp".into())).await;
    h.coordinator.player_command("grab lamp").await;
    assert_eq!(next_command(&mut h.interpreter).await, "grab lamp");

    h.coordinator.interpreter_output(UNKNOWN_WORD_ERROR).await;

    match next_event(&mut h.events).await {
        SessionEvent::RetryAttempted {
            original_error,
            rewritten,
        } => {
            assert!(original_error.contains("grab"));
            assert_eq!(rewritten, "take lamp");
        },
        other => panic!("expected RetryAttempted, got {other:?}"),
    }
    assert_eq!(next_command(&mut h.interpreter).await, "take lamp");
    assert_eq!(service.call_count(), 1);
}

#[tokio::test]
async fn successful_retry_returns_to_idle() {
    let service = ScriptedService::replying("take lamp");
    let mut h = harness(service, Some(game_vocabulary()), RepairConfig::default());

    h.coordinator.context_update(ContextUpdate::Object("lamp".into())).await;
    h.coordinator.player_command("grab lamp").await;
    next_command(&mut h.interpreter).await;
    h.coordinator.interpreter_output(UNKNOWN_WORD_ERROR).await;
    assert!(matches!(next_event(&mut h.events).await, SessionEvent::RetryAttempted { .. }));
    next_command(&mut h.interpreter).await;

    h.coordinator.interpreter_output(SUCCESS_OUTPUT).await;
    match next_event(&mut h.events).await {
        SessionEvent::Output(text) => assert!(text.contains("Taken")),
        other => panic!("expected Output, got {other:?}"),
    }

    let audit = h.coordinator.export_audit().await.expect("audit export");
    let value: serde_json::Value = serde_json::from_str(&audit).unwrap();
    let events = value["events"].as_array().unwrap();
    assert!(
        events
            .iter()
            .any(|e| e["event"] == "retry_result" && e["success"] == true)
    );

    // the next command is a fresh turn, proving the machine left RetrySent
    h.coordinator.player_command("look").await;
    assert_eq!(next_command(&mut h.interpreter).await, "look");
}

#[tokio::test]
async fn failed_retry_presents_both_responses() {
    // Scenario: the rewrite goes out, the interpreter rejects it too, and
    // the player is shown both responses together.
    let service = ScriptedService::replying("take lamp");
    let mut h = harness(service, Some(game_vocabulary()), RepairConfig::default());

    h.coordinator.context_update(ContextUpdate::Object("lamp".into())).await;
    h.coordinator.player_command("grab lamp").await;
    next_command(&mut h.interpreter).await;
    h.coordinator.interpreter_output(UNKNOWN_WORD_ERROR).await;
    assert!(matches!(next_event(&mut h.events).await, SessionEvent::RetryAttempted { .. }));
    next_command(&mut h.interpreter).await;

    h.coordinator.interpreter_output(UNKNOWN_NOUN_ERROR).await;
    match next_event(&mut h.events).await {
        SessionEvent::RetryFailed {
            original_output,
            retry_output,
        } => {
            assert!(original_output.contains("grab"));
            assert!(retry_output.contains("any such thing"));
        },
        other => panic!("expected RetryFailed, got {other:?}"),
    }

    // the next distinct command leaves Failed
    h.coordinator.player_command("open door").await;
    assert_eq!(next_command(&mut h.interpreter).await, "open door");
}

#[tokio::test]
async fn sentinel_surfaces_only_the_original_error() {
    let service = ScriptedService::replying("NO_REWRITE");
    let mut h = harness(service.clone(), Some(game_vocabulary()), RepairConfig::default());

    h.coordinator.player_command("unlock door with invisible key").await;
    next_command(&mut h.interpreter).await;
    h.coordinator.interpreter_output(UNKNOWN_NOUN_ERROR).await;

    match next_event(&mut h.events).await {
        SessionEvent::Output(text) => assert!(text.contains("any such thing")),
        other => panic!("expected Output, got {other:?}"),
    }
    assert_eq!(service.call_count(), 1);
    assert!(h.interpreter.try_recv().is_err(), "nothing further may be resent");
}

#[tokio::test]
async fn game_responses_never_reach_the_service() {
    // "You can't do that." is the game simulating, not the parser failing.
    let service = ScriptedService::replying("take lamp");
    let mut h = harness(service.clone(), Some(game_vocabulary()), RepairConfig::default());

    h.coordinator.player_command("open door").await;
    next_command(&mut h.interpreter).await;
    h.coordinator.interpreter_output("You can't do that.\n\n").await;

    match next_event(&mut h.events).await {
        SessionEvent::Output(text) => assert!(text.contains("can't do that")),
        other => panic!("expected Output, got {other:?}"),
    }
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn timeout_is_treated_as_no_rewrite() {
    let service = Arc::new(StalledService {
        calls: AtomicUsize::new(0),
    });
    let mut config = RepairConfig::default();
    config.rewrite_timeout_secs = 0;
    let mut h = harness(service.clone(), Some(game_vocabulary()), config);

    h.coordinator.player_command("grab lamp").await;
    next_command(&mut h.interpreter).await;
    h.coordinator.interpreter_output(UNKNOWN_WORD_ERROR).await;

    match next_event(&mut h.events).await {
        SessionEvent::Output(text) => assert!(text.contains("grab")),
        other => panic!("expected Output, got {other:?}"),
    }
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    assert!(h.interpreter.try_recv().is_err());
}

#[tokio::test]
async fn invented_verb_from_service_is_never_forwarded() {
    // the service proposes a verb absent from the dictionary; the strict
    // validator discards it and the original error is shown instead
    let service = ScriptedService::replying("yoink lamp");
    let mut h = harness(service, Some(game_vocabulary()), RepairConfig::default());

    h.coordinator.context_update(ContextUpdate::Object("lamp".into())).await;
    h.coordinator.player_command("grab lamp").await;
    next_command(&mut h.interpreter).await;
    h.coordinator.interpreter_output(UNKNOWN_WORD_ERROR).await;

    match next_event(&mut h.events).await {
        SessionEvent::Output(text) => assert!(text.contains("grab")),
        other => panic!("expected Output, got {other:?}"),
    }
    assert!(h.interpreter.try_recv().is_err());
}

#[tokio::test]
async fn no_vocabulary_disables_arbitration_by_default() {
    let service = ScriptedService::replying("take lamp");
    let mut h = harness(service.clone(), None, RepairConfig::default());

    h.coordinator.player_command("grab lamp").await;
    next_command(&mut h.interpreter).await;
    h.coordinator.interpreter_output(UNKNOWN_WORD_ERROR).await;

    match next_event(&mut h.events).await {
        SessionEvent::Output(text) => assert!(text.contains("grab")),
        other => panic!("expected Output, got {other:?}"),
    }
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn command_during_inflight_retry_is_rejected() {
    let service = Arc::new(StalledService {
        calls: AtomicUsize::new(0),
    });
    let mut config = RepairConfig::default();
    config.rewrite_timeout_secs = 30;
    let mut h = harness(service, Some(game_vocabulary()), config);

    h.coordinator.player_command("grab lamp").await;
    next_command(&mut h.interpreter).await;
    h.coordinator.interpreter_output(UNKNOWN_WORD_ERROR).await;

    h.coordinator.player_command("look").await;
    match next_event(&mut h.events).await {
        SessionEvent::CommandRejected { command, .. } => assert_eq!(command, "look"),
        other => panic!("expected CommandRejected, got {other:?}"),
    }
    assert!(h.interpreter.try_recv().is_err());
}

#[tokio::test]
async fn output_in_chunks_is_buffered_until_turn_complete() {
    let service = ScriptedService::replying("take lamp");
    let mut h = harness(service.clone(), Some(game_vocabulary()), RepairConfig::default());

    h.coordinator.player_command("open door").await;
    next_command(&mut h.interpreter).await;

    // arrives in fragments; the turn only completes on the blank line
    h.coordinator.interpreter_output("The door creaks open, revealing ").await;
    h.coordinator.interpreter_output("a narrow stone staircase winding down ").await;
    h.coordinator.interpreter_output("into darkness below the house.\n\n").await;

    match next_event(&mut h.events).await {
        SessionEvent::Output(text) => assert!(text.contains("staircase")),
        other => panic!("expected Output, got {other:?}"),
    }
    assert_eq!(service.call_count(), 0);
}
