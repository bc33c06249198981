//! Retry coordination.
//!
//! The coordinator owns everything mutable about a repair session and runs
//! it as a single-consumer actor: player commands, interpreter output, and
//! rewrite completions all arrive through one queue, so the session state
//! machine and the output buffer are never touched from two execution
//! contexts at once. The rewrite call itself runs on a spawned task under a
//! timeout and resolves back through the same queue; the interpreter is
//! never blocked waiting on it, and nothing is forwarded to the interpreter
//! until normalization and validation have fully passed.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use zmend_story::Vocabulary;

use crate::audit::{AuditKind, AuditLog};
use crate::classifier::{FailureInfo, classify, match_known_pattern};
use crate::config::{NoVocabPolicy, RepairConfig};
use crate::context::GameContext;
use crate::rewrite::{build_request, normalize_reply, validate_rewrite};
use crate::rewrite::service::{RewriteError, RewriteResponse, RewriteService};
use crate::session::{ErrorSignal, RetrySession, RetryState};

/// Queue depth for the actor inbox and the host event stream.
const CHANNEL_CAPACITY: usize = 32;

/// What the host UI should do, in order of arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Interpreter text to show the player as-is.
    Output(String),
    /// A validated rewrite went to the interpreter; the original error and
    /// the corrected command, for an optional notice line.
    RetryAttempted { original_error: String, rewritten: String },
    /// The retry failed too; both responses are presented together so the
    /// assistance is never silently substituted.
    RetryFailed { original_output: String, retry_output: String },
    /// A command arrived while a retry was still in flight and was dropped.
    CommandRejected { command: String, reason: String },
}

/// Observed-context updates pushed by the host as it renders output.
#[derive(Debug, Clone)]
pub enum ContextUpdate {
    Room(String),
    Object(String),
    Inventory(String),
    Exit(String),
}

enum Msg {
    PlayerCommand(String),
    InterpreterOutput(String),
    Context(ContextUpdate),
    RewriteResolved {
        generation: u64,
        result: Result<RewriteResponse, RewriteError>,
    },
    ExportAudit(oneshot::Sender<String>),
}

/// Handle to a running repair session.
///
/// Dropping the handle closes the inbox and ends the actor task. One
/// coordinator exists per active game; loading a new story file means
/// spawning a fresh one with the new vocabulary.
pub struct Coordinator {
    inbox: mpsc::Sender<Msg>,
}

impl Coordinator {
    /// Spawn the session actor.
    ///
    /// `interpreter` is where validated command text is written; the host
    /// feeds interpreter output back through [`Coordinator::interpreter_output`].
    /// Returns the handle and the host-facing event stream.
    pub fn spawn(
        config: RepairConfig,
        vocabulary: Option<Vocabulary>,
        service: Arc<dyn RewriteService>,
        interpreter: mpsc::Sender<String>,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (inbox_tx, inbox_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let actor = Actor::new(config, vocabulary, service, interpreter, events_tx, inbox_tx.clone());
        tokio::spawn(actor.run(inbox_rx));

        (Self { inbox: inbox_tx }, events_rx)
    }

    /// Feed one player command into the session.
    pub async fn player_command(&self, command: impl Into<String>) {
        self.send(Msg::PlayerCommand(command.into())).await;
    }

    /// Feed a chunk of interpreter output (push or poll, any granularity).
    pub async fn interpreter_output(&self, chunk: impl Into<String>) {
        self.send(Msg::InterpreterOutput(chunk.into())).await;
    }

    /// Record an observed-context fact.
    pub async fn context_update(&self, update: ContextUpdate) {
        self.send(Msg::Context(update)).await;
    }

    /// Export the session's audit log as JSON.
    pub async fn export_audit(&self) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        self.send(Msg::ExportAudit(tx)).await;
        rx.await.ok()
    }

    async fn send(&self, msg: Msg) {
        if self.inbox.send(msg).await.is_err() {
            warn!("coordinator task is gone; message dropped");
        }
    }
}

/// The single consumer that owns all mutable session state.
struct Actor {
    config: RepairConfig,
    vocabulary: Option<Vocabulary>,
    service: Arc<dyn RewriteService>,
    interpreter: mpsc::Sender<String>,
    events: mpsc::Sender<SessionEvent>,
    inbox: mpsc::Sender<Msg>,
    session: RetrySession,
    context: GameContext,
    audit: AuditLog,
    buffer: String,
    /// Full output of the turn that opened the retry window; shown when the
    /// rewrite path comes up empty or the retry also fails.
    original_failure: Option<String>,
    /// Guards against rewrite completions that outlive a reset.
    generation: u64,
    arbitration_pending: bool,
}

impl Actor {
    fn new(
        config: RepairConfig,
        vocabulary: Option<Vocabulary>,
        service: Arc<dyn RewriteService>,
        interpreter: mpsc::Sender<String>,
        events: mpsc::Sender<SessionEvent>,
        inbox: mpsc::Sender<Msg>,
    ) -> Self {
        let context = GameContext::with_limit(config.recent_command_limit);
        let mut audit = AuditLog::new();
        audit.append(AuditKind::SessionStarted { story: None });
        let mut session = RetrySession::new();
        session.reset();
        Self {
            config,
            vocabulary,
            service,
            interpreter,
            events,
            inbox,
            session,
            context,
            audit,
            buffer: String::new(),
            original_failure: None,
            generation: 0,
            arbitration_pending: false,
        }
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<Msg>) {
        info!("repair session {} started", self.audit.session_id);
        while let Some(msg) = inbox.recv().await {
            match msg {
                Msg::PlayerCommand(command) => self.on_player_command(command).await,
                Msg::InterpreterOutput(chunk) => self.on_interpreter_output(chunk).await,
                Msg::Context(update) => self.on_context_update(update),
                Msg::RewriteResolved { generation, result } => self.on_rewrite_resolved(generation, result).await,
                Msg::ExportAudit(reply) => {
                    let json = self.audit.export_json().unwrap_or_else(|err| {
                        warn!("audit export failed: {err}");
                        String::from("{}")
                    });
                    let _ = reply.send(json);
                },
            }
        }
        info!("repair session {} ended", self.audit.session_id);
    }

    async fn on_player_command(&mut self, command: String) {
        if self.arbitration_pending || self.session.state() == RetryState::RetrySent {
            warn!("command {command:?} rejected: a retry is still in flight");
            self.audit.append(AuditKind::Fallback {
                reason: format!("command {command:?} rejected while retry in flight"),
            });
            self.emit(SessionEvent::CommandRejected {
                command,
                reason: "a retry is still in flight".into(),
            })
            .await;
            return;
        }

        self.session.on_command_sent(&command);
        self.context.note_command(&command);
        self.audit.append(AuditKind::CommandSent {
            command: command.clone(),
            retry: false,
        });
        self.buffer.clear();
        self.original_failure = None;
        self.forward_to_interpreter(command).await;
    }

    async fn on_interpreter_output(&mut self, chunk: String) {
        self.buffer.push_str(&chunk);
        if turn_complete(&self.buffer) {
            let output = std::mem::take(&mut self.buffer);
            self.on_turn_complete(output).await;
        }
    }

    fn on_context_update(&mut self, update: ContextUpdate) {
        match update {
            ContextUpdate::Room(name) => self.context.current_room = Some(name),
            ContextUpdate::Object(name) => self.context.observe_object(&name),
            ContextUpdate::Inventory(name) => self.context.observe_inventory(&name),
            ContextUpdate::Exit(direction) => self.context.observe_exit(&direction),
        }
    }

    /// One turn's output is assembled; classify it and drive the session.
    async fn on_turn_complete(&mut self, output: String) {
        let failure = classify(&output);

        let Some(info) = failure else {
            self.finish_turn_ok(output).await;
            return;
        };

        self.audit.append(AuditKind::ErrorDetected {
            kind: info.kind,
            matched_span: info.matched_span.clone(),
        });

        if !info.kind.is_rewritable() {
            debug!("{:?} is a game response, not parser confusion; no rewrite", info.kind);
            self.finish_turn_ok(output).await;
            return;
        }

        match self.session.on_parser_error(info.clone()) {
            ErrorSignal::RetryAvailable => self.begin_arbitration(output, &info).await,
            ErrorSignal::RetryFailed => {
                self.audit.append(AuditKind::RetryResult {
                    rewritten: self.session.rewritten_command().unwrap_or_default().to_string(),
                    success: false,
                });
                let original_output = self.original_failure.take().unwrap_or_default();
                self.emit(SessionEvent::RetryFailed {
                    original_output,
                    retry_output: output,
                })
                .await;
            },
            ErrorSignal::Ignored => {
                // failure-shaped text with no command outstanding
                self.emit(SessionEvent::Output(output)).await;
            },
        }
    }

    /// The turn resolved without parser confusion.
    async fn finish_turn_ok(&mut self, output: String) {
        if self.session.state() == RetryState::RetrySent {
            self.audit.append(AuditKind::RetryResult {
                rewritten: self.session.rewritten_command().unwrap_or_default().to_string(),
                success: true,
            });
        }
        self.session.on_success();
        self.original_failure = None;
        self.emit(SessionEvent::Output(output)).await;
    }

    /// Kick the rewrite call onto its own task; the player sees nothing yet.
    async fn begin_arbitration(&mut self, output: String, info: &FailureInfo) {
        if !self.session.can_retry() {
            return;
        }
        if self.vocabulary.is_none() && self.config.no_vocab_policy == NoVocabPolicy::DisableRewrites {
            debug!("no vocabulary extracted and rewrites disabled without one; skipping arbitration");
            self.original_failure = Some(output);
            self.surface_original("no vocabulary available").await;
            return;
        }
        let command = self.session.original_command().unwrap_or_default().to_string();
        let request = build_request(&command, info, self.vocabulary.as_ref(), &self.context, &self.config);

        self.original_failure = Some(output);
        self.generation += 1;
        self.arbitration_pending = true;

        let generation = self.generation;
        let timeout = Duration::from_secs(self.config.rewrite_timeout_secs);
        let service = Arc::clone(&self.service);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, service.rewrite(request)).await {
                Ok(result) => result,
                Err(_) => Err(RewriteError::Timeout),
            };
            let _ = inbox.send(Msg::RewriteResolved { generation, result }).await;
        });
    }

    /// The rewrite task finished; decide whether anything gets resent.
    async fn on_rewrite_resolved(&mut self, generation: u64, result: Result<RewriteResponse, RewriteError>) {
        if !self.arbitration_pending || generation != self.generation {
            debug!("stale rewrite completion (generation {generation}) dropped");
            return;
        }
        self.arbitration_pending = false;

        if !self.session.can_retry() {
            warn!("rewrite resolved but session is in {:?}; dropping", self.session.state());
            return;
        }

        let rewritten = match result {
            Ok(response) => normalize_reply(&response.text, self.config.max_reply_len),
            Err(err) => {
                info!("rewrite call failed locally: {err}");
                self.audit.append(AuditKind::Fallback { reason: err.to_string() });
                None
            },
        };

        let Some(rewritten) = rewritten else {
            // sentinel, service failure, or no command in the reply
            self.surface_original("no usable rewrite").await;
            return;
        };

        if let Err(violations) = validate_rewrite(&rewritten, self.vocabulary.as_ref(), &self.context, &self.config) {
            let reasons = violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            info!("rewrite {rewritten:?} rejected by validator: {reasons}");
            self.surface_original(&format!("rewrite rejected: {reasons}")).await;
            return;
        }

        let original_error = self.original_failure.clone().unwrap_or_default();
        self.session.on_retry_sent(&rewritten);
        self.audit.append(AuditKind::RewriteAttempted {
            original: self.session.original_command().unwrap_or_default().to_string(),
            rewritten: rewritten.clone(),
        });
        self.audit.append(AuditKind::CommandSent {
            command: rewritten.clone(),
            retry: true,
        });
        self.buffer.clear();
        self.emit(SessionEvent::RetryAttempted {
            original_error,
            rewritten: rewritten.clone(),
        })
        .await;
        self.forward_to_interpreter(rewritten).await;
    }

    /// Abandon the rewrite path: reset and show the real response, nothing
    /// silently substituted.
    async fn surface_original(&mut self, reason: &str) {
        self.audit.append(AuditKind::Fallback {
            reason: reason.to_string(),
        });
        self.session.reset();
        if let Some(original) = self.original_failure.take() {
            self.emit(SessionEvent::Output(original)).await;
        }
    }

    async fn forward_to_interpreter(&self, command: String) {
        if self.interpreter.send(command).await.is_err() {
            warn!("interpreter channel closed; command dropped");
        }
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            warn!("host event channel closed");
        }
    }
}

/// Whether the buffered output constitutes a complete turn: a blank-line
/// paragraph break at the end, a recognized failure pattern already in the
/// buffer, or a trailing prompt marker.
fn turn_complete(buffer: &str) -> bool {
    if buffer.is_empty() {
        return false;
    }
    let end_trimmed = buffer.trim_end_matches(' ');
    end_trimmed.ends_with("\n\n") || end_trimmed.ends_with('>') || match_known_pattern(buffer).is_some()
}
