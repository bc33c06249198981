//! Retry session state machine.
//!
//! One [`RetrySession`] exists per active game. It enforces the single-retry
//! protocol: a command may be rewritten and resent at most once, and two
//! retries can never happen without a fresh command in between. Protocol
//! violations (a call that makes no sense in the current state) are logged
//! and ignored rather than panicking; the interpreter keeps running either
//! way.

use log::{info, warn};

use crate::classifier::FailureInfo;

/// Where the session is in the command / error / retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// No command outstanding.
    Idle,
    /// A player command was sent; awaiting its output.
    CommandSent,
    /// The output classified as a rewritable failure; a retry is available.
    ErrorDetected,
    /// A validated rewrite was sent; awaiting its output.
    RetrySent,
    /// The retry failed too; waiting for the next distinct command.
    Failed,
}

/// Outcome of reporting a parser error to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSignal {
    /// First failure for this command; a retry may be attempted.
    RetryAvailable,
    /// The retry itself failed; both errors should be surfaced together.
    RetryFailed,
    /// The report made no sense in the current state and was dropped.
    Ignored,
}

/// Per-game retry bookkeeping, mutated only by the coordinator.
#[derive(Debug, Clone)]
pub struct RetrySession {
    state: RetryState,
    original_command: Option<String>,
    rewritten_command: Option<String>,
    last_error: Option<FailureInfo>,
}

impl Default for RetrySession {
    fn default() -> Self {
        Self::new()
    }
}

impl RetrySession {
    pub fn new() -> Self {
        Self {
            state: RetryState::Idle,
            original_command: None,
            rewritten_command: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn original_command(&self) -> Option<&str> {
        self.original_command.as_deref()
    }

    pub fn rewritten_command(&self) -> Option<&str> {
        self.rewritten_command.as_deref()
    }

    pub fn last_error(&self) -> Option<&FailureInfo> {
        self.last_error.as_ref()
    }

    /// A fresh player command went to the interpreter.
    ///
    /// Valid from `Idle` and `Failed`; records the command and clears prior
    /// rewrite/error state. In `RetrySent` the interpreter traffic belongs
    /// to the in-flight retry, so nothing changes. Anywhere else the call is
    /// logged as unexpected and dropped.
    pub fn on_command_sent(&mut self, command: &str) {
        match self.state {
            RetryState::Idle | RetryState::Failed => {
                self.state = RetryState::CommandSent;
                self.original_command = Some(command.to_string());
                self.rewritten_command = None;
                self.last_error = None;
                info!("command sent: {command:?}");
            },
            RetryState::RetrySent => {
                // output correlation for the retry itself; not a new command
            },
            RetryState::CommandSent | RetryState::ErrorDetected => {
                warn!(
                    "on_command_sent({command:?}) ignored in state {:?}: previous command still unresolved",
                    self.state
                );
            },
        }
    }

    /// The turn's output classified as a parser failure.
    pub fn on_parser_error(&mut self, info: FailureInfo) -> ErrorSignal {
        match self.state {
            RetryState::CommandSent => {
                self.state = RetryState::ErrorDetected;
                self.last_error = Some(info);
                ErrorSignal::RetryAvailable
            },
            RetryState::RetrySent => {
                self.state = RetryState::Failed;
                self.last_error = Some(info);
                ErrorSignal::RetryFailed
            },
            _ => {
                warn!("on_parser_error ignored in state {:?}", self.state);
                ErrorSignal::Ignored
            },
        }
    }

    /// True iff a rewrite may be attempted right now.
    pub fn can_retry(&self) -> bool {
        self.state == RetryState::ErrorDetected
    }

    /// A validated rewrite is going to the interpreter.
    ///
    /// Requires `ErrorDetected`; returns false (and changes nothing) from
    /// any other state, which keeps a second retry per command unreachable.
    pub fn on_retry_sent(&mut self, rewritten: &str) -> bool {
        if self.state != RetryState::ErrorDetected {
            warn!("on_retry_sent({rewritten:?}) ignored in state {:?}", self.state);
            return false;
        }
        self.state = RetryState::RetrySent;
        self.rewritten_command = Some(rewritten.to_string());
        info!("retry sent: {rewritten:?}");
        true
    }

    /// The turn resolved without a rewritable failure.
    pub fn on_success(&mut self) {
        if self.state != RetryState::Idle {
            self.state = RetryState::Idle;
            self.original_command = None;
            self.rewritten_command = None;
            self.last_error = None;
        }
    }

    /// Force `Idle` unconditionally (session start, rewrite abandonment).
    pub fn reset(&mut self) {
        self.state = RetryState::Idle;
        self.original_command = None;
        self.rewritten_command = None;
        self.last_error = None;
    }
}
