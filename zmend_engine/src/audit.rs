//! Append-only audit log for repair sessions.
//!
//! Every decision the coordinator makes is recorded as a timestamped,
//! tagged event scoped to a session id, and the whole session exports as
//! JSON for diagnostics. The log is monotonic in time and never mutated
//! after append.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::classifier::FailureKind;

/// What happened, with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditKind {
    SessionStarted {
        story: Option<String>,
    },
    CommandSent {
        command: String,
        retry: bool,
    },
    ErrorDetected {
        kind: FailureKind,
        matched_span: String,
    },
    RewriteAttempted {
        original: String,
        rewritten: String,
    },
    RetryResult {
        rewritten: String,
        success: bool,
    },
    Fallback {
        reason: String,
    },
}

/// One timestamped entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(flatten)]
    pub kind: AuditKind,
}

/// The per-session event stream.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    pub session_id: Uuid,
    events: Vec<AuditEvent>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            events: Vec::new(),
        }
    }

    /// Append an event stamped "now". If the wall clock stepped backwards,
    /// the stamp is clamped to the previous event's so the log stays
    /// monotonic.
    pub fn append(&mut self, kind: AuditKind) {
        let mut timestamp = OffsetDateTime::now_utc();
        if let Some(last) = self.events.last()
            && timestamp < last.timestamp
        {
            timestamp = last.timestamp;
        }
        self.events.push(AuditEvent { timestamp, kind });
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Export the session as one pretty-printed JSON object.
    ///
    /// # Errors
    /// Serialization errors bubble up from `serde_json`.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
