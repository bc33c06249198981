#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const ZMEND_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod audit;
pub mod classifier;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod rewrite;
pub mod session;

// Re-exports for convenience
pub use audit::{AuditEvent, AuditKind, AuditLog};
pub use classifier::{FailureInfo, FailureKind, classify};
pub use config::{NoVocabPolicy, RepairConfig};
pub use context::GameContext;
pub use coordinator::{Coordinator, SessionEvent};
pub use rewrite::service::{RewriteError, RewriteRequest, RewriteResponse, RewriteService};
pub use session::{ErrorSignal, RetrySession, RetryState};
pub use zmend_story::Vocabulary;
