//! Rewrite-service interface.
//!
//! The service itself (an LLM call over the network) is an external
//! collaborator; this module pins down the only contract the engine
//! assumes: a structured prompt goes in, free text or an error comes back,
//! and the call may take seconds or never return.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// The exact token the service must emit when no safe rewrite exists.
/// Detected case-insensitively as a substring during normalization.
pub const NO_REWRITE_SENTINEL: &str = "NO_REWRITE";

/// A fully assembled request: system instruction, per-call payload, and
/// sampling bounds. Pure value object, no ownership semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// The service's raw reply before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResponse {
    pub text: String,
}

/// Failures from the rewrite call. All of these are recovered locally and
/// folded into "no rewrite"; none reach the player as a distinct error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("rewrite call timed out")]
    Timeout,
    #[error("rewrite transport failure: {0}")]
    Transport(String),
    #[error("malformed rewrite reply: {0}")]
    Malformed(String),
}

/// Boxed future returned by [`RewriteService::rewrite`].
pub type RewriteFut = Pin<Box<dyn Future<Output = Result<RewriteResponse, RewriteError>> + Send>>;

/// An external text-rewriting service.
///
/// Implementations must be callable from a spawned task; the coordinator
/// never awaits this future on the interpreter's execution context.
pub trait RewriteService: Send + Sync {
    fn rewrite(&self, request: RewriteRequest) -> RewriteFut;
}
