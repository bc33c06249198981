//! Rewrite arbitration.
//!
//! The pipeline between "the parser rejected this command" and "a corrected
//! command may be resent": build a bounded prompt for the external rewrite
//! service, normalize whatever text comes back into a bare command, and
//! validate that command against the story's real vocabulary and the
//! observed context. Validation is the hard gate: no invented word ever
//! reaches the interpreter, and a rejected rewrite is silently discarded in
//! favor of the interpreter's genuine response.

pub mod normalize;
pub mod prompt;
pub mod service;
pub mod validate;

pub use normalize::normalize_reply;
pub use prompt::build_request;
pub use service::{NO_REWRITE_SENTINEL, RewriteError, RewriteFut, RewriteRequest, RewriteResponse, RewriteService};
pub use validate::{Violation, validate_rewrite};
