//! Typed failure taxonomy for the agent core.
//!
//! Only [`SearchError`] is recoverable: the orchestrator absorbs it and
//! degrades to empty-result synthesis. Everything in [`AgentError`] propagates
//! to the caller as a typed failure so the front end can render a generic
//! error turn instead of leaking provider internals.

use thiserror::Error;

/// Fatal errors surfaced from a single agent invocation.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Query text was empty after trimming. Raised before any outbound call.
    #[error("query text must not be empty")]
    InvalidInput,

    /// Classifier output did not match the two-label schema, even after one
    /// corrective retry. Never silently defaulted: guessing the branch could
    /// suppress a needed search or waste one.
    #[error("classifier output did not match schema after retry: {0}")]
    ClassificationSchema(String),

    /// Model failed to produce a non-empty answer. No fallback exists.
    #[error("answer synthesis failed: {0}")]
    Synthesis(String),
}

/// Search provider failure. Recovered inside the orchestrator, never surfaced
/// to the caller directly.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Provider unreachable, timed out, rate limited, or returned a non-2xx
    /// status. A valid zero-result response is *not* this error.
    #[error("search provider unavailable: {0}")]
    Unavailable(String),
}
