//! Per-invocation trace of the path the orchestrator took.

use crate::agent::classifier::Classification;
use serde::{Deserialize, Serialize};

/// Record of one `run` invocation: which branch was taken, whether search
/// executed or degraded, and what came back. Constructed once, never mutated,
/// discarded after the caller consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTrace {
    /// Correlation id for log lines belonging to this invocation.
    pub invocation_id: String,
    pub classification: Classification,
    /// True when the search branch was taken, including the degraded case.
    pub search_executed: bool,
    /// True when the search provider failed and the orchestrator proceeded
    /// with an explicitly-empty result set.
    pub search_degraded: bool,
    pub result_count: usize,
    pub answer: String,
}

/// Public return value of one invocation.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub answer: String,
    pub used_search: bool,
    pub trace: AgentTrace,
}
