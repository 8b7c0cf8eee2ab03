//! Query classification gate.
//!
//! Decides whether a query needs live web information or can be answered from
//! model knowledge alone. The decision is produced by a schema-constrained
//! model call and parsed into a closed two-variant enum, so the orchestrator's
//! branch is exhaustive and testable independent of prompt wording. Output
//! that fails to parse triggers one corrective retry, then a typed failure;
//! there is no silent default branch.

use crate::error::AgentError;
use crate::providers::Provider;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The two-way decision gating the orchestrator's branch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    NeedsSearch,
    DirectAnswer,
}

/// Structured classifier output: the decision plus an optimized query to send
/// to the search provider when the search branch is taken.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchDecision {
    pub decision: Classification,
    /// Rewritten search query; empty means "use the raw user text".
    #[serde(default)]
    pub search_query: String,
}

const CLASSIFIER_SYSTEM_PROMPT: &str = "\
Determine if this query needs web search for current or real-time information.

Search needed for: current events, real-time data, recent updates, \"latest\" queries.
No search for: general knowledge, historical facts, explanations, how-to questions.

Reply with a JSON object: \"decision\" is either \"needs_search\" or \
\"direct_answer\", and \"search_query\" is an optimized web search query \
(empty string when no search is needed).";

const CORRECTIVE_SUFFIX: &str = "\n\nYour previous reply did not match the required schema. \
Reply with ONLY a JSON object containing \"decision\" (one of \"needs_search\", \
\"direct_answer\") and \"search_query\" (a string). No other text.";

/// JSON schema sent to the provider's constrained-generation mode.
pub fn classification_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "decision": {
                "type": "string",
                "enum": ["needs_search", "direct_answer"]
            },
            "search_query": {
                "type": "string",
                "description": "Optimized web search query, empty if no search is needed"
            }
        },
        "required": ["decision", "search_query"],
        "additionalProperties": false
    })
}

/// Strip a Markdown code fence if the model wrapped its JSON in one.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse raw model output into a [`SearchDecision`], or explain why not.
fn parse_decision(raw: &str) -> Result<SearchDecision, String> {
    let candidate = strip_code_fence(raw);
    serde_json::from_str::<SearchDecision>(candidate)
        .map_err(|e| format!("{e} (raw output: {:.120})", candidate))
}

/// Classify a query, retrying once with a corrective instruction when the
/// model output fails schema validation.
///
/// The caller must pass already-trimmed, non-empty query text; empty input is
/// rejected here as a final guard before any outbound call.
pub async fn classify(
    provider: &dyn Provider,
    model: &str,
    query: &str,
    retries: usize,
) -> Result<SearchDecision, AgentError> {
    if query.trim().is_empty() {
        return Err(AgentError::InvalidInput);
    }

    let schema = classification_schema();
    let mut last_failure = String::new();

    for attempt in 0..=retries {
        let message = if attempt == 0 {
            query.to_string()
        } else {
            format!("{query}{CORRECTIVE_SUFFIX}")
        };

        let raw = provider
            .generate_structured(Some(CLASSIFIER_SYSTEM_PROMPT), &message, model, &schema)
            .await
            .map_err(|e| AgentError::ClassificationSchema(e.to_string()))?;

        match parse_decision(&raw) {
            Ok(decision) => {
                debug!(decision = ?decision.decision, attempt, "Query classified");
                return Ok(decision);
            }
            Err(reason) => {
                warn!(attempt, %reason, "Classifier output failed schema validation");
                last_failure = reason;
            }
        }
    }

    Err(AgentError::ClassificationSchema(last_failure))
}
