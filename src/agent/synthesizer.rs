//! Answer synthesis.
//!
//! Builds the final-answer prompt and makes the single synthesis model call.
//! With results present the answer must be grounded in them; with results
//! absent the model answers from its own knowledge. A present-but-empty result
//! set is the degraded case and must produce an honest "insufficient
//! information" acknowledgment rather than a fabricated answer.

use crate::error::AgentError;
use crate::providers::Provider;
use crate::search::SearchResult;
use std::fmt::Write as _;

const DIRECT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant. Answer the user's question from your own \
knowledge, clearly and concisely.";

const GROUNDED_SYSTEM_PROMPT: &str = "\
You are a helpful assistant. Ground your answer in the search results \
provided below, citing titles or URLs where relevant. If the results do not \
contain enough information to answer, say so explicitly instead of guessing.";

/// Render search results into prompt context, preserving ranking order.
fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "SEARCH RESULTS: (none available)\n".to_string();
    }

    let mut out = String::from("SEARCH RESULTS:\n");
    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {}\n   URL: {}\n   {}",
            i + 1,
            result.title,
            result.url,
            result.snippet
        );
    }
    out
}

/// Build the user-facing portion of the synthesis prompt.
fn build_prompt(query: &str, results: Option<&[SearchResult]>) -> String {
    match results {
        None => query.to_string(),
        Some(results) => format!("{}\nQUESTION: {query}", render_results(results)),
    }
}

fn system_prompt(results: Option<&[SearchResult]>) -> &'static str {
    if results.is_some() {
        GROUNDED_SYSTEM_PROMPT
    } else {
        DIRECT_SYSTEM_PROMPT
    }
}

/// Produce the final answer. One outbound model call; an empty or failed
/// response is a [`AgentError::Synthesis`].
pub async fn synthesize(
    provider: &dyn Provider,
    model: &str,
    temperature: f64,
    query: &str,
    results: Option<&[SearchResult]>,
) -> Result<String, AgentError> {
    let prompt = build_prompt(query, results);

    let answer = provider
        .chat_with_system(Some(system_prompt(results)), &prompt, model, temperature)
        .await
        .map_err(|e| AgentError::Synthesis(e.to_string()))?;

    let answer = answer.trim().to_string();
    if answer.is_empty() {
        return Err(AgentError::Synthesis(
            "model returned an empty answer".into(),
        ));
    }

    Ok(answer)
}
