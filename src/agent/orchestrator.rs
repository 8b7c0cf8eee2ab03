//! The decision-and-orchestration core.
//!
//! One invocation is a strict sequence: classify, then search or skip, then
//! synthesize. Classification and synthesis failures are fatal for the
//! invocation; a search failure degrades to empty-result synthesis so the user
//! still gets an answer. Each invocation constructs fresh state, so concurrent
//! `run` calls share nothing but the injected provider handles.

use crate::agent::classifier::{self, Classification};
use crate::agent::synthesizer;
use crate::agent::trace::{AgentOutcome, AgentTrace};
use crate::error::{AgentError, SearchError};
use crate::providers::Provider;
use crate::search::{SearchProvider, SearchResult};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What the gathering step produced for the synthesis step.
///
/// Closed variant set so the degraded-search sub-case cannot be conflated
/// with either a clean search or a skipped one.
#[derive(Debug)]
enum Gathered {
    /// Search branch: results in ranking order, possibly empty.
    Searched {
        results: Vec<SearchResult>,
        degraded: bool,
    },
    /// Direct branch: search never invoked.
    Skipped,
}

/// The orchestrator. Holds injected, process-wide handles; never mutated
/// after construction.
pub struct Agent {
    provider: Arc<dyn Provider>,
    search: Arc<dyn SearchProvider>,
    model: String,
    temperature: f64,
    max_results: usize,
    classification_retries: usize,
}

pub struct AgentBuilder {
    provider: Arc<dyn Provider>,
    search: Arc<dyn SearchProvider>,
    model: String,
    temperature: f64,
    max_results: usize,
    classification_retries: usize,
}

impl AgentBuilder {
    pub fn new(provider: Arc<dyn Provider>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            search,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_results: 3,
            classification_retries: 1,
        }
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn classification_retries(mut self, retries: usize) -> Self {
        self.classification_retries = retries;
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            provider: self.provider,
            search: self.search,
            model: self.model,
            temperature: self.temperature,
            max_results: self.max_results,
            classification_retries: self.classification_retries,
        }
    }
}

impl Agent {
    pub fn builder(provider: Arc<dyn Provider>, search: Arc<dyn SearchProvider>) -> AgentBuilder {
        AgentBuilder::new(provider, search)
    }

    /// Run one invocation: classify, search or skip, synthesize.
    pub async fn run(&self, query: &str) -> Result<AgentOutcome, AgentError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AgentError::InvalidInput);
        }

        let invocation_id = Uuid::new_v4();
        debug!(%invocation_id, "Invocation started");

        let decision =
            classifier::classify(&*self.provider, &self.model, query, self.classification_retries)
                .await?;

        let gathered = match decision.decision {
            Classification::NeedsSearch => {
                // Classifier may have rewritten the query for search.
                let search_query = if decision.search_query.trim().is_empty() {
                    query
                } else {
                    decision.search_query.as_str()
                };

                match self.search.search(search_query, self.max_results).await {
                    Ok(results) => {
                        debug!(%invocation_id, count = results.len(), "Search completed");
                        Gathered::Searched {
                            results,
                            degraded: false,
                        }
                    }
                    Err(SearchError::Unavailable(reason)) => {
                        // Degrade, don't fail: synthesis still runs with an
                        // explicitly-empty result set and must acknowledge
                        // the missing information.
                        warn!(%invocation_id, %reason, "Search unavailable, degrading to empty results");
                        Gathered::Searched {
                            results: Vec::new(),
                            degraded: true,
                        }
                    }
                }
            }
            Classification::DirectAnswer => {
                debug!(%invocation_id, "Search skipped");
                Gathered::Skipped
            }
        };

        let (answer, used_search, degraded, result_count) = match &gathered {
            Gathered::Searched { results, degraded } => {
                let answer = synthesizer::synthesize(
                    &*self.provider,
                    &self.model,
                    self.temperature,
                    query,
                    Some(results),
                )
                .await?;
                (answer, true, *degraded, results.len())
            }
            Gathered::Skipped => {
                let answer = synthesizer::synthesize(
                    &*self.provider,
                    &self.model,
                    self.temperature,
                    query,
                    None,
                )
                .await?;
                (answer, false, false, 0)
            }
        };

        info!(
            %invocation_id,
            classification = ?decision.decision,
            used_search,
            search_degraded = degraded,
            result_count,
            "Invocation finished"
        );

        Ok(AgentOutcome {
            answer: answer.clone(),
            used_search,
            trace: AgentTrace {
                invocation_id: invocation_id.to_string(),
                classification: decision.decision,
                search_executed: used_search,
                search_degraded: degraded,
                result_count,
                answer,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted model provider: pops structured replies in order, records the
    /// last chat prompt, counts calls.
    struct FakeProvider {
        structured_replies: Mutex<Vec<anyhow::Result<String>>>,
        chat_reply: anyhow::Result<String>,
        structured_calls: AtomicUsize,
        chat_calls: AtomicUsize,
        last_chat_message: Mutex<Option<String>>,
    }

    impl FakeProvider {
        fn new(structured_replies: Vec<anyhow::Result<String>>, chat_reply: &str) -> Self {
            Self {
                structured_replies: Mutex::new(structured_replies),
                chat_reply: Ok(chat_reply.to_string()),
                structured_calls: AtomicUsize::new(0),
                chat_calls: AtomicUsize::new(0),
                last_chat_message: Mutex::new(None),
            }
        }

        fn with_chat_error(structured_replies: Vec<anyhow::Result<String>>, err: &str) -> Self {
            Self {
                structured_replies: Mutex::new(structured_replies),
                chat_reply: Err(anyhow::anyhow!("{err}")),
                structured_calls: AtomicUsize::new(0),
                chat_calls: AtomicUsize::new(0),
                last_chat_message: Mutex::new(None),
            }
        }

        fn needs_search(search_query: &str) -> anyhow::Result<String> {
            Ok(format!(
                r#"{{"decision":"needs_search","search_query":"{search_query}"}}"#
            ))
        }

        fn direct_answer() -> anyhow::Result<String> {
            Ok(r#"{"decision":"direct_answer","search_query":""}"#.to_string())
        }
    }

    #[async_trait]
    impl Provider for FakeProvider {
        async fn chat_with_system(
            &self,
            _system_prompt: Option<&str>,
            message: &str,
            _model: &str,
            _temperature: f64,
        ) -> anyhow::Result<String> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_chat_message.lock().unwrap() = Some(message.to_string());
            match &self.chat_reply {
                Ok(reply) => Ok(reply.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }

        async fn generate_structured(
            &self,
            _system_prompt: Option<&str>,
            _message: &str,
            _model: &str,
            _schema: &serde_json::Value,
        ) -> anyhow::Result<String> {
            self.structured_calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.structured_replies.lock().unwrap();
            if replies.is_empty() {
                anyhow::bail!("no scripted reply left");
            }
            replies.remove(0)
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    /// Scripted search provider: fixed outcome, counts calls, records query.
    struct FakeSearch {
        outcome: Mutex<Option<Result<Vec<SearchResult>, SearchError>>>,
        calls: AtomicUsize,
        last_query: Mutex<Option<String>>,
    }

    impl FakeSearch {
        fn returning(results: Vec<SearchResult>) -> Self {
            Self {
                outcome: Mutex::new(Some(Ok(results))),
                calls: AtomicUsize::new(0),
                last_query: Mutex::new(None),
            }
        }

        fn unavailable(reason: &str) -> Self {
            Self {
                outcome: Mutex::new(Some(Err(SearchError::Unavailable(reason.into())))),
                calls: AtomicUsize::new(0),
                last_query: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for FakeSearch {
        async fn search(
            &self,
            query: &str,
            _max_results: usize,
        ) -> Result<Vec<SearchResult>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap() = Some(query.to_string());
            self.outcome
                .lock()
                .unwrap()
                .take()
                .expect("search called more than once")
        }

        fn name(&self) -> &str {
            "fake-search"
        }
    }

    fn result(title: &str, url: &str, snippet: &str) -> SearchResult {
        SearchResult {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }

    fn agent(provider: Arc<FakeProvider>, search: Arc<FakeSearch>) -> Agent {
        Agent::builder(provider, search).build()
    }

    #[tokio::test]
    async fn direct_answer_never_invokes_search() {
        let provider = Arc::new(FakeProvider::new(
            vec![FakeProvider::direct_answer()],
            "Machine learning is a field of study.",
        ));
        let search = Arc::new(FakeSearch::returning(vec![]));
        let outcome = agent(provider.clone(), search.clone())
            .run("Explain machine learning")
            .await
            .unwrap();

        assert!(!outcome.used_search);
        assert!(!outcome.trace.search_executed);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.chat_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.answer, "Machine learning is a field of study.");
    }

    #[tokio::test]
    async fn needs_search_folds_results_into_prompt_in_order() {
        let provider = Arc::new(FakeProvider::new(
            vec![FakeProvider::needs_search("oslo weather now")],
            "Around 12C and raining, per yr.no.",
        ));
        let search = Arc::new(FakeSearch::returning(vec![
            result("A", "https://a.example", "rank one"),
            result("B", "https://b.example", "rank two"),
            result("C", "https://c.example", "rank three"),
        ]));
        let outcome = agent(provider.clone(), search.clone())
            .run("What is the weather in Oslo?")
            .await
            .unwrap();

        assert!(outcome.used_search);
        assert!(!outcome.trace.search_degraded);
        assert_eq!(outcome.trace.result_count, 3);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);

        // Classifier's optimized query is the one actually searched.
        assert_eq!(
            search.last_query.lock().unwrap().as_deref(),
            Some("oslo weather now")
        );

        // Ranking order survives into the synthesis prompt.
        let prompt = provider.last_chat_message.lock().unwrap().clone().unwrap();
        let a = prompt.find("https://a.example").unwrap();
        let b = prompt.find("https://b.example").unwrap();
        let c = prompt.find("https://c.example").unwrap();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn blank_optimized_query_falls_back_to_raw_text() {
        let provider = Arc::new(FakeProvider::new(
            vec![FakeProvider::needs_search("  ")],
            "answer",
        ));
        let search = Arc::new(FakeSearch::returning(vec![]));
        agent(provider, search.clone())
            .run("latest rust release")
            .await
            .unwrap();

        assert_eq!(
            search.last_query.lock().unwrap().as_deref(),
            Some("latest rust release")
        );
    }

    #[tokio::test]
    async fn search_unavailable_degrades_instead_of_failing() {
        let provider = Arc::new(FakeProvider::new(
            vec![FakeProvider::needs_search("oslo weather")],
            "I could not retrieve live results, so I cannot say for certain.",
        ));
        let search = Arc::new(FakeSearch::unavailable("connect timeout"));
        let outcome = agent(provider.clone(), search.clone())
            .run("What is the weather in Oslo?")
            .await
            .unwrap();

        assert!(outcome.used_search);
        assert!(outcome.trace.search_degraded);
        assert_eq!(outcome.trace.result_count, 0);
        assert!(!outcome.answer.is_empty());

        // Synthesis still ran, in grounded mode with an empty set.
        let prompt = provider.last_chat_message.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("(none available)"));
    }

    #[tokio::test]
    async fn zero_results_is_success_not_degradation() {
        let provider = Arc::new(FakeProvider::new(
            vec![FakeProvider::needs_search("obscure topic")],
            "The results do not contain enough information.",
        ));
        let search = Arc::new(FakeSearch::returning(vec![]));
        let outcome = agent(provider, search)
            .run("An obscure topic nobody wrote about")
            .await
            .unwrap();

        assert!(outcome.used_search);
        assert!(!outcome.trace.search_degraded);
        assert_eq!(outcome.trace.result_count, 0);
    }

    #[tokio::test]
    async fn unparseable_classification_retries_once_then_fails() {
        let provider = Arc::new(FakeProvider::new(
            vec![
                Ok("definitely needs a search!".to_string()),
                Ok("still not json".to_string()),
            ],
            "unused",
        ));
        let search = Arc::new(FakeSearch::returning(vec![]));
        let err = agent(provider.clone(), search.clone())
            .run("anything")
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::ClassificationSchema(_)));
        assert_eq!(provider.structured_calls.load(Ordering::SeqCst), 2);
        // No silent default: neither branch executed.
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn corrective_retry_can_recover() {
        let provider = Arc::new(FakeProvider::new(
            vec![Ok("not json".to_string()), FakeProvider::direct_answer()],
            "recovered answer",
        ));
        let search = Arc::new(FakeSearch::returning(vec![]));
        let outcome = agent(provider.clone(), search)
            .run("anything")
            .await
            .unwrap();

        assert_eq!(provider.structured_calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.answer, "recovered answer");
    }

    #[tokio::test]
    async fn empty_query_fails_before_any_outbound_call() {
        let provider = Arc::new(FakeProvider::new(vec![], "unused"));
        let search = Arc::new(FakeSearch::returning(vec![]));
        let err = agent(provider.clone(), search.clone())
            .run("   ")
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::InvalidInput));
        assert_eq!(provider.structured_calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.chat_calls.load(Ordering::SeqCst), 0);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn synthesis_failure_is_fatal() {
        let provider = Arc::new(FakeProvider::with_chat_error(
            vec![FakeProvider::direct_answer()],
            "rate limited",
        ));
        let search = Arc::new(FakeSearch::returning(vec![]));
        let err = agent(provider, search).run("anything").await.unwrap_err();

        assert!(matches!(err, AgentError::Synthesis(_)));
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn empty_synthesized_answer_is_a_typed_failure() {
        let provider = Arc::new(FakeProvider::new(
            vec![FakeProvider::direct_answer()],
            "   ",
        ));
        let search = Arc::new(FakeSearch::returning(vec![]));
        let err = agent(provider, search).run("anything").await.unwrap_err();

        assert!(matches!(err, AgentError::Synthesis(_)));
    }

    #[tokio::test]
    async fn trace_records_answer_and_classification() {
        let provider = Arc::new(FakeProvider::new(
            vec![FakeProvider::direct_answer()],
            "direct knowledge answer",
        ));
        let search = Arc::new(FakeSearch::returning(vec![]));
        let outcome = agent(provider, search).run("Explain entropy").await.unwrap();

        assert_eq!(outcome.trace.classification, Classification::DirectAnswer);
        assert_eq!(outcome.trace.answer, "direct knowledge answer");
        assert!(!outcome.trace.invocation_id.is_empty());
    }
}
