//! Search subsystem for web-search backends.
//!
//! Mirrors the provider factory: each backend implements [`SearchProvider`]
//! and is registered in [`create_search_provider`] by its canonical string
//! key. Credentials are resolved here from config or environment and injected.

pub mod tavily;
pub mod traits;

pub use tavily::TavilySearchProvider;
pub use traits::{SearchProvider, SearchResult};

/// Resolve the search API key: explicit config value wins, then env.
fn resolve_search_credential(credential_override: Option<&str>) -> Option<String> {
    if let Some(raw_override) = credential_override {
        let trimmed = raw_override.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_owned());
        }
    }

    for env_var in ["TAVILY_API_KEY", "WEBSAGE_SEARCH_API_KEY"] {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Factory: create the search backend from config.
pub fn create_search_provider(
    name: &str,
    api_key: Option<&str>,
    timeout_ms: u64,
) -> anyhow::Result<Box<dyn SearchProvider>> {
    match name {
        "tavily" => {
            let key = resolve_search_credential(api_key).ok_or_else(|| {
                anyhow::anyhow!(
                    "Tavily API key not set. Set search.api_key in config.toml or TAVILY_API_KEY."
                )
            })?;
            Ok(Box::new(TavilySearchProvider::new(&key, timeout_ms)))
        }
        other if other.trim().is_empty() => {
            anyhow::bail!("search.provider cannot be empty. Supported values: tavily")
        }
        other => anyhow::bail!("Unknown search provider '{other}'. Supported values: tavily"),
    }
}
