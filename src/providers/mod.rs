//! Provider subsystem for model inference backends.
//!
//! This module implements the factory pattern for AI model providers. Each
//! provider implements the [`Provider`] trait defined in [`traits`], and is
//! registered in the factory function [`create_provider`] by its canonical
//! string key. Credentials are resolved once here and injected; nothing inside
//! the agent core reads the environment.

pub mod compatible;
pub mod traits;

pub use compatible::{AuthStyle, OpenAiCompatibleProvider};
pub use traits::Provider;

const MAX_API_ERROR_CHARS: usize = 200;

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub known secret-like token prefixes from provider error strings.
///
/// Redacts tokens with prefixes like `sk-`, `tvly-`, `ghp_`, and
/// `github_pat_` so upstream error bodies never leak credentials into logs.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [&str; 5] = ["sk-", "tvly-", "ghp_", "gho_", "github_pat_"];

    let mut scrubbed = input.to_string();

    for prefix in PREFIXES {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(prefix) else {
                break;
            };

            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize API error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{provider} API error ({status}): {sanitized}")
}

/// Resolve an API key for a provider: explicit config value wins, then the
/// provider's env var, then the generic fallbacks.
fn resolve_provider_credential(name: &str, credential_override: Option<&str>) -> Option<String> {
    if let Some(raw_override) = credential_override {
        let trimmed_override = raw_override.trim();
        if !trimmed_override.is_empty() {
            return Some(trimmed_override.to_owned());
        }
    }

    let provider_env_candidates: Vec<&str> = match name {
        "openai" => vec!["OPENAI_API_KEY"],
        "openrouter" => vec!["OPENROUTER_API_KEY"],
        "groq" => vec!["GROQ_API_KEY"],
        _ => vec![],
    };

    for env_var in provider_env_candidates {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    for env_var in ["WEBSAGE_API_KEY", "API_KEY"] {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Factory: create the right provider from config (without custom URL)
pub fn create_provider(name: &str, api_key: Option<&str>) -> anyhow::Result<Box<dyn Provider>> {
    create_provider_with_url(name, api_key, None)
}

/// Factory: create the right provider from config with optional custom base URL
pub fn create_provider_with_url(
    name: &str,
    api_key: Option<&str>,
    api_url: Option<&str>,
) -> anyhow::Result<Box<dyn Provider>> {
    let resolved_credential = resolve_provider_credential(name, api_key);
    let key = resolved_credential.as_deref();

    match name {
        "openai" => Ok(Box::new(OpenAiCompatibleProvider::new(
            "OpenAI",
            api_url.unwrap_or("https://api.openai.com/v1"),
            key,
            AuthStyle::Bearer,
        ))),
        "openrouter" => Ok(Box::new(OpenAiCompatibleProvider::new(
            "OpenRouter",
            api_url.unwrap_or("https://openrouter.ai/api/v1"),
            key,
            AuthStyle::Bearer,
        ))),
        "groq" => Ok(Box::new(OpenAiCompatibleProvider::new(
            "Groq",
            api_url.unwrap_or("https://api.groq.com/openai/v1"),
            key,
            AuthStyle::Bearer,
        ))),
        custom if custom.starts_with("custom:") => {
            let url = custom.trim_start_matches("custom:");
            if url.trim().is_empty() {
                anyhow::bail!("custom provider requires a URL: custom:<URL>");
            }
            Ok(Box::new(OpenAiCompatibleProvider::new(
                "Custom",
                url,
                key,
                AuthStyle::Bearer,
            )))
        }
        _ => anyhow::bail!(
            "Unknown provider: {name}. Supported: openai, openrouter, groq, custom:<URL>"
        ),
    }
}

/// Information about a supported provider for display purposes.
pub struct ProviderInfo {
    /// Canonical name used in config (e.g. `"openai"`)
    pub name: &'static str,
    /// Human-readable display name
    pub display_name: &'static str,
}

/// Return the list of all known providers for display in `websage providers`.
pub fn list_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            name: "openai",
            display_name: "OpenAI",
        },
        ProviderInfo {
            name: "openrouter",
            display_name: "OpenRouter",
        },
        ProviderInfo {
            name: "groq",
            display_name: "Groq",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_openai() {
        assert!(create_provider("openai", Some("provider-test-credential")).is_ok());
    }

    #[test]
    fn factory_unknown_provider_errors() {
        let p = create_provider("nonexistent", None);
        assert!(p.is_err());
        let msg = p.err().unwrap().to_string();
        assert!(msg.contains("Unknown provider"));
    }

    #[test]
    fn factory_empty_name_errors() {
        assert!(create_provider("", None).is_err());
    }

    #[test]
    fn factory_custom_url() {
        let p = create_provider("custom:http://localhost:8080/v1", Some("key"));
        assert!(p.is_ok());
    }

    #[test]
    fn factory_custom_without_url_errors() {
        let p = create_provider("custom:", Some("key"));
        assert!(p.is_err());
    }

    #[test]
    fn listed_providers_are_constructible() {
        for provider in list_providers() {
            assert!(
                create_provider(provider.name, Some("provider-test-credential")).is_ok(),
                "Canonical provider id should be constructible: {}",
                provider.name
            );
        }
    }

    // ── API error sanitization ───────────────────────────────

    #[test]
    fn sanitize_scrubs_sk_prefix() {
        let input = "request failed: sk-1234567890abcdef";
        let out = sanitize_api_error(input);
        assert!(!out.contains("sk-1234567890abcdef"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn sanitize_scrubs_tavily_key() {
        let input = "unauthorized: tvly-abc123def456";
        let out = sanitize_api_error(input);
        assert!(!out.contains("tvly-abc123def456"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn sanitize_truncates_long_error() {
        let long = "a".repeat(400);
        let result = sanitize_api_error(&long);
        assert!(result.len() <= 203);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn sanitize_no_secret_no_change() {
        let input = "simple upstream timeout";
        let result = sanitize_api_error(input);
        assert_eq!(result, input);
    }

    #[test]
    fn scrub_github_personal_access_token() {
        let input = "auth failed with token ghp_abc123def456";
        let result = scrub_secret_patterns(input);
        assert_eq!(result, "auth failed with token [REDACTED]");
    }

    #[test]
    fn resolve_provider_credential_prefers_explicit_argument() {
        let resolved = resolve_provider_credential("openai", Some("  explicit-key  "));
        assert_eq!(resolved, Some("explicit-key".to_string()));
    }
}
