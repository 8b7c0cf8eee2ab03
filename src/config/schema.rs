use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

// ── Top-level config ──────────────────────────────────────────────

/// Top-level websage configuration, loaded from `config.toml`.
///
/// Resolution order: `WEBSAGE_CONFIG_DIR` env → `~/.websage/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// API key for the selected model provider. Overridden by `WEBSAGE_API_KEY` or `API_KEY` env vars.
    pub api_key: Option<String>,
    /// Base URL override for the provider API (e.g. a local OpenAI-compatible gateway)
    pub api_url: Option<String>,
    /// Model provider ID (e.g. `"openai"`, `"openrouter"`, `"custom:<URL>"`). Default: `"openai"`.
    pub default_provider: Option<String>,
    /// Default model routed through the selected provider.
    pub default_model: Option<String>,
    /// Default model temperature (0.0–2.0) for answer synthesis. Default: `0.7`.
    pub default_temperature: f64,

    /// Web search configuration (`[search]`).
    #[serde(default)]
    pub search: SearchConfig,

    /// Agent orchestration settings (`[agent]`).
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Web search configuration (`[search]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search backend ID. Default: `"tavily"`.
    #[serde(default = "default_search_provider")]
    pub provider: String,
    /// API key for the search provider. Overridden by `TAVILY_API_KEY`.
    pub api_key: Option<String>,
    /// Maximum results folded into the synthesis prompt. Default: `3`.
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
    /// Per-request timeout in milliseconds. A timed-out search degrades to
    /// empty results rather than failing the invocation. Default: `20000`.
    #[serde(default = "default_search_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_search_provider() -> String {
    "tavily".into()
}

fn default_search_max_results() -> usize {
    3
}

fn default_search_timeout_ms() -> u64 {
    20_000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            api_key: None,
            max_results: default_search_max_results(),
            timeout_ms: default_search_timeout_ms(),
        }
    }
}

/// Agent orchestration configuration (`[agent]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Corrective retries when classifier output fails schema validation.
    /// Default: `1`.
    #[serde(default = "default_classification_retries")]
    pub classification_retries: usize,
}

fn default_classification_retries() -> usize {
    1
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            classification_retries: default_classification_retries(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            api_key: None,
            api_url: None,
            default_provider: Some("openai".into()),
            default_model: Some("gpt-4o-mini".into()),
            default_temperature: 0.7,
            search: SearchConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

fn default_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("WEBSAGE_CONFIG_DIR") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    let user_dirs = UserDirs::new().context("Could not determine home directory")?;
    Ok(user_dirs.home_dir().join(".websage"))
}

fn config_dir_creation_error(path: &Path) -> String {
    format!("Failed to create config directory: {}", path.display())
}

impl Config {
    pub async fn load_or_init() -> Result<Self> {
        let websage_dir = default_config_dir()?;
        let config_path = websage_dir.join("config.toml");

        fs::create_dir_all(&websage_dir)
            .await
            .with_context(|| config_dir_creation_error(&websage_dir))?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.clone();

            config.apply_env_overrides();
            config.validate()?;
            tracing::info!(
                path = %config.config_path.display(),
                initialized = false,
                "Config loaded"
            );
            Ok(config)
        } else {
            let mut config = Config::default();
            config.config_path = config_path.clone();
            config.save().await?;

            // Restrict permissions on newly created config file (may contain API keys)
            #[cfg(unix)]
            {
                use std::{fs::Permissions, os::unix::fs::PermissionsExt};
                let _ = fs::set_permissions(&config_path, Permissions::from_mode(0o600)).await;
            }

            config.apply_env_overrides();
            config.validate()?;
            tracing::info!(
                path = %config.config_path.display(),
                initialized = true,
                "Config loaded"
            );
            Ok(config)
        }
    }

    pub async fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, contents)
            .await
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Validate configuration values that would cause runtime failures.
    ///
    /// Called after TOML deserialization and env-override application to catch
    /// obviously invalid values early instead of failing mid-invocation.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            anyhow::bail!("default_temperature must be between 0.0 and 2.0");
        }
        if self.search.max_results == 0 {
            anyhow::bail!("search.max_results must be at least 1");
        }
        if self.search.provider.trim().is_empty() {
            anyhow::bail!("search.provider must not be empty");
        }
        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        // Model API key: WEBSAGE_API_KEY or API_KEY (generic)
        if let Ok(key) = std::env::var("WEBSAGE_API_KEY").or_else(|_| std::env::var("API_KEY")) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }

        // Provider: WEBSAGE_PROVIDER
        if let Ok(provider) = std::env::var("WEBSAGE_PROVIDER") {
            if !provider.is_empty() {
                self.default_provider = Some(provider);
            }
        }

        // Model: WEBSAGE_MODEL or MODEL
        if let Ok(model) = std::env::var("WEBSAGE_MODEL").or_else(|_| std::env::var("MODEL")) {
            if !model.is_empty() {
                self.default_model = Some(model);
            }
        }

        // Search API key: TAVILY_API_KEY
        if let Ok(key) = std::env::var("TAVILY_API_KEY") {
            if !key.is_empty() {
                self.search.api_key = Some(key);
            }
        }

        // Temperature: WEBSAGE_TEMPERATURE
        if let Ok(temp_str) = std::env::var("WEBSAGE_TEMPERATURE") {
            if let Ok(temp) = temp_str.parse::<f64>() {
                if (0.0..=2.0).contains(&temp) {
                    self.default_temperature = temp;
                }
            }
        }
    }
}
