//! Application configuration for chimei.
//!
//! User config lives at `~/.chimei/chimei.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChimeiError, Result};
use crate::types::{Category, StrategyKind};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "chimei.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".chimei";

// ---------------------------------------------------------------------------
// Config structs (matching chimei.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Extraction behaviour.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Completion service used by the AI-assisted strategy.
    #[serde(default)]
    pub ai: AiConfig,

    /// General-purpose entity tagger.
    #[serde(default)]
    pub tagger: TaggerConfig,

    /// Additions to the built-in pattern catalog.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Inputs shorter than this many characters yield an empty result.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    /// Cap for the before/sentence/after context windows, in characters.
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,

    /// Concurrent sentence workers. `0` means one per available CPU.
    #[serde(default)]
    pub max_concurrency: usize,

    /// Strip Aozora Bunko ruby, annotations and footer before extraction.
    #[serde(default = "default_true")]
    pub strip_markup: bool,

    /// Strategies to run, in any order (registry order is fixed).
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,

    /// Per-strategy, per-sentence timeout.
    #[serde(default = "default_strategy_timeout")]
    pub strategy_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: default_min_text_chars(),
            context_chars: default_context_chars(),
            max_concurrency: 0,
            strip_markup: true,
            strategies: default_strategies(),
            strategy_timeout_secs: default_strategy_timeout(),
        }
    }
}

fn default_min_text_chars() -> usize {
    20
}
fn default_context_chars() -> usize {
    500
}
fn default_true() -> bool {
    true
}
fn default_strategies() -> Vec<StrategyKind> {
    StrategyKind::ALL.to_vec()
}
fn default_strategy_timeout() -> u64 {
    60
}

/// `[ai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout.
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,

    /// Maximum in-flight requests.
    #[serde(default = "default_ai_concurrency")]
    pub max_concurrent_requests: usize,

    /// Minimum ms between the starts of two requests.
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,

    /// Places reported below this confidence are discarded.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    /// Retries after a transient failure (HTTP 429/5xx or network error).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Replies kept in the in-memory cache; least recently used go first.
    #[serde(default = "default_cache_entries")]
    pub cache_entries: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_ai_timeout(),
            max_concurrent_requests: default_ai_concurrency(),
            min_interval_ms: default_min_interval(),
            min_confidence: default_min_confidence(),
            max_retries: default_max_retries(),
            cache_entries: default_cache_entries(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_ai_timeout() -> u64 {
    30
}
fn default_ai_concurrency() -> usize {
    2
}
fn default_min_interval() -> u64 {
    1000
}
fn default_min_confidence() -> f32 {
    0.6
}
fn default_max_retries() -> u32 {
    2
}
fn default_cache_entries() -> usize {
    1024
}

/// `[tagger]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaggerConfig {
    /// TSV gazetteer (`surface<TAB>label`). Tagger is disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gazetteer_path: Option<String>,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Extra literal names matched as famous places.
    #[serde(default)]
    pub extra_famous_places: Vec<String>,

    /// User-defined lexical patterns.
    #[serde(default)]
    pub patterns: Vec<CustomPatternConfig>,
}

/// `[[catalog.patterns]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPatternConfig {
    /// Identifier reported in diagnostics.
    pub name: String,
    /// Regular expression (Rust `regex` syntax, no look-around).
    pub regex: String,
    #[serde(default = "default_custom_category")]
    pub category: Category,
    /// Defaults to the category's base confidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Defaults to the category's priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Reject matches touching an adjacent kanji on either side.
    #[serde(default)]
    pub guarded: bool,
}

fn default_custom_category() -> Category {
    Category::Custom
}

// ---------------------------------------------------------------------------
// Extraction options (runtime, merged from config + per-call overrides)
// ---------------------------------------------------------------------------

/// Per-call overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    /// Replaces `[extraction].strategies` when set.
    pub strategies: Option<Vec<StrategyKind>>,
    /// Completion-service credential; takes precedence over the env var.
    pub api_key: Option<String>,
}

/// Runtime extraction options.
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    pub min_text_chars: usize,
    pub context_chars: usize,
    /// Resolved worker count (never zero).
    pub concurrency: usize,
    pub strip_markup: bool,
    pub strategies: Vec<StrategyKind>,
    pub strategy_timeout: Duration,
}

impl ExtractionOptions {
    /// Apply per-call overrides.
    pub fn with_overrides(mut self, overrides: &RunOverrides) -> Self {
        if let Some(strategies) = &overrides.strategies {
            self.strategies = strategies.clone();
        }
        self
    }

    pub fn is_enabled(&self, kind: StrategyKind) -> bool {
        self.strategies.contains(&kind)
    }
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ExtractionOptions {
    fn from(config: &AppConfig) -> Self {
        let extraction = &config.extraction;
        let concurrency = match extraction.max_concurrency {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            n => n,
        };

        Self {
            min_text_chars: extraction.min_text_chars,
            context_chars: extraction.context_chars,
            concurrency,
            strip_markup: extraction.strip_markup,
            strategies: extraction.strategies.clone(),
            strategy_timeout: Duration::from_secs(extraction.strategy_timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.chimei/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ChimeiError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.chimei/chimei.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ChimeiError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ChimeiError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ChimeiError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| ChimeiError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ChimeiError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the completion-service key from the configured env var.
/// `None` when unset or empty; the AI strategy is then left out.
pub fn resolve_api_key(config: &AiConfig) -> Option<String> {
    match std::env::var(&config.api_key_env) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
