//! Application configuration for SiteChat.
//!
//! User config lives at `~/.sitechat/sitechat.toml`.
//! CLI flags override environment variables, which override config file
//! values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SiteChatError};
use crate::types::GenerationParams;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitechat.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitechat";

/// Environment variables consulted by [`AppConfig::apply_overrides`].
pub const ENV_CATALOG_URL: &str = "SITECHAT_CATALOG_URL";
pub const ENV_GENERATION_ENDPOINT: &str = "SITECHAT_GENERATION_ENDPOINT";
pub const ENV_HOST: &str = "SITECHAT_HOST";
pub const ENV_PORT: &str = "SITECHAT_PORT";

// ---------------------------------------------------------------------------
// Config structs (matching sitechat.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Page catalog service.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Page fetching limits.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Text-generation endpoint and fixed parameters.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Assistant identity used in the prompt's closing instruction.
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Canned responses, checked in order before any network call.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<KeywordEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            catalog: CatalogConfig::default(),
            fetch: FetchConfig::default(),
            generation: GenerationConfig::default(),
            persona: PersonaConfig::default(),
            keywords: default_keywords(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    /// Surface raw upstream error text to clients. When false, clients get a
    /// generic message per error kind and the cause only goes to the log.
    #[serde(default = "default_true")]
    pub expose_upstream_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allowed_origins: Vec::new(),
            expose_upstream_errors: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}
fn default_true() -> bool {
    true
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Endpoint returning a JSON object of page name → URL.
    #[serde(default)]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_catalog_timeout(),
        }
    }
}

fn default_catalog_timeout() -> u64 {
    10
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-page request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Maximum pages fetched at once. 1 fetches strictly in catalog order.
    #[serde(default = "default_fetch_concurrency")]
    pub concurrency: usize,

    /// Pages larger than this are rejected.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,

    /// Fail a page that answers with a non-success status instead of
    /// extracting whatever body it returned.
    #[serde(default)]
    pub reject_error_status: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            concurrency: default_fetch_concurrency(),
            max_response_bytes: default_max_response_bytes(),
            reject_error_status: false,
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}
fn default_fetch_concurrency() -> usize {
    1
}
fn default_max_response_bytes() -> u64 {
    10 * 1024 * 1024
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Text-generation inference endpoint.
    #[serde(default)]
    pub endpoint: String,

    /// Name of the env var holding the API token (never store the token itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Maximum output length in tokens.
    #[serde(default = "default_max_length")]
    pub max_length: u32,

    /// Repetition-avoidance window (n-gram size).
    #[serde(default = "default_no_repeat_ngram_size")]
    pub no_repeat_ngram_size: u32,

    /// Padding token id; normally the model's end-of-sequence token.
    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_generation_timeout(),
            max_length: default_max_length(),
            no_repeat_ngram_size: default_no_repeat_ngram_size(),
            pad_token_id: default_pad_token_id(),
        }
    }
}

fn default_api_key_env() -> String {
    "SITECHAT_GENERATION_API_KEY".into()
}
fn default_generation_timeout() -> u64 {
    60
}
fn default_max_length() -> u32 {
    150
}
fn default_no_repeat_ngram_size() -> u32 {
    2
}
fn default_pad_token_id() -> Option<u32> {
    Some(50256)
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_length: config.max_length,
            num_return_sequences: 1,
            no_repeat_ngram_size: config.no_repeat_ngram_size,
            pad_token_id: config.pad_token_id,
        }
    }
}

/// `[persona]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Who the assistant speaks as, e.g. "a knowledgeable support assistant".
    #[serde(default = "default_role")]
    pub role: String,

    /// The business or site the assistant represents.
    #[serde(default = "default_organization")]
    pub organization: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            organization: default_organization(),
        }
    }
}

fn default_role() -> String {
    "a knowledgeable support assistant".into()
}
fn default_organization() -> String {
    "this website".into()
}

/// `[[keywords]]` entry: a phrase and its canned response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    /// Matched as a case-insensitive substring of the user message.
    pub phrase: String,
    /// Returned verbatim on match.
    pub response: String,
}

fn default_keywords() -> Vec<KeywordEntry> {
    [
        ("hi", "Hello! How can I assist you today?"),
        ("hello", "Hi there! How can I help you?"),
        ("hey", "Hey! What can I do for you?"),
    ]
    .into_iter()
    .map(|(phrase, response)| KeywordEntry {
        phrase: phrase.into(),
        response: response.into(),
    })
    .collect()
}

// ---------------------------------------------------------------------------
// Overrides and validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get(ENV_CATALOG_URL) {
            self.catalog.url = url;
        }
        if let Some(endpoint) = get(ENV_GENERATION_ENDPOINT) {
            self.generation.endpoint = endpoint;
        }
        if let Some(host) = get(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.port = port
                .parse()
                .map_err(|e| SiteChatError::config(format!("{ENV_PORT}={port}: {e}")))?;
        }
        Ok(())
    }

    /// Check everything the chat and feedback paths need at runtime.
    pub fn validate_for_serving(&self) -> Result<()> {
        require_http_url("catalog.url", &self.catalog.url)?;
        self.validate_for_feedback()?;

        if self.fetch.concurrency == 0 {
            return Err(SiteChatError::config("fetch.concurrency must be at least 1"));
        }
        if let Some(entry) = self.keywords.iter().find(|k| k.phrase.trim().is_empty()) {
            return Err(SiteChatError::config(format!(
                "keyword phrase must not be empty (response: {:?})",
                entry.response
            )));
        }
        Ok(())
    }

    /// The subset of [`validate_for_serving`](Self::validate_for_serving)
    /// the feedback path needs: it only talks to the generation endpoint.
    pub fn validate_for_feedback(&self) -> Result<()> {
        require_http_url("generation.endpoint", &self.generation.endpoint)?;

        if self.generation.max_length == 0 {
            return Err(SiteChatError::config("generation.max_length must be at least 1"));
        }
        Ok(())
    }

    /// Read the generation API token from the configured env var, if set.
    pub fn generation_api_key(&self) -> Option<String> {
        std::env::var(&self.generation.api_key_env)
            .ok()
            .filter(|v| !v.is_empty())
    }
}

fn require_http_url(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SiteChatError::config(format!(
            "{field} is not set. Add it to {CONFIG_FILE_NAME} or set the matching SITECHAT_* variable."
        )));
    }
    let url = Url::parse(value)
        .map_err(|e| SiteChatError::config(format!("{field} is not a valid URL ({value}): {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(SiteChatError::config(format!(
            "{field} must be http or https, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitechat/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SiteChatError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitechat/sitechat.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config and apply environment overrides.
///
/// An explicit `path` must exist. Without one, the default location is used
/// and a missing file means defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(p) => load_config_from(p)?,
        None => {
            let default_path = config_file_path()?;
            if default_path.exists() {
                load_config_from(&default_path)?
            } else {
                tracing::debug!(path = ?default_path, "config file not found, using defaults");
                AppConfig::default()
            }
        }
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteChatError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SiteChatError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SiteChatError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SiteChatError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteChatError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
