// rzpchat-core/src/config.rs

//! Configuration structures and parsing for the assistant.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::errors::DispatchError;

pub const CONFIG_FILENAME: &str = "Rzpchat.toml";
pub const DEFAULT_MCP_ENDPOINT: &str = "https://mcp.razorpay.com/mcp";
pub const DEFAULT_MCP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DOCS_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AssistConfig {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub docs: DocsConfig,
}

/// Where the Razorpay key pair comes from. Inline values win over env vars.
#[derive(Deserialize, Debug, Clone)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub key_secret: Option<String>,
    #[serde(default = "default_key_id_env_var")]
    pub key_id_env_var: String,
    #[serde(default = "default_key_secret_env_var")]
    pub key_secret_env_var: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct McpConfig {
    #[serde(default = "default_mcp_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_mcp_timeout")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DocsConfig {
    /// Documentation-search endpoint. Docs search is disabled when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_docs_timeout")]
    pub timeout_secs: u64,
    /// Number of prior question/answer pairs sent along. Zero sends none.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_key_id_env_var() -> String {
    "RAZORPAY_KEY_ID".to_string()
}
fn default_key_secret_env_var() -> String {
    "RAZORPAY_KEY_SECRET".to_string()
}
fn default_mcp_endpoint() -> String {
    DEFAULT_MCP_ENDPOINT.to_string()
}
fn default_mcp_timeout() -> u64 {
    DEFAULT_MCP_TIMEOUT_SECS
}
fn default_docs_timeout() -> u64 {
    DEFAULT_DOCS_TIMEOUT_SECS
}
fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            key_id: None,
            key_secret: None,
            key_id_env_var: default_key_id_env_var(),
            key_secret_env_var: default_key_secret_env_var(),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            endpoint: default_mcp_endpoint(),
            timeout_secs: default_mcp_timeout(),
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_docs_timeout(),
            history_window: default_history_window(),
        }
    }
}

impl McpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DocsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AssistConfig {
    pub fn from_toml_str(config_toml_content: &str) -> Result<AssistConfig> {
        let config: AssistConfig = match toml::from_str(config_toml_content) {
            Ok(cfg) => cfg,
            Err(e) => {
                // Content is not logged: it may hold inline secrets.
                tracing::error!(error = %e, "Failed to parse TOML content");
                return Err(anyhow!(e))
                    .context("Failed to parse configuration TOML content. Check TOML syntax.");
            }
        };
        config.validate()?;
        tracing::info!("Successfully parsed and validated assistant configuration.");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<AssistConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        AssistConfig::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {:?}", path))
    }

    fn validate(&self) -> Result<()> {
        if self.mcp.endpoint.trim().is_empty() {
            return Err(anyhow!("'mcp.endpoint' is empty."));
        }
        Url::parse(&self.mcp.endpoint).with_context(|| {
            format!("Invalid URL format for 'mcp.endpoint' ('{}').", self.mcp.endpoint)
        })?;
        if self.mcp.timeout_secs == 0 {
            return Err(anyhow!("'mcp.timeout_secs' must be greater than zero."));
        }

        if let Some(endpoint) = &self.docs.endpoint {
            if endpoint.trim().is_empty() {
                return Err(anyhow!("'docs.endpoint' is set but empty."));
            }
            Url::parse(endpoint).with_context(|| {
                format!("Invalid URL format for 'docs.endpoint' ('{}').", endpoint)
            })?;
        }
        if self.docs.timeout_secs == 0 {
            return Err(anyhow!("'docs.timeout_secs' must be greater than zero."));
        }

        let creds = &self.credentials;
        if creds.key_id.is_none() && creds.key_id_env_var.trim().is_empty() {
            return Err(anyhow!(
                "Set either 'credentials.key_id' or 'credentials.key_id_env_var'."
            ));
        }
        if creds.key_secret.is_none() && creds.key_secret_env_var.trim().is_empty() {
            return Err(anyhow!(
                "Set either 'credentials.key_secret' or 'credentials.key_secret_env_var'."
            ));
        }
        Ok(())
    }
}

/// Walks up from `start` looking for [`CONFIG_FILENAME`].
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}

/// A resolved Razorpay key pair. Lives only for the request it authorizes.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub key_id: String,
    pub key_secret: String,
}

impl Credentials {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }

    pub fn basic_token(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.key_id, self.key_secret))
    }

    pub fn authorization_header(&self) -> String {
        format!("Basic {}", self.basic_token())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials at request time.
pub trait CredentialSource: Send + Sync {
    fn credentials(&self) -> Result<Credentials, DispatchError>;
}

impl CredentialSource for Credentials {
    fn credentials(&self) -> Result<Credentials, DispatchError> {
        Ok(self.clone())
    }
}

impl CredentialSource for CredentialsConfig {
    fn credentials(&self) -> Result<Credentials, DispatchError> {
        let key_id = resolve_value(&self.key_id, &self.key_id_env_var, "key_id")?;
        let key_secret = resolve_value(&self.key_secret, &self.key_secret_env_var, "key_secret")?;
        Ok(Credentials { key_id, key_secret })
    }
}

fn resolve_value(
    inline: &Option<String>,
    env_var: &str,
    field: &str,
) -> Result<String, DispatchError> {
    if let Some(value) = inline.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(value.to_string());
    }
    match env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(DispatchError::config(format!(
            "Razorpay {} not configured: set '{}' in the environment or 'credentials.{}' in {}",
            field, env_var, field, CONFIG_FILENAME
        ))),
    }
}
