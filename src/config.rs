use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::chunk::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_chunk_size")]
    pub document_chunk_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            document_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

fn default_token_env() -> String {
    "API_TOKEN".to_string()
}

impl AuthConfig {
    /// Read the bearer token from the environment. Called once at startup.
    pub fn read_token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.is_empty())
    }
}

impl Config {
    /// Defaults used when no config file is given.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:8000".to_string(),
                log_level: default_log_level(),
            },
            ingest: IngestConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.ingest.document_chunk_size == 0 {
        anyhow::bail!("ingest.document_chunk_size must be > 0");
    }

    if config.auth.token_env.trim().is_empty() {
        anyhow::bail!("auth.token_env must not be empty");
    }

    Ok(())
}
