//! Configuration loading
//!
//! Layers, lowest precedence first:
//! 1. the reference deployment embedded from `config/audit.toml`
//! 2. an optional user TOML file
//! 3. `AUDITOR_*` environment variables, nested with `__`
//!    (e.g. `AUDITOR_MATCHER__MIN_SIMILARITY=0.7`)

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use std::path::Path;
use tracing::{debug, info};

use crate::domain::audit_config::AuditConfig;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider};

/// Reference deployment shipped with the binary
pub const DEFAULT_CONFIG: &str = include_str!("../../../config/audit.toml");

const ENV_PREFIX: &str = "AUDITOR_";

pub struct ConfigService {
    figment: Figment,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            figment: Figment::new()
                .merge(Toml::string(DEFAULT_CONFIG))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        }
    }

    /// Layer a user file between the embedded defaults and the environment
    pub fn with_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AppError::NotFound(format!(
                "Configuration file {} does not exist",
                path.display()
            )));
        }

        debug!(path = %path.display(), "Layering configuration file");
        Ok(Self {
            figment: Figment::new()
                .merge(Toml::string(DEFAULT_CONFIG))
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        })
    }

    /// Extract and validate the audit configuration
    pub fn load(&self) -> Result<AuditConfig> {
        let config: AuditConfig = self.figment.extract()?;
        config.validate()?;

        info!(
            units = config.unit_codes.len(),
            categories = config.categories.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// API key for a provider, read from the environment (after `.env` loading)
    pub fn get_api_key(&self, provider: LLMProvider) -> Option<String> {
        let var = match provider {
            LLMProvider::Google => "GEMINI_API_KEY",
            LLMProvider::OpenAI => "OPENAI_API_KEY",
        };
        std::env::var(var)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// Connection settings for a provider, failing when no key is configured
    pub fn llm_config(&self, provider: LLMProvider) -> Result<LLMConfig> {
        let api_key = self.get_api_key(provider).ok_or_else(|| {
            AppError::ConfigError(format!("No API key configured for {:?}", provider))
        })?;

        Ok(match provider {
            LLMProvider::Google => LLMConfig::gemini(Some(api_key)),
            LLMProvider::OpenAI => LLMConfig::openai(Some(api_key)),
        })
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
