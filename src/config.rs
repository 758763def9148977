use anyhow::{bail, Result};
use serde::Deserialize;
use std::{env, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Postgres,
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(LedgerBackend::Postgres),
            "memory" => Ok(LedgerBackend::Memory),
            other => bail!("Unsupported ledger backend: {}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub ledger_backend: LedgerBackend,
    pub host: String,
    pub port: u16,
    pub free_tier_daily_limit: i32,
    pub token_reservation: i64,
    pub cors_allowed_origins: Vec<String>,
    pub ai: AiProviderConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so parsing can be tested without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            database_url: var("DATABASE_URL", "postgresql://localhost/masterpiece"),
            database_max_connections: var("DATABASE_MAX_CONNECTIONS", "20").parse()?,
            ledger_backend: var("LEDGER_BACKEND", "postgres").parse()?,
            host: var("HOST", "0.0.0.0"),
            port: var("PORT", "3000").parse()?,
            free_tier_daily_limit: var("FREE_TIER_DAILY_LIMIT", "10").parse()?,
            token_reservation: var("AI_TOKEN_RESERVATION", "2000").parse()?,
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS", "")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            ai: AiProviderConfig {
                api_key: var("ANTHROPIC_API_KEY", ""),
                base_url: var("ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
                model: var("AI_MODEL", "claude-3-5-sonnet-latest"),
                max_tokens: var("AI_MAX_TOKENS", "1024").parse()?,
                request_timeout_secs: var("AI_REQUEST_TIMEOUT_SECS", "60").parse()?,
            },
        };

        if config.free_tier_daily_limit <= 0 {
            bail!("FREE_TIER_DAILY_LIMIT must be positive");
        }
        if config.token_reservation <= 0 {
            bail!("AI_TOKEN_RESERVATION must be positive");
        }

        Ok(config)
    }
}
