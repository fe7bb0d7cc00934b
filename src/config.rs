//! Environment-driven configuration.
//!
//! Settings come from the process environment (with `.env` support via
//! dotenvy in main) and are grouped per concern so each component receives
//! only the block it cares about.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a competitive programming coach. Review the \
     student's in-progress code and reasoning against the problem statement and respond with \
     structured, actionable feedback.";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub fetcher: FetcherConfig,
    pub llm: LlmConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: usize,
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Base URL of the browserless/chrome sidecar.
    pub base_url: String,
    pub token: SecretString,
    /// Overall deadline for one fetch including all retries.
    pub deadline: Duration,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    pub system_prompt: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Minimum gap between model consultations for one problem.
    pub feedback_window: Duration,
    /// Pause after a transient socket read error.
    pub read_retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            feedback_window: Duration::from_secs(60),
            read_retry_delay: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Assemble the full configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig {
                host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or("PORT", 12345)?,
            },
            database: DatabaseConfig {
                url: require("DATABASE_URL")?,
                pool_size: parse_or("DATABASE_POOL_SIZE", 8)?,
            },
            fetcher: FetcherConfig {
                base_url: require("FETCHER_ENDPOINT")?,
                token: require("FETCHER_TOKEN")?.into(),
                deadline: Duration::from_secs(parse_or("FETCHER_DEADLINE_SECS", 120)?),
            },
            llm: LlmConfig {
                base_url: optional("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com".to_string()),
                api_key: require("OPENAI_API_KEY")?.into(),
                model: optional("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                system_prompt: optional("OPENAI_SYSTEM_PROMPT")
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
                request_timeout: Duration::from_secs(parse_or("OPENAI_TIMEOUT_SECS", 60)?),
            },
            session: SessionConfig {
                feedback_window: Duration::from_secs(parse_or("FEEDBACK_WINDOW_SECS", 60)?),
                ..SessionConfig::default()
            },
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar { name })
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match optional(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        let session = SessionConfig::default();
        assert_eq!(session.feedback_window, Duration::from_secs(60));
        assert_eq!(session.read_retry_delay, Duration::from_secs(1));
    }
}
