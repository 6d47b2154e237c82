use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::llm_client::DEFAULT_API_BASE;
use crate::opinions::generation::DEFAULT_TIMEOUT;

const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:80"];

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub cors_origins: Vec<String>,
    pub generation_timeout: Duration,
    pub prompt_path: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let gemini_api_key = require_env("GEMINI_API_KEY")?;
        if gemini_api_key.trim().is_empty() {
            bail!("GEMINI_API_KEY is set but empty. Put a valid key in .env");
        }

        Ok(Config {
            gemini_api_key: gemini_api_key.trim().to_string(),
            gemini_api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            cors_origins: parse_origins(std::env::var("CORS_ORIGINS").ok().as_deref()),
            generation_timeout: parse_timeout(
                std::env::var("GENERATION_TIMEOUT_SECS").ok().as_deref(),
            )?,
            prompt_path: std::env::var("OPINION_PROMPT_PATH").ok().map(PathBuf::from),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_timeout(raw: Option<&str>) -> Result<Duration> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DEFAULT_TIMEOUT),
        Some(secs) => Ok(Duration::from_secs(
            secs.parse::<u64>()
                .context("GENERATION_TIMEOUT_SECS must be a whole number of seconds")?,
        )),
    }
}

/// Splits a comma-separated origin list. Falls back to the local dev origins when empty.
fn parse_origins(raw: Option<&str>) -> Vec<String> {
    let origins: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        if raw.is_some() {
            warn!("CORS_ORIGINS is empty, using defaults");
        }
        return DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect();
    }
    origins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_splits_and_trims() {
        let origins = parse_origins(Some("https://a.example, https://b.example ,"));
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_parse_timeout_defaults_to_generation_timeout() {
        assert_eq!(parse_timeout(None).unwrap(), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some(" ")).unwrap(), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("15")).unwrap(), Duration::from_secs(15));
        assert!(parse_timeout(Some("soon")).is_err());
    }

    #[test]
    fn test_parse_origins_defaults_when_missing_or_blank() {
        assert_eq!(parse_origins(None).len(), 2);
        assert_eq!(parse_origins(Some(" , ")), parse_origins(None));
    }
}
