use serde::Deserialize;
use std::time::Duration;

use crate::llm_mapper::LlmSettings;

pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "google/gemini-2.0-flash-001";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Presence of this key enables the remote mapping layer.
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub llm_model: String,
    /// Sent as `HTTP-Referer` to the model provider.
    pub app_url: String,
    /// Sent as `X-Title` to the model provider.
    pub app_name: String,
    /// HTTP client timeout for a single model request.
    pub llm_timeout_secs: u64,
    /// Upper bound the mapping engine waits for the remote layer.
    pub mapping_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            openrouter_base_url: http_url_var("OPENROUTER_BASE_URL", DEFAULT_OPENROUTER_BASE_URL)?,
            llm_model: std::env::var("LLM_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            app_url: http_url_var("APP_URL", "http://localhost:3000")?,
            app_name: std::env::var("APP_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "IQLead".to_string()),
            llm_timeout_secs: secs_var("LLM_TIMEOUT_SECS", 10)?,
            mapping_timeout_secs: secs_var("MAPPING_TIMEOUT_SECS", 8)?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::debug!("Database URL: {}...", url_preview(&config.database_url));
        tracing::debug!("Server Port: {}", config.port);
        if config.openrouter_api_key.is_some() {
            tracing::info!(
                "LLM field mapping enabled: {} via {}",
                config.llm_model,
                config.openrouter_base_url
            );
        } else {
            tracing::warn!("OPENROUTER_API_KEY not set - LLM field mapping disabled");
        }

        Ok(config)
    }

    /// Remote model settings, or `None` when no credential is configured.
    pub fn llm_settings(&self) -> Option<LlmSettings> {
        let api_key = self.openrouter_api_key.clone()?;

        Some(LlmSettings {
            base_url: self.openrouter_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: self.llm_model.clone(),
            referer: self.app_url.clone(),
            title: self.app_name.clone(),
            timeout: Duration::from_secs(self.llm_timeout_secs),
        })
    }

    pub fn mapping_timeout(&self) -> Duration {
        Duration::from_secs(self.mapping_timeout_secs)
    }
}

/// First 20 characters of a URL, for logs.
fn url_preview(url: &str) -> String {
    url.chars().take(20).collect()
}

/// Optional http(s) URL variable with a default.
fn http_url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let value = std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string());
    validate_http_url(name, &value)?;
    Ok(value)
}

fn validate_http_url(name: &str, value: &str) -> anyhow::Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(())
}

fn secs_var(name: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(name) {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds", name))?;
            if secs == 0 {
                anyhow::bail!("{} must be greater than zero", name);
            }
            Ok(secs)
        }
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(api_key: Option<&str>) -> Config {
        Config {
            database_url: "postgresql://test".to_string(),
            port: 3000,
            openrouter_api_key: api_key.map(str::to_string),
            openrouter_base_url: "https://openrouter.ai/api/v1/".to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            app_url: "http://localhost:3000".to_string(),
            app_name: "IQLead".to_string(),
            llm_timeout_secs: 10,
            mapping_timeout_secs: 8,
        }
    }

    #[test]
    fn test_url_preview_respects_char_boundaries() {
        assert_eq!(url_preview("postgres://u:pässwörd@db/leads"), "postgres://u:pässwör");
        assert_eq!(url_preview("postgres://x"), "postgres://x");
    }

    #[test]
    fn test_llm_settings_require_key() {
        assert!(test_config(None).llm_settings().is_none());

        let settings = test_config(Some("sk-test")).llm_settings().unwrap();
        assert_eq!(settings.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("X", "https://openrouter.ai/api/v1").is_ok());
        assert!(validate_http_url("X", "ftp://example.com").is_err());
        assert!(validate_http_url("X", "not a url").is_err());
    }
}
