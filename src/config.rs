//! Process configuration, read once at startup.

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const DEFAULT_TICKET_TAGS: &[&str] = &["voice-call", "automated"];
pub const MAX_SUBJECT_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;
pub const PHONE_NUMBER_MIN_LENGTH: usize = 7;
pub const PHONE_NUMBER_MAX_LENGTH: usize = 15;
pub const MAX_TAG_LENGTH: usize = 50;

#[derive(Debug, Clone)]
pub struct Config {
    /// development | staging | production
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Reported by the health check
    pub service_name: String,
    pub zendesk_domain: String,
    pub zendesk_email: String,
    pub zendesk_api_token: String,
    /// Defaults to `https://{zendesk_domain}/api/v2`
    pub zendesk_base_url: String,
    pub zendesk_request_timeout: Duration,
    /// Postgres URL for the idempotency store; in-memory store when unset
    pub database_url: Option<String>,
    pub call_processing_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let development = environment == "development";
        // Outside development a secret must be present and non-empty.
        let secret = |name: &str| -> Result<String, BoxError> {
            match var(name).filter(|v| !v.is_empty()) {
                Some(v) => Ok(v),
                None if development => Ok(format!("dev-{name}-not-for-production")),
                None => Err(format!("{name} is missing or empty ({environment})").into()),
            }
        };
        let number = |name: &str, default: u64| -> u64 {
            var(name)
                .and_then(|v| v.trim().parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };

        let zendesk_domain = secret("ZENDESK_DOMAIN")?;
        let zendesk_email = secret("ZENDESK_EMAIL")?;
        let zendesk_api_token = secret("ZENDESK_API_TOKEN")?;
        let zendesk_base_url = var("ZENDESK_BASE_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("https://{zendesk_domain}/api/v2"));
        let default_level = if development { "debug" } else { "info" };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: u16::try_from(number("PORT", 5000)).unwrap_or(5000),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| default_level.into()),
            service_name: var("SERVICE_NAME").unwrap_or_else(|| "zendesk-voice-server".into()),
            zendesk_domain,
            zendesk_email,
            zendesk_api_token,
            zendesk_base_url,
            zendesk_request_timeout: Duration::from_secs(number(
                "ZENDESK_REQUEST_TIMEOUT_SECS",
                30,
            )),
            database_url: var("DATABASE_URL").filter(|s| !s.is_empty()),
            call_processing_enabled: var("CALL_PROCESSING_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            environment,
        })
    }

    pub fn default_tags(&self) -> Vec<String> {
        DEFAULT_TICKET_TAGS.iter().map(|t| t.to_string()).collect()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
impl Config {
    /// Configuration pointing at a local helpdesk stand-in.
    pub fn for_tests(zendesk_base_url: &str) -> Self {
        Self {
            environment: "testing".into(),
            host: "127.0.0.1".into(),
            port: 0,
            log_level: "debug".into(),
            service_name: "zendesk-voice-server".into(),
            zendesk_domain: "test.zendesk.com".into(),
            zendesk_email: "test@example.com".into(),
            zendesk_api_token: "test-token".into(),
            zendesk_base_url: zendesk_base_url.into(),
            zendesk_request_timeout: Duration::from_secs(5),
            database_url: None,
            call_processing_enabled: true,
        }
    }
}
