//! Configuration types.
//!
//! Everything is read from environment variables; unset or unparsable values
//! fall back to the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Message shown as the first transcript entry of every conversation.
pub const GREETING: &str = "Hi! I'll help you estimate your car's price. Let's start! 🚗";

/// Message appended when the valuation request fails.
pub const FAILURE_MESSAGE: &str = "Error occurred. Please try again.";

/// Conversation pacing delays.
///
/// These only shape how the transcript reads; the state machine is correct
/// with every delay set to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Delay before a question prompt is posted.
    pub prompt_delay: Duration,
    /// Delay between accepting an answer and moving to the next question.
    pub advance_delay: Duration,
    /// Delay between a successful valuation and posting the result.
    pub result_delay: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            prompt_delay: Duration::from_millis(500),
            advance_delay: Duration::from_millis(600),
            result_delay: Duration::from_millis(1000),
        }
    }
}

impl PacingConfig {
    /// No pacing at all.
    pub fn instant() -> Self {
        Self {
            prompt_delay: Duration::ZERO,
            advance_delay: Duration::ZERO,
            result_delay: Duration::ZERO,
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            prompt_delay: env_millis("CAR_PRICE_PROMPT_DELAY_MS").unwrap_or(defaults.prompt_delay),
            advance_delay: env_millis("CAR_PRICE_ADVANCE_DELAY_MS")
                .unwrap_or(defaults.advance_delay),
            result_delay: env_millis("CAR_PRICE_RESULT_DELAY_MS").unwrap_or(defaults.result_delay),
        }
    }
}

/// Where and how to reach the valuation service.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL, without a trailing slash (e.g. `http://localhost:8000`).
    pub base_url: String,
    /// Client-side request timeout. `None` waits for the service indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: None,
        }
    }
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "CAR_PRICE_API_URL".into(),
                message: format!("expected an http(s) URL, got {base_url:?}"),
            });
        }
        Ok(Self {
            base_url,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("CAR_PRICE_API_URL") {
            Ok(url) => Self::new(url)?,
            Err(_) => Self::default(),
        };
        if let Some(secs) = std::env::var("CAR_PRICE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Full URL for an endpoint path such as `/predict`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Settings for the binary's hosts.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Port for `serve` mode.
    pub port: u16,
    /// Directory for CLI-mode log files.
    pub log_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_dir: PathBuf::from("./logs"),
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("CAR_PRICE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            log_dir: std::env::var("CAR_PRICE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_pacing_is_all_zero() {
        let pacing = PacingConfig::instant();
        assert_eq!(pacing.prompt_delay, Duration::ZERO);
        assert_eq!(pacing.advance_delay, Duration::ZERO);
        assert_eq!(pacing.result_delay, Duration::ZERO);
    }

    #[test]
    fn default_pacing_matches_conversation_beats() {
        let pacing = PacingConfig::default();
        assert_eq!(pacing.prompt_delay, Duration::from_millis(500));
        assert_eq!(pacing.advance_delay, Duration::from_millis(600));
        assert_eq!(pacing.result_delay, Duration::from_millis(1000));
    }

    #[test]
    fn gateway_config_strips_trailing_slash() {
        let config = GatewayConfig::new("http://valuation.local:9000/").unwrap();
        assert_eq!(config.base_url, "http://valuation.local:9000");
        assert_eq!(
            config.endpoint("/predict"),
            "http://valuation.local:9000/predict"
        );
        assert!(config.timeout.is_none());
    }

    #[test]
    fn gateway_config_rejects_non_http_url() {
        let err = GatewayConfig::new("ftp://example.com").unwrap_err();
        assert!(err.to_string().contains("CAR_PRICE_API_URL"));
    }

    #[test]
    fn gateway_config_with_timeout() {
        let config = GatewayConfig::default().with_timeout(Duration::from_secs(3));
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
    }
}
