// src/config/mod.rs
// Environment-based configuration, loaded once at startup

use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_WEBHOOK_PATH: &str = "/api/github/webhooks";
pub const DEFAULT_REQUIRED_LABEL: &str = "Help Wanted";
pub const DEFAULT_EDIT_MARKER: &str = "Edited by **proposal-police**";

/// Upper bounds for the poll settings; larger values are clamped
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(3600);
pub const MAX_POLL_TIMEOUT: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone)]
pub struct PoliceConfig {
    // ── Assistant
    pub openai_api_key: Option<String>,
    pub openai_assistant_id: Option<String>,
    pub openai_base_url: String,

    // ── GitHub
    pub github_api_url: String,
    pub github_token: Option<String>,
    pub app_id: Option<u64>,
    pub private_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub webhook_path: String,

    // ── Server
    pub host: String,
    pub port: u16,

    // ── Comment handling
    pub label_gate: bool,
    pub required_label: String,
    pub ignore_bots: bool,
    pub edit_marker: String,
    pub edit_notice_prefix: Option<String>,

    // ── Polling
    pub poll_interval: Duration,
    pub poll_backoff: f64,
    pub poll_max_interval: Duration,
    pub poll_max_ticks: u32,
    pub poll_timeout: Duration,
    pub poll_jitter: f64,

    // ── Shutdown
    pub shutdown_grace: Duration,
}

/// Parse `key` from `lookup`, falling back to `default` when missing or malformed.
/// Trailing `# comments` and surrounding whitespace are stripped first.
fn env_var_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => {
                    debug!(key, value = clean_val, "Config value from environment");
                    parsed
                }
                Err(_) => {
                    warn!(key, value = %val, "Config value failed to parse, using default");
                    default
                }
            }
        }
        None => default,
    }
}

/// Read an optional string, filtering empty values
fn read_opt<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PoliceConfig {
    /// Load configuration from the process environment. `.env` is loaded by the binary first.
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|key| std::env::var(key).ok());
        config.log_status();
        config
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let private_key = read_opt(&lookup, "PRIVATE_KEY")
            .map(|k| k.replace("\\n", "\n"))
            .or_else(|| {
                let path = read_opt(&lookup, "PRIVATE_KEY_PATH")?;
                match std::fs::read_to_string(&path) {
                    Ok(pem) => Some(pem),
                    Err(e) => {
                        warn!(path = %path, error = %e, "Failed to read PRIVATE_KEY_PATH");
                        None
                    }
                }
            });

        let app_id = read_opt(&lookup, "APP_ID").and_then(|id| match id.parse::<u64>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(value = %id, "APP_ID is not a number, ignoring");
                None
            }
        });

        Self {
            openai_api_key: read_opt(&lookup, "OPENAI_API_KEY"),
            openai_assistant_id: read_opt(&lookup, "OPENAI_ASSISTANT_ID"),
            openai_base_url: env_var_or(&lookup, "OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL.to_string()),

            github_api_url: env_var_or(&lookup, "GITHUB_API_URL", DEFAULT_GITHUB_API_URL.to_string()),
            github_token: read_opt(&lookup, "GITHUB_TOKEN"),
            app_id,
            private_key,
            webhook_secret: read_opt(&lookup, "WEBHOOK_SECRET"),
            webhook_path: env_var_or(&lookup, "WEBHOOK_PATH", DEFAULT_WEBHOOK_PATH.to_string()),

            host: env_var_or(&lookup, "HOST", "0.0.0.0".to_string()),
            port: env_var_or(&lookup, "PORT", 3000),

            label_gate: env_var_or(&lookup, "PP_LABEL_GATE", false),
            required_label: env_var_or(&lookup, "PP_REQUIRED_LABEL", DEFAULT_REQUIRED_LABEL.to_string()),
            ignore_bots: env_var_or(&lookup, "PP_IGNORE_BOTS", true),
            edit_marker: read_opt(&lookup, "PP_EDIT_MARKER").unwrap_or_else(|| DEFAULT_EDIT_MARKER.to_string()),
            edit_notice_prefix: read_opt(&lookup, "PP_EDIT_NOTICE_PREFIX"),

            poll_interval: Duration::from_millis(env_var_or(&lookup, "PP_POLL_INTERVAL_MS", 1500)).min(MAX_POLL_INTERVAL),
            poll_backoff: env_var_or(&lookup, "PP_POLL_BACKOFF", 1.5),
            poll_max_interval: Duration::from_millis(env_var_or(&lookup, "PP_POLL_MAX_INTERVAL_MS", 10_000))
                .min(MAX_POLL_INTERVAL),
            poll_max_ticks: env_var_or(&lookup, "PP_POLL_MAX_TICKS", 60),
            poll_timeout: Duration::from_secs(env_var_or(&lookup, "PP_POLL_TIMEOUT_SECS", 300)).min(MAX_POLL_TIMEOUT),
            poll_jitter: env_var_or(&lookup, "PP_POLL_JITTER", 0.1),

            shutdown_grace: Duration::from_secs(env_var_or(&lookup, "PP_SHUTDOWN_GRACE_SECS", 30)),
        }
    }

    /// Assistant id, or `ConfigMissing` when it is not set
    pub fn assistant_id(&self) -> crate::error::Result<&str> {
        self.openai_assistant_id
            .as_deref()
            .ok_or(crate::error::PoliceError::ConfigMissing("OPENAI_ASSISTANT_ID"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Log what is configured (without exposing secrets)
    fn log_status(&self) {
        if self.openai_assistant_id.is_none() {
            warn!("OPENAI_ASSISTANT_ID missing - every comment event will be skipped");
        }
        if self.openai_api_key.is_none() {
            warn!("OPENAI_API_KEY missing - assistant calls will be rejected");
        }
        if self.webhook_secret.is_none() {
            warn!("WEBHOOK_SECRET missing - webhook signatures will not be verified");
        }
        if self.github_token.is_none() && (self.app_id.is_none() || self.private_key.is_none()) {
            warn!("No GitHub credentials (GITHUB_TOKEN or APP_ID + PRIVATE_KEY) configured");
        }
        info!("{}", self.summary());
    }

    /// Get a human-readable summary of the configuration
    pub fn summary(&self) -> String {
        format!(
            "Config:\n\
            - Assistant: {}\n\
            - GitHub auth: {}\n\
            - Label gate: {} ({})\n\
            - Poll: every {} ms, x{} backoff, max {} ticks / {} secs",
            if self.openai_assistant_id.is_some() { "configured" } else { "MISSING" },
            if self.github_token.is_some() {
                "token"
            } else if self.app_id.is_some() {
                "app"
            } else {
                "none"
            },
            if self.label_gate { "ON" } else { "OFF" },
            self.required_label,
            self.poll_interval.as_millis(),
            self.poll_backoff,
            self.poll_max_ticks,
            self.poll_timeout.as_secs(),
        )
    }
}

impl Default for PoliceConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> PoliceConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PoliceConfig::from_lookup(move |key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = PoliceConfig::default();
        assert!(config.openai_assistant_id.is_none());
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.webhook_path, "/api/github/webhooks");
        assert_eq!(config.port, 3000);
        assert!(!config.label_gate);
        assert_eq!(config.required_label, "Help Wanted");
        assert_eq!(config.edit_marker, "Edited by **proposal-police**");
        assert_eq!(config.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.poll_max_ticks, 60);
        assert_eq!(config.shutdown_grace, Duration::from_secs(30));
    }

    #[test]
    fn test_values_parsed_with_comments_stripped() {
        let config = config_from(&[
            ("PORT", "8080 # local"),
            ("PP_LABEL_GATE", "true"),
            ("PP_POLL_INTERVAL_MS", "250"),
            ("OPENAI_ASSISTANT_ID", "asst_123"),
        ]);
        assert_eq!(config.port, 8080);
        assert!(config.label_gate);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.assistant_id().unwrap(), "asst_123");
    }

    #[test]
    fn test_malformed_value_falls_back() {
        let config = config_from(&[("PORT", "not-a-port"), ("PP_POLL_BACKOFF", "fast")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.poll_backoff, 1.5);
    }

    #[test]
    fn test_poll_limits_are_clamped() {
        let config = config_from(&[
            ("PP_POLL_INTERVAL_MS", "18446744073709551615"),
            ("PP_POLL_MAX_INTERVAL_MS", "18446744073709551615"),
            ("PP_POLL_TIMEOUT_SECS", "18446744073709551615"),
        ]);
        assert_eq!(config.poll_interval, MAX_POLL_INTERVAL);
        assert_eq!(config.poll_max_interval, MAX_POLL_INTERVAL);
        assert_eq!(config.poll_timeout, MAX_POLL_TIMEOUT);
    }

    #[test]
    fn test_missing_assistant_id_is_config_missing() {
        let config = config_from(&[("OPENAI_ASSISTANT_ID", "   ")]);
        let err = config.assistant_id().unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_private_key_newlines_unescaped() {
        let config = config_from(&[("APP_ID", "1234"), ("PRIVATE_KEY", "-----BEGIN-----\\nabc\\n-----END-----")]);
        assert_eq!(config.app_id, Some(1234));
        assert_eq!(
            config.private_key.as_deref(),
            Some("-----BEGIN-----\nabc\n-----END-----")
        );
    }
}
