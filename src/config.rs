//! Executor configuration.
//!
//! All settings can be overridden via GO_FAULT_* environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Default agent host when an experiment does not name one.
pub const DEFAULT_AGENT_HOST: &str = "localhost";
/// Default agent port when an experiment does not name one.
pub const DEFAULT_AGENT_PORT: &str = "9526";

/// Configuration for the dispatcher and the action catalog.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Agent host used when the `host` flag is absent or empty.
    pub agent_host: String,
    /// Agent port used when the `port` flag is absent or empty.
    pub agent_port: String,
    /// HTTP timeout in milliseconds when the caller supplies no deadline.
    pub http_timeout_ms: u64,
    /// Maximum agent response body size in bytes.
    pub http_max_response_bytes: u64,
    /// Directory containing one .toml file per supported action.
    pub action_dir: PathBuf,
    /// File holding the matcher flags shared by every action.
    pub matcher_file: PathBuf,
}

impl ExecutorConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            agent_host: env_string("GO_FAULT_AGENT_HOST", defaults.agent_host),
            agent_port: env_string("GO_FAULT_AGENT_PORT", defaults.agent_port),
            http_timeout_ms: env_u64("GO_FAULT_HTTP_TIMEOUT_MS", defaults.http_timeout_ms),
            http_max_response_bytes: env_u64(
                "GO_FAULT_HTTP_MAX_RESPONSE_BYTES",
                defaults.http_max_response_bytes,
            ),
            action_dir: std::env::var("GO_FAULT_ACTION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.action_dir),
            matcher_file: std::env::var("GO_FAULT_MATCHER_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.matcher_file),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            agent_host: DEFAULT_AGENT_HOST.to_string(),
            agent_port: DEFAULT_AGENT_PORT.to_string(),
            http_timeout_ms: 30_000, // 30 seconds
            http_max_response_bytes: 10 * 1024 * 1024, // 10 MiB
            action_dir: PathBuf::from("./actions"),
            matcher_file: PathBuf::from("./matchers.toml"),
        }
    }
}

/// Read a u64 from an env var, falling back to a default.
fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read a non-empty string from an env var, falling back to a default.
fn env_string(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ExecutorConfig::default();
        assert_eq!(config.agent_host, "localhost");
        assert_eq!(config.agent_port, "9526");
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.http_max_response_bytes, 10_485_760);
    }

    #[test]
    fn test_env_u64_falls_back_on_garbage() {
        assert_eq!(env_u64("GO_FAULT_TEST_UNSET_U64", 7), 7);
    }

    #[test]
    fn test_env_string_falls_back_when_unset() {
        assert_eq!(
            env_string("GO_FAULT_TEST_UNSET_STRING", "fallback".into()),
            "fallback"
        );
    }
}
