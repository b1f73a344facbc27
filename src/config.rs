use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Clinical Triage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Inference service reached when `TRIAGE_SERVICE_URL` is unset.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

/// Connection establishment limit. Kept short so an unreachable service
/// surfaces quickly instead of hanging the panel.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Whole-request limit. Model inference on CPU can take minutes.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

const ENV_SERVICE_URL: &str = "TRIAGE_SERVICE_URL";
const ENV_CONNECT_TIMEOUT: &str = "TRIAGE_CONNECT_TIMEOUT_SECS";
const ENV_REQUEST_TIMEOUT: &str = "TRIAGE_REQUEST_TIMEOUT_SECS";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "clinical_triage=info,warn"
}

/// Connection settings for the external inference service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL without trailing slash, e.g. `http://localhost:8000`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_URL)
    }
}

impl ServiceConfig {
    /// Config for the given base URL with default timeouts.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Read the config from the process environment.
    ///
    /// Unset variables use the defaults. Unparsable timeouts are logged and
    /// replaced by the default rather than failing startup.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_SERVICE_URL)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());

        let mut config = Self::new(base_url.trim());
        if let Some(secs) = read_secs(&lookup, ENV_CONNECT_TIMEOUT) {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = read_secs(&lookup, ENV_REQUEST_TIMEOUT) {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Absolute URL for a service path such as `/api/triage`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn read_secs<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid timeout, using default");
            None
        }
        Ok(secs) => Some(secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_env_empty() {
        let config = ServiceConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout, Duration::from_secs(300));
    }

    #[test]
    fn reads_url_and_timeouts() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("TRIAGE_SERVICE_URL", "http://10.0.0.5:9000/"),
            ("TRIAGE_CONNECT_TIMEOUT_SECS", "3"),
            ("TRIAGE_REQUEST_TIMEOUT_SECS", "45"),
        ]));
        assert_eq!(config.base_url, "http://10.0.0.5:9000");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(45));
    }

    #[test]
    fn invalid_timeout_falls_back() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("TRIAGE_CONNECT_TIMEOUT_SECS", "soon"),
            ("TRIAGE_REQUEST_TIMEOUT_SECS", "0"),
        ]));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(300));
    }

    #[test]
    fn blank_url_uses_default() {
        let config = ServiceConfig::from_lookup(lookup_from(&[("TRIAGE_SERVICE_URL", "  ")]));
        assert_eq!(config.base_url, DEFAULT_SERVICE_URL);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = ServiceConfig::new("http://localhost:8000/");
        assert_eq!(
            config.endpoint("/triage/multimodal"),
            "http://localhost:8000/triage/multimodal"
        );
        assert_eq!(config.endpoint("health"), "http://localhost:8000/health");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
