//! Install options: network limits shared by the fetcher and the pipeline.

use std::time::Duration;

use tracing::warn;

/// Redirect hops followed before a download is abandoned.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Whole-request timeout, covering the body transfer.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// TCP/TLS connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Overrides the request timeout in seconds; `0` disables it.
pub const TIMEOUT_ENV: &str = "RELBIN_TIMEOUT_SECS";

/// Overrides the redirect hop limit.
pub const MAX_REDIRECTS_ENV: &str = "RELBIN_MAX_REDIRECTS";

/// Network behaviour of an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Timeout for a whole request including the body; `None` waits forever
    pub request_timeout: Option<Duration>,
    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
    /// Maximum redirect hops per download
    pub max_redirects: usize,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: crate::USER_AGENT.to_string(),
        }
    }
}

impl InstallOptions {
    /// Defaults, overridden by `RELBIN_TIMEOUT_SECS` and `RELBIN_MAX_REDIRECTS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    /// Unparseable values are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => options = options.with_timeout_secs(secs),
                Err(_) => warn!(var = TIMEOUT_ENV, value = %raw, "ignoring invalid timeout"),
            }
        }

        if let Some(raw) = lookup(MAX_REDIRECTS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(hops) => options.max_redirects = hops,
                Err(_) => warn!(var = MAX_REDIRECTS_ENV, value = %raw, "ignoring invalid redirect limit"),
            }
        }

        options
    }

    /// Set the request timeout; `0` disables it.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = InstallOptions::from_lookup(lookup(&[]));
        assert_eq!(options, InstallOptions::default());
        assert_eq!(options.max_redirects, 5);
        assert_eq!(options.request_timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_env_overrides() {
        let options = InstallOptions::from_lookup(lookup(&[
            (TIMEOUT_ENV, "12"),
            (MAX_REDIRECTS_ENV, "2"),
        ]));
        assert_eq!(options.request_timeout, Some(Duration::from_secs(12)));
        assert_eq!(options.max_redirects, 2);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let options = InstallOptions::from_lookup(lookup(&[(TIMEOUT_ENV, "0")]));
        assert_eq!(options.request_timeout, None);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let options = InstallOptions::from_lookup(lookup(&[
            (TIMEOUT_ENV, "soon"),
            (MAX_REDIRECTS_ENV, "-1"),
        ]));
        assert_eq!(options, InstallOptions::default());
    }
}
