//! Console configuration from the environment.

use std::path::PathBuf;
use std::time::Duration;

use kitchenhub_observability::LogFormat;
use kitchenhub_session::SessionConfig;

use crate::storage::default_db_path;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    pub db_path: PathBuf,
    pub reconcile_interval: Duration,
    pub stale_permissions_ttl: Option<chrono::Duration>,
    pub log_format: LogFormat,
    /// Problems found while reading the environment. Logged once tracing is up.
    pub warnings: Vec<String>,
}

impl ConsoleConfig {
    /// Read `KITCHENHUB_*` variables; unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut warnings = Vec::new();
        let defaults = SessionConfig::default();

        let api_url = lookup("KITCHENHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let auth_token = lookup("KITCHENHUB_AUTH_TOKEN").filter(|t| !t.is_empty());

        let db_path = match lookup("KITCHENHUB_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_db_path().unwrap_or_else(|err| {
                warnings.push(format!("{err}; using ./kitchenhub.db"));
                PathBuf::from("kitchenhub.db")
            }),
        };

        let reconcile_interval = parse_or(
            &lookup,
            "KITCHENHUB_RECONCILE_MS",
            &mut warnings,
            |ms: u64| (ms > 0).then(|| Duration::from_millis(ms)),
        )
        .unwrap_or(defaults.reconcile_interval);

        let stale_permissions_ttl = parse_or(
            &lookup,
            "KITCHENHUB_STALE_TTL_SECS",
            &mut warnings,
            |secs: i64| (secs >= 0).then(|| chrono::Duration::seconds(secs)),
        )
        .or(defaults.stale_permissions_ttl);

        let log_format = match lookup("KITCHENHUB_LOG_FORMAT") {
            None => LogFormat::default(),
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                warnings.push(format!("KITCHENHUB_LOG_FORMAT: {err}"));
                LogFormat::default()
            }),
        };

        Self {
            api_url,
            auth_token,
            db_path,
            reconcile_interval,
            stale_permissions_ttl,
            log_format,
            warnings,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::default().with_reconcile_interval(self.reconcile_interval);
        match self.stale_permissions_ttl {
            Some(ttl) => config.with_stale_permissions_ttl(ttl),
            None => config,
        }
    }
}

/// Parse `key` as `T` and validate it; record a warning on failure.
fn parse_or<T, U>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    warnings: &mut Vec<String>,
    validate: impl FnOnce(T) -> Option<U>,
) -> Option<U>
where
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>().ok().and_then(validate) {
        Some(value) => Some(value),
        None => {
            warnings.push(format!("{key}: ignoring invalid value '{raw}'"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ConsoleConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConsoleConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[("KITCHENHUB_DB_PATH", "/tmp/k.db")]);
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.auth_token, None);
        assert_eq!(cfg.reconcile_interval, Duration::from_secs(1));
        assert_eq!(cfg.stale_permissions_ttl, None);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert!(cfg.warnings.is_empty());
        assert_eq!(cfg.session_config(), SessionConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let cfg = config(&[
            ("KITCHENHUB_API_URL", "https://api.kitchenhub.test"),
            ("KITCHENHUB_AUTH_TOKEN", "secret"),
            ("KITCHENHUB_DB_PATH", "/var/lib/kh/identity.db"),
            ("KITCHENHUB_RECONCILE_MS", "250"),
            ("KITCHENHUB_STALE_TTL_SECS", "600"),
            ("KITCHENHUB_LOG_FORMAT", "pretty"),
        ]);

        assert_eq!(cfg.api_url, "https://api.kitchenhub.test");
        assert_eq!(cfg.auth_token.as_deref(), Some("secret"));
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/kh/identity.db"));
        assert_eq!(cfg.log_format, LogFormat::Pretty);

        let session = cfg.session_config();
        assert_eq!(session.reconcile_interval, Duration::from_millis(250));
        assert_eq!(session.stale_permissions_ttl, Some(chrono::Duration::minutes(10)));
    }

    #[test]
    fn invalid_values_warn_and_fall_back() {
        let cfg = config(&[
            ("KITCHENHUB_DB_PATH", "k.db"),
            ("KITCHENHUB_RECONCILE_MS", "0"),
            ("KITCHENHUB_STALE_TTL_SECS", "soon"),
            ("KITCHENHUB_LOG_FORMAT", "xml"),
            ("KITCHENHUB_AUTH_TOKEN", ""),
        ]);

        assert_eq!(cfg.reconcile_interval, Duration::from_secs(1));
        assert_eq!(cfg.stale_permissions_ttl, None);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.auth_token, None);
        assert_eq!(cfg.warnings.len(), 3);
        assert!(cfg.warnings[0].starts_with("KITCHENHUB_RECONCILE_MS"));
    }
}
