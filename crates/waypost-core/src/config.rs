//! Configuration management for Waypost.
//!
//! All configuration is driven by environment variables.

use std::env;

use crate::error::{WaypostError, WaypostResult};

/// Base path used when `WAYPOST_BASE_PATH` is not set.
pub const DEFAULT_BASE_PATH: &str = "/api";

/// Global configuration for a Waypost server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypostConfig {
    /// Bind address for the listener.
    pub listen: String,
    /// Path prefix every API route lives under.
    pub base_path: String,
    /// Log level.
    pub log_level: String,
    /// Maximum allowed distance between the signed date and the server clock.
    ///
    /// `None` disables the freshness check entirely.
    pub auth_max_skew_secs: Option<u64>,
    /// Whether the access log post-processor is installed.
    pub access_log: bool,
    /// Whether a later route registration may replace an earlier one.
    pub allow_route_override: bool,
}

impl Default for WaypostConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
            base_path: DEFAULT_BASE_PATH.to_owned(),
            log_level: "info".to_owned(),
            auth_max_skew_secs: None,
            access_log: true,
            allow_route_override: false,
        }
    }
}

impl WaypostConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> WaypostResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> WaypostResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("WAYPOST_LISTEN") {
            config.listen = v;
        }
        if let Some(v) = lookup("WAYPOST_BASE_PATH") {
            if v.contains(['?', '#']) {
                return Err(WaypostError::Config(format!(
                    "base path must be a plain path, got {v}"
                )));
            }
            config.base_path = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("WAYPOST_AUTH_MAX_SKEW_SECS") {
            let secs = v.parse::<u64>().map_err(|_| WaypostError::InvalidSetting {
                key: "WAYPOST_AUTH_MAX_SKEW_SECS".to_owned(),
                value: v.clone(),
            })?;
            config.auth_max_skew_secs = Some(secs);
        }
        config.access_log = parse_bool(lookup("WAYPOST_ACCESS_LOG"), config.access_log);
        config.allow_route_override = parse_bool(
            lookup("WAYPOST_ALLOW_ROUTE_OVERRIDE"),
            config.allow_route_override,
        );

        Ok(config)
    }
}

fn parse_bool(raw: Option<String>, default: bool) -> bool {
    raw.map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_should_create_default_config() {
        let config = WaypostConfig::default();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.base_path, "/api");
        assert!(config.auth_max_skew_secs.is_none());
        assert!(config.access_log);
        assert!(!config.allow_route_override);
    }

    #[test]
    fn test_should_read_overrides_from_lookup() {
        let config = WaypostConfig::from_lookup(lookup_from(&[
            ("WAYPOST_LISTEN", "127.0.0.1:9000"),
            ("WAYPOST_BASE_PATH", "/service/"),
            ("WAYPOST_AUTH_MAX_SKEW_SECS", "300"),
            ("WAYPOST_ACCESS_LOG", "false"),
            ("WAYPOST_ALLOW_ROUTE_OVERRIDE", "yes"),
        ]))
        .unwrap();

        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.base_path, "/service/");
        assert_eq!(config.auth_max_skew_secs, Some(300));
        assert!(!config.access_log);
        assert!(config.allow_route_override);
    }

    #[test]
    fn test_should_reject_non_numeric_skew() {
        let err = WaypostConfig::from_lookup(lookup_from(&[("WAYPOST_AUTH_MAX_SKEW_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, WaypostError::InvalidSetting { .. }));
    }

    #[test]
    fn test_should_reject_base_path_with_query() {
        let err = WaypostConfig::from_lookup(lookup_from(&[("WAYPOST_BASE_PATH", "/api?x=1")]))
            .unwrap_err();
        assert!(matches!(err, WaypostError::Config(_)));
    }

    #[test]
    fn test_should_serialize_config_in_camel_case() {
        let json = serde_json::to_value(WaypostConfig::default()).unwrap();
        assert_eq!(json["basePath"], "/api");
        assert_eq!(json["allowRouteOverride"], false);
    }
}
