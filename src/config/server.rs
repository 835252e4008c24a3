//! Listener, logging and CORS settings

use serde::Deserialize;
use std::net::SocketAddr;

use super::error::ValidationError;

/// How the HTTP/WebSocket listener runs.
///
/// Every field has a default, so `DISPATCH_HUB__SERVER__*` variables are
/// only needed to override them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Tightens CORS: with no origins listed, cross-origin requests are refused.
    pub production: bool,

    /// `EnvFilter` directive, used when `RUST_LOG` is unset.
    pub log_level: String,
    pub log_format: LogFormat,

    /// Comma-separated list of allowed browser origins.
    pub cors_origins: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            production: false,
            log_level: "info,dispatch_hub=debug,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            cors_origins: None,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ValidationError::InvalidAddress(raw))
    }

    /// Origins from `cors_origins`, trimmed, blanks skipped.
    pub fn allowed_origins(&self) -> Vec<&str> {
        self.cors_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a missing origin list should fall back to allowing any origin.
    pub fn allows_any_origin(&self) -> bool {
        !self.production && self.allowed_origins().is_empty()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        self.socket_addr().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ServerConfig {
        ServerConfig::default()
    }

    #[test]
    fn binds_all_interfaces_on_8080_by_default() {
        let config = server();
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:8080");
        assert!(!config.production);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn rejects_port_zero() {
        let config = ServerConfig { port: 0, ..server() };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidPort)));
    }

    #[test]
    fn rejects_host_that_is_not_an_ip() {
        let config = ServerConfig {
            host: "dispatch.local".to_string(),
            ..server()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidAddress(_))));
    }

    #[test]
    fn origin_list_skips_blank_entries() {
        let config = ServerConfig {
            cors_origins: Some(" https://ops.example.com,, https://track.example.com ".to_string()),
            ..server()
        };
        assert_eq!(
            config.allowed_origins(),
            vec!["https://ops.example.com", "https://track.example.com"]
        );
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn any_origin_only_outside_production() {
        assert!(server().allows_any_origin());

        let production = ServerConfig {
            production: true,
            ..server()
        };
        assert!(!production.allows_any_origin());
        assert!(production.allowed_origins().is_empty());
    }
}
