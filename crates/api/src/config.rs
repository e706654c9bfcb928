//! Process configuration from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

use portal_observability::LogFormat;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";
const INSECURE_DEV_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORTAL_BIND_ADDR '{0}'")]
    InvalidBindAddr(String),

    #[error("invalid boolean for {var}: '{value}' (expected true/false)")]
    InvalidBool { var: &'static str, value: String },

    #[error("IDENTITY_URL is set but IDENTITY_API_KEY is missing")]
    MissingApiKey,

    #[error("invalid PORTAL_LOG_FORMAT '{0}' (expected json/pretty)")]
    InvalidLogFormat(String),

    #[error("PORTAL_DEV_ADMIN_EMAIL and PORTAL_DEV_ADMIN_PASSWORD must be set together")]
    IncompleteDevAdmin,
}

/// Which identity provider the portal talks to.
#[derive(Clone, PartialEq, Eq)]
pub enum IdentityConfig {
    /// In-process provider signing sessions with `jwt_secret`.
    Local { jwt_secret: String },
    /// GoTrue-compatible auth server.
    GoTrue { url: String, api_key: String },
}

impl IdentityConfig {
    /// True when the local provider fell back to the built-in secret.
    pub fn uses_insecure_secret(&self) -> bool {
        matches!(self, IdentityConfig::Local { jwt_secret } if jwt_secret == INSECURE_DEV_SECRET)
    }
}

impl core::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IdentityConfig::Local { .. } => f.debug_struct("Local").finish_non_exhaustive(),
            IdentityConfig::GoTrue { url, .. } => f
                .debug_struct("GoTrue")
                .field("url", url)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DevAdmin {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for DevAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DevAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub identity: IdentityConfig,
    /// Postgres role store; in-memory when absent.
    pub database_url: Option<String>,
    pub secure_cookies: bool,
    /// Externally visible origin, used for OAuth callback URLs.
    pub public_url: String,
    pub log_format: LogFormat,
    /// Account seeded with the admin role (local provider only).
    pub dev_admin: Option<DevAdmin>,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = var("PORTAL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind_addr.clone()))?;

        let identity = match var("IDENTITY_URL") {
            Some(url) => IdentityConfig::GoTrue {
                url,
                api_key: var("IDENTITY_API_KEY").ok_or(ConfigError::MissingApiKey)?,
            },
            None => IdentityConfig::Local {
                jwt_secret: var("JWT_SECRET").unwrap_or_else(|| INSECURE_DEV_SECRET.to_string()),
            },
        };

        let secure_cookies = match var("PORTAL_SECURE_COOKIES") {
            None => false,
            Some(value) => parse_bool("PORTAL_SECURE_COOKIES", &value)?,
        };

        let log_format = match var("PORTAL_LOG_FORMAT") {
            None => LogFormat::default(),
            Some(value) => LogFormat::parse(&value).ok_or(ConfigError::InvalidLogFormat(value))?,
        };

        let dev_admin = match (var("PORTAL_DEV_ADMIN_EMAIL"), var("PORTAL_DEV_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(DevAdmin { email, password }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteDevAdmin),
        };

        let public_url = var("PORTAL_PUBLIC_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bind_addr,
            identity,
            database_url: var("DATABASE_URL"),
            secure_cookies,
            public_url,
            log_format,
            dev_admin,
        })
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<PortalConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PortalConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_to_local_identity_and_memory_roles() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(
            cfg.identity,
            IdentityConfig::Local {
                jwt_secret: "dev-secret".into()
            }
        );
        assert_eq!(cfg.database_url, None);
        assert!(!cfg.secure_cookies);
        assert_eq!(cfg.public_url, "http://localhost:8080");
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn identity_url_selects_gotrue_and_needs_a_key() {
        let cfg = config(&[("IDENTITY_URL", "https://auth.example.com"), ("IDENTITY_API_KEY", "anon")])
            .unwrap();
        assert!(matches!(cfg.identity, IdentityConfig::GoTrue { .. }));

        assert_eq!(
            config(&[("IDENTITY_URL", "https://auth.example.com")]),
            Err(ConfigError::MissingApiKey)
        );
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            config(&[("PORTAL_BIND_ADDR", "nowhere")]),
            Err(ConfigError::InvalidBindAddr(_))
        ));
        assert!(matches!(
            config(&[("PORTAL_SECURE_COOKIES", "maybe")]),
            Err(ConfigError::InvalidBool { .. })
        ));
        assert!(matches!(
            config(&[("PORTAL_LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidLogFormat(_))
        ));
        assert_eq!(
            config(&[("PORTAL_DEV_ADMIN_EMAIL", "root@example.com")]),
            Err(ConfigError::IncompleteDevAdmin)
        );
    }

    #[test]
    fn public_url_loses_trailing_slash() {
        let cfg = config(&[("PORTAL_PUBLIC_URL", "https://portal.example.com/")]).unwrap();
        assert_eq!(cfg.public_url, "https://portal.example.com");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = config(&[
            ("JWT_SECRET", "super-secret"),
            ("PORTAL_DEV_ADMIN_EMAIL", "root@example.com"),
            ("PORTAL_DEV_ADMIN_PASSWORD", "hunter2"),
        ])
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("hunter2"));
    }
}
