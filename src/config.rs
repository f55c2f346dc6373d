// Runtime configuration from environment variables (.env honoured)

use std::env;
use std::net::SocketAddr;
use thiserror::Error;

use crate::session::Credential;
use crate::source::DataSourceKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{name} is required when {context}")]
    Missing {
        name: &'static str,
        context: &'static str,
    },
}

/// Google OAuth client registration
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Externally visible base URL, used for the OAuth redirect
    pub public_url: String,
    pub data_source: DataSourceKind,
    pub oauth: Option<OAuthClientConfig>,
    pub session_ttl_secs: u64,
    /// Max location fetches in flight during aggregation (>= 1)
    pub fetch_concurrency: usize,
    pub http_timeout_secs: u64,
    pub static_dir: String,
    /// `GOOGLE_ACCESS_TOKEN`, the terminal UI's credential for the Google source
    pub access_token: Option<Credential>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            public_url: "http://localhost:3000".to_string(),
            data_source: DataSourceKind::Mock,
            oauth: None,
            session_ttl_secs: 3600,
            fetch_concurrency: 4,
            http_timeout_secs: 30,
            static_dir: "web".to_string(),
            access_token: None,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any), then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any name -> value lookup; unset and blank values take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let bind_addr = match get("BIND_ADDR") {
            Some(value) => value.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid {
                    name: "BIND_ADDR",
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => defaults.bind_addr,
        };

        let public_url = get("PUBLIC_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_url);
        if !public_url.starts_with("http://") && !public_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "PUBLIC_URL",
                value: public_url,
                reason: "must start with http:// or https://".to_string(),
            });
        }

        let data_source = match get("DATA_SOURCE") {
            Some(value) => DataSourceKind::parse(&value).ok_or_else(|| ConfigError::Invalid {
                name: "DATA_SOURCE",
                value: value.clone(),
                reason: "expected \"mock\" or \"google\"".to_string(),
            })?,
            None => defaults.data_source,
        };

        let oauth = match (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(OAuthClientConfig {
                client_id: client_id.trim().to_string(),
                client_secret: client_secret.trim().to_string(),
            }),
            (Some(_), None) => {
                return Err(ConfigError::Missing {
                    name: "GOOGLE_CLIENT_SECRET",
                    context: "GOOGLE_CLIENT_ID is set",
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Missing {
                    name: "GOOGLE_CLIENT_ID",
                    context: "GOOGLE_CLIENT_SECRET is set",
                })
            }
            (None, None) => None,
        };

        if data_source == DataSourceKind::Google && oauth.is_none() {
            return Err(ConfigError::Missing {
                name: "GOOGLE_CLIENT_ID",
                context: "DATA_SOURCE=google",
            });
        }

        let session_ttl_secs = parse_number(&get, "SESSION_TTL_SECS", defaults.session_ttl_secs)?;
        let fetch_concurrency =
            parse_number(&get, "FETCH_CONCURRENCY", defaults.fetch_concurrency as u64)?.max(1)
                as usize;
        let http_timeout_secs =
            parse_number(&get, "HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?.max(1);
        let static_dir = get("STATIC_DIR").unwrap_or(defaults.static_dir);
        let access_token = get("GOOGLE_ACCESS_TOKEN").and_then(|v| Credential::new(v.trim()));

        Ok(Self {
            bind_addr,
            public_url,
            data_source,
            oauth,
            session_ttl_secs,
            fetch_concurrency,
            http_timeout_secs,
            static_dir,
            access_token,
        })
    }

    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.public_url)
    }

    /// Cookies get `Secure` when the public URL is https
    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }
}

fn parse_number<G>(get: &G, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::Invalid {
                name,
                value: value.clone(),
                reason: e.to_string(),
            }
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.redirect_uri(), "http://localhost:3000/auth/callback");
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_google_source_with_oauth_client() {
        let config = config_from(&[
            ("DATA_SOURCE", "google"),
            ("GOOGLE_CLIENT_ID", "id.apps.googleusercontent.com"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("PUBLIC_URL", "https://dash.example.com/"),
            ("BIND_ADDR", "127.0.0.1:8080"),
        ])
        .unwrap();

        assert_eq!(config.data_source, DataSourceKind::Google);
        assert_eq!(config.oauth.unwrap().client_id, "id.apps.googleusercontent.com");
        assert_eq!(config.public_url, "https://dash.example.com");
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn test_google_source_requires_oauth_client() {
        let err = config_from(&[("DATA_SOURCE", "google")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                name: "GOOGLE_CLIENT_ID",
                context: "DATA_SOURCE=google"
            }
        );
    }

    #[test]
    fn test_half_configured_oauth_client() {
        let err = config_from(&[("GOOGLE_CLIENT_ID", "id")]).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_CLIENT_SECRET"));
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = config_from(&[("FETCH_CONCURRENCY", "many")]).unwrap_err();
        assert!(err.to_string().contains("FETCH_CONCURRENCY"));

        let err = config_from(&[("DATA_SOURCE", "sqlite")]).unwrap_err();
        assert!(err.to_string().contains("DATA_SOURCE"));

        let err = config_from(&[("PUBLIC_URL", "localhost:3000")]).unwrap_err();
        assert!(err.to_string().contains("PUBLIC_URL"));
    }

    #[test]
    fn test_access_token_is_optional_and_redacted() {
        assert!(config_from(&[]).unwrap().access_token.is_none());
        assert!(config_from(&[("GOOGLE_ACCESS_TOKEN", "  ")]).unwrap().access_token.is_none());

        let config = config_from(&[("GOOGLE_ACCESS_TOKEN", " ya29.token ")]).unwrap();
        assert_eq!(
            config.access_token.as_ref().map(Credential::access_token),
            Some("ya29.token")
        );
        assert!(!format!("{:?}", config).contains("ya29.token"));
    }

    #[test]
    fn test_fetch_concurrency_floor() {
        let config = config_from(&[("FETCH_CONCURRENCY", "0")]).unwrap();
        assert_eq!(config.fetch_concurrency, 1);
    }

    #[test]
    fn test_oauth_secret_is_redacted() {
        let oauth = OAuthClientConfig {
            client_id: "id".to_string(),
            client_secret: "s3cret".to_string(),
        };
        assert!(!format!("{:?}", oauth).contains("s3cret"));
    }
}
