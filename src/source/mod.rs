// Vendor API client - the BusinessDataSource capability
// One read operation per resource; failures are typed, never embedded in payloads

pub mod google;
pub mod mock;
#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{Account, Insights, Location, Review};
use crate::session::Credential;

pub use google::{GoogleBusinessClient, GoogleEndpoints};
pub use mock::MockBusinessData;

// ============================================================================
// ERRORS
// ============================================================================

/// Closed set of upstream failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Token expired, revoked or otherwise rejected
    AuthExpired,
    /// Token lacks the Business Profile scope
    InsufficientScope,
    /// Account or location absent upstream
    NotFound,
    /// Timeouts, connection failures, 429 and 5xx
    Transient,
    Unknown,
}

impl SourceErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceErrorKind::AuthExpired => "auth_expired",
            SourceErrorKind::InsufficientScope => "insufficient_scope",
            SourceErrorKind::NotFound => "not_found",
            SourceErrorKind::Transient => "transient",
            SourceErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::AuthExpired, message)
    }

    pub fn insufficient_scope(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InsufficientScope, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Transient, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unknown, message)
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

// ============================================================================
// CAPABILITY
// ============================================================================

/// Read-only access to Business Profile data on behalf of one user.
///
/// Implementations keep no per-user state: the credential travels with every
/// call, so one instance serves every session.
#[async_trait]
pub trait BusinessDataSource: Send + Sync {
    /// Short label for logs ("mock", "google")
    fn name(&self) -> &'static str;

    async fn list_accounts(&self, credential: &Credential) -> SourceResult<Vec<Account>>;

    /// Fails with `NotFound` when the account is unknown or has no locations
    async fn list_locations(
        &self,
        credential: &Credential,
        account_name: &str,
    ) -> SourceResult<Vec<Location>>;

    async fn list_reviews(
        &self,
        credential: &Credential,
        location_name: &str,
    ) -> SourceResult<Vec<Review>>;

    async fn get_insights(
        &self,
        credential: &Credential,
        location_name: &str,
    ) -> SourceResult<Insights>;
}

// ============================================================================
// SELECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    Mock,
    Google,
}

impl DataSourceKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mock" => Some(DataSourceKind::Mock),
            "google" => Some(DataSourceKind::Google),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceKind::Mock => "mock",
            DataSourceKind::Google => "google",
        }
    }
}

/// Build the data source named by the configuration
pub fn from_config(config: &AppConfig) -> SourceResult<Arc<dyn BusinessDataSource>> {
    match config.data_source {
        DataSourceKind::Mock => Ok(Arc::new(MockBusinessData::new())),
        DataSourceKind::Google => {
            let client =
                GoogleBusinessClient::new(GoogleEndpoints::default(), config.http_timeout_secs)?;
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_kind_parse() {
        assert_eq!(DataSourceKind::parse("mock"), Some(DataSourceKind::Mock));
        assert_eq!(DataSourceKind::parse(" Google "), Some(DataSourceKind::Google));
        assert_eq!(DataSourceKind::parse("sqlite"), None);
    }

    #[test]
    fn test_source_error_display() {
        let err = SourceError::not_found("Location accounts/1/locations/2 not found");
        assert_eq!(
            err.to_string(),
            "not_found: Location accounts/1/locations/2 not found"
        );
        assert_eq!(err.kind, SourceErrorKind::NotFound);
    }

    #[test]
    fn test_from_config_selects_source() {
        let mut config = AppConfig::default();
        assert_eq!(from_config(&config).unwrap().name(), "mock");

        config.data_source = DataSourceKind::Google;
        assert_eq!(from_config(&config).unwrap().name(), "google");
    }
}
