// API proxy layer - session-checked, parameter-checked calls into the data source
//
// This is the single place where upstream failures become the HTTP-facing
// taxonomy. Both the JSON API and the server-rendered pages go through it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{AccountsResponse, InsightsResponse, LocationsResponse, ReviewsResponse};
use crate::session::Credential;
use crate::source::{BusinessDataSource, SourceError, SourceErrorKind};

pub const NO_ACCESS_TOKEN: &str = "Unauthorized - No access token";
pub const AUTH_EXPIRED: &str = "Authentication expired. Please sign in again.";
pub const INSUFFICIENT_SCOPE: &str =
    "Insufficient permissions. Please re-authenticate with Google Business Profile access.";

// ============================================================================
// TAXONOMY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}: {details}")]
    Internal { message: String, details: String },
}

impl ProxyError {
    /// No session, or a session without a usable token
    pub fn no_session() -> Self {
        ProxyError::Unauthorized(NO_ACCESS_TOKEN.to_string())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::Unauthorized(_) => 401,
            ProxyError::Forbidden(_) => 403,
            ProxyError::BadRequest(_) => 400,
            ProxyError::NotFound(_) => 404,
            ProxyError::Internal { .. } => 500,
        }
    }

    /// Human-readable message shown to the user
    pub fn message(&self) -> &str {
        match self {
            ProxyError::Unauthorized(m)
            | ProxyError::Forbidden(m)
            | ProxyError::BadRequest(m)
            | ProxyError::NotFound(m) => m,
            ProxyError::Internal { message, .. } => message,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            ProxyError::Internal { details, .. } => Some(details),
            _ => None,
        }
    }

    /// Re-running sign-in can fix it
    pub fn needs_sign_in(&self) -> bool {
        matches!(self, ProxyError::Unauthorized(_) | ProxyError::Forbidden(_))
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.message().to_string(),
            details: self.details().map(String::from),
        }
    }
}

/// JSON body of every non-200 API response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ============================================================================
// RESOURCES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Accounts,
    Locations,
    Reviews,
    Insights,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Accounts => "accounts",
            Resource::Locations => "locations",
            Resource::Reviews => "reviews",
            Resource::Insights => "insights",
        }
    }

    fn not_found_message(&self) -> &'static str {
        match self {
            Resource::Accounts => "Business account not found",
            Resource::Locations => "Account not found or no locations available",
            Resource::Reviews | Resource::Insights => "Location not found",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Resource::Accounts => "Failed to fetch business accounts",
            Resource::Locations => "Failed to fetch business locations",
            Resource::Reviews => "Failed to fetch reviews",
            Resource::Insights => "Failed to fetch insights",
        }
    }
}

/// Query parameter a resource cannot be fetched without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredParam {
    /// `accountName`, for locations
    AccountName,
    /// `locationName`, for reviews and insights
    LocationName,
}

impl RequiredParam {
    fn missing_message(&self) -> &'static str {
        match self {
            RequiredParam::AccountName => "Account name is required",
            RequiredParam::LocationName => "Location name is required",
        }
    }
}

/// Translate a typed upstream failure for `resource`
pub fn classify(resource: Resource, err: SourceError) -> ProxyError {
    match err.kind {
        SourceErrorKind::InsufficientScope => ProxyError::Forbidden(INSUFFICIENT_SCOPE.to_string()),
        SourceErrorKind::AuthExpired => ProxyError::Unauthorized(AUTH_EXPIRED.to_string()),
        SourceErrorKind::NotFound => ProxyError::NotFound(resource.not_found_message().to_string()),
        SourceErrorKind::Transient | SourceErrorKind::Unknown => ProxyError::Internal {
            message: resource.failure_message().to_string(),
            details: err.message,
        },
    }
}

/// Blank counts as missing
pub fn require_param(param: RequiredParam, value: Option<&str>) -> Result<&str, ProxyError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProxyError::BadRequest(param.missing_message().to_string()))
}

fn log_failure(resource: Resource, err: &SourceError) {
    warn!(
        resource = resource.as_str(),
        kind = %err.kind,
        "Upstream call failed: {}",
        err.message
    );
}

// ============================================================================
// OPERATIONS
// ============================================================================

pub async fn fetch_accounts(
    source: &dyn BusinessDataSource,
    credential: &Credential,
) -> Result<AccountsResponse, ProxyError> {
    info!(source = source.name(), "Fetching business accounts");

    match source.list_accounts(credential).await {
        Ok(accounts) => Ok(AccountsResponse { accounts }),
        Err(err) => {
            log_failure(Resource::Accounts, &err);
            Err(classify(Resource::Accounts, err))
        }
    }
}

pub async fn fetch_locations(
    source: &dyn BusinessDataSource,
    credential: &Credential,
    account_name: Option<&str>,
) -> Result<LocationsResponse, ProxyError> {
    let account_name = require_param(RequiredParam::AccountName, account_name)?;
    info!(source = source.name(), account = account_name, "Fetching business locations");

    match source.list_locations(credential, account_name).await {
        Ok(locations) => Ok(LocationsResponse { locations }),
        Err(err) => {
            log_failure(Resource::Locations, &err);
            Err(classify(Resource::Locations, err))
        }
    }
}

pub async fn fetch_reviews(
    source: &dyn BusinessDataSource,
    credential: &Credential,
    location_name: Option<&str>,
) -> Result<ReviewsResponse, ProxyError> {
    let location_name = require_param(RequiredParam::LocationName, location_name)?;
    info!(source = source.name(), location = location_name, "Fetching reviews");

    match source.list_reviews(credential, location_name).await {
        Ok(reviews) => Ok(ReviewsResponse { reviews }),
        Err(err) => {
            log_failure(Resource::Reviews, &err);
            Err(classify(Resource::Reviews, err))
        }
    }
}

pub async fn fetch_insights(
    source: &dyn BusinessDataSource,
    credential: &Credential,
    location_name: Option<&str>,
) -> Result<InsightsResponse, ProxyError> {
    let location_name = require_param(RequiredParam::LocationName, location_name)?;
    info!(source = source.name(), location = location_name, "Fetching insights");

    match source.get_insights(credential, location_name).await {
        Ok(insights) => Ok(InsightsResponse { insights }),
        Err(err) => {
            log_failure(Resource::Insights, &err);
            Err(classify(Resource::Insights, err))
        }
    }
}
