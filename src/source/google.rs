// Google Business Profile API client
//
// Injects the caller's OAuth token per request, follows nextPageToken
// pagination, and classifies failures from the structured error payload
// (HTTP status, error.status, error.details[].reason, WWW-Authenticate).

use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{BusinessDataSource, SourceError, SourceErrorKind, SourceResult};
use crate::models::{Account, Insights, Location, PostalAddress, Review};
use crate::session::Credential;

/// Guard against upstreams that keep handing back a page token
const MAX_PAGES: usize = 50;

const INSIGHTS_WINDOW_DAYS: i64 = 30;

const LOCATION_READ_MASK: &str = "name,title,storefrontAddress,phoneNumbers,websiteUri";

const VIEW_METRICS: [&str; 4] = [
    "BUSINESS_IMPRESSIONS_DESKTOP_MAPS",
    "BUSINESS_IMPRESSIONS_DESKTOP_SEARCH",
    "BUSINESS_IMPRESSIONS_MOBILE_MAPS",
    "BUSINESS_IMPRESSIONS_MOBILE_SEARCH",
];
const CLICK_METRIC: &str = "WEBSITE_CLICKS";
const CALL_METRIC: &str = "CALL_CLICKS";
const DIRECTION_METRIC: &str = "BUSINESS_DIRECTION_REQUESTS";

// ============================================================================
// ENDPOINTS
// ============================================================================

/// Base URLs of the Business Profile API family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleEndpoints {
    pub account_management: String,
    pub business_information: String,
    pub my_business: String,
    pub performance: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            account_management: "https://mybusinessaccountmanagement.googleapis.com".to_string(),
            business_information: "https://mybusinessbusinessinformation.googleapis.com"
                .to_string(),
            my_business: "https://mybusiness.googleapis.com".to_string(),
            performance: "https://businessprofileperformance.googleapis.com".to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Every API behind one base URL (local stand-ins, proxies)
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            account_management: base.clone(),
            business_information: base.clone(),
            my_business: base.clone(),
            performance: base,
        }
    }
}

// ============================================================================
// UPSTREAM PAYLOADS
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamAddress {
    #[serde(default)]
    address_lines: Vec<String>,
    #[serde(default)]
    locality: String,
    #[serde(default)]
    administrative_area: String,
    #[serde(default)]
    postal_code: String,
    #[serde(default)]
    region_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamPhoneNumbers {
    primary_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamLocation {
    name: String,
    #[serde(default)]
    title: String,
    storefront_address: Option<UpstreamAddress>,
    phone_numbers: Option<UpstreamPhoneNumbers>,
    website_uri: Option<String>,
}

impl UpstreamLocation {
    /// Business Information returns "locations/{id}"; reviews need the
    /// account-qualified name, so qualify it here
    fn into_location(self, account_name: &str) -> Location {
        let name = if self.name.starts_with("accounts/") {
            self.name
        } else {
            format!("{}/{}", account_name.trim_end_matches('/'), self.name)
        };

        Location {
            name,
            title: self.title,
            address: self.storefront_address.map(|a| PostalAddress {
                address_lines: a.address_lines,
                locality: a.locality,
                region: a.administrative_area,
                postal_code: a.postal_code,
                country: a.region_code,
            }),
            primary_phone: self
                .phone_numbers
                .and_then(|p| p.primary_phone)
                .filter(|p| !p.is_empty()),
            website_uri: self.website_uri.filter(|w| !w.is_empty()),
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// Google-backed data source. One instance serves every session.
pub struct GoogleBusinessClient {
    client: Client,
    endpoints: GoogleEndpoints,
}

impl GoogleBusinessClient {
    pub fn new(endpoints: GoogleEndpoints, timeout_secs: u64) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SourceError::unknown(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &GoogleEndpoints {
        &self.endpoints
    }

    async fn get(
        &self,
        credential: &Credential,
        url: &str,
        query: &[(&str, String)],
    ) -> SourceResult<Value> {
        let builder = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(credential.access_token());

        execute_request(builder).await
    }

    /// Collect `field` across every page of a list call
    async fn get_all<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        url: &str,
        base_query: &[(&str, String)],
        field: &str,
    ) -> SourceResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query = base_query.to_vec();
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self.get(credential, url, &query).await?;

            if let Some(page) = response.get(field).and_then(|v| v.as_array()) {
                for item in page {
                    let parsed = serde_json::from_value::<T>(item.clone()).map_err(|e| {
                        SourceError::unknown(format!("Unexpected {} payload: {}", field, e))
                    })?;
                    items.push(parsed);
                }
            }

            match response.get("nextPageToken").and_then(|v| v.as_str()) {
                Some(next) if !next.is_empty() => page_token = Some(next.to_string()),
                _ => return Ok(items),
            }
        }

        warn!(url, pages = MAX_PAGES, "Stopped paginating after page limit");
        Ok(items)
    }
}

#[async_trait]
impl BusinessDataSource for GoogleBusinessClient {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn list_accounts(&self, credential: &Credential) -> SourceResult<Vec<Account>> {
        let url = format!("{}/v1/accounts", self.endpoints.account_management);
        let accounts: Vec<Account> = self.get_all(credential, &url, &[], "accounts").await?;

        debug!("Retrieved {} accounts", accounts.len());
        Ok(accounts)
    }

    async fn list_locations(
        &self,
        credential: &Credential,
        account_name: &str,
    ) -> SourceResult<Vec<Location>> {
        if !is_account_name(account_name) {
            return Err(SourceError::not_found(format!(
                "Account {} is not a valid account name",
                account_name
            )));
        }

        let url = format!(
            "{}/v1/{}/locations",
            self.endpoints.business_information, account_name
        );
        let query = [
            ("readMask", LOCATION_READ_MASK.to_string()),
            ("pageSize", "100".to_string()),
        ];

        let upstream: Vec<UpstreamLocation> =
            self.get_all(credential, &url, &query, "locations").await?;

        if upstream.is_empty() {
            return Err(SourceError::not_found(format!(
                "No locations found for {}",
                account_name
            )));
        }

        debug!("Retrieved {} locations for {}", upstream.len(), account_name);
        Ok(upstream
            .into_iter()
            .map(|l| l.into_location(account_name))
            .collect())
    }

    async fn list_reviews(
        &self,
        credential: &Credential,
        location_name: &str,
    ) -> SourceResult<Vec<Review>> {
        if !is_location_name(location_name) {
            return Err(SourceError::not_found(format!(
                "Location {} is not an account-qualified location name",
                location_name
            )));
        }

        let url = format!("{}/v4/{}/reviews", self.endpoints.my_business, location_name);
        let query = [("pageSize", "50".to_string())];
        let reviews: Vec<Review> = self.get_all(credential, &url, &query, "reviews").await?;

        debug!("Retrieved {} reviews for {}", reviews.len(), location_name);
        Ok(reviews)
    }

    async fn get_insights(
        &self,
        credential: &Credential,
        location_name: &str,
    ) -> SourceResult<Insights> {
        let location_id = location_id(location_name).ok_or_else(|| {
            SourceError::not_found(format!("Location {} not found", location_name))
        })?;

        let url = format!(
            "{}/v1/locations/{}:fetchMultiDailyMetricsTimeSeries",
            self.endpoints.performance, location_id
        );
        let end = Utc::now().date_naive();
        let start = end - ChronoDuration::days(INSIGHTS_WINDOW_DAYS);
        let query = insights_query(start, end);

        let response = self.get(credential, &url, &query).await?;
        let insights = sum_insights(&response);

        debug!(?insights, "Retrieved insights for {}", location_name);
        Ok(insights)
    }
}

// ============================================================================
// REQUEST / RESPONSE HANDLING
// ============================================================================

async fn execute_request(builder: RequestBuilder) -> SourceResult<Value> {
    let response = builder.send().await.map_err(|e| {
        if e.is_timeout() || e.is_connect() {
            SourceError::transient(format!("HTTP request failed: {}", e))
        } else {
            SourceError::unknown(format!("HTTP request failed: {}", e))
        }
    })?;

    let status = response.status();
    let www_authenticate = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    debug!("Response status: {}", status);

    let body = response
        .text()
        .await
        .map_err(|e| SourceError::transient(format!("Failed to read response body: {}", e)))?;

    if status.is_success() && body.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    let parsed = serde_json::from_str::<Value>(&body);

    if !status.is_success() {
        let payload = parsed.unwrap_or(Value::Null);
        let err = classify_failure(status, &payload, www_authenticate.as_deref());
        warn!(kind = %err.kind, "Google API error: {}", err.message);
        return Err(err);
    }

    parsed.map_err(|e| SourceError::unknown(format!("Failed to parse JSON response: {}", e)))
}

/// Map a failed upstream response onto the closed error-kind set.
///
/// Google REST errors look like
/// `{"error": {"code": 403, "message": "...", "status": "PERMISSION_DENIED",
///   "details": [{"reason": "ACCESS_TOKEN_SCOPE_INSUFFICIENT"}]}}`;
/// OAuth endpoints use `{"error": "invalid_grant", "error_description": "..."}`.
pub(crate) fn classify_failure(
    status: StatusCode,
    payload: &Value,
    www_authenticate: Option<&str>,
) -> SourceError {
    let error = payload.get("error");

    // OAuth-style string error codes
    if let Some(code) = error.and_then(|e| e.as_str()) {
        let description = payload
            .get("error_description")
            .and_then(|v| v.as_str())
            .unwrap_or(code);
        let kind = match code {
            "invalid_grant" | "invalid_token" => SourceErrorKind::AuthExpired,
            "insufficient_scope" => SourceErrorKind::InsufficientScope,
            _ => kind_from_status(status, ""),
        };
        return SourceError::new(kind, format!("{}: {}", code, description));
    }

    let upstream_status = error
        .and_then(|e| e.get("status"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {} error", status));
    let code = error
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_i64())
        .unwrap_or(status.as_u16() as i64);

    let scope_reason = error
        .and_then(|e| e.get("details"))
        .and_then(|d| d.as_array())
        .map(|details| {
            details.iter().any(|d| {
                d.get("reason").and_then(|r| r.as_str()) == Some("ACCESS_TOKEN_SCOPE_INSUFFICIENT")
            })
        })
        .unwrap_or(false);
    let scope_header = www_authenticate
        .map(|h| h.contains("error=\"insufficient_scope\""))
        .unwrap_or(false);

    let kind = if scope_reason || scope_header {
        SourceErrorKind::InsufficientScope
    } else {
        kind_from_status(status, upstream_status)
    };

    SourceError::new(kind, format!("Google API error {}: {}", code, message))
}

fn kind_from_status(status: StatusCode, upstream_status: &str) -> SourceErrorKind {
    match upstream_status {
        "UNAUTHENTICATED" => return SourceErrorKind::AuthExpired,
        "PERMISSION_DENIED" => return SourceErrorKind::InsufficientScope,
        "NOT_FOUND" => return SourceErrorKind::NotFound,
        "UNAVAILABLE" | "RESOURCE_EXHAUSTED" | "DEADLINE_EXCEEDED" => {
            return SourceErrorKind::Transient
        }
        _ => {}
    }

    match status {
        StatusCode::UNAUTHORIZED => SourceErrorKind::AuthExpired,
        StatusCode::FORBIDDEN => SourceErrorKind::InsufficientScope,
        StatusCode::NOT_FOUND => SourceErrorKind::NotFound,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => SourceErrorKind::Transient,
        s if s.is_server_error() => SourceErrorKind::Transient,
        _ => SourceErrorKind::Unknown,
    }
}

/// Path segment safe to splice into an upstream URL
fn is_resource_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// "accounts/{id}"
fn is_account_name(name: &str) -> bool {
    name.strip_prefix("accounts/").map_or(false, is_resource_id)
}

/// "accounts/{id}/locations/{id}"
fn is_location_name(name: &str) -> bool {
    name.strip_prefix("accounts/")
        .and_then(|rest| rest.split_once("/locations/"))
        .map_or(false, |(account, location)| {
            is_resource_id(account) && is_resource_id(location)
        })
}

/// "accounts/1/locations/987" or "locations/987" -> "987"
fn location_id(location_name: &str) -> Option<&str> {
    let (_, id) = location_name.rsplit_once("locations/")?;
    if !is_resource_id(id) {
        return None;
    }
    Some(id)
}

fn insights_query(start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
    let mut query: Vec<(&'static str, String)> = VIEW_METRICS
        .iter()
        .chain([CLICK_METRIC, CALL_METRIC, DIRECTION_METRIC].iter())
        .map(|metric| ("dailyMetrics", metric.to_string()))
        .collect();

    query.push(("dailyRange.startDate.year", start.year().to_string()));
    query.push(("dailyRange.startDate.month", start.month().to_string()));
    query.push(("dailyRange.startDate.day", start.day().to_string()));
    query.push(("dailyRange.endDate.year", end.year().to_string()));
    query.push(("dailyRange.endDate.month", end.month().to_string()));
    query.push(("dailyRange.endDate.day", end.day().to_string()));
    query
}

/// Sum every dated value per metric family. Values arrive as int64 strings
/// and are omitted on days with no activity.
fn sum_insights(response: &Value) -> Insights {
    let mut insights = Insights::default();

    let series = response
        .get("multiDailyMetricTimeSeries")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|m| m.get("dailyMetricTimeSeries").and_then(|v| v.as_array()))
        .flatten();

    for metric_series in series {
        let metric = metric_series
            .get("dailyMetric")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let total: u64 = metric_series
            .get("timeSeries")
            .and_then(|t| t.get("datedValues"))
            .and_then(|v| v.as_array())
            .into_iter()
            .flatten()
            .filter_map(|dv| dv.get("value"))
            .filter_map(|v| match v {
                Value::String(s) => s.parse::<u64>().ok(),
                Value::Number(n) => n.as_u64(),
                _ => None,
            })
            .sum();

        match metric {
            m if VIEW_METRICS.contains(&m) => insights.total_views += total,
            CLICK_METRIC => insights.total_clicks += total,
            CALL_METRIC => insights.total_calls += total,
            DIRECTION_METRIC => insights.total_direction_requests += total,
            _ => {}
        }
    }

    insights
}
