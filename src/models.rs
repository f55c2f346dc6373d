// Business Profile data model
// Read-only projections of upstream state, serialized as camelCase JSON

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ACCOUNT
// ============================================================================

/// A Business Profile account the signed-in user can manage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Resource name (e.g., "accounts/123456789")
    pub name: String,

    /// Display name
    #[serde(default)]
    pub account_name: String,

    /// PERSONAL, LOCATION_GROUP, USER_GROUP, ORGANIZATION
    #[serde(rename = "type", default)]
    pub account_type: String,

    /// VERIFIED, UNVERIFIED, VERIFICATION_REQUESTED
    #[serde(default, alias = "state")]
    pub verification_state: String,
}

// ============================================================================
// LOCATION
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

impl PostalAddress {
    /// "123 Main St, Suite 4"
    pub fn street(&self) -> String {
        self.address_lines.join(", ")
    }

    /// "City, State 12345" - empty when locality or region is missing
    pub fn city_line(&self) -> String {
        if self.locality.is_empty() || self.region.is_empty() {
            return String::new();
        }
        format!("{}, {} {}", self.locality, self.region, self.postal_code)
            .trim_end()
            .to_string()
    }
}

/// A physical business location under an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Resource name (e.g., "accounts/123/locations/987")
    pub name: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<PostalAddress>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_uri: Option<String>,
}

// ============================================================================
// REVIEW
// ============================================================================

/// Star rating as the upstream word token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StarRating {
    StarRatingUnspecified,
    One,
    Two,
    Three,
    Four,
    Five,
}

impl StarRating {
    /// Numeric value, 0 when unspecified
    pub fn stars(&self) -> u8 {
        match self {
            StarRating::StarRatingUnspecified => 0,
            StarRating::One => 1,
            StarRating::Two => 2,
            StarRating::Three => 3,
            StarRating::Four => 4,
            StarRating::Five => 5,
        }
    }

    /// "★★★★☆"
    pub fn glyphs(&self) -> String {
        let filled = self.stars() as usize;
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

impl Default for StarRating {
    fn default() -> Self {
        StarRating::StarRatingUnspecified
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    #[serde(default)]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,

    #[serde(default)]
    pub is_anonymous: bool,
}

impl Reviewer {
    /// Upper-cased first letter, used when there is no photo
    pub fn initial(&self) -> String {
        self.display_name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }
}

/// The business owner's public reply to a review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReply {
    #[serde(default)]
    pub comment: String,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Resource name, absent in some upstream payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub review_id: String,

    pub reviewer: Reviewer,

    #[serde(default)]
    pub star_rating: StarRating,

    #[serde(default)]
    pub comment: String,

    pub create_time: DateTime<Utc>,

    pub update_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_reply: Option<ReviewReply>,
}

// ============================================================================
// INSIGHTS
// ============================================================================

/// Aggregate usage counters for a location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub total_views: u64,
    pub total_clicks: u64,
    pub total_calls: u64,
    pub total_direction_requests: u64,
}

// ============================================================================
// RESPONSE ENVELOPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationsResponse {
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewsResponse {
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub insights: Insights,
}
