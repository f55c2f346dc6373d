// Dashboard flows - what the browser pages and the terminal UI show
//
// Every fetch goes through the proxy layer, so the UI sees exactly the
// taxonomy the JSON API returns. Failures never escape as errors here: they
// become a soft-failure state the views render with a retry affordance.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::models::{Insights, Location, Review};
use crate::proxy::{self, ProxyError};
use crate::session::Credential;
use crate::source::BusinessDataSource;

/// Fallback heading when a reviews link carries no title
pub const DEFAULT_TITLE: &str = "Business";

// ============================================================================
// LOCATIONS
// ============================================================================

/// One selectable business on the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct LocationCard {
    /// Resource name, the key for the reviews panel
    pub name: String,
    pub title: String,
    /// Joined address lines, empty when unknown
    pub street: String,
    /// "City, State 12345", empty when unknown
    pub city_line: String,
    pub phone: Option<String>,
    pub website: Option<String>,
}

impl LocationCard {
    pub fn from_location(location: &Location) -> Self {
        let (street, city_line) = location
            .address
            .as_ref()
            .map(|a| (a.street(), a.city_line()))
            .unwrap_or_default();

        Self {
            name: location.name.clone(),
            title: location.title.clone(),
            street,
            city_line,
            phone: location.primary_phone.clone().filter(|p| !p.is_empty()),
            website: location.website_uri.clone().filter(|w| !w.is_empty()),
        }
    }

    /// Link to this location's reviews page
    pub fn reviews_href(&self) -> String {
        format!(
            "/reviews?location={}&title={}",
            urlencoding::encode(&self.name),
            urlencoding::encode(&self.title)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationsView {
    /// No accounts, or every account answered with zero locations
    Empty,
    /// The accounts call failed, or every locations call failed
    Failed(ProxyError),
    Loaded(Vec<LocationCard>),
}

impl LocationsView {
    pub fn cards(&self) -> &[LocationCard] {
        match self {
            LocationsView::Loaded(cards) => cards,
            _ => &[],
        }
    }
}

/// Gather every location across the user's accounts.
///
/// Location fetches run with at most `concurrency` in flight and keep account
/// order. An account whose locations cannot be fetched is skipped, so one bad
/// account does not hide the others. When nothing loaded and some fetch failed,
/// the view fails with that error, preferring one that needs a fresh sign-in.
pub async fn load_locations(
    source: &dyn BusinessDataSource,
    credential: &Credential,
    concurrency: usize,
) -> LocationsView {
    let accounts = match proxy::fetch_accounts(source, credential).await {
        Ok(response) => response.accounts,
        Err(err) => return LocationsView::Failed(err),
    };

    if accounts.is_empty() {
        info!("No business accounts for this user");
        return LocationsView::Empty;
    }

    let results: Vec<_> = stream::iter(accounts)
        .map(|account| async move {
            let outcome = proxy::fetch_locations(source, credential, Some(&account.name)).await;
            (account.name, outcome)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut cards = Vec::new();
    let mut failure: Option<ProxyError> = None;
    for (account_name, outcome) in results {
        match outcome {
            Ok(response) => cards.extend(response.locations.iter().map(LocationCard::from_location)),
            Err(err) => {
                debug!(account = %account_name, "Skipping account: {}", err.message());
                let replace = match &failure {
                    None => true,
                    Some(current) => err.needs_sign_in() && !current.needs_sign_in(),
                };
                if replace {
                    failure = Some(err);
                }
            }
        }
    }

    if cards.is_empty() {
        match failure {
            Some(err) => {
                warn!("No locations loaded: {}", err.message());
                LocationsView::Failed(err)
            }
            None => LocationsView::Empty,
        }
    } else {
        info!(count = cards.len(), "Loaded business locations");
        LocationsView::Loaded(cards)
    }
}

// ============================================================================
// REVIEWS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewsView {
    /// The page was opened without a location
    NoLocation,
    Empty,
    Failed(ProxyError),
    Loaded(Vec<Review>),
}

/// Reviews page for one location
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewsPanel {
    pub location_name: Option<String>,
    pub title: String,
    pub reviews: ReviewsView,
    /// Absent when the insights call failed; the panel still renders
    pub insights: Option<Insights>,
}

impl ReviewsPanel {
    /// Link that reloads this panel
    pub fn retry_href(&self) -> String {
        match &self.location_name {
            Some(name) => format!(
                "/reviews?location={}&title={}",
                urlencoding::encode(name),
                urlencoding::encode(&self.title)
            ),
            None => "/".to_string(),
        }
    }
}

pub async fn load_reviews(
    source: &dyn BusinessDataSource,
    credential: &Credential,
    location_name: Option<&str>,
    title: Option<&str>,
) -> ReviewsPanel {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string();

    let location_name = match location_name.map(str::trim).filter(|l| !l.is_empty()) {
        Some(name) => name,
        None => {
            return ReviewsPanel {
                location_name: None,
                title,
                reviews: ReviewsView::NoLocation,
                insights: None,
            }
        }
    };

    let (reviews, insights) = futures::join!(
        proxy::fetch_reviews(source, credential, Some(location_name)),
        proxy::fetch_insights(source, credential, Some(location_name)),
    );

    let reviews = match reviews {
        Ok(response) if response.reviews.is_empty() => ReviewsView::Empty,
        Ok(response) => ReviewsView::Loaded(response.reviews),
        Err(err) => ReviewsView::Failed(err),
    };

    ReviewsPanel {
        location_name: Some(location_name.to_string()),
        title,
        reviews,
        insights: insights.ok().map(|response| response.insights),
    }
}

/// "January 15, 2024"
pub fn format_date(time: &DateTime<Utc>) -> String {
    time.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostalAddress, StarRating};
    use crate::source::stub::{account, location, StubSource};
    use crate::source::{MockBusinessData, SourceError};

    fn credential() -> Credential {
        Credential::new("token").unwrap()
    }

    #[tokio::test]
    async fn test_zero_accounts_fetches_no_locations() {
        let source = StubSource::new().with_accounts(Ok(Vec::new()));

        let view = load_locations(&source, &credential(), 4).await;

        assert_eq!(view, LocationsView::Empty);
        assert_eq!(source.location_calls(), 0);
    }

    #[tokio::test]
    async fn test_single_location_yields_one_card() {
        let source = StubSource::new()
            .with_accounts(Ok(vec![account("accounts/123456789")]))
            .with_locations(
                "accounts/123456789",
                Ok(vec![location(
                    "accounts/123456789/locations/987654321",
                    "My Business Location",
                )]),
            );

        let view = load_locations(&source, &credential(), 4).await;

        let cards = view.cards();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "My Business Location");
        assert_eq!(cards[0].name, "accounts/123456789/locations/987654321");
    }

    #[tokio::test]
    async fn test_mock_source_scenario() {
        let view = load_locations(&MockBusinessData::new(), &credential(), 1).await;

        assert_eq!(view.cards().len(), 1);
        assert_eq!(view.cards()[0].title, "My Business Location");
    }

    #[tokio::test]
    async fn test_failed_account_is_skipped_and_order_kept() {
        let source = StubSource::new()
            .with_accounts(Ok(vec![
                account("accounts/1"),
                account("accounts/broken"),
                account("accounts/3"),
            ]))
            .with_locations("accounts/1", Ok(vec![location("accounts/1/locations/a", "First")]))
            .with_locations(
                "accounts/broken",
                Err(SourceError::transient("connection reset")),
            )
            .with_locations("accounts/3", Ok(vec![location("accounts/3/locations/c", "Third")]));

        let view = load_locations(&source, &credential(), 2).await;

        let titles: Vec<_> = view.cards().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third"]);
        assert_eq!(source.location_calls(), 3);
    }

    #[tokio::test]
    async fn test_accounts_failure_is_soft() {
        let source = StubSource::new().with_accounts(Err(SourceError::insufficient_scope(
            "ACCESS_TOKEN_SCOPE_INSUFFICIENT",
        )));

        match load_locations(&source, &credential(), 4).await {
            LocationsView::Failed(err) => assert_eq!(err.status_code(), 403),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(source.location_calls(), 0);
    }

    #[tokio::test]
    async fn test_every_locations_call_failing_is_a_failure() {
        let source = StubSource::new()
            .with_accounts(Ok(vec![account("accounts/1"), account("accounts/2")]))
            .with_locations("accounts/1", Err(SourceError::transient("connection reset")))
            .with_locations("accounts/2", Err(SourceError::auth_expired("invalid_grant")));

        match load_locations(&source, &credential(), 2).await {
            LocationsView::Failed(err) => {
                assert_eq!(err.status_code(), 401);
                assert!(err.needs_sign_in());
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_single_failed_account_renders_sign_in_again() {
        let source = StubSource::new()
            .with_accounts(Ok(vec![account("accounts/1")]))
            .with_locations("accounts/1", Err(SourceError::auth_expired("invalid_grant")));

        let view = load_locations(&source, &credential(), 4).await;
        assert!(matches!(view, LocationsView::Failed(_)));

        let user = crate::session::UserProfile {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
        };
        let html = crate::views::dashboard_page(&user, &view);
        assert!(html.contains("Sign in again"));
        assert!(!html.contains("No businesses found"));
    }

    #[tokio::test]
    async fn test_all_accounts_without_locations_is_empty() {
        let source = StubSource::new()
            .with_accounts(Ok(vec![account("accounts/1"), account("accounts/2")]))
            .with_locations("accounts/1", Ok(Vec::new()))
            .with_locations("accounts/2", Ok(Vec::new()));

        let view = load_locations(&source, &credential(), 4).await;
        assert_eq!(view, LocationsView::Empty);
    }

    #[test]
    fn test_card_from_location() {
        let loc = Location {
            name: "accounts/1/locations/2".to_string(),
            title: "Joe's Diner".to_string(),
            address: Some(PostalAddress {
                address_lines: vec!["1 Elm St".to_string()],
                locality: "Springfield".to_string(),
                region: "IL".to_string(),
                postal_code: "62701".to_string(),
                country: "US".to_string(),
            }),
            primary_phone: Some(String::new()),
            website_uri: Some("https://joes.example".to_string()),
        };

        let card = LocationCard::from_location(&loc);
        assert_eq!(card.street, "1 Elm St");
        assert_eq!(card.city_line, "Springfield, IL 62701");
        assert_eq!(card.phone, None);
        assert_eq!(
            card.reviews_href(),
            "/reviews?location=accounts%2F1%2Flocations%2F2&title=Joe%27s%20Diner"
        );
    }

    #[tokio::test]
    async fn test_reviews_panel_loaded_with_insights() {
        let panel = load_reviews(
            &MockBusinessData::new(),
            &credential(),
            Some("accounts/123456789/locations/987654321"),
            Some("My Business Location"),
        )
        .await;

        match &panel.reviews {
            ReviewsView::Loaded(reviews) => {
                assert_eq!(reviews.len(), 2);
                assert_eq!(reviews[0].star_rating, StarRating::Five);
            }
            other => panic!("expected reviews, got {:?}", other),
        }
        assert_eq!(panel.insights.map(|i| i.total_views), Some(1250));
    }

    #[tokio::test]
    async fn test_reviews_panel_without_location() {
        let source = StubSource::new();

        let panel = load_reviews(&source, &credential(), None, None).await;

        assert_eq!(panel.reviews, ReviewsView::NoLocation);
        assert_eq!(panel.title, DEFAULT_TITLE);
        assert_eq!(panel.retry_href(), "/");
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_reviews_panel_soft_failures() {
        let source = StubSource::new()
            .with_reviews(Err(SourceError::auth_expired("invalid_grant")))
            .with_insights(Err(SourceError::transient("timeout")));

        let panel = load_reviews(&source, &credential(), Some("accounts/1/locations/2"), None).await;

        match &panel.reviews {
            ReviewsView::Failed(err) => assert!(err.needs_sign_in()),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(panel.insights.is_none());
        assert!(panel.retry_href().starts_with("/reviews?location=accounts%2F1"));
    }

    #[tokio::test]
    async fn test_reviews_panel_empty() {
        let source = StubSource::new();

        let panel = load_reviews(&source, &credential(), Some("accounts/1/locations/2"), None).await;
        assert_eq!(panel.reviews, ReviewsView::Empty);
    }

    #[test]
    fn test_format_date() {
        let time: DateTime<Utc> = "2024-01-05T10:30:00Z".parse().unwrap();
        assert_eq!(format_date(&time), "January 5, 2024");
    }
}
