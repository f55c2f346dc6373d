// Mock data source - deterministic Business Profile data for demos and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{BusinessDataSource, SourceError, SourceResult};
use crate::models::{Account, Insights, Location, PostalAddress, Review, Reviewer, StarRating};
use crate::session::Credential;

pub const MOCK_ACCOUNT: &str = "accounts/123456789";
pub const MOCK_LOCATION: &str = "accounts/123456789/locations/987654321";

/// Token issued to demo sessions when no OAuth client is configured
pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";

/// One account, one location, two reviews
#[derive(Debug, Clone, Default)]
pub struct MockBusinessData;

impl MockBusinessData {
    pub fn new() -> Self {
        Self
    }

    fn accounts() -> Vec<Account> {
        vec![Account {
            name: MOCK_ACCOUNT.to_string(),
            account_name: "My Business Account".to_string(),
            account_type: "PERSONAL".to_string(),
            verification_state: "VERIFIED".to_string(),
        }]
    }

    fn locations() -> Vec<Location> {
        vec![Location {
            name: MOCK_LOCATION.to_string(),
            title: "My Business Location".to_string(),
            address: Some(PostalAddress {
                address_lines: vec!["123 Main St".to_string()],
                locality: "City".to_string(),
                region: "State".to_string(),
                postal_code: "12345".to_string(),
                country: "US".to_string(),
            }),
            primary_phone: Some("+1-555-123-4567".to_string()),
            website_uri: Some("https://mybusiness.com".to_string()),
        }]
    }

    fn reviews() -> Vec<Review> {
        vec![
            review(
                "1",
                "John Doe",
                StarRating::Five,
                "Great service! Highly recommend.",
                "2024-01-15T10:30:00Z",
            ),
            review(
                "2",
                "Jane Smith",
                StarRating::Four,
                "Good experience overall.",
                "2024-01-10T14:20:00Z",
            ),
        ]
    }
}

fn review(id: &str, author: &str, rating: StarRating, comment: &str, at: &str) -> Review {
    let time = at.parse::<DateTime<Utc>>().unwrap_or_default();
    Review {
        name: Some(format!("{}/reviews/{}", MOCK_LOCATION, id)),
        review_id: id.to_string(),
        reviewer: Reviewer {
            display_name: author.to_string(),
            profile_photo_url: None,
            is_anonymous: false,
        },
        star_rating: rating,
        comment: comment.to_string(),
        create_time: time,
        update_time: time,
        review_reply: None,
    }
}

#[async_trait]
impl BusinessDataSource for MockBusinessData {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_accounts(&self, _credential: &Credential) -> SourceResult<Vec<Account>> {
        debug!("Serving mock business accounts");
        Ok(Self::accounts())
    }

    async fn list_locations(
        &self,
        _credential: &Credential,
        account_name: &str,
    ) -> SourceResult<Vec<Location>> {
        debug!(account = account_name, "Serving mock locations");

        if account_name != MOCK_ACCOUNT {
            return Err(SourceError::not_found(format!(
                "Account {} not found",
                account_name
            )));
        }
        Ok(Self::locations())
    }

    async fn list_reviews(
        &self,
        _credential: &Credential,
        location_name: &str,
    ) -> SourceResult<Vec<Review>> {
        debug!(location = location_name, "Serving mock reviews");

        if location_name != MOCK_LOCATION {
            return Err(SourceError::not_found(format!(
                "Location {} not found",
                location_name
            )));
        }
        Ok(Self::reviews())
    }

    async fn get_insights(
        &self,
        _credential: &Credential,
        location_name: &str,
    ) -> SourceResult<Insights> {
        debug!(location = location_name, "Serving mock insights");

        if location_name != MOCK_LOCATION {
            return Err(SourceError::not_found(format!(
                "Location {} not found",
                location_name
            )));
        }
        Ok(Insights {
            total_views: 1250,
            total_clicks: 89,
            total_calls: 23,
            total_direction_requests: 45,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceErrorKind;

    fn credential() -> Credential {
        Credential::new(MOCK_ACCESS_TOKEN).unwrap()
    }

    #[tokio::test]
    async fn test_mock_accounts() {
        let source = MockBusinessData::new();
        let accounts = source.list_accounts(&credential()).await.unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "accounts/123456789");
        assert_eq!(accounts[0].verification_state, "VERIFIED");
    }

    #[tokio::test]
    async fn test_mock_locations_scoped_to_account() {
        let source = MockBusinessData::new();

        let locations = source
            .list_locations(&credential(), MOCK_ACCOUNT)
            .await
            .unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].title, "My Business Location");

        let err = source
            .list_locations(&credential(), "accounts/000")
            .await
            .unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_mock_reviews() {
        let source = MockBusinessData::new();
        let reviews = source
            .list_reviews(&credential(), MOCK_LOCATION)
            .await
            .unwrap();

        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].reviewer.display_name, "John Doe");
        assert_eq!(reviews[0].star_rating, StarRating::Five);
        assert_eq!(
            reviews[1].create_time,
            "2024-01-10T14:20:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_mock_insights() {
        let source = MockBusinessData::new();
        let insights = source
            .get_insights(&credential(), MOCK_LOCATION)
            .await
            .unwrap();

        assert_eq!(insights.total_views, 1250);
        assert_eq!(insights.total_direction_requests, 45);

        let err = source
            .get_insights(&credential(), "locations/unknown")
            .await
            .unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::NotFound);
    }
}
