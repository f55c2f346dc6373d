// Scriptable data source for tests - canned results plus call counters

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{BusinessDataSource, SourceError, SourceResult};
use crate::models::{Account, Insights, Location, Review};
use crate::session::Credential;

pub struct StubSource {
    accounts: SourceResult<Vec<Account>>,
    locations: HashMap<String, SourceResult<Vec<Location>>>,
    reviews: SourceResult<Vec<Review>>,
    insights: SourceResult<Insights>,
    calls: AtomicUsize,
    location_calls: AtomicUsize,
}

impl StubSource {
    pub fn new() -> Self {
        Self {
            accounts: Ok(Vec::new()),
            locations: HashMap::new(),
            reviews: Ok(Vec::new()),
            insights: Ok(Insights::default()),
            calls: AtomicUsize::new(0),
            location_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_accounts(mut self, accounts: SourceResult<Vec<Account>>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_locations(mut self, account: &str, locations: SourceResult<Vec<Location>>) -> Self {
        self.locations.insert(account.to_string(), locations);
        self
    }

    pub fn with_reviews(mut self, reviews: SourceResult<Vec<Review>>) -> Self {
        self.reviews = reviews;
        self
    }

    pub fn with_insights(mut self, insights: SourceResult<Insights>) -> Self {
        self.insights = insights;
        self
    }

    /// Upstream calls of any kind
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn location_calls(&self) -> usize {
        self.location_calls.load(Ordering::SeqCst)
    }
}

pub fn account(name: &str) -> Account {
    Account {
        name: name.to_string(),
        account_name: format!("Account {}", name),
        account_type: "PERSONAL".to_string(),
        verification_state: "VERIFIED".to_string(),
    }
}

pub fn location(name: &str, title: &str) -> Location {
    Location {
        name: name.to_string(),
        title: title.to_string(),
        address: None,
        primary_phone: None,
        website_uri: None,
    }
}

#[async_trait]
impl BusinessDataSource for StubSource {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn list_accounts(&self, _credential: &Credential) -> SourceResult<Vec<Account>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accounts.clone()
    }

    async fn list_locations(
        &self,
        _credential: &Credential,
        account_name: &str,
    ) -> SourceResult<Vec<Location>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.location_calls.fetch_add(1, Ordering::SeqCst);
        self.locations
            .get(account_name)
            .cloned()
            .unwrap_or_else(|| Err(SourceError::not_found(format!("{} not found", account_name))))
    }

    async fn list_reviews(
        &self,
        _credential: &Credential,
        _location_name: &str,
    ) -> SourceResult<Vec<Review>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reviews.clone()
    }

    async fn get_insights(
        &self,
        _credential: &Credential,
        _location_name: &str,
    ) -> SourceResult<Insights> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.insights.clone()
    }
}
