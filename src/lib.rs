// Business Profile Dashboard - Core Library
// Exposes all modules for use in the web server, the terminal UI, and tests

pub mod models;
pub mod session;
pub mod config;
pub mod source;    // Vendor API client: mock + Google
pub mod proxy;     // Session/parameter checks and error taxonomy
pub mod dashboard; // Locations aggregation and reviews panel
pub mod views;
pub mod auth;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use models::{
    Account, Location, PostalAddress, Review, ReviewReply, Reviewer, StarRating, Insights,
    AccountsResponse, LocationsResponse, ReviewsResponse, InsightsResponse,
};
pub use session::{Credential, Session, SessionStore, UserProfile};
pub use config::{AppConfig, ConfigError, OAuthClientConfig};
pub use source::{
    BusinessDataSource, DataSourceKind, SourceError, SourceErrorKind, SourceResult,
    GoogleBusinessClient, GoogleEndpoints, MockBusinessData,
};
pub use proxy::{ErrorBody, ProxyError, RequiredParam, Resource};
pub use dashboard::{LocationCard, LocationsView, ReviewsPanel, ReviewsView};
pub use auth::{AuthError, GoogleOAuth};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
