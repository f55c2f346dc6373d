// Google sign-in - OAuth 2.0 authorization code flow with PKCE (S256)
//
// Produces the delegated access token a session carries. No refresh:
// when the token expires the user signs in again.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::OAuthClientConfig;
use crate::session::UserProfile;

/// Identity scopes plus Business Profile management
pub const SCOPES: [&str; 4] = [
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/business.manage",
];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("sign-in was cancelled or denied: {0}")]
    Denied(String),

    #[error("sign-in link expired or was already used")]
    UnknownState,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}: {message}")]
    Provider {
        endpoint: &'static str,
        status: u16,
        message: String,
    },

    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse {
        endpoint: &'static str,
        reason: String,
    },
}

// ============================================================================
// ENDPOINTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub authorize: String,
    pub token: String,
    pub userinfo: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            authorize: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token: "https://oauth2.googleapis.com/token".to_string(),
            userinfo: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        }
    }
}

// ============================================================================
// PKCE
// ============================================================================

/// 64 unreserved characters from two random v4 UUIDs
pub fn generate_code_verifier() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// S256 challenge for `verifier`
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Tokens and identity returned by a completed sign-in
#[derive(Debug, Clone)]
pub struct SignIn {
    pub user: UserProfile,
    pub access_token: String,
}

pub struct GoogleOAuth {
    client: reqwest::Client,
    config: OAuthClientConfig,
    redirect_uri: String,
    endpoints: OAuthEndpoints,
}

impl GoogleOAuth {
    pub fn new(
        config: OAuthClientConfig,
        redirect_uri: String,
        endpoints: OAuthEndpoints,
        timeout_secs: u64,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            config,
            redirect_uri,
            endpoints,
        })
    }

    pub fn authorize_url(&self, state: &str, code_challenge: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent",
            self.endpoints.authorize,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&SCOPES.join(" ")),
            urlencoding::encode(state),
            urlencoding::encode(code_challenge),
        )
    }

    /// Redeem an authorization code and look up who signed in
    pub async fn complete_sign_in(&self, code: &str, code_verifier: &str) -> Result<SignIn, AuthError> {
        let access_token = self.exchange_code(code, code_verifier).await?;
        let user = self.fetch_user(&access_token).await?;
        info!(email = %user.email, "Google sign-in completed");
        Ok(SignIn { user, access_token })
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<String, AuthError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(&self.endpoints.token)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::InvalidResponse {
                endpoint: "token",
                reason: e.to_string(),
            })?;

        if let Some(error) = parsed.error {
            let message = match parsed.error_description {
                Some(description) => format!("{}: {}", error, description),
                None => error,
            };
            warn!(status = status.as_u16(), "Token exchange rejected: {}", message);
            return Err(AuthError::Provider {
                endpoint: "token",
                status: status.as_u16(),
                message,
            });
        }

        if !status.is_success() || parsed.access_token.is_empty() {
            return Err(AuthError::InvalidResponse {
                endpoint: "token",
                reason: format!("status {} without access_token", status.as_u16()),
            });
        }

        Ok(parsed.access_token)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let response = self
            .client
            .get(&self.endpoints.userinfo)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider {
                endpoint: "userinfo",
                status: status.as_u16(),
                message,
            });
        }

        let info: UserInfo = response.json().await.map_err(|e| AuthError::InvalidResponse {
            endpoint: "userinfo",
            reason: e.to_string(),
        })?;

        let email = info.email.unwrap_or_default();
        let name = info
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.clone());
        Ok(UserProfile { name, email })
    }
}

/// Identity used for sessions opened without Google
pub fn demo_user() -> UserProfile {
    UserProfile {
        name: "Demo User".to_string(),
        email: "demo@example.com".to_string(),
    }
}
