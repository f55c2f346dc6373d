// Dashboard web server - JSON API, Google sign-in routes and browser pages

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{self, AuthError, GoogleOAuth, OAuthEndpoints};
use crate::config::AppConfig;
use crate::dashboard;
use crate::proxy::{self, ProxyError};
use crate::session::{self, Credential, Session, SessionStore};
use crate::source::{mock::MOCK_ACCESS_TOKEN, BusinessDataSource, DataSourceKind};
use crate::views;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn BusinessDataSource>,
    pub sessions: SessionStore,
    pub oauth: Option<Arc<GoogleOAuth>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, source: Arc<dyn BusinessDataSource>) -> Result<Self, AuthError> {
        let oauth = match &config.oauth {
            Some(client) => Some(Arc::new(GoogleOAuth::new(
                client.clone(),
                config.redirect_uri(),
                OAuthEndpoints::default(),
                config.http_timeout_secs,
            )?)),
            None => None,
        };

        Ok(Self {
            source,
            sessions: SessionStore::new(config.session_ttl_secs),
            oauth,
            config: Arc::new(config),
        })
    }

    /// Mock data without an OAuth client: sign-in opens a local session
    fn demo_sign_in(&self) -> bool {
        self.oauth.is_none() && self.config.data_source == DataSourceKind::Mock
    }
}

// ============================================================================
// SESSION EXTRACTOR
// ============================================================================

/// A live session with a usable delegated token
pub struct Authenticated {
    pub session: Session,
    pub credential: Credential,
}

fn current_session(headers: &HeaderMap, sessions: &SessionStore) -> Option<Authenticated> {
    let session = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(session::session_id_from_cookie_header)
        .and_then(|id| sessions.get(id))?;
    let credential = session.credential()?;
    Some(Authenticated {
        session,
        credential,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ProxyError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        current_session(&parts.headers, &state.sessions).ok_or_else(ProxyError::no_session)
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body())).into_response()
    }
}

fn json_result<T: serde::Serialize>(result: Result<T, ProxyError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

// ============================================================================
// API HANDLERS
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationsQuery {
    account_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationQuery {
    location_name: Option<String>,
}

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/business/accounts
async fn get_accounts(State(state): State<AppState>, auth: Authenticated) -> Response {
    json_result(proxy::fetch_accounts(state.source.as_ref(), &auth.credential).await)
}

/// GET /api/business/locations?accountName=
async fn get_locations(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<LocationsQuery>,
) -> Response {
    json_result(
        proxy::fetch_locations(
            state.source.as_ref(),
            &auth.credential,
            query.account_name.as_deref(),
        )
        .await,
    )
}

/// GET /api/business/reviews?locationName=
async fn get_reviews(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<LocationQuery>,
) -> Response {
    json_result(
        proxy::fetch_reviews(
            state.source.as_ref(),
            &auth.credential,
            query.location_name.as_deref(),
        )
        .await,
    )
}

/// GET /api/business/insights?locationName=
async fn get_insights(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<LocationQuery>,
) -> Response {
    json_result(
        proxy::fetch_insights(
            state.source.as_ref(),
            &auth.credential,
            query.location_name.as_deref(),
        )
        .await,
    )
}

// ============================================================================
// SIGN-IN
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn signed_in(state: &AppState, session: &Session) -> Response {
    let cookie = session::session_cookie(session, state.config.secure_cookies());
    ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

fn sign_in_failed(status: StatusCode, err: &AuthError) -> Response {
    (status, Html(views::auth_error_page(&err.to_string()))).into_response()
}

/// GET /auth/signin
async fn sign_in(State(state): State<AppState>) -> Response {
    if let Some(oauth) = &state.oauth {
        let verifier = auth::generate_code_verifier();
        let challenge = auth::code_challenge(&verifier);
        let oauth_state = state.sessions.begin_sign_in(verifier);
        return Redirect::to(&oauth.authorize_url(&oauth_state, &challenge)).into_response();
    }

    if state.demo_sign_in() {
        let session = state
            .sessions
            .create(auth::demo_user(), MOCK_ACCESS_TOKEN.to_string());
        info!("Demo session opened");
        return signed_in(&state, &session);
    }

    (
        StatusCode::SERVICE_UNAVAILABLE,
        Html(views::auth_error_page("Google sign-in is not configured")),
    )
        .into_response()
}

/// GET /auth/callback?code=&state=
async fn sign_in_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error {
        warn!("Sign-in denied: {}", error);
        return sign_in_failed(StatusCode::BAD_REQUEST, &AuthError::Denied(error));
    }

    let Some(oauth) = state.oauth.clone() else {
        return Redirect::to("/").into_response();
    };

    let pending = query
        .state
        .as_deref()
        .and_then(|s| state.sessions.take_sign_in(s));
    let (Some(pending), Some(code)) = (pending, query.code) else {
        return sign_in_failed(StatusCode::BAD_REQUEST, &AuthError::UnknownState);
    };

    match oauth.complete_sign_in(&code, &pending.code_verifier).await {
        Ok(result) => {
            let session = state.sessions.create(result.user, result.access_token);
            signed_in(&state, &session)
        }
        Err(err) => {
            warn!("Sign-in failed: {}", err);
            sign_in_failed(StatusCode::BAD_GATEWAY, &err)
        }
    }
}

/// GET /auth/signout
async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(auth) = current_session(&headers, &state.sessions) {
        state.sessions.remove(&auth.session.id);
        info!("Session closed");
    }
    (
        [(header::SET_COOKIE, session::clear_session_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}

// ============================================================================
// PAGES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReviewsPageQuery {
    location: Option<String>,
    title: Option<String>,
}

/// GET / - sign-in or the locations dashboard
async fn serve_dashboard(State(state): State<AppState>, auth: Option<Authenticated>) -> Response {
    let Some(auth) = auth else {
        return Html(views::sign_in_page()).into_response();
    };

    let view = dashboard::load_locations(
        state.source.as_ref(),
        &auth.credential,
        state.config.fetch_concurrency,
    )
    .await;
    Html(views::dashboard_page(&auth.session.user, &view)).into_response()
}

/// GET /reviews?location=&title=
async fn serve_reviews(
    State(state): State<AppState>,
    auth: Option<Authenticated>,
    Query(query): Query<ReviewsPageQuery>,
) -> Response {
    let Some(auth) = auth else {
        return Html(views::sign_in_required_page("Please sign in to view reviews")).into_response();
    };

    let panel = dashboard::load_reviews(
        state.source.as_ref(),
        &auth.credential,
        query.location.as_deref(),
        query.title.as_deref(),
    )
    .await;
    Html(views::reviews_page(&auth.session.user, &panel)).into_response()
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/business/accounts", get(get_accounts))
        .route("/business/locations", get(get_locations))
        .route("/business/reviews", get(get_reviews))
        .route("/business/insights", get(get_insights));

    let auth_routes = Router::new()
        .route("/signin", get(sign_in))
        .route("/callback", get(sign_in_callback))
        .route("/signout", get(sign_out));

    Router::new()
        .route("/", get(serve_dashboard))
        .route("/reviews", get(serve_reviews))
        .nest("/api", api_routes)
        .nest("/auth", auth_routes)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
