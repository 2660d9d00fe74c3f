//! HTTP route handlers for the OAuth endpoints.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Query, State,
    },
    http::{
        header::{self, AUTHORIZATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};

use gatehouse_oauth::{
    AuthorizationRequest, AuthorizeOutcome, AuthorizeRejection, OAuthError, OAuthProvider,
    TokenRequest,
};

use crate::error::{oauth_error_response, status_for, ErrorBody, ServerError};
use crate::middleware::{basic_credentials, RequireUser};
use crate::storage::SqliteStorage;

/// Application state shared across handlers.
pub struct AppState {
    /// The protocol engine over `SQLite` storage.
    pub provider: OAuthProvider<SqliteStorage>,
    /// HS256 secret used to verify caller session tokens.
    pub session_secret: Vec<u8>,
}

/// Creates the OAuth router.
#[must_use = "returns the configured router"]
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/connect/authorize", get(authorize_get).post(authorize_post))
        .route("/connect/token", post(token))
        .route("/connect/consent", post(consent))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Body of a failed authorization request delivered by redirect.
#[derive(Debug, Serialize)]
struct AuthorizeErrorRedirect {
    action: &'static str,
    redirect_uri: String,
    error: String,
    error_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

/// Form fields for recording consent.
#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    /// Client being approved.
    #[serde(default)]
    pub client_id: String,
    /// Space-separated scopes being approved.
    #[serde(default)]
    pub scope: String,
}

// ============================================================================
// Handler implementations
// ============================================================================

async fn health_check() -> &'static str {
    "OK"
}

/// Maps an undecodable request body or query onto `invalid_request`.
fn malformed(rejection: &impl std::fmt::Display) -> OAuthError {
    tracing::warn!(error = %rejection, "malformed request");
    OAuthError::InvalidRequest(format!("malformed request: {rejection}"))
}

async fn authorize_get(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    request: Result<Query<AuthorizationRequest>, QueryRejection>,
) -> Response {
    match request {
        Ok(Query(request)) => authorize(&state, &request, user_id).await,
        Err(e) => authorize_rejection_response(AuthorizeRejection::direct(malformed(&e), None)),
    }
}

async fn authorize_post(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    request: Result<Form<AuthorizationRequest>, FormRejection>,
) -> Response {
    match request {
        Ok(Form(request)) => authorize(&state, &request, user_id).await,
        Err(e) => authorize_rejection_response(AuthorizeRejection::direct(malformed(&e), None)),
    }
}

#[tracing::instrument(skip_all, fields(client_id = %request.client_id, user_id = user_id))]
async fn authorize(state: &AppState, request: &AuthorizationRequest, user_id: i64) -> Response {
    match state.provider.authorize(request, user_id).await {
        Ok(outcome) => {
            if let AuthorizeOutcome::Redirect { .. } = &outcome {
                tracing::info!("authorization code issued");
            }
            Json(outcome).into_response()
        }
        Err(rejection) => authorize_rejection_response(rejection),
    }
}

fn authorize_rejection_response(rejection: AuthorizeRejection) -> Response {
    match rejection.redirect_location() {
        Some(location) => Json(AuthorizeErrorRedirect {
            action: "error",
            redirect_uri: location,
            error: rejection.error.code().as_str().to_string(),
            error_description: rejection.error.description().to_string(),
            state: rejection.state,
        })
        .into_response(),
        None => (
            status_for(rejection.error.code()),
            Json(ErrorBody::from_oauth(&rejection.error, rejection.state)),
        )
            .into_response(),
    }
}

async fn token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let mut response = match request {
        Ok(Form(request)) => exchange(&state, &headers, request).await,
        Err(e) => oauth_error_response(&malformed(&e), None),
    };

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

#[tracing::instrument(skip_all, fields(grant_type = %request.grant_type))]
async fn exchange(state: &AppState, headers: &HeaderMap, mut request: TokenRequest) -> Response {
    let basic = basic_credentials(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()));
    if request.client_id.as_deref().map_or(true, str::is_empty) {
        request.client_id = basic.client_id;
    }
    if request.client_secret.as_deref().map_or(true, str::is_empty) {
        request.client_secret = basic.client_secret;
    }

    match state.provider.token(&request).await {
        Ok(tokens) => Json(tokens).into_response(),
        Err(e) => oauth_error_response(&e, None),
    }
}

async fn consent(
    State(state): State<Arc<AppState>>,
    RequireUser(user_id): RequireUser,
    form: Result<Form<ConsentForm>, FormRejection>,
) -> Result<StatusCode, ServerError> {
    let Form(form) = form.map_err(|e| malformed(&e))?;
    record_consent(&state, user_id, &form).await
}

#[tracing::instrument(skip_all, fields(client_id = %form.client_id))]
async fn record_consent(
    state: &AppState,
    user_id: i64,
    form: &ConsentForm,
) -> Result<StatusCode, ServerError> {
    state
        .provider
        .grant_consent(user_id, &form.client_id, &form.scope)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
