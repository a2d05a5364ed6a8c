// handlers/public/auth.rs - login flow through the identity provider
//
// GET  /login?returnPath=      - redirect to the provider's login page
// GET  /auth/callback          - code exchange, session cookie, redirect back
// GET  /logout                 - drop the session, redirect to the provider's logout
// GET  /reset-password         - ask the provider to send a password-reset mail
// POST /reset-password         - same, with a JSON body
// GET  /api/auth/status        - is the caller logged in?

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{clear_session_cookie, generate_jwt, sanitize_return_path, session_cookie, Claims, LoginState};
use crate::error::ApiError;
use crate::middleware::session_from_headers;
use crate::services::Auth0Service;
use crate::state::AppState;

/// Connection used for password resets when the client names none.
pub const DEFAULT_CONNECTION: &str = "Username-Password-Authentication";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnPath")]
    pub return_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    #[serde(default)]
    pub connection: Option<String>,
}

fn auth0(state: &AppState) -> Result<&Auth0Service, ApiError> {
    state
        .auth0
        .as_ref()
        .ok_or_else(|| ApiError::internal_server_error("Authentication is not configured"))
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// GET /login
pub async fn login(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Result<Response, ApiError> {
    let auth0 = auth0(&state)?;
    let login_state = LoginState {
        return_path: sanitize_return_path(query.return_path.as_deref()),
    };
    Ok(redirect(&auth0.authorize_url(&login_state.encode())?))
}

/**
 * GET /auth/callback?code=&state=
 *
 * The provider sends the browser back here after login. The code is
 * exchanged for an access token, the profile is fetched and stored in a
 * signed session cookie, and the browser is sent to the path it started
 * from. A missing or unreadable `state` lands on `/`.
 */
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let auth0 = auth0(&state)?;

    if let Some(error) = query.error {
        tracing::warn!(%error, description = ?query.error_description, "login rejected by provider");
        return Err(ApiError::unauthorized(
            query.error_description.unwrap_or(error),
        ));
    }

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let return_path = query
        .state
        .as_deref()
        .and_then(LoginState::decode)
        .map(|login_state| sanitize_return_path(Some(&login_state.return_path)))
        .unwrap_or_else(|| "/".to_string());

    let tokens = auth0.exchange_code(&code).await?;
    let profile = auth0.user_info(&tokens.access_token).await?;
    tracing::info!(user = %profile.sub, "user logged in");

    let claims = Claims::new(profile, state.config.session.expiry_hours);
    let token = generate_jwt(&claims, &state.config.session)
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?;

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, return_path),
            (header::SET_COOKIE, session_cookie(&state.config.session, &token)),
        ],
    )
        .into_response())
}

/// GET /logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let auth0 = auth0(&state)?;

    let host = super::request_host(&headers).unwrap_or_else(|| "localhost".to_string());
    let return_to = format!("{}://{}/", state.config.sitemap.scheme, host);

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, auth0.logout_url(&return_to)?),
            (header::SET_COOKIE, clear_session_cookie(&state.config.session)),
        ],
    )
        .into_response())
}

/// GET /reset-password?email=&connection= - the form the site's login page sends
pub async fn reset_password(
    State(state): State<AppState>,
    Query(request): Query<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    send_password_reset(&state, request).await
}

/// POST /reset-password with the same fields as a JSON body
pub async fn reset_password_json(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    send_password_reset(&state, request).await
}

async fn send_password_reset(state: &AppState, request: ResetPasswordRequest) -> Result<Json<Value>, ApiError> {
    let auth0 = auth0(state)?;

    let email = request.email.trim();
    if email.is_empty() {
        return Err(ApiError::bad_request("An email address is required"));
    }
    let connection = request.connection.as_deref().unwrap_or(DEFAULT_CONNECTION);

    auth0.change_password(email, connection).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/auth/status
pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let authenticated = session_from_headers(&headers, &state.config.session).is_ok();
    Json(json!({ "authenticated": authenticated }))
}
