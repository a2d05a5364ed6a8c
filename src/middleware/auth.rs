use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{cookie_value, validate_jwt, Claims};
use crate::config::SessionConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context extracted from the session token
#[derive(Clone, Debug)]
pub struct SessionUser {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub claims: Claims,
}

impl From<Claims> for SessionUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            name: claims.name.clone(),
            email: claims.email.clone(),
            claims,
        }
    }
}

/// Session middleware that validates the token and injects `SessionUser`
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = session_from_headers(request.headers(), &state.config.session)
        .map_err(ApiError::unauthorized)?;

    request.extensions_mut().insert(SessionUser::from(claims));
    Ok(next.run(request).await)
}

/// Validate the session carried by a `Bearer` header or the session cookie
pub fn session_from_headers(headers: &HeaderMap, session: &SessionConfig) -> Result<Claims, String> {
    let token = extract_token(headers, &session.cookie_name)?;
    validate_jwt(&token, session).map_err(|e| e.to_string())
}

fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Result<String, String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| "Invalid Authorization header format".to_string())?;

        return match auth_str.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            Some(_) => Err("Empty session token".to_string()),
            None => Err("Authorization header must use Bearer token format".to_string()),
        };
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookies| cookie_value(cookies, cookie_name))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| "Not logged in".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers, "s").unwrap_err(), "Not logged in");

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; s=cookie-token"));
        assert_eq!(extract_token(&headers, "s").unwrap(), "cookie-token");

        // An explicit header takes precedence over the cookie
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        assert_eq!(extract_token(&headers, "s").unwrap(), "header-token");

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_token(&headers, "s").is_err());
    }
}
