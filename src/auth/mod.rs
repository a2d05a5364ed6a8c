use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::services::Auth0Profile;

/// Session token claims; the profile comes from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(profile: Auth0Profile, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: profile.sub,
            name: profile.name,
            email: profile.email,
            picture: profile.picture,
            jti: Uuid::new_v4(),
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn profile(&self) -> Auth0Profile {
        Auth0Profile {
            sub: self.sub.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            picture: self.picture.clone(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid session token: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &Claims, session: &SessionConfig) -> Result<String, JwtError> {
    if session.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(session.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, session: &SessionConfig) -> Result<Claims, JwtError> {
    if session.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(session.jwt_secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

/// Data carried through the identity provider's `state` parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginState {
    #[serde(rename = "returnPath")]
    pub return_path: String,
}

impl LoginState {
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Accepts padded and unpadded, standard and URL-safe base64.
    pub fn decode(raw: &str) -> Option<Self> {
        let trimmed = raw.trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(trimmed))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Reduce a return target to a local path so logins cannot redirect off-site.
pub fn sanitize_return_path(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return "/".to_string();
    };

    let candidate = if raw.starts_with('/') {
        raw.to_string()
    } else {
        match url::Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => path_and_query(&url),
            _ => return "/".to_string(),
        }
    };

    local_path(&candidate).unwrap_or_else(|| "/".to_string())
}

/// `path` as a browser would resolve it on this site; `None` when it leaves the host.
fn local_path(path: &str) -> Option<String> {
    let base = url::Url::parse("http://localhost/").ok()?;
    let resolved = base.join(path).ok()?;
    if resolved.host() != base.host() || resolved.port() != base.port() {
        return None;
    }
    let local = path_and_query(&resolved);
    // "//host" would be protocol-relative again
    (!local.starts_with("//")).then_some(local)
}

fn path_and_query(url: &url::Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// `Set-Cookie` value carrying the session token.
pub fn session_cookie(session: &SessionConfig, token: &str) -> String {
    let max_age = session.expiry_hours.saturating_mul(3600);
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.cookie_name, token, max_age
    );
    if session.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie(session: &SessionConfig) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", session.cookie_name)
}

/// Value of cookie `name` in a `Cookie` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionConfig {
        SessionConfig {
            jwt_secret: "test-secret".to_string(),
            ..SessionConfig::default()
        }
    }

    fn profile() -> Auth0Profile {
        Auth0Profile {
            sub: "auth0|42".to_string(),
            name: Some("Karen".to_string()),
            email: Some("karen@example.com".to_string()),
            picture: None,
        }
    }

    #[test]
    fn test_session_token() {
        let token = generate_jwt(&Claims::new(profile(), 1), &session()).unwrap();
        let claims = validate_jwt(&token, &session()).unwrap();
        assert_eq!(claims.profile(), profile());

        let other = SessionConfig {
            jwt_secret: "other".to_string(),
            ..SessionConfig::default()
        };
        assert!(matches!(validate_jwt(&token, &other), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let empty = SessionConfig::default();
        assert!(matches!(
            generate_jwt(&Claims::new(profile(), 1), &empty),
            Err(JwtError::InvalidSecret)
        ));
    }

    #[test]
    fn test_login_state_accepts_browser_base64() {
        // btoa(JSON.stringify({returnPath: "http://host/kbh/1"}))
        let state = LoginState::decode("eyJyZXR1cm5QYXRoIjoiaHR0cDovL2hvc3Qva2JoLzEifQ==").unwrap();
        assert_eq!(state.return_path, "http://host/kbh/1");

        let encoded = LoginState {
            return_path: "/kbh/1".to_string(),
        }
        .encode();
        assert_eq!(LoginState::decode(&encoded).unwrap().return_path, "/kbh/1");
        assert!(LoginState::decode("%%%").is_none());
    }

    #[test]
    fn test_sanitize_return_path() {
        assert_eq!(sanitize_return_path(None), "/");
        assert_eq!(sanitize_return_path(Some("/kbh-museum/1?x=1")), "/kbh-museum/1?x=1");
        assert_eq!(sanitize_return_path(Some("https://evil.example.com/kbh/1")), "/kbh/1");
        assert_eq!(sanitize_return_path(Some("//evil.example.com")), "/");
        assert_eq!(sanitize_return_path(Some("javascript:alert(1)")), "/");
        assert_eq!(sanitize_return_path(Some("/\\evil.example.com/steal")), "/");
        assert_eq!(sanitize_return_path(Some("\\\\evil.example.com")), "/");
        assert_eq!(sanitize_return_path(Some("/\t/evil.example.com")), "/");
        assert_eq!(sanitize_return_path(Some("https://evil.example.com//other.example.com/x")), "/");
        assert_eq!(sanitize_return_path(Some("/kbh/../search?q=a")), "/search?q=a");
    }

    #[test]
    fn test_cookie_helpers() {
        let cookie = session_cookie(&session(), "abc");
        assert!(cookie.starts_with("collections_session=abc; Path=/; HttpOnly"));
        assert!(!cookie.contains("Secure"));

        assert_eq!(cookie_value("a=1; collections_session=xyz; b=2", "collections_session"), Some("xyz"));
        assert_eq!(cookie_value("a=1", "collections_session"), None);
    }
}
