// handlers/protected/auth.rs - session-scoped account endpoints
//
// GET /api/auth/whoami      - profile carried by the session
// GET /api/auth/users/:id   - user record from the identity provider

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::SessionUser;
use crate::state::AppState;

/// GET /api/auth/whoami
///
/// ```json
/// {
///   "id": "auth0|5a1b2c",
///   "name": "Jane Doe",
///   "email": "jane@example.com",
///   "picture": "https://...",
///   "expires_at": 1767225600
/// }
/// ```
pub async fn whoami(Extension(user): Extension<SessionUser>) -> Json<Value> {
    Json(json!({
        "id": user.user_id,
        "name": user.name,
        "email": user.email,
        "picture": user.claims.picture,
        "expires_at": user.claims.exp,
    }))
}

/// GET /api/auth/users/:id
pub async fn user(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let auth0 = state
        .auth0
        .as_ref()
        .ok_or_else(|| ApiError::internal_server_error("Authentication is not configured"))?;

    tracing::debug!(requested_by = %session.user_id, user = %id, "management user lookup");
    Ok(Json(auth0.get_user(&id).await?))
}
