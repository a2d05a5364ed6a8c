// handlers/protected/motif_tags.rs - POST /api/motif-tags/:collection/:id

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::handlers::public::motif_tags::ensure_enabled;
use crate::middleware::SessionUser;
use crate::state::AppState;
use crate::types::AssetRef;

/// One tag or several.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagInput {
    One(String),
    Many(Vec<String>),
}

impl TagInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            TagInput::One(tag) => vec![tag],
            TagInput::Many(tags) => tags,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveTagRequest {
    pub tag: TagInput,
}

/**
 * POST /api/motif-tags/:collection/:id
 *
 * Expected Input:
 * ```json
 * { "tag": "kirke" }            // or { "tag": ["kirke", "tårn"] }
 * ```
 *
 * Responds with the asset's tags after the index has been refreshed:
 * ```json
 * { "collection": "kbh-museum", "id": "26893", "tags": ["kirke", "tårn"] }
 * ```
 */
pub async fn save_crowd_tag(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path((collection, id)): Path<(String, String)>,
    Json(request): Json<SaveTagRequest>,
) -> Result<Json<Value>, ApiError> {
    ensure_enabled(&state)?;

    let tags = request.tag.into_vec();
    if tags.iter().all(|tag| tag.trim().is_empty()) {
        return Err(ApiError::bad_request("At least one tag is required"));
    }

    let asset = AssetRef::new(collection, id);
    state.tag_store.save(&asset, &tags).await?;
    tracing::info!(asset = %asset, user = %user.user_id, count = tags.len(), "crowd tags saved");

    Ok(Json(state.tag_store.update_index(&asset).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_input_accepts_string_or_list() {
        let one: SaveTagRequest = serde_json::from_str(r#"{"tag":"kirke"}"#).unwrap();
        assert_eq!(one.tag.into_vec(), vec!["kirke"]);

        let many: SaveTagRequest = serde_json::from_str(r#"{"tag":["kirke","tårn"]}"#).unwrap();
        assert_eq!(many.tag.into_vec(), vec!["kirke", "tårn"]);

        assert!(serde_json::from_str::<SaveTagRequest>(r#"{"tag":3}"#).is_err());
    }
}
