// handlers/public/motif_tags.rs - machine-suggested and crowd motif tags
//
// GET /api/motif-tags/:collection/:id/suggestions
// GET /api/motif-tags/typeahead?text=

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;
use crate::tagging::SuggestionApis;

#[derive(Debug, Deserialize)]
pub struct TypeaheadQuery {
    #[serde(default)]
    pub text: String,
}

/// Motif tagging endpoints do not exist unless the feature is switched on.
pub(crate) fn ensure_enabled(state: &AppState) -> Result<(), ApiError> {
    if state.config.features.motif_tagging {
        Ok(())
    } else {
        Err(ApiError::not_found("Motif tagging is not enabled"))
    }
}

/**
 * GET /api/motif-tags/:collection/:id/suggestions
 *
 * Runs the asset's thumbnail through the image-recognition services,
 * translates the labels and returns them sorted:
 *
 * ```json
 * { "tags": ["bygning", "gade", "himmel"] }
 * ```
 */
pub async fn suggestions(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    ensure_enabled(&state)?;

    let image_url = state.cip.thumbnail_url(&collection, &id);
    let tags = state
        .suggester
        .fetch_suggestions(&image_url, SuggestionApis::all())
        .await?;

    tracing::debug!(%collection, %id, count = tags.len(), "motif tag suggestions");
    Ok(Json(json!({ "tags": tags })))
}

/// GET /api/motif-tags/typeahead?text= - known tags starting with `text`, as a bare array
pub async fn typeahead(
    State(state): State<AppState>,
    Query(query): Query<TypeaheadQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    ensure_enabled(&state)?;

    let text = query.text.trim().to_lowercase();
    let tags = state.tag_store.typeahead(&text).await?;
    Ok(Json(tags))
}
