// handlers/public/assets.rs - asset pages composed from the configured layout
//
// GET /:collection/:id                     - metadata + rendered sections (JSON)
// GET /:collection/:id/sections/:section   - one rendered section (HTML)

use axum::{
    extract::{Path, Query, State},
    response::{Html, Json},
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::layout::{Layout, RenderOptions, DEFAULT_ASSET_TYPE};
use crate::state::AppState;
use crate::types::AssetRef;

fn asset_layout(state: &AppState) -> Result<&Layout, ApiError> {
    state
        .layouts
        .get(DEFAULT_ASSET_TYPE)
        .ok_or_else(|| ApiError::not_found(format!("No layout configured for type \"{}\"", DEFAULT_ASSET_TYPE)))
}

async fn fetch_metadata(state: &AppState, asset: &AssetRef) -> Result<Value, ApiError> {
    Ok(state
        .es
        .get_source(&state.config.elasticsearch.assets_index, &asset.document_id())
        .await?)
}

/// GET /:collection/:id
pub async fn show(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Query(options): Query<RenderOptions>,
) -> Result<Json<Value>, ApiError> {
    let asset = AssetRef::new(collection, id);
    let metadata = fetch_metadata(&state, &asset).await?;

    let sections = match state.layouts.get(DEFAULT_ASSET_TYPE) {
        Some(layout) => layout.render_all(&options, &metadata),
        None => Default::default(),
    };

    Ok(Json(json!({
        "collection": asset.collection,
        "id": asset.id,
        "metadata": metadata,
        "sections": sections
    })))
}

/// GET /:collection/:id/sections/:section
pub async fn section(
    State(state): State<AppState>,
    Path((collection, id, section)): Path<(String, String, String)>,
    Query(options): Query<RenderOptions>,
) -> Result<Html<String>, ApiError> {
    let layout = asset_layout(&state)?;
    // Unknown sections fail before the upstream lookup
    if layout.section(&section).is_none() {
        return Err(crate::layout::LayoutError::UnknownSection(section).into());
    }

    let asset = AssetRef::new(collection, id);
    let metadata = fetch_metadata(&state, &asset).await?;
    Ok(Html(layout.render(&section, &options, &metadata)?))
}
