// handlers/public/search.rs - POST /api/search/sidebar

use axum::response::Json;

use crate::search::{SidebarRequest, SidebarResponse};

/// Trim a result page's aggregations down to what the filter sidebar shows.
///
/// Expected Output:
/// ```json
/// {
///   "aggregations": { "filtered": { "type": { "buckets": [{ "key": "Foto", "doc_count": 12 }] } } },
///   "filters": { "type": ["Foto"] },
///   "filterCount": 1
/// }
/// ```
pub async fn sidebar(Json(request): Json<SidebarRequest>) -> Json<SidebarResponse> {
    Json(SidebarResponse::build(request))
}
