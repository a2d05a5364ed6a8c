// handlers/public/sitemap.rs - XML sitemaps for crawlers
//
// GET /sitemap.xml               - index pointing at every catalog page
// GET /:collection/sitemap.xml   - one page of a catalog (?offset=N)

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::sitemap::{catalog_query, index_query, parse_catalog_buckets, parse_offset, render_index, render_urlset};
use crate::state::AppState;

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Host the crawler used: the proxy's `x-forwarded-host`, else `host`.
fn request_host(headers: &HeaderMap) -> Result<String, ApiError> {
    super::request_host(headers).ok_or_else(|| ApiError::bad_request("Missing host header"))
}

fn xml_response(xml: String) -> Response {
    ([(header::CONTENT_TYPE, XML_CONTENT_TYPE)], xml).into_response()
}

/// GET /sitemap.xml
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let host = request_host(&headers)?;
    let response = state
        .es
        .search(&state.config.elasticsearch.assets_index, &index_query())
        .await?;

    let buckets = response
        .aggregations
        .as_ref()
        .map(parse_catalog_buckets)
        .unwrap_or_default();

    tracing::debug!(catalogs = buckets.len(), %host, "rendering sitemap index");
    Ok(xml_response(render_index(
        &state.config.sitemap.scheme,
        &host,
        &buckets,
        state.config.sitemap.asset_limit,
    )))
}

/// GET /:collection/sitemap.xml?offset=N
pub async fn catalog(
    State(state): State<AppState>,
    Path(catalog): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if catalog.trim().is_empty() {
        return Err(ApiError::bad_request("No catalog specified"));
    }

    let host = request_host(&headers)?;
    let offset = parse_offset(query.get("offset").map(String::as_str));
    let limit = state.config.sitemap.asset_limit;

    let response = state
        .es
        .search(
            &state.config.elasticsearch.assets_index,
            &catalog_query(&catalog, offset, limit),
        )
        .await?;

    let sources: Vec<_> = response.hits.hits.into_iter().map(|hit| hit.source).collect();
    tracing::debug!(%catalog, offset, assets = sources.len(), "rendering catalog sitemap");

    Ok(xml_response(render_urlset(
        &state.config.sitemap.scheme,
        &host,
        &sources,
        &state.config,
    )))
}
