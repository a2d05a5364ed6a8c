// handlers/public/mod.rs - Public handlers (no session required)
//
// Asset pages, images, sitemaps, tag suggestions and the login flow.
//
// Security Level: None
// Middleware: tracing + CORS only

pub mod assets;
pub mod auth;
pub mod images;
pub mod motif_tags;
pub mod search;
pub mod sitemap;

use axum::http::{header, HeaderMap};

/// Host the client addressed; the proxy's `x-forwarded-host` wins over `Host`.
pub(crate) fn request_host(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
