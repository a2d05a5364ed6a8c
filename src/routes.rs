use axum::{
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::require_session;
use crate::state::AppState;

/// The full HTTP surface of the site.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(sitemap_routes())
        .merge(auth_public_routes())
        .merge(motif_tag_routes())
        .merge(search_routes())
        .merge(asset_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        .with_state(state.clone());

    if let Some(cors) = cors_layer(&state.config.security) {
        router = router.layer(cors);
    }

    router.layer(TraceLayer::new_for_http())
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.is_empty() {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(CorsLayer::new().allow_origin(AllowOrigin::list(origins)))
}

fn sitemap_routes() -> Router<AppState> {
    use public::sitemap;

    Router::new()
        .route("/sitemap.xml", get(sitemap::index))
        .route("/:collection/sitemap.xml", get(sitemap::catalog))
}

fn asset_routes() -> Router<AppState> {
    use public::{assets, images};

    Router::new()
        .route("/:collection/:id", get(assets::show))
        .route("/:collection/:id/sections/:section", get(assets::section))
        // Thumbnails, with optional size and watermark position
        .route("/:collection/:id/thumbnail", get(images::thumbnail))
        .route("/:collection/:id/thumbnail/:size", get(images::thumbnail))
        .route("/:collection/:id/thumbnail/:size/:position", get(images::thumbnail))
        .route("/:collection/:id/image/:size", get(images::thumbnail))
        // Original files
        .route("/:collection/:id/download", get(images::download))
        .route("/:collection/:id/download/:size", get(images::download))
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/login", get(auth::login))
        .route("/logout", get(auth::logout))
        .route("/auth/callback", get(auth::callback))
        .route("/reset-password", get(auth::reset_password).post(auth::reset_password_json))
        .route("/api/auth/status", get(auth::status))
}

fn motif_tag_routes() -> Router<AppState> {
    use public::motif_tags;

    Router::new()
        .route("/api/motif-tags/typeahead", get(motif_tags::typeahead))
        .route(
            "/api/motif-tags/:collection/:id/suggestions",
            get(motif_tags::suggestions),
        )
}

fn search_routes() -> Router<AppState> {
    Router::new().route("/api/search/sidebar", post(public::search::sidebar))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/whoami", get(protected::auth::whoami))
        .route("/api/auth/users/:id", get(protected::auth::user))
        .route(
            "/api/motif-tags/:collection/:id",
            post(protected::motif_tags::save_crowd_tag),
        )
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Collections Online",
            "version": version,
            "description": "Digital collections website backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "sitemaps": "/sitemap.xml, /:catalog/sitemap.xml?offset=N (public)",
                "assets": "/:collection/:id, /:collection/:id/sections/:section (public)",
                "images": "/:collection/:id/thumbnail[/:size[/:position]], /:collection/:id/image/:size, /:collection/:id/download[/:size] (public)",
                "motif_tags": "/api/motif-tags/:collection/:id/suggestions, /api/motif-tags/typeahead (public), POST /api/motif-tags/:collection/:id (session)",
                "search": "POST /api/search/sidebar (public)",
                "login": "/login, /logout, /auth/callback, /reset-password, /api/auth/status (public)",
                "auth": "/api/auth/whoami, /api/auth/users/:id (session)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.es.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "elasticsearch": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "elasticsearch unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "elasticsearch_error": e.to_string()
                    }
                })),
            )
        }
    }
}
