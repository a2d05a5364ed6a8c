#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use collections_online::config::{AppConfig, Auth0Config, LayoutConfig, LicenseConfig, RowConfig, SectionConfig};
use collections_online::{app, AppState};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const INDEX: &str = "assets";
pub const BUCKET: &str = "thumbnail-cache";
pub const SESSION_SECRET: &str = "integration-test-secret";

/// Documents, cached objects and uploads seen by the fake upstream.
#[derive(Default)]
pub struct UpstreamData {
    pub documents: HashMap<String, Value>,
    pub cached_objects: HashSet<String>,
    pub uploads: Vec<String>,
    pub password_resets: Vec<String>,
}

#[derive(Clone, Default)]
pub struct Upstream {
    pub data: Arc<Mutex<UpstreamData>>,
}

impl Upstream {
    pub fn with_documents() -> Self {
        let upstream = Self::default();
        {
            let mut data = upstream.data.lock().unwrap();
            for document in seed_documents() {
                let key = format!(
                    "{}-{}",
                    document["collection"].as_str().unwrap(),
                    document["id"].as_str().unwrap()
                );
                data.documents.insert(key, document);
            }
        }
        upstream
    }

    pub fn document(&self, key: &str) -> Option<Value> {
        self.data.lock().unwrap().documents.get(key).cloned()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.data.lock().unwrap().uploads.clone()
    }

    pub fn cache_object(&self, name: &str) {
        self.data.lock().unwrap().cached_objects.insert(name.to_string());
    }
}

fn seed_documents() -> Vec<Value> {
    vec![
        json!({
            "collection": "kbh-museum",
            "catalog": "kbh-museum",
            "id": "26893",
            "short_title": "Rundetårn",
            "description": "Tower & church",
            "license": { "id": 2 },
            "is_searchable": true,
            "modification_time": "2016-05-10T12:00:00",
            "tags": ["tårn", "kirke"],
            "latitude": 55.6813,
            "longitude": 12.5759
        }),
        json!({
            "collection": "kbh-museum",
            "catalog": "kbh-museum",
            "id": "100",
            "short_title": "Nyhavn",
            "description": "",
            "license": { "id": 1 },
            "is_searchable": true
        }),
        json!({
            "collection": "kbh-arkiv",
            "catalog": "kbh-arkiv",
            "id": "7",
            "short_title": "Rådhuspladsen",
            "license": { "id": 1 },
            "is_searchable": true
        }),
        json!({
            "collection": "kbh-arkiv",
            "catalog": "kbh-arkiv",
            "id": "8",
            "short_title": "Hidden",
            "is_searchable": false
        }),
    ]
}

/// A 800x600 JPEG, big enough to be downscaled and watermarked.
pub fn sample_jpeg() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(800, 600, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Jpeg).unwrap();
    bytes.into_inner()
}

// -- Fake upstream ---------------------------------------------------------

fn upstream_router(upstream: Upstream) -> Router {
    Router::new()
        // Elasticsearch
        .route("/es/", get(|| async { Json(json!({ "cluster_name": "fake" })) }))
        .route("/es/:index/_source/:id", get(es_source))
        .route("/es/:index/_search", post(es_search))
        .route("/es/:index/_update/:id", post(es_update))
        .route("/es/:index/_refresh", post(|| async { Json(json!({ "_shards": { "failed": 0 } })) }))
        // CIP
        .route("/cip/preview/thumbnail/:collection/:id", get(cip_thumbnail))
        .route("/cip/asset/download/:collection/:id", get(cip_download))
        .route("/cip/asset/download/:collection/:id/:size", get(cip_download))
        // Google Cloud Storage
        .route("/gcs/storage/v1/b/:bucket/o/:object", get(gcs_object))
        .route("/gcs/upload/storage/v1/b/:bucket/o", post(gcs_upload))
        // Google Translate
        .route("/google/language/translate/v2", post(google_translate))
        // Auth0
        .route("/auth0/oauth/token", post(auth0_token))
        .route("/auth0/userinfo", get(auth0_userinfo))
        .route("/auth0/api/v2/users/:id", get(auth0_user))
        .route("/auth0/dbconnections/change_password", post(auth0_change_password))
        // `images:annotate` is not a path the router can express
        .fallback(google_annotate)
        .with_state(upstream)
}

async fn es_source(State(upstream): State<Upstream>, Path((_index, id)): Path<(String, String)>) -> Response {
    match upstream.document(&id) {
        Some(document) => Json(document).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "found": false }))).into_response(),
    }
}

async fn es_search(State(upstream): State<Upstream>, Json(body): Json<Value>) -> Json<Value> {
    let documents: Vec<Value> = upstream.data.lock().unwrap().documents.values().cloned().collect();

    if body.pointer("/aggs/searchable").is_some() {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for document in documents.iter().filter(|d| d["is_searchable"] == json!(true)) {
            if let Some(catalog) = document["catalog"].as_str() {
                *counts.entry(catalog.to_string()).or_default() += 1;
            }
        }
        let buckets: Vec<Value> = counts
            .into_iter()
            .map(|(key, doc_count)| json!({ "key": key, "doc_count": doc_count }))
            .collect();
        return Json(json!({
            "hits": { "hits": [] },
            "aggregations": { "searchable": { "catalogs": { "buckets": buckets } } }
        }));
    }

    if let Some(include) = body.pointer("/aggs/suggestions/terms/include").and_then(Value::as_str) {
        let field = body
            .pointer("/aggs/suggestions/terms/field")
            .and_then(Value::as_str)
            .unwrap_or("tags");
        let prefix = include.trim_end_matches(".*").replace('\\', "");
        let mut tags: Vec<String> = documents
            .iter()
            .filter_map(|d| d[field].as_array())
            .flatten()
            .filter_map(Value::as_str)
            .filter(|tag| tag.starts_with(&prefix))
            .map(str::to_string)
            .collect();
        tags.sort();
        tags.dedup();
        let buckets: Vec<Value> = tags.into_iter().map(|key| json!({ "key": key, "doc_count": 1 })).collect();
        return Json(json!({
            "hits": { "hits": [] },
            "aggregations": { "suggestions": { "buckets": buckets } }
        }));
    }

    let catalog = body
        .pointer("/query/bool/filter/0/match/catalog")
        .and_then(Value::as_str)
        .map(str::to_lowercase);
    let mut hits: Vec<Value> = documents
        .into_iter()
        .filter(|d| d["is_searchable"] == json!(true))
        .filter(|d| match &catalog {
            Some(catalog) => d["catalog"].as_str().map(str::to_lowercase).as_ref() == Some(catalog),
            None => true,
        })
        .collect();
    hits.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));

    let from = body["from"].as_u64().unwrap_or(0) as usize;
    let size = body["size"].as_u64().unwrap_or(10) as usize;
    let hits: Vec<Value> = hits
        .into_iter()
        .skip(from)
        .take(size)
        .map(|source| json!({ "_id": source["id"], "_source": source }))
        .collect();

    Json(json!({ "hits": { "hits": hits } }))
}

async fn es_update(
    State(upstream): State<Upstream>,
    Path((_index, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut data = upstream.data.lock().unwrap();
    let Some(document) = data.documents.get_mut(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "document_missing_exception" }))).into_response();
    };

    let fields: Vec<String> = body
        .pointer("/script/params/fields")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    let tags = body.pointer("/script/params/tags").and_then(Value::as_array).cloned().unwrap_or_default();
    for field in fields {
        let existing = document
            .as_object_mut()
            .unwrap()
            .entry(field)
            .or_insert_with(|| json!([]));
        let list = existing.as_array_mut().unwrap();
        for tag in &tags {
            if !list.contains(tag) {
                list.push(tag.clone());
            }
        }
    }

    Json(json!({ "result": "updated", "_id": id })).into_response()
}

async fn cip_thumbnail(Path((_collection, id)): Path<(String, String)>) -> Response {
    if id == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    ([(header::CONTENT_TYPE, "image/jpeg")], sample_jpeg()).into_response()
}

async fn cip_download(Path(params): Path<HashMap<String, String>>) -> Response {
    if params.get("id").map(String::as_str) == Some("missing") {
        return (StatusCode::NOT_FOUND, "no such asset").into_response();
    }
    (
        [
            (header::CONTENT_TYPE, "image/tiff"),
            (header::CONTENT_DISPOSITION, "attachment; filename=26893.tif"),
        ],
        "original-bytes",
    )
        .into_response()
}

async fn gcs_object(State(upstream): State<Upstream>, Path((_bucket, object)): Path<(String, String)>) -> Response {
    if upstream.data.lock().unwrap().cached_objects.contains(&object) {
        Json(json!({ "name": object })).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn gcs_upload(State(upstream): State<Upstream>, Query(query): Query<HashMap<String, String>>, body: Bytes) -> Response {
    let name = query.get("name").cloned().unwrap_or_default();
    if body.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let mut data = upstream.data.lock().unwrap();
    data.cached_objects.insert(name.clone());
    data.uploads.push(name.clone());
    Json(json!({ "name": name })).into_response()
}

async fn google_annotate(uri: Uri) -> Response {
    if !uri.path().ends_with("/v1/images:annotate") {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({
        "responses": [{
            "labelAnnotations": [
                { "description": "Building" },
                { "description": "Sky" },
                { "description": "Street" },
                { "description": "Building" }
            ],
            "landmarkAnnotations": [{ "description": "Round Tower" }]
        }]
    }))
    .into_response()
}

async fn google_translate(Json(body): Json<Value>) -> Json<Value> {
    let translations: Vec<Value> = body["q"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_str)
        .map(|text| {
            let translated = match text {
                "Building" => "Bygning",
                "Sky" => "Himmel",
                "Street" => "Gade",
                "Round Tower" => "Rundetårn",
                other => other,
            };
            json!({ "translatedText": translated })
        })
        .collect();
    Json(json!({ "data": { "translations": translations } }))
}

async fn auth0_token(Json(body): Json<Value>) -> Response {
    match body["grant_type"].as_str() {
        Some("authorization_code") if body["code"] == json!("good-code") => {
            Json(json!({ "access_token": "user-access-token", "expires_in": 86400 })).into_response()
        }
        Some("client_credentials") => {
            Json(json!({ "access_token": "management-token", "expires_in": 86400 })).into_response()
        }
        _ => (StatusCode::FORBIDDEN, Json(json!({ "error": "invalid_grant" }))).into_response(),
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn auth0_userinfo(headers: HeaderMap) -> Response {
    if bearer(&headers) != Some("user-access-token") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "sub": "auth0|42",
        "name": "Jane Doe",
        "email": "jane@example.com",
        "picture": "https://example.com/jane.png"
    }))
    .into_response()
}

async fn auth0_user(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if bearer(&headers) != Some("management-token") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if id != "auth0|42" {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" }))).into_response();
    }
    Json(json!({ "user_id": id, "name": "Jane Doe", "logins_count": 3 })).into_response()
}

async fn auth0_change_password(State(upstream): State<Upstream>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if email == "unknown@example.com" {
        return (StatusCode::BAD_REQUEST, "user does not exist").into_response();
    }
    upstream.data.lock().unwrap().password_resets.push(email);
    "We've just sent you an email to reset your password.".into_response()
}

// -- Application under test -----------------------------------------------

pub struct TestApp {
    pub base_url: String,
    pub upstream_url: String,
    pub upstream: Upstream,
    /// Does not follow redirects, so 302s can be asserted.
    pub client: reqwest::Client,
    _dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    /// Session token for the fake Auth0 user, obtained through the login callback.
    pub async fn login(&self) -> Result<String> {
        let res = self.get("/auth/callback?code=good-code").await?;
        anyhow::ensure!(res.status() == reqwest::StatusCode::FOUND, "login failed: {}", res.status());
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .context("no session cookie")?
            .to_str()?
            .to_string();
        let token = cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value.to_string())
            .context("malformed session cookie")?;
        Ok(token)
    }
}

async fn serve(router: Router) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{}", addr))
}

fn write_watermark(dir: &TempDir) -> Result<PathBuf> {
    let path = dir.path().join("kbh-museum.png");
    let mark = RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 160]));
    DynamicImage::ImageRgba8(mark).save(&path)?;
    Ok(path)
}

fn asset_layout() -> LayoutConfig {
    let row = |title: &str, row_type: Option<&str>, template: Option<&str>, field: Option<&str>| RowConfig {
        title: title.to_string(),
        row_type: row_type.map(str::to_string),
        template: template.map(str::to_string),
        field: field.map(str::to_string),
    };

    let mut sections = BTreeMap::new();
    sections.insert(
        "description".to_string(),
        SectionConfig {
            title: Some("Beskrivelse".to_string()),
            rows: vec![
                row("Titel", None, Some("{{ short_title }}"), None),
                row("Beskrivelse", None, None, Some("description")),
            ],
        },
    );
    sections.insert(
        "motif".to_string(),
        SectionConfig {
            title: Some("Motiv".to_string()),
            rows: vec![row("Emneord", Some("tags"), None, None)],
        },
    );
    sections.insert(
        "place".to_string(),
        SectionConfig {
            title: Some("Sted".to_string()),
            rows: vec![row("Kort", Some("map-coordinates"), None, None)],
        },
    );
    LayoutConfig { sections }
}

/// Configuration pointing every upstream at the fake server.
pub fn test_config(upstream_url: &str, watermark: PathBuf) -> AppConfig {
    let mut config = AppConfig::default();
    config.elasticsearch.url = format!("{}/es", upstream_url);
    config.elasticsearch.assets_index = INDEX.to_string();
    config.cip.base_url = format!("{}/cip", upstream_url);
    config.thumbnails.sizes = vec!["lowres".to_string(), "originalJPEG".to_string()];

    config.google.api_key = "test-key".to_string();
    config.google.vision_url = format!("{}/google", upstream_url);
    config.google.translate_url = format!("{}/google", upstream_url);
    config.google.storage_api_url = format!("{}/gcs", upstream_url);
    config.google.storage_download_url = "https://storage.example.com".to_string();
    config.cache.google_storage_bucket = Some(BUCKET.to_string());

    config.features.watermarks = true;
    config.features.thumbnail_caching = false;
    config.features.motif_tagging = true;
    config.licenses = vec![
        None,
        Some(LicenseConfig {
            url: Some("https://creativecommons.org/licenses/by/4.0/".to_string()),
            watermark: false,
        }),
        Some(LicenseConfig {
            url: Some("https://example.com/all-rights-reserved".to_string()),
            watermark: true,
        }),
    ];
    config.watermarks.insert("kbh-museum".to_string(), watermark);
    config.tagging.blacklist = vec!["himmel".to_string()];

    config.auth0 = Some(Auth0Config {
        domain: "tenant.eu.auth0.com".to_string(),
        client_id: "client-id".to_string(),
        callback_url: "http://localhost/auth/callback".to_string(),
        client_secret: "client-secret".to_string(),
        base_url: Some(format!("{}/auth0", upstream_url)),
    });
    config.session.jwt_secret = SESSION_SECRET.to_string();
    config.layouts.insert("asset".to_string(), asset_layout());
    config
}

/// Start the fake upstream and the application, with `configure` applied last.
pub async fn spawn_app_with(configure: impl FnOnce(&mut AppConfig)) -> Result<TestApp> {
    let upstream = Upstream::with_documents();
    let upstream_url = serve(upstream_router(upstream.clone())).await?;

    let dir = tempfile::tempdir()?;
    let watermark = write_watermark(&dir)?;
    let mut config = test_config(&upstream_url, watermark);
    configure(&mut config);

    let state = AppState::new(config)?;
    let base_url = serve(app(state)).await?;

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let test_app = TestApp {
        base_url,
        upstream_url,
        upstream,
        client,
        _dir: dir,
    };
    wait_ready(&test_app, Duration::from_secs(5)).await?;
    Ok(test_app)
}

pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(|_| {}).await
}

async fn wait_ready(app: &TestApp, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if Instant::now() > deadline {
            break;
        }
        if let Ok(resp) = app.get("/health").await {
            if resp.status() == reqwest::StatusCode::OK {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    anyhow::bail!("server did not become ready on {} within {:?}", app.base_url, timeout)
}
