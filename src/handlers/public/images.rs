// handlers/public/images.rs - asset downloads and thumbnails
//
// GET /:collection/:id/download[/:size]
// GET /:collection/:id/thumbnail[/:size[/:position]]
// GET /:collection/:id/image/:size

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::imaging::{cache_key, license_id, render_thumbnail, should_watermark, WatermarkPosition, THUMBNAIL_SIZE};
use crate::state::AppState;
use crate::types::AssetRef;

#[derive(Debug, Deserialize)]
pub struct DownloadPath {
    pub collection: String,
    pub id: String,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailPath {
    pub collection: String,
    pub id: String,
    pub size: Option<String>,
    pub position: Option<String>,
}

/// GET /:collection/:id/download[/:size] - proxy the original file from the CIP
pub async fn download(State(state): State<AppState>, Path(path): Path<DownloadPath>) -> Result<Response, ApiError> {
    let size = path.size.as_deref();
    let allowed = &state.config.thumbnails.sizes;
    if let Some(size) = size {
        if !allowed.is_empty() && !allowed.iter().any(|s| s == size) {
            return Err(ApiError::bad_request(format!(
                "The size is required and must be one of {} given: \"{}\"",
                allowed.join(","),
                size
            )));
        }
    }

    let upstream = state.cip.proxy_download(&path.collection, &path.id, size).await?;
    if upstream.status() != reqwest::StatusCode::OK {
        tracing::warn!(
            collection = %path.collection,
            id = %path.id,
            status = upstream.status().as_u16(),
            "CIP download failed, serving placeholder"
        );
        return Ok(fallback_response(&state));
    }

    let mut response = Response::builder().status(StatusCode::OK);
    if let Some(content_type) = upstream.headers().get(header::CONTENT_TYPE) {
        response = response.header(header::CONTENT_TYPE, content_type.clone());
    }
    if let Some(length) = upstream.headers().get(header::CONTENT_LENGTH) {
        response = response.header(header::CONTENT_LENGTH, length.clone());
    }
    if let Some(disposition) = upstream
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        let filename = download_filename(&path.collection, &path.id, size, disposition);
        response = response.header(header::CONTENT_DISPOSITION, format!("attachment; filename={}", filename));
    }

    let collection = path.collection.clone();
    let id = path.id.clone();
    let body = upstream.bytes_stream().inspect_err(move |e| {
        tracing::warn!(%collection, %id, "CIP download interrupted: {}", e);
    });

    response
        .body(Body::from_stream(body))
        .map_err(|e| ApiError::internal_server_error(format!("failed to build response: {}", e)))
}

/// `{collection}-{id}[-{size}]{ext}`; `JPEG` is dropped from size names and the
/// extension comes from the upstream header, `.jpg` when it has none.
pub fn download_filename(collection: &str, id: &str, size: Option<&str>, content_disposition: &str) -> String {
    let mut filename = format!("{}-{}", collection, id);
    if let Some(size) = size {
        filename.push('-');
        filename.push_str(&size.replace("JPEG", ""));
    }
    filename.push_str(&extension_from_disposition(content_disposition).unwrap_or_else(|| ".jpg".to_string()));
    filename
}

fn extension_from_disposition(disposition: &str) -> Option<String> {
    let trimmed = disposition.trim().trim_end_matches(&['"', '\'', ';'][..]);
    let (_, extension) = trimmed.rsplit_once('.')?;
    if extension.is_empty() || extension.contains(&['/', '\\', ' ', ';', '='][..]) {
        return None;
    }
    Some(format!(".{}", extension))
}

/// GET /:collection/:id/thumbnail[/:size[/:position]] - resized, possibly watermarked JPEG
pub async fn thumbnail(State(state): State<AppState>, Path(path): Path<ThumbnailPath>) -> Result<Response, ApiError> {
    let size = parse_size(path.size.as_deref())?;
    let position = path
        .position
        .as_deref()
        .map(str::parse::<WatermarkPosition>)
        .transpose()?
        .unwrap_or_default();
    let asset = AssetRef::new(path.collection, path.id);

    if !state.config.features.thumbnail_caching {
        return match render(&state, &asset, size, position).await {
            Ok(jpeg) => Ok(jpeg_response(jpeg)),
            Err(e) => {
                tracing::error!(asset = %asset, "thumbnail failed: {}", e);
                Ok(fallback_response(&state))
            }
        };
    }

    let bucket = state
        .config
        .cache
        .google_storage_bucket
        .clone()
        .ok_or_else(|| ApiError::internal_server_error("You need to specify a cache.google_storage_bucket"))?;
    let key = cache_key(&asset.collection, &asset.id, size, position);

    if state.storage.exists(&bucket, &key).await? {
        let location = state.storage.public_url(&bucket, &key);
        tracing::debug!(asset = %asset, %location, "thumbnail cache hit");
        return Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response());
    }

    let jpeg = render(&state, &asset, size, position).await?;

    let storage = state.storage.clone();
    let upload = jpeg.clone();
    tokio::spawn(async move {
        if let Err(e) = storage.upload(&bucket, &key, upload, "image/jpeg").await {
            tracing::error!(%bucket, %key, "failed to cache thumbnail: {}", e);
        }
    });

    Ok(jpeg_response(jpeg))
}

fn parse_size(raw: Option<&str>) -> Result<u32, ApiError> {
    match raw {
        None => Ok(THUMBNAIL_SIZE),
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid thumbnail size: {}", raw))),
    }
}

/// Look up the asset's license, fetch the CIP thumbnail and transform it.
async fn render(state: &AppState, asset: &AssetRef, size: u32, position: WatermarkPosition) -> Result<Vec<u8>, ApiError> {
    let metadata = state
        .es
        .get_source(&state.config.elasticsearch.assets_index, &asset.document_id())
        .await?;

    let mark = if should_watermark(
        license_id(&metadata),
        size,
        state.config.features.watermarks,
        &state.watermarked_licenses,
    ) {
        state.watermarks.get(&asset.collection)
    } else {
        None
    };

    let source = state.cip.fetch_thumbnail(&asset.collection, &asset.id).await?;
    let quality = state.config.thumbnails.jpeg_quality;

    let jpeg = tokio::task::spawn_blocking(move || render_thumbnail(&source, size, mark.as_deref(), position, quality))
        .await
        .map_err(|e| ApiError::internal_server_error(format!("thumbnail task failed: {}", e)))??;

    Ok(jpeg)
}

fn jpeg_response(jpeg: Vec<u8>) -> Response {
    let digest = Sha256::digest(&jpeg);
    let etag = format!("\"{:x}\"", digest);
    (
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        jpeg,
    )
        .into_response()
}

pub(crate) fn fallback_response(state: &AppState) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], state.fallback_image.clone()).into_response()
}
