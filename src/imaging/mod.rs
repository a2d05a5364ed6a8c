// Thumbnail rendering and watermarking.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub mod thumbnail;
pub mod watermark;

pub use thumbnail::{fallback_png, render_thumbnail};
pub use watermark::WatermarkSet;

/// Default thumbnail edge; watermarks are only applied above it.
pub const THUMBNAIL_SIZE: u32 = 350;

#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("unexpected position function: {0}")]
    UnknownPosition(String),

    #[error("failed to read watermark {path}: {source}")]
    WatermarkRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("thumbnail size must be positive")]
    ZeroSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatermarkPosition {
    #[default]
    MiddleCenter,
    BottomRight,
}

impl WatermarkPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatermarkPosition::MiddleCenter => "middle-center",
            WatermarkPosition::BottomRight => "bottom-right",
        }
    }

    /// Top-left corner for a `mark` placed on a `canvas`, both `(width, height)`.
    pub fn origin(&self, canvas: (u32, u32), mark: (u32, u32)) -> (i64, i64) {
        let dx = i64::from(canvas.0) - i64::from(mark.0);
        let dy = i64::from(canvas.1) - i64::from(mark.1);
        match self {
            WatermarkPosition::MiddleCenter => (dx / 2, dy / 2),
            WatermarkPosition::BottomRight => (dx, dy),
        }
    }
}

impl FromStr for WatermarkPosition {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "middle-center" => Ok(WatermarkPosition::MiddleCenter),
            "bottom-right" => Ok(WatermarkPosition::BottomRight),
            other => Err(ImagingError::UnknownPosition(other.to_string())),
        }
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object name of a rendered thumbnail in the cache bucket.
pub fn cache_key(collection: &str, id: &str, size: u32, position: WatermarkPosition) -> String {
    format!("{}-{}-{}-{}.jpg", collection, id, size, position)
}

/// Assets without a license are marked; so are licenses flagged in the mapping.
/// Only images larger than the default thumbnail get a mark.
pub fn should_watermark(
    license_id: Option<u64>,
    size: u32,
    feature_enabled: bool,
    watermarked_ids: &BTreeSet<u64>,
) -> bool {
    let license_requires = match license_id {
        None => true,
        Some(id) => watermarked_ids.contains(&id),
    };
    license_requires && size > THUMBNAIL_SIZE && feature_enabled
}

/// `metadata.license.id` of an asset document, if any.
pub fn license_id(metadata: &serde_json::Value) -> Option<u64> {
    let id = metadata.get("license")?.get("id")?;
    id.as_u64().or_else(|| id.as_str().and_then(|s| s.parse().ok()))
}
