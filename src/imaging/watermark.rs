use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use image::{imageops, imageops::FilterType, DynamicImage, RgbaImage};

use super::{ImagingError, WatermarkPosition};

/// Watermark images per catalog, decoded once at startup.
#[derive(Debug, Clone, Default)]
pub struct WatermarkSet {
    marks: BTreeMap<String, Arc<RgbaImage>>,
}

impl WatermarkSet {
    pub fn load(paths: &BTreeMap<String, PathBuf>) -> Result<Self, ImagingError> {
        let mut marks = BTreeMap::new();
        for (catalog, path) in paths {
            let bytes = std::fs::read(path).map_err(|source| ImagingError::WatermarkRead {
                path: path.clone(),
                source,
            })?;
            let mark = image::load_from_memory(&bytes)?.to_rgba8();
            tracing::info!(catalog = %catalog, path = %path.display(), "loaded watermark");
            marks.insert(catalog.clone(), Arc::new(mark));
        }
        Ok(Self { marks })
    }

    pub fn from_images(marks: impl IntoIterator<Item = (String, RgbaImage)>) -> Self {
        Self {
            marks: marks.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
        }
    }

    pub fn get(&self, catalog: &str) -> Option<Arc<RgbaImage>> {
        self.marks.get(catalog).cloned()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

/// Composite `mark` onto `image`; a mark larger than the image is scaled down to fit.
pub fn apply_watermark(image: &DynamicImage, mark: &RgbaImage, position: WatermarkPosition) -> DynamicImage {
    let mut canvas = image.to_rgba8();
    let (width, height) = canvas.dimensions();

    let scaled;
    let mark = if mark.width() > width || mark.height() > height {
        scaled = DynamicImage::ImageRgba8(mark.clone())
            .resize(width, height, FilterType::Triangle)
            .to_rgba8();
        &scaled
    } else {
        mark
    };

    let (x, y) = position.origin((width, height), mark.dimensions());
    imageops::overlay(&mut canvas, mark, x, y);
    DynamicImage::ImageRgba8(canvas)
}
