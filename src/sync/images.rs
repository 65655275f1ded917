use crate::drive::api::{Asset, AssetFetcher, AssetReference};
use crate::error::ImageError;
use crate::platform::EventPlatform;
use crate::wix::dto::MainImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::{info, instrument, warn};

const SCALE_PERCENTAGES: [u32; 8] = [100, 90, 80, 70, 60, 50, 40, 30];
const JPEG_QUALITIES: [u8; 7] = [90, 85, 80, 75, 70, 65, 60];
const JPEG_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageStats {
    pub uploaded: usize,
    pub cache_hits: usize,
    pub compressed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub compressed: bool,
}

/// Fits an image under `max_bytes`.
///
/// Small enough images go through untouched. Larger ones are re-encoded as
/// JPEG, shrinking the quality first and then the size, keeping the aspect
/// ratio, until one fits.
pub fn prepare_image(asset: Asset, max_bytes: usize) -> Result<PreparedImage, ImageError> {
    if asset.bytes.len() <= max_bytes {
        let dimensions = read_dimensions(&asset.bytes);

        return Ok(PreparedImage {
            width: dimensions.map(|(width, _)| width),
            height: dimensions.map(|(_, height)| height),
            bytes: asset.bytes,
            file_name: asset.file_name,
            mime_type: asset.mime_type,
            compressed: false,
        });
    }

    info!(
        "Image '{}' is {} bytes (limit {}), compressing",
        asset.file_name,
        asset.bytes.len(),
        max_bytes
    );

    let decoded = DynamicImage::ImageRgb8(image::load_from_memory(&asset.bytes)?.to_rgb8());

    for scale in SCALE_PERCENTAGES {
        let candidate = if scale == 100 {
            decoded.clone()
        } else {
            decoded.resize(
                scaled(decoded.width(), scale),
                scaled(decoded.height(), scale),
                FilterType::Lanczos3,
            )
        };

        for quality in JPEG_QUALITIES {
            let mut buffer = Vec::new();
            candidate.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality))?;

            if buffer.len() <= max_bytes {
                info!(
                    "Compressed to {} bytes (scale {}%, quality {})",
                    buffer.len(),
                    scale,
                    quality
                );

                return Ok(PreparedImage {
                    bytes: buffer,
                    file_name: jpeg_file_name(&asset.file_name),
                    mime_type: JPEG_MIME_TYPE.to_string(),
                    width: Some(candidate.width()),
                    height: Some(candidate.height()),
                    compressed: true,
                });
            }
        }
    }

    Err(ImageError::TooLarge {
        size: asset.bytes.len(),
        limit: max_bytes,
    })
}

fn scaled(length: u32, percentage: u32) -> u32 {
    (length * percentage / 100).max(1)
}

fn read_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn jpeg_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("event_image");

    format!("{}.jpg", stem)
}

/// Resolves sheet image references into uploaded platform images, once per reference.
pub struct ImageAttacher<'a> {
    platform: &'a dyn EventPlatform,
    fetcher: &'a dyn AssetFetcher,
    max_bytes: usize,
    cache: HashMap<AssetReference, MainImage>,
    stats: ImageStats,
}

impl<'a> ImageAttacher<'a> {
    pub fn new(platform: &'a dyn EventPlatform, fetcher: &'a dyn AssetFetcher, max_bytes: usize) -> Self {
        Self {
            platform,
            fetcher,
            max_bytes,
            cache: HashMap::new(),
            stats: ImageStats::default(),
        }
    }

    pub fn stats(&self) -> &ImageStats {
        &self.stats
    }

    #[instrument(skip(self))]
    pub async fn attach(&mut self, reference: &str) -> Result<MainImage, ImageError> {
        let result = self.resolve(reference).await;

        if let Err(err) = &result {
            self.stats.failed += 1;
            warn!("Image '{}' left out: {}", reference, err);
        }

        result
    }

    async fn resolve(&mut self, reference: &str) -> Result<MainImage, ImageError> {
        let reference = AssetReference::parse(reference)?;

        if let Some(image) = self.cache.get(&reference) {
            info!("Reusing uploaded image {}", image.id);
            self.stats.cache_hits += 1;
            return Ok(image.clone());
        }

        let asset = self.fetcher.fetch(&reference).await?;
        let prepared = prepare_image(asset, self.max_bytes)?;
        if prepared.compressed {
            self.stats.compressed += 1;
        }

        let upload_url = self
            .platform
            .generate_upload_url(&prepared.mime_type, &prepared.file_name)
            .await?;
        let uploaded = self
            .platform
            .upload_bytes(&upload_url, &prepared.mime_type, prepared.bytes)
            .await?;

        let (Some(width), Some(height)) = (
            uploaded.width.or(prepared.width),
            uploaded.height.or(prepared.height),
        ) else {
            return Err(ImageError::MissingDimensions);
        };

        let image = MainImage {
            id: uploaded.id,
            width,
            height,
        };

        info!("Uploaded image {} ({}x{})", image.id, width, height);
        self.stats.uploaded += 1;
        self.cache.insert(reference, image.clone());

        Ok(image)
    }
}
