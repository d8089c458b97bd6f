//! Session persistence.
//!
//! A saved project holds the base photo and the recolored overlay as PNG,
//! the colors used on it, and a small JPEG preview for listings. Encoding and
//! decoding are pure functions so the session can run them on a worker.

mod record;
mod store;
pub mod wire;

pub use record::{RecolorMeta, RecolorRecord, UsedColorRecord};
pub use store::{ProjectEntry, ProjectStore};

use crate::compositing::alloc_rgba;
use crate::constants::{THUMBNAIL_FOOTER_HEIGHT, THUMBNAIL_JPEG_QUALITY, THUMBNAIL_MAX_SWATCHES};
use crate::error::{RecolorError, RecolorResult};
use crate::types::{PaintColor, SharedImage};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, Rgba, RgbaImage};
use std::time::{SystemTime, UNIX_EPOCH};

/// Gap between swatches and around the footer edge
const SWATCH_GAP: u32 = 5;

pub fn encode_png(image: &RgbaImage) -> RecolorResult<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}

pub fn decode_png(bytes: &[u8]) -> RecolorResult<RgbaImage> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8())
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Preview with a white footer holding up to four color swatches, as JPEG
pub fn encode_meta_thumbnail(thumbnail: &RgbaImage, colors: &[PaintColor]) -> RecolorResult<Vec<u8>> {
    let (width, height) = thumbnail.dimensions();
    let mut canvas = alloc_rgba(width, height + THUMBNAIL_FOOTER_HEIGHT)?;
    for (x, y, px) in canvas.enumerate_pixels_mut() {
        *px = if y < height {
            // JPEG has no alpha: flatten over white
            let src = thumbnail.get_pixel(x, y);
            let a = src[3] as u32;
            let mix = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
            Rgba([mix(src[0]), mix(src[1]), mix(src[2]), 255])
        } else {
            Rgba([255, 255, 255, 255])
        };
    }

    let swatches: Vec<&PaintColor> = colors.iter().take(THUMBNAIL_MAX_SWATCHES).collect();
    if !swatches.is_empty() && width > 0 {
        let count = swatches.len() as u32;
        let swatch_width = width.saturating_sub((count - 1) * SWATCH_GAP) / count;
        let top = height + SWATCH_GAP;
        let bottom = height + THUMBNAIL_FOOTER_HEIGHT - SWATCH_GAP;
        for (i, color) in swatches.iter().enumerate() {
            let [r, g, b] = color.rgb();
            let left = i as u32 * (swatch_width + SWATCH_GAP);
            for y in top..bottom {
                for x in left..(left + swatch_width).min(width) {
                    canvas.put_pixel(x, y, Rgba([r, g, b, 255]));
                }
            }
        }
    }

    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, THUMBNAIL_JPEG_QUALITY).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(bytes)
}

/// Everything needed to write one project, captured on the interaction thread
#[derive(Clone, Debug)]
pub struct ProjectSnapshot {
    pub image: SharedImage,
    /// Flattened overlay of every committed edit
    pub recolored: Option<SharedImage>,
    pub colors: Vec<PaintColor>,
    pub thumbnail: RgbaImage,
    pub label: String,
}

impl ProjectSnapshot {
    /// Encode both files. Slow: run off the interaction thread.
    pub fn encode(&self) -> RecolorResult<(RecolorRecord, RecolorMeta)> {
        let original = encode_png(&self.image)?;
        let recolored = self.recolored.as_deref().map(encode_png).transpose()?;
        let record = RecolorRecord::new(original, recolored, &self.colors);
        let thumbnail = encode_meta_thumbnail(&self.thumbnail, &self.colors)?;
        let meta = RecolorMeta::new(now_millis(), &self.colors, thumbnail, &self.label);
        Ok((record, meta))
    }
}

/// A decoded project ready to install into a session
#[derive(Clone, Debug)]
pub struct LoadedProject {
    pub image: RgbaImage,
    pub recolored: Option<RgbaImage>,
    pub colors: Vec<PaintColor>,
}

impl LoadedProject {
    pub fn from_record(record: &RecolorRecord) -> RecolorResult<Self> {
        let original = record
            .original_image
            .as_deref()
            .ok_or_else(|| RecolorError::Decode("record has no original image".into()))?;
        let image = decode_png(original)?;
        let recolored = record
            .recolored_image
            .as_deref()
            .map(decode_png)
            .transpose()?
            .filter(|layer| layer.dimensions() == image.dimensions());
        Ok(Self {
            image,
            recolored,
            colors: record.colors(),
        })
    }

    /// Swap decoded colors for catalogue entries with the same `catalogueId:code` key
    pub fn resolve_colors(&mut self, catalogue: &[PaintColor]) {
        for color in &mut self.colors {
            let key = color.key();
            if let Some(found) = catalogue.iter().find(|c| c.key() == key) {
                *color = found.clone();
            }
        }
    }
}
