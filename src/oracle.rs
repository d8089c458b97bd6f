//! Contract of the external mask oracle.
//!
//! The oracle turns seed points, a color and the exclusion/freehand masks
//! into a recolored overlay. It is called only from worker threads and
//! receives immutable snapshots, so implementations need no locking of
//! their own beyond being `Send + Sync`.

use crate::compositing::{alloc_mask, alloc_rgba};
use crate::error::RecolorResult;
use crate::types::{
    Mask, PaintColor, Rect, SeedPoint, SharedImage, SharedMask, hue_to_bucket, rgb_to_hsv,
};
use image::RgbaImage;
use std::collections::BTreeSet;

/// Snapshot of everything one oracle call needs.
#[derive(Clone, Debug)]
pub struct MaskRequest {
    pub image: SharedImage,
    pub color: PaintColor,
    /// Ordered oldest first
    pub seeds: Vec<SeedPoint>,
    pub coverage: f32,
    /// Pixels that must not be repainted
    pub exclusion: Option<SharedMask>,
    /// Brush stroke to paint along
    pub freehand: Option<SharedMask>,
    pub disable_exclusion: bool,
}

impl MaskRequest {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Result of [`MaskOracle::compute_mask`]
#[derive(Clone, Debug)]
pub struct MaskOutcome {
    /// Recolored overlay, transparent where nothing was painted
    pub image: RgbaImage,
    /// Whether already-painted pixels were painted again
    pub repainted: bool,
}

pub trait MaskOracle: Send + Sync {
    /// Compute the recolored overlay for `request`
    fn compute_mask(&self, request: &MaskRequest) -> RecolorResult<MaskOutcome>;

    /// Coarse bounds of the region the request's single seed would fill.
    /// Best-effort: callers ignore failures.
    fn contour_rect(&self, request: &MaskRequest) -> RecolorResult<Rect>;

    /// Same pixels with alpha inverted
    fn invert_alpha(&self, image: &RgbaImage) -> RecolorResult<RgbaImage> {
        let mut out = alloc_rgba(image.width(), image.height())?;
        for (dst, src) in out.pixels_mut().zip(image.pixels()) {
            *dst = image::Rgba([src[0], src[1], src[2], 255 - src[3]]);
        }
        Ok(out)
    }

    /// Mask of every pixel with non-zero alpha
    fn exclusion_mask_from_image(&self, image: &RgbaImage) -> RecolorResult<Mask> {
        let mut mask = alloc_mask(image.width(), image.height())?;
        for (dst, src) in mask.pixels_mut().zip(image.pixels()) {
            dst[0] = if src[3] != 0 { 255 } else { 0 };
        }
        Ok(mask)
    }

    /// Hue buckets present among the visible pixels of `image`
    fn hue_histogram(&self, image: &RgbaImage) -> RecolorResult<BTreeSet<u16>> {
        Ok(image
            .pixels()
            .filter(|p| p[3] != 0)
            .map(|p| hue_to_bucket(rgb_to_hsv([p[0], p[1], p[2]]).0))
            .collect())
    }
}

/// White image whose alpha is the mask, as fed to [`MaskOracle::invert_alpha`]
pub fn mask_to_image(mask: &Mask) -> RecolorResult<RgbaImage> {
    let mut out = alloc_rgba(mask.width(), mask.height())?;
    for (dst, src) in out.pixels_mut().zip(mask.pixels()) {
        *dst = image::Rgba([255, 255, 255, src[0]]);
    }
    Ok(out)
}
