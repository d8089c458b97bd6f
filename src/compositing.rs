//! Bitmap allocation and Porter-Duff style layer compositing.
//!
//! Allocations are fallible so a huge photo reports `OutOfMemory` instead of
//! aborting. Per-pixel loops run in parallel with rayon.

use crate::error::{RecolorError, RecolorResult};
use crate::types::Mask;
use image::{ImageBuffer, RgbaImage};
use rayon::prelude::*;

fn alloc_zeroed(width: u32, height: u32, channels: usize) -> RecolorResult<Vec<u8>> {
    let oom = || RecolorError::OutOfMemory { width, height };
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels))
        .ok_or_else(oom)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| oom())?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Fully transparent RGBA bitmap
pub fn alloc_rgba(width: u32, height: u32) -> RecolorResult<RgbaImage> {
    let buf = alloc_zeroed(width, height, 4)?;
    ImageBuffer::from_raw(width, height, buf).ok_or(RecolorError::OutOfMemory { width, height })
}

/// Empty (all clear) mask
pub fn alloc_mask(width: u32, height: u32) -> RecolorResult<Mask> {
    let buf = alloc_zeroed(width, height, 1)?;
    ImageBuffer::from_raw(width, height, buf).ok_or(RecolorError::OutOfMemory { width, height })
}

/// Fallible clone of a bitmap
pub fn try_clone(image: &RgbaImage) -> RecolorResult<RgbaImage> {
    let mut out = alloc_rgba(image.width(), image.height())?;
    out.copy_from_slice(image.as_raw());
    Ok(out)
}

/// Draw `src` over `dst` (source-over, straight alpha). Sizes must match.
pub fn source_over(dst: &mut RgbaImage, src: &RgbaImage) {
    debug_assert_eq!(dst.dimensions(), src.dimensions());
    let dst_raw: &mut [u8] = &mut **dst;
    dst_raw
        .par_chunks_exact_mut(4)
        .zip(src.as_raw().par_chunks_exact(4))
        .for_each(|(d, s)| blend_pixel(d, s));
}

#[inline]
fn blend_pixel(d: &mut [u8], s: &[u8]) {
    match s[3] {
        0 => {}
        255 => d.copy_from_slice(s),
        sa => {
            let sa = sa as f32 / 255.0;
            let da = d[3] as f32 / 255.0;
            let out_a = sa + da * (1.0 - sa);
            for c in 0..3 {
                let v = (s[c] as f32 * sa + d[c] as f32 * da * (1.0 - sa)) / out_a;
                d[c] = v.round().clamp(0.0, 255.0) as u8;
            }
            d[3] = (out_a * 255.0).round() as u8;
        }
    }
}

/// Flatten `top` onto a copy of `base`, or onto a blank canvas without one
pub fn composite_over(
    base: Option<&RgbaImage>,
    top: Option<&RgbaImage>,
    width: u32,
    height: u32,
) -> RecolorResult<RgbaImage> {
    let mut out = match base {
        Some(base) if base.dimensions() == (width, height) => try_clone(base)?,
        _ => alloc_rgba(width, height)?,
    };
    if let Some(top) = top.filter(|t| t.dimensions() == (width, height)) {
        source_over(&mut out, top);
    }
    Ok(out)
}

/// Erase `dst` where `mask` is set (destination-out)
pub fn subtract_mask(dst: &mut RgbaImage, mask: &Mask) {
    debug_assert_eq!(dst.dimensions(), mask.dimensions());
    let dst_raw: &mut [u8] = &mut **dst;
    dst_raw
        .par_chunks_exact_mut(4)
        .zip(mask.as_raw().par_iter())
        .for_each(|(d, &m)| {
            if m != 0 {
                d[3] = ((d[3] as u16 * (255 - m) as u16) / 255) as u8;
                if d[3] == 0 {
                    d[..3].fill(0);
                }
            }
        });
}

/// Keep `mask` only where `clip` is set (destination-in)
pub fn intersect_mask(mask: &mut Mask, clip: &Mask) {
    debug_assert_eq!(mask.dimensions(), clip.dimensions());
    let raw: &mut [u8] = &mut **mask;
    raw.par_iter_mut()
        .zip(clip.as_raw().par_iter())
        .for_each(|(m, &c)| *m = ((*m as u16 * c as u16) / 255) as u8);
}
