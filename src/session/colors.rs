//! Color, fill threshold and coverage controls.

use super::{RecolorSession, SessionMessage, to_task};
use crate::background::Completion;
use crate::compositing::composite_over;
use crate::constants::{HUE_BUCKETS, NOT_APPLICABLE};
use crate::error::RecolorResult;
use crate::oracle::MaskOracle;
use crate::types::{PaintColor, Tool};
use image::RgbaImage;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Whether a hue bucket present in `hues` lies within `bucket - 2 ..= bucket + 1`,
/// wrapping around the color wheel
pub fn hue_matches(hues: &BTreeSet<u16>, bucket: u16) -> bool {
    let buckets = HUE_BUCKETS as i32;
    (-2..=1).any(|offset| {
        let b = (bucket as i32 + offset).rem_euclid(buckets) as u16;
        hues.contains(&b)
    })
}

/// Candidates whose hue actually appears in `overlay`
pub(crate) fn visible_colors(
    oracle: &dyn MaskOracle,
    overlay: &RgbaImage,
    candidates: &BTreeSet<PaintColor>,
) -> RecolorResult<BTreeSet<PaintColor>> {
    let hues = oracle.hue_histogram(overlay)?;
    Ok(candidates
        .iter()
        .filter(|c| hue_matches(&hues, c.hue_bucket()))
        .cloned()
        .collect())
}

impl RecolorSession {
    /// Pick the paint color; coverage resets to the color's default
    pub fn set_color(&mut self, color: PaintColor) {
        self.coverage = color.default_coverage();
        debug!(code = %color.code, coverage = self.coverage, "Color selected");
        self.active_color = Some(color);
    }

    /// Threshold of the newest seed, or -1 when it doesn't apply
    pub fn fill_threshold(&self) -> f32 {
        if self.tool != Tool::Fill || self.has_repaint {
            return NOT_APPLICABLE;
        }
        self.seeds.last().map_or(NOT_APPLICABLE, |s| s.threshold)
    }

    pub fn set_fill_threshold(&mut self, threshold: f32) -> Completion<()> {
        let threshold = threshold.clamp(0.0, 1.0);
        match self.seeds.last_mut() {
            Some(seed) if seed.threshold != threshold => seed.threshold = threshold,
            _ => return Completion::resolved(Ok(())),
        }
        self.update_mask()
    }

    /// Coverage for fills and brush strokes, or -1 when it doesn't apply
    pub fn coverage(&self) -> f32 {
        let fill_active = self.tool == Tool::Fill && !self.seeds.is_empty();
        if fill_active || self.tool == Tool::Brush {
            self.coverage
        } else {
            NOT_APPLICABLE
        }
    }

    pub fn set_coverage(&mut self, coverage: f32) -> Completion<()> {
        let coverage = coverage.clamp(0.0, 1.0);
        if coverage == self.coverage {
            return Completion::resolved(Ok(()));
        }
        self.coverage = coverage;
        self.update_mask()
    }

    /// Stroke width becomes `size` x 10 dp
    pub fn set_brush_size(&mut self, size: f32) {
        if size > 0.0 {
            self.settings.brush_size = size;
            self.freehand.set_brush_size(size, self.settings.density);
        }
    }

    /// Colors that are really visible in the composite, matched by hue.
    ///
    /// Candidates are the committed colors plus the active color.
    pub fn real_used_colors(&self) -> Completion<BTreeSet<PaintColor>> {
        let (Some(_), Some(base)) = (&self.image, self.history.top()) else {
            return Completion::resolved(Ok(BTreeSet::new()));
        };
        let base = Arc::clone(&base.image);
        let top = self.top_layer.as_ref().map(|t| Arc::clone(&t.image));
        let mut candidates = self.history.last_colors();
        if let Some(color) = &self.active_color {
            candidates.insert(color.clone());
        }

        let oracle = Arc::clone(&self.oracle);
        let completion = Completion::new();
        let done = completion.clone();
        self.executor.spawn(
            "real_used_colors",
            move || {
                let (width, height) = base.dimensions();
                let overlay = to_task(composite_over(Some(&base), top.as_deref(), width, height))?;
                to_task(visible_colors(oracle.as_ref(), &overlay, &candidates))
            },
            move |result| {
                done.resolve(result);
                SessionMessage::Resolved
            },
        );
        completion
    }
}
