//! Committed layer history and the commit/undo rules.

use super::{ExclusionState, RecolorSession};
use crate::compositing::composite_over;
use crate::constants::{COMPOSITE_WARN_MS, MAX_HISTORY};
use crate::error::RecolorResult;
use crate::input::InteractionState;
use crate::types::{PaintColor, SeedPoint, SharedImage, SharedMask, Tool};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// One committed, flattened state of the overlay
#[derive(Clone, Debug)]
pub struct CompositedLayer {
    pub image: SharedImage,
    /// Every color used up to and including this commit
    pub used_colors: BTreeSet<PaintColor>,
}

/// Bounded undo stack; the oldest entry is evicted past the limit.
#[derive(Clone, Debug)]
pub struct LayerHistory {
    layers: VecDeque<CompositedLayer>,
    limit: usize,
}

impl Default for LayerHistory {
    fn default() -> Self {
        Self::with_limit(MAX_HISTORY)
    }
}

impl LayerHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            layers: VecDeque::with_capacity(limit),
            limit: limit.max(1),
        }
    }

    /// Push and return the evicted entry, if any
    pub fn push(&mut self, layer: CompositedLayer) -> Option<CompositedLayer> {
        self.layers.push_back(layer);
        if self.layers.len() > self.limit {
            self.layers.pop_front()
        } else {
            None
        }
    }

    pub fn pop(&mut self) -> Option<CompositedLayer> {
        self.layers.pop_back()
    }

    pub fn top(&self) -> Option<&CompositedLayer> {
        self.layers.back()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Colors of the newest entry
    pub fn last_colors(&self) -> BTreeSet<PaintColor> {
        self.top().map(|l| l.used_colors.clone()).unwrap_or_default()
    }
}

/// Uncommitted result of the latest mask update
#[derive(Clone, Debug)]
pub(crate) struct TopLayer {
    pub image: SharedImage,
    /// Color the layer was painted with
    pub color: Option<PaintColor>,
    /// Whether the polygon confined it
    pub with_polygon: bool,
}

/// An edit finished by a tool switch while its layer was still computing.
///
/// It no longer shares state with the live edit; it commits straight into
/// history when its own oracle run comes back.
#[derive(Clone, Debug)]
pub(crate) struct DetachedEdit {
    pub seeds: Vec<SeedPoint>,
    pub freehand: Option<SharedMask>,
    pub color: PaintColor,
    pub coverage: f32,
    pub with_polygon: bool,
    pub disable_exclusion: bool,
    pub exclusion: ExclusionState,
    pub exclusion_revision: u64,
    /// Oracle run that paints it; `None` until one is started
    pub job: Option<u64>,
}

impl RecolorSession {
    // ==================== Commit ====================

    /// Flatten the top layer into history when the edit is complete.
    ///
    /// Without `force`, a fill only commits once the color or the polygon
    /// confinement changed since the layer was painted; other tools commit
    /// any pending layer.
    pub(crate) fn maybe_commit_history(&mut self, force: bool) -> RecolorResult<bool> {
        let Some(top) = &self.top_layer else {
            return Ok(false);
        };
        let changed = top.color.as_ref() != self.active_color.as_ref()
            || top.with_polygon != self.polygon_enabled;
        if !force && self.tool == Tool::Fill && !changed {
            return Ok(false);
        }

        let (width, height) = top.image.dimensions();
        let base = self.history.top().map(|l| l.image.as_ref());
        let flattened = self
            .timings
            .time("commit_composite", COMPOSITE_WARN_MS, || {
                composite_over(base, Some(top.image.as_ref()), width, height)
            })?;

        let mut used_colors = self.history.last_colors();
        if let Some(color) = &self.current_color {
            used_colors.insert(color.clone());
        }
        self.push_history(Arc::new(flattened), used_colors);
        self.top_layer = None;
        self.seeds.clear();
        self.freehand_hint = None;
        self.has_repaint = false;
        info!(depth = self.history.len(), force, "Committed layer");
        Ok(true)
    }

    /// Push a flattened layer and point the exclusion at it
    pub(crate) fn push_history(&mut self, image: SharedImage, used_colors: BTreeSet<PaintColor>) {
        if self
            .history
            .push(CompositedLayer {
                image: Arc::clone(&image),
                used_colors,
            })
            .is_some()
        {
            debug!("Evicted oldest history entry");
        }
        self.layer_epoch += 1;
        self.set_exclusion(ExclusionState::FromComposite(image));
        self.saved = false;
    }

    // ==================== Undo ====================

    /// Step back one edit: a seed, then the uncommitted layer, then an edit
    /// still waiting to commit, then history
    pub fn undo(&mut self) {
        self.freehand.reset();
        self.interaction = InteractionState::Idle;

        if self.seeds.pop().is_some() {
            if !self.seeds.is_empty() {
                self.update_mask();
                return;
            }
            self.current_color = None;
            self.discard_top_layer();
            debug!("Undo removed the last seed");
            return;
        }

        if self.top_layer.is_some() || self.freehand_hint.is_some() {
            self.discard_top_layer();
            debug!("Undo discarded uncommitted layer");
            return;
        }

        if let Some(edit) = self.pending_commits.pop_back() {
            // A run already painting it lands on a stale epoch and is dropped
            self.layer_epoch += 1;
            debug!(job = ?edit.job, "Undo dropped an edit waiting to commit");
            return;
        }

        if self.history.pop().is_some() {
            self.layer_epoch += 1;
            let exclusion = match self.history.top() {
                Some(layer) => ExclusionState::FromComposite(Arc::clone(&layer.image)),
                None => ExclusionState::Empty,
            };
            self.set_exclusion(exclusion);
            self.saved = false;
            debug!(depth = self.history.len(), "Undo popped history");
        }
    }

    pub(crate) fn discard_top_layer(&mut self) {
        self.top_layer = None;
        self.freehand_hint = None;
        self.has_repaint = false;
        self.layer_epoch += 1;
    }

    /// Back to the freshly loaded image
    pub fn undo_all(&mut self) {
        self.freehand.reset();
        self.interaction = InteractionState::Idle;
        self.seeds.clear();
        self.top_layer = None;
        self.freehand_hint = None;
        self.has_repaint = false;
        self.history.clear();
        self.current_color = None;
        self.pending_commits.clear();
        self.layer_epoch += 1;
        self.set_exclusion(ExclusionState::Empty);
    }
}
