//! Tool switching and input routing.

use super::{ExclusionState, RecolorSession, SessionMessage, to_task};
use crate::background::TaskResult;
use crate::compositing::{intersect_mask, subtract_mask, try_clone};
use crate::constants::{
    CONTOUR_GROWTH, CONTOUR_SEED_THRESHOLD, DEFAULT_COLOR_VALUE, MIN_CONTOUR_EXTENT,
};
use crate::error::RecolorResult;
use crate::freehand::StrokeMask;
use crate::host::{HostEvent, ToolbarAction};
use crate::input::{Drawable, Gesture, InteractionState, TouchConsumer, TouchEvent, TouchPhase};
use crate::oracle::MaskRequest;
use crate::types::{PaintColor, Point, Rect, SeedPoint, Tool, to_hex};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl RecolorSession {
    // ==================== Tools ====================

    /// Switch tools. A pending edit is committed first; if its layer is
    /// still being computed, the edit is set aside and commits when its
    /// layer arrives, while the new tool starts from a clean edit.
    pub fn set_tool(&mut self, tool: Tool) {
        if tool == self.tool {
            return;
        }
        if self.flight.is_in_flight() && self.can_compute() {
            self.detach_pending_edit();
        } else if self.top_layer.is_some() {
            if let Err(e) = self.maybe_commit_history(true) {
                warn!("Could not commit before switching tools: {e}");
            }
        }

        self.tool = tool;
        self.freehand.set_visible(tool.uses_freehand());
        self.freehand.reset();
        self.polygon.set_interactive(tool == Tool::Polygon);
        self.polygon
            .set_visible(tool == Tool::Polygon || self.polygon_enabled);
        self.interaction = InteractionState::Idle;
        info!(?tool, "Tool changed");
    }

    pub fn polygon_enabled(&self) -> bool {
        self.polygon_enabled
    }

    /// Confine fills and strokes to the polygon
    pub fn set_polygon_enabled(&mut self, enabled: bool) {
        if enabled == self.polygon_enabled {
            return;
        }
        self.polygon_enabled = enabled;
        self.polygon
            .set_visible(enabled || self.tool == Tool::Polygon);
        if !enabled && self.exclusion.is_polygon() {
            let exclusion = match self.history.top() {
                Some(layer) => ExclusionState::FromComposite(Arc::clone(&layer.image)),
                None => ExclusionState::Empty,
            };
            self.set_exclusion(exclusion);
        }
    }

    fn apply_polygon_exclusion(&mut self) {
        let points = self.polygon.points().to_vec();
        self.set_exclusion(ExclusionState::FromPolygon(points));
    }

    // ==================== Taps ====================

    /// Image-space point under `screen`, if it lands on the image
    fn tap_to_image(&self, screen: Point) -> Option<Point> {
        let image = self.image.as_ref()?;
        let point = self.transform.map_to_image_space(screen)?;
        let (width, height) = image.dimensions();
        Rect::from_size(width as f32, height as f32)
            .contains(point)
            .then_some(point)
    }

    /// Single tap in screen coordinates. Returns whether it did anything.
    pub fn on_tap(&mut self, screen: Point) -> RecolorResult<bool> {
        match self.tool {
            Tool::Fill => self.fill_tap(screen),
            Tool::Polygon => self.polygon_tap(screen),
            Tool::Brush | Tool::Eraser => Ok(false),
        }
    }

    fn fill_tap(&mut self, screen: Point) -> RecolorResult<bool> {
        let Some(color) = self.active_color.clone() else {
            debug!("Fill tap without a color");
            return Ok(false);
        };
        let Some(point) = self.tap_to_image(screen) else {
            return Ok(false);
        };
        self.maybe_commit_history(false)?;

        if self.polygon_enabled {
            if self.polygon.has_polygon() {
                self.apply_polygon_exclusion();
            } else {
                self.request_contour(point);
            }
        }
        self.seeds.push(SeedPoint::new(point));
        self.coverage = color.default_coverage();
        self.current_color = Some(color);
        debug!(x = point.x, y = point.y, seeds = self.seeds.len(), "Fill seed added");
        self.update_mask();
        Ok(true)
    }

    fn polygon_tap(&mut self, screen: Point) -> RecolorResult<bool> {
        let Some(point) = self.tap_to_image(screen) else {
            return Ok(false);
        };
        self.maybe_commit_history(false)?;
        self.request_contour(point);
        Ok(true)
    }

    /// Ask the oracle for the region around `point` to seed the polygon
    fn request_contour(&mut self, point: Point) {
        let Some(image) = self.image.clone() else {
            return;
        };
        let color = self
            .active_color
            .clone()
            .unwrap_or_else(|| PaintColor::from_hex(&to_hex(DEFAULT_COLOR_VALUE)));
        let request = MaskRequest {
            image,
            color,
            seeds: vec![SeedPoint::with_threshold(point, CONTOUR_SEED_THRESHOLD)],
            coverage: self.coverage,
            exclusion: None,
            freehand: None,
            disable_exclusion: false,
        };
        let oracle = Arc::clone(&self.oracle);
        let generation = self.generation;
        self.executor.spawn(
            "contour_rect",
            move || to_task(oracle.contour_rect(&request)),
            move |result| SessionMessage::ContourFound { generation, result },
        );
    }

    pub(crate) fn apply_contour(&mut self, generation: u64, result: TaskResult<Rect>) {
        if generation != self.generation {
            return;
        }
        match result {
            Ok(rect) => {
                let rect = if rect.width() <= MIN_CONTOUR_EXTENT || rect.height() <= MIN_CONTOUR_EXTENT {
                    rect.grow(CONTOUR_GROWTH)
                } else {
                    rect
                };
                self.polygon.set_rect(rect);
                self.polygon_enabled = true;
                debug!(?rect, "Polygon seeded from contour");
            }
            Err(e) => {
                debug!("Contour hint failed: {e}");
                if self.polygon.has_polygon() {
                    self.polygon_enabled = true;
                }
            }
        }
        self.polygon
            .set_visible(self.polygon_enabled || self.tool == Tool::Polygon);
    }

    // ==================== Touches ====================

    /// Raw touch. Returns whether a tool consumed it.
    pub fn on_touch(&mut self, event: &TouchEvent) -> RecolorResult<bool> {
        if self.interaction.is_pinching() {
            return Ok(false);
        }
        if event.pointer_count > 1 {
            // A second finger hands the gesture to pan/zoom
            match self.interaction.take() {
                InteractionState::Drawing { .. } => self.freehand.reset(),
                InteractionState::DraggingVertex { .. } => {
                    self.polygon.drag_end();
                }
                _ => {}
            }
            return Ok(false);
        }

        match self.tool {
            Tool::Brush | Tool::Eraser => self.route_freehand(event),
            Tool::Polygon => Ok(self.route_polygon(event)),
            Tool::Fill => Ok(false),
        }
    }

    fn route_freehand(&mut self, event: &TouchEvent) -> RecolorResult<bool> {
        let consumed = self.freehand.on_touch(event);
        match event.phase {
            TouchPhase::Down if consumed => {
                self.interaction = InteractionState::Drawing { tool: self.tool };
            }
            TouchPhase::Up => {
                if let InteractionState::Drawing { tool } = self.interaction.take()
                    && let Some(stroke) = self.freehand.take_completed()
                {
                    self.finish_stroke(tool, stroke)?;
                }
            }
            TouchPhase::Cancel => self.interaction = InteractionState::Idle,
            _ => {}
        }
        Ok(consumed)
    }

    fn route_polygon(&mut self, event: &TouchEvent) -> bool {
        let consumed = self.polygon.on_touch(event);
        match event.phase {
            TouchPhase::Down => {
                if let Some(index) = self.polygon.dragged_vertex() {
                    self.interaction = InteractionState::DraggingVertex { index };
                }
            }
            TouchPhase::Up | TouchPhase::Cancel => {
                if self.interaction.is_dragging_vertex() {
                    self.interaction = InteractionState::Idle;
                    if self.polygon_enabled && self.exclusion.is_polygon() {
                        self.apply_polygon_exclusion();
                    }
                }
            }
            TouchPhase::Move => {}
        }
        consumed
    }

    fn finish_stroke(&mut self, tool: Tool, stroke: StrokeMask) -> RecolorResult<()> {
        match tool {
            Tool::Brush => self.finish_brush(stroke),
            Tool::Eraser => self.finish_eraser(stroke),
            Tool::Fill | Tool::Polygon => Ok(()),
        }
    }

    fn finish_brush(&mut self, stroke: StrokeMask) -> RecolorResult<()> {
        let Some((width, height)) = self.image.as_ref().map(|i| i.dimensions()) else {
            return Ok(());
        };
        let Some(color) = self.active_color.clone() else {
            debug!("Brush stroke without a color");
            return Ok(());
        };
        let hint = stroke.rasterize(width, height)?;
        self.maybe_commit_history(false)?;

        if self.polygon_enabled && self.polygon.has_polygon() {
            self.apply_polygon_exclusion();
        }
        self.seeds.clear();
        self.freehand_hint = Some(Arc::new(hint));
        self.current_color = Some(color);
        self.update_mask();
        Ok(())
    }

    /// Erase committed paint under the stroke, synchronously
    fn finish_eraser(&mut self, stroke: StrokeMask) -> RecolorResult<()> {
        crate::profile_scope!("erase_stroke");
        if self.history.is_empty() && self.top_layer.is_none() {
            debug!("Nothing to erase");
            return Ok(());
        }
        let Some((width, height)) = self.image.as_ref().map(|i| i.dimensions()) else {
            return Ok(());
        };
        let mut mask = stroke.rasterize(width, height)?;
        if self.polygon_enabled && self.polygon.has_polygon() {
            let clip = self.polygon.rasterize(width, height)?;
            intersect_mask(&mut mask, &clip);
        }
        self.maybe_commit_history(false)?;

        let Some(layer) = self.history.top() else {
            return Ok(());
        };
        let mut erased = try_clone(&layer.image)?;
        subtract_mask(&mut erased, &mask);
        let colors = self.history.last_colors();
        self.push_history(Arc::new(erased), colors);
        debug!(depth = self.history.len(), "Erased stroke");
        Ok(())
    }

    // ==================== Gestures ====================

    /// Recognized gesture. Taps go to the tool, everything else to pan/zoom.
    pub fn on_gesture(&mut self, gesture: &Gesture) -> RecolorResult<bool> {
        let consumed = match *gesture {
            Gesture::Tap(point) => return self.on_tap(point),
            Gesture::ScaleBegin { .. } => {
                match self.interaction.take() {
                    InteractionState::Drawing { .. } => self.freehand.reset(),
                    InteractionState::DraggingVertex { .. } => {
                        self.polygon.drag_end();
                    }
                    _ => {}
                }
                let consumed = self.transform.on_gesture(gesture);
                if consumed {
                    self.interaction = InteractionState::Pinching;
                }
                consumed
            }
            Gesture::ScaleEnd => {
                if self.interaction.is_pinching() {
                    self.interaction = InteractionState::Idle;
                }
                self.transform.on_gesture(gesture)
            }
            _ => self.transform.on_gesture(gesture),
        };
        self.sync_view();
        Ok(consumed)
    }

    pub fn rotate_clockwise(&mut self) {
        self.transform.rotate_clockwise();
        self.sync_view();
    }

    pub fn rotate_counter_clockwise(&mut self) {
        self.transform.rotate_counter_clockwise();
        self.sync_view();
    }

    // ==================== Toolbar ====================

    /// Perform a toolbar action and queue its host event
    pub fn on_toolbar(&mut self, action: ToolbarAction) -> RecolorResult<()> {
        match action {
            ToolbarAction::Fill => {
                self.set_tool(Tool::Fill);
                self.host().emit(HostEvent::FillTapped);
            }
            ToolbarAction::Eraser => {
                self.set_tool(Tool::Eraser);
                self.host().emit(HostEvent::EraserTapped);
            }
            ToolbarAction::Brush => self.set_tool(Tool::Brush),
            ToolbarAction::Polygon => self.set_tool(Tool::Polygon),
            ToolbarAction::Undo => {
                self.undo();
                self.host().emit(HostEvent::UndoTapped);
            }
            ToolbarAction::Share => self.share()?,
            ToolbarAction::ColorPalette => self.host().emit(HostEvent::ColorPaletteTapped),
            ToolbarAction::PickImage => self.host().emit(HostEvent::ImageRequested),
            ToolbarAction::NewImage => self.host().emit(HostEvent::NewImageRequested),
            ToolbarAction::SaveColor(code) => self.host().emit(HostEvent::SaveColorClicked { code }),
        }
        Ok(())
    }
}
