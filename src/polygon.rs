//! Draggable selection polygon.
//!
//! Vertices live in image space. Hit testing happens in image space too,
//! with the on-screen hit radius converted through the current view scale so
//! the touch target stays the same size at every zoom level.

use crate::constants::{VERTEX_DOT_RADIUS_DP, VERTEX_HIT_RADIUS_DP};
use crate::error::RecolorResult;
use crate::geometry::rasterize_polygon;
use crate::input::{
    Affine, CoordinateConverter, Drawable, TouchConsumer, TouchEvent, TouchPhase, Transformable,
};
use crate::settings::Settings;
use crate::spatial_index::VertexIndex;
use crate::types::{Mask, Point, Rect};
use tracing::debug;

#[derive(Clone, Copy, Debug)]
struct VertexDrag {
    index: usize,
    /// Vertex position at gesture-down
    origin: Point,
    /// Touch position at gesture-down
    touch_down: Point,
}

pub struct PolygonSelector {
    points: Vec<Point>,
    index: VertexIndex,
    view: Affine,
    interactive: bool,
    visible: bool,
    hit_radius: f32,
    dot_radius: f32,
    drag: Option<VertexDrag>,
}

impl PolygonSelector {
    pub fn new(settings: &Settings) -> Self {
        Self {
            points: Vec::new(),
            index: VertexIndex::new(),
            view: Affine::IDENTITY,
            interactive: false,
            visible: false,
            hit_radius: settings.dp(VERTEX_HIT_RADIUS_DP),
            dot_radius: settings.dp(VERTEX_DOT_RADIUS_DP),
            drag: None,
        }
    }

    /// Replace the polygon with the four corners of `bounds`
    pub fn set_rect(&mut self, bounds: Rect) {
        self.set_points(bounds.corners().to_vec());
    }

    pub fn set_points(&mut self, points: Vec<Point>) {
        self.index = VertexIndex::from_points(&points);
        self.points = points;
        self.drag = None;
    }

    pub fn clear(&mut self) {
        self.set_points(Vec::new());
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn has_polygon(&self) -> bool {
        self.points.len() >= 3
    }

    pub fn set_interactive(&mut self, enabled: bool) {
        self.interactive = enabled;
        if !enabled {
            self.drag = None;
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Radius renderers use for the vertex handles (screen px)
    pub fn dot_radius(&self) -> f32 {
        self.dot_radius
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Index of the vertex being dragged
    pub fn dragged_vertex(&self) -> Option<usize> {
        self.drag.map(|d| d.index)
    }

    fn to_image(&self, screen: Point) -> Option<Point> {
        CoordinateConverter::screen_to_image(screen, &self.view)
    }

    /// Grab the nearest vertex within the hit radius. Needs exactly one pointer.
    pub fn drag_begin(&mut self, screen: Point, pointer_count: usize) -> bool {
        self.drag = None;
        if !self.interactive || pointer_count != 1 || self.points.is_empty() {
            return false;
        }
        let Some(touch) = self.to_image(screen) else {
            return false;
        };
        let radius = CoordinateConverter::distance_screen_to_image(self.hit_radius, &self.view);
        let Some(index) = self.index.nearest_within(touch.x, touch.y, radius) else {
            return false;
        };
        self.drag = Some(VertexDrag {
            index,
            origin: self.points[index],
            touch_down: touch,
        });
        debug!(index, "Started vertex drag");
        true
    }

    /// Place the dragged vertex at origin + (touch - touch_down)
    pub fn drag_move(&mut self, screen: Point, pointer_count: usize) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        if pointer_count != 1 {
            self.drag = None;
            return false;
        }
        let Some(touch) = self.to_image(screen) else {
            return false;
        };
        let moved = drag
            .origin
            .offset(touch.x - drag.touch_down.x, touch.y - drag.touch_down.y);
        self.points[drag.index] = moved;
        self.index.update(drag.index, moved);
        true
    }

    pub fn drag_end(&mut self) -> bool {
        self.drag.take().is_some()
    }
}

impl Drawable for PolygonSelector {
    /// Filled polygon in image space, independent of the view transform
    fn rasterize(&self, width: u32, height: u32) -> RecolorResult<Mask> {
        rasterize_polygon(&self.points, width, height)
    }
}

impl Transformable for PolygonSelector {
    fn set_view_matrix(&mut self, matrix: &Affine) {
        self.view = *matrix;
    }
}

impl TouchConsumer for PolygonSelector {
    fn on_touch(&mut self, event: &TouchEvent) -> bool {
        match event.phase {
            TouchPhase::Down => self.drag_begin(event.position, event.pointer_count),
            TouchPhase::Move => self.drag_move(event.position, event.pointer_count),
            TouchPhase::Up | TouchPhase::Cancel => self.drag_end(),
        }
    }
}
