use crate::constants::QUAD_FLATTEN_SEGMENTS;
use crate::types::{Point, Rect};

/// One quadratic Bezier segment continuing from the previous end point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadSegment {
    pub control: Point,
    pub end: Point,
}

/// A path made of quadratic segments, optionally closed by a straight line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuadPath {
    start: Option<Point>,
    segments: Vec<QuadSegment>,
    closed: bool,
}

impl QuadPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the smoothed path through `points`: every point becomes the
    /// control of a segment ending midway to the next one.
    pub fn smoothed(points: &[Point]) -> Self {
        let mut path = Self::new();
        let Some((&first, rest)) = points.split_first() else {
            return path;
        };
        path.move_to(first);
        let mut last = first;
        for &p in rest {
            path.quad_to(last, last.midpoint(p));
            last = p;
        }
        if rest.is_empty() {
            // A lone point still renders as a dot
            path.quad_to(first, first);
        }
        path
    }

    pub fn move_to(&mut self, p: Point) {
        self.start = Some(p);
        self.segments.clear();
        self.closed = false;
    }

    pub fn quad_to(&mut self, control: Point, end: Point) {
        if self.start.is_none() {
            self.start = Some(control);
        }
        self.segments.push(QuadSegment { control, end });
    }

    pub fn close(&mut self) {
        if self.start.is_some() {
            self.closed = true;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn start(&self) -> Option<Point> {
        self.start
    }

    pub fn segments(&self) -> &[QuadSegment] {
        &self.segments
    }

    /// Current pen position
    pub fn last_point(&self) -> Option<Point> {
        self.segments.last().map(|s| s.end).or(self.start)
    }

    /// Approximate the path by a polyline. A closed path repeats its start.
    pub fn flatten(&self) -> Vec<Point> {
        let Some(start) = self.start else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(1 + self.segments.len() * QUAD_FLATTEN_SEGMENTS);
        out.push(start);
        let mut from = start;
        for seg in &self.segments {
            for step in 1..=QUAD_FLATTEN_SEGMENTS {
                let t = step as f32 / QUAD_FLATTEN_SEGMENTS as f32;
                out.push(quad_point(from, seg.control, seg.end, t));
            }
            from = seg.end;
        }
        if self.closed && out.last() != Some(&start) {
            out.push(start);
        }
        out
    }

    pub fn bounds(&self) -> Option<Rect> {
        Rect::bounding(&self.flatten())
    }
}

#[inline]
fn quad_point(p0: Point, c: Point, p1: Point, t: f32) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * p0.x + 2.0 * u * t * c.x + t * t * p1.x,
        u * u * p0.y + 2.0 * u * t * c.y + t * t * p1.y,
    )
}
