//! Core value types shared by the engine: points, rects, tools, seeds and paint colors.

use crate::constants::{
    COVERAGE_BIAS, COVERAGE_DIVISOR, COVERAGE_GAMMA, DEFAULT_COLOR_VALUE, DEFAULT_SEED_THRESHOLD,
    HUE_BUCKETS, LIGHT_LUMINANCE_THRESHOLD,
};
use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Binary mask: 255 = set, 0 = clear.
pub type Mask = GrayImage;

/// Shared, immutable bitmap handed between the interaction and worker contexts.
pub type SharedImage = Arc<RgbaImage>;

/// Shared, immutable mask.
pub type SharedMask = Arc<Mask>;

/// A 2D point in either screen or image space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[inline]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    #[inline]
    pub fn offset(self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned rectangle (left/top inclusive, right/bottom exclusive).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rect at the origin with the given size
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    /// Grow (positive) or shrink (negative) every side by `amount`
    pub fn grow(&self, amount: f32) -> Rect {
        Rect::new(
            self.left - amount,
            self.top - amount,
            self.right + amount,
            self.bottom + amount,
        )
    }

    /// Smallest rect containing all points, `None` for an empty slice
    pub fn bounding(points: &[Point]) -> Option<Rect> {
        let first = points.first()?;
        let mut rect = Rect::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            rect.left = rect.left.min(p.x);
            rect.top = rect.top.min(p.y);
            rect.right = rect.right.max(p.x);
            rect.bottom = rect.bottom.max(p.y);
        }
        Some(rect)
    }

    /// Corners clockwise from top-left
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }
}

/// Editing tools. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Fill,
    Eraser,
    Brush,
    Polygon,
}

impl Tool {
    /// Tools that draw with the freehand tracker
    pub fn uses_freehand(self) -> bool {
        matches!(self, Tool::Eraser | Tool::Brush)
    }
}

/// One fill-tool tap in image space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedPoint {
    pub x: f32,
    pub y: f32,
    /// Fill sensitivity in [0, 1]
    pub threshold: f32,
}

impl SeedPoint {
    pub fn new(point: Point) -> Self {
        Self::with_threshold(point, DEFAULT_SEED_THRESHOLD)
    }

    pub fn with_threshold(point: Point, threshold: f32) -> Self {
        Self {
            x: point.x,
            y: point.y,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A catalogue paint color. Equality covers every field.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaintColor {
    pub name: String,
    /// Hex code, e.g. `#FF0000`
    pub code: String,
    /// Packed ARGB
    pub value: u32,
    pub catalogue_id: String,
    pub catalogue_name: String,
}

impl PaintColor {
    /// Build a color from its hex code; unparseable codes fall back to dark gray
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        catalogue_id: impl Into<String>,
        catalogue_name: impl Into<String>,
    ) -> Self {
        let code = code.into();
        let value = parse_hex(&code).unwrap_or(DEFAULT_COLOR_VALUE);
        Self {
            name: name.into(),
            code,
            value,
            catalogue_id: catalogue_id.into(),
            catalogue_name: catalogue_name.into(),
        }
    }

    /// Uncatalogued color straight from a hex code
    pub fn from_hex(code: &str) -> Self {
        Self::new(code, code, "", "")
    }

    /// Identity used when matching persisted colors against a catalogue
    pub fn key(&self) -> String {
        format!("{}:{}", self.catalogue_id, self.code)
    }

    #[inline]
    pub fn alpha(&self) -> u8 {
        (self.value >> 24) as u8
    }

    #[inline]
    pub fn rgb(&self) -> [u8; 3] {
        [
            (self.value >> 16) as u8,
            (self.value >> 8) as u8,
            self.value as u8,
        ]
    }

    pub fn rgba(&self) -> [u8; 4] {
        let [r, g, b] = self.rgb();
        [r, g, b, self.alpha()]
    }

    /// Hue in degrees [0, 360), saturation and value in [0, 1]
    pub fn hsv(&self) -> (f32, f32, f32) {
        rgb_to_hsv(self.rgb())
    }

    /// Hue bucket in [0, HUE_BUCKETS)
    pub fn hue_bucket(&self) -> u16 {
        hue_to_bucket(self.hsv().0)
    }

    pub fn is_light(&self) -> bool {
        let [r, g, b] = self.rgb();
        0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32 > LIGHT_LUMINANCE_THRESHOLD
    }

    /// Coverage a fill with this color starts with. Darker colors need more.
    pub fn default_coverage(&self) -> f32 {
        let (_, _, v) = self.hsv();
        let raw = ((1.0 - v).powf(1.0 / COVERAGE_GAMMA) / COVERAGE_DIVISOR + COVERAGE_BIAS).min(1.0);
        (raw * 1000.0).floor() / 1000.0
    }
}

/// Parse `#RRGGBB`, `#AARRGGBB` or the same without `#` into packed ARGB
pub fn parse_hex(code: &str) -> Option<u32> {
    let digits = code.trim().trim_start_matches('#');
    let value = u32::from_str_radix(digits, 16).ok()?;
    match digits.len() {
        6 => Some(0xFF00_0000 | value),
        8 => Some(value),
        _ => None,
    }
}

/// Format the RGB part of a packed color as `#RRGGBB`
pub fn to_hex(value: u32) -> String {
    format!("#{:06X}", value & 0x00FF_FFFF)
}

pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max <= f32::EPSILON { 0.0 } else { delta / max };
    (hue, saturation, max)
}

#[inline]
pub fn hue_to_bucket(hue_degrees: f32) -> u16 {
    let per_bucket = 360.0 / HUE_BUCKETS as f32;
    ((hue_degrees.rem_euclid(360.0) / per_bucket) as u16).min(HUE_BUCKETS - 1)
}
