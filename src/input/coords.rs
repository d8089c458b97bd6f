//! Coordinate conversion between the screen and the loaded image.
//!
//! The view transform is a 2D affine matrix. Operations prefixed `post_`
//! apply after the current transform, so the newest operation acts in
//! screen space.

use crate::types::{Point, Rect};

/// 2D affine transform: `x' = a·x + c·y + tx`, `y' = b·x + d·y + ty`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Uniform scale followed by a translation
    pub fn scale_translate(scale: f32, tx: f32, ty: f32) -> Self {
        Affine {
            a: scale,
            d: scale,
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    /// `self` followed by `next`
    pub fn then(&self, next: &Affine) -> Affine {
        Affine {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            tx: next.a * self.tx + next.c * self.ty + next.tx,
            ty: next.b * self.tx + next.d * self.ty + next.ty,
        }
    }

    pub fn post_translate(&mut self, dx: f32, dy: f32) {
        self.tx += dx;
        self.ty += dy;
    }

    /// Scale by `s` around the pivot `(px, py)`
    pub fn post_scale(&mut self, s: f32, px: f32, py: f32) {
        self.a *= s;
        self.b *= s;
        self.c *= s;
        self.d *= s;
        self.tx = (self.tx - px) * s + px;
        self.ty = (self.ty - py) * s + py;
    }

    /// Rotate clockwise on screen by `degrees` around `(px, py)`
    pub fn post_rotate(&mut self, degrees: f32, px: f32, py: f32) {
        if degrees == 0.0 {
            return;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        let rotation = Affine {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: px - cos * px + sin * py,
            ty: py - sin * px - cos * py,
        };
        *self = self.then(&rotation);
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    pub fn invert(&self) -> Option<Affine> {
        let det = self.determinant();
        if det.abs() <= f32::EPSILON * f32::EPSILON || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            tx: (self.c * self.ty - self.d * self.tx) * inv,
            ty: (self.b * self.tx - self.a * self.ty) * inv,
        })
    }

    #[inline]
    pub fn map_point(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    /// Bounding box of the mapped rect
    pub fn map_rect(&self, rect: &Rect) -> Rect {
        let corners = rect.corners().map(|p| self.map_point(p));
        Rect::bounding(&corners).unwrap_or(*rect)
    }

    /// Uniform scale factor, independent of rotation
    #[inline]
    pub fn scale_factor(&self) -> f32 {
        self.a.hypot(self.b)
    }
}

/// Converts between screen space and image space for a given view matrix.
pub struct CoordinateConverter;

impl CoordinateConverter {
    /// Convert a screen position to image pixels, `None` for a singular matrix
    #[inline]
    pub fn screen_to_image(screen_pos: Point, view: &Affine) -> Option<Point> {
        view.invert().map(|inv| inv.map_point(screen_pos))
    }

    #[inline]
    pub fn image_to_screen(image_pos: Point, view: &Affine) -> Point {
        view.map_point(image_pos)
    }

    /// Convert a screen distance into image pixels
    #[inline]
    pub fn distance_screen_to_image(distance: f32, view: &Affine) -> f32 {
        let scale = view.scale_factor();
        if scale > 0.0 { distance / scale } else { distance }
    }
}
