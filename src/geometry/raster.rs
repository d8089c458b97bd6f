//! Scanline polygon fill and round-capped polyline stroking into masks.

use crate::compositing::alloc_mask;
use crate::error::RecolorResult;
use crate::types::{Mask, Point};

const SET: u8 = 255;

/// Fill a closed polygon (even-odd rule) sampled at pixel centers.
pub fn rasterize_polygon(vertices: &[Point], width: u32, height: u32) -> RecolorResult<Mask> {
    let mut mask = alloc_mask(width, height)?;
    if vertices.len() < 3 || width == 0 || height == 0 {
        return Ok(mask);
    }

    let min_y = vertices.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let max_y = vertices.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
    let first_row = (min_y - 0.5).ceil().max(0.0) as u32;
    let last_row = ((max_y - 0.5).floor().max(-1.0) as i64).min(height as i64 - 1);

    let mut crossings = Vec::with_capacity(vertices.len());
    for y in first_row as i64..=last_row {
        let sy = y as f32 + 0.5;
        crossings.clear();
        for (i, a) in vertices.iter().enumerate() {
            let b = vertices[(i + 1) % vertices.len()];
            // Half-open rule so shared vertices count once
            if (a.y <= sy && b.y > sy) || (b.y <= sy && a.y > sy) {
                crossings.push(a.x + (sy - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
        crossings.sort_by(|l, r| l.total_cmp(r));

        for pair in crossings.chunks_exact(2) {
            let start = (pair[0] - 0.5).ceil().max(0.0) as u32;
            let end = ((pair[1] - 0.5).ceil().max(0.0) as u32).min(width);
            for x in start..end {
                mask.put_pixel(x, y as u32, image::Luma([SET]));
            }
        }
    }
    Ok(mask)
}

/// Stroke a polyline with round caps and joins.
///
/// A single point (or a run of identical points) produces a dot.
pub fn stroke_polyline(points: &[Point], stroke_width: f32, width: u32, height: u32) -> RecolorResult<Mask> {
    let mut mask = alloc_mask(width, height)?;
    if points.is_empty() || width == 0 || height == 0 {
        return Ok(mask);
    }
    let radius = (stroke_width / 2.0).max(0.5);

    let segments: Vec<(Point, Point)> = if points.len() == 1 {
        vec![(points[0], points[0])]
    } else {
        points.windows(2).map(|w| (w[0], w[1])).collect()
    };

    for (a, b) in segments {
        let min_x = (a.x.min(b.x) - radius).floor().max(0.0) as u32;
        let min_y = (a.y.min(b.y) - radius).floor().max(0.0) as u32;
        let max_x = ((a.x.max(b.x) + radius).ceil().max(0.0) as u32).min(width);
        let max_y = ((a.y.max(b.y) + radius).ceil().max(0.0) as u32).min(height);
        for y in min_y..max_y {
            for x in min_x..max_x {
                let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                if distance_to_segment(center, a, b) <= radius {
                    mask.put_pixel(x, y, image::Luma([SET]));
                }
            }
        }
    }
    Ok(mask)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let vx = b.x - a.x;
    let vy = b.y - a.y;
    let len2 = vx * vx + vy * vy;
    if len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * vx + (p.y - a.y) * vy) / len2).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * vx, a.y + t * vy))
}
