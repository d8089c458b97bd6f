use crate::types::Point;

/// Distance from `p` to the infinite line through `a` and `b`.
///
/// Falls back to the distance to `a` when the line is degenerate.
pub fn perpendicular_distance(p: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len <= f32::EPSILON {
        return p.distance(a);
    }
    ((p.x - a.x) * dy - (p.y - a.y) * dx).abs() / len
}

/// Ramer-Douglas-Peucker polyline simplification.
///
/// Returns the input unchanged for fewer than three points or a
/// non-positive tolerance. The first and last points are always kept.
pub fn douglas_peucker(points: &[Point], tolerance: f32) -> Vec<Point> {
    let n = points.len();
    if n < 3 || !(tolerance > 0.0) {
        return points.to_vec();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut ranges = vec![(0usize, n - 1)];
    while let Some((start, end)) = ranges.pop() {
        if end <= start + 1 {
            continue;
        }
        let (a, b) = (points[start], points[end]);
        let mut max_dist = 0.0f32;
        let mut max_idx = start;
        for (offset, p) in points[start + 1..end].iter().enumerate() {
            let d = perpendicular_distance(*p, a, b);
            if d > max_dist {
                max_dist = d;
                max_idx = start + 1 + offset;
            }
        }
        if max_dist > tolerance {
            keep[max_idx] = true;
            ranges.push((start, max_idx));
            ranges.push((max_idx, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then_some(*p))
        .collect()
}
