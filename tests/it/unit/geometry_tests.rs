//! Geometry tests: simplification, smoothing and rasterization.

use recolor::Point;
use recolor::geometry::{QuadPath, douglas_peucker, perpendicular_distance, rasterize_polygon, stroke_polyline};

/// A wobbly deterministic polyline
fn wave(count: usize, amplitude: f32) -> Vec<Point> {
    (0..count)
        .map(|i| {
            let x = i as f32 * 2.0;
            Point::new(x, (x * 0.37).sin() * amplitude + (x * 1.3).cos() * amplitude * 0.2)
        })
        .collect()
}

fn set_count(mask: &image::GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] > 0).count()
}

#[test]
fn test_simplify_keeps_endpoints() {
    for count in [3, 10, 57, 200] {
        for tolerance in [0.1, 1.0, 5.0, 100.0] {
            let input = wave(count, 12.0);
            let output = douglas_peucker(&input, tolerance);
            assert!(output.len() >= 2 && output.len() <= input.len());
            assert_eq!(output.first(), input.first());
            assert_eq!(output.last(), input.last());
        }
    }
}

#[test]
fn test_simplify_output_is_a_subsequence_within_tolerance() {
    let input = wave(120, 8.0);
    let tolerance = 1.5;
    let output = douglas_peucker(&input, tolerance);

    // Indices of kept points in the input
    let mut kept = Vec::new();
    let mut next = 0;
    for p in &output {
        let idx = input[next..].iter().position(|q| q == p).unwrap() + next;
        kept.push(idx);
        next = idx + 1;
    }

    for pair in kept.windows(2) {
        let (a, b) = (input[pair[0]], input[pair[1]]);
        for p in &input[pair[0] + 1..pair[1]] {
            assert!(perpendicular_distance(*p, a, b) <= tolerance);
        }
    }
}

#[test]
fn test_larger_tolerance_never_keeps_more() {
    let input = wave(150, 20.0);
    let fine = douglas_peucker(&input, 0.5).len();
    let coarse = douglas_peucker(&input, 10.0).len();
    assert!(coarse <= fine);
}

#[test]
fn test_smoothed_path_ends_at_last_midpoint() {
    let points = [Point::new(0.0, 0.0), Point::new(20.0, 0.0), Point::new(20.0, 20.0)];
    let path = QuadPath::smoothed(&points);
    assert_eq!(path.start(), Some(Point::new(0.0, 0.0)));
    assert_eq!(path.last_point(), Some(Point::new(20.0, 10.0)));

    let bounds = path.bounds().unwrap();
    assert!(bounds.right <= 20.0 && bounds.bottom <= 10.0);
}

#[test]
fn test_closed_path_flattens_back_to_start() {
    let mut path = QuadPath::smoothed(&[Point::new(1.0, 1.0), Point::new(9.0, 1.0), Point::new(9.0, 9.0)]);
    path.close();
    let flat = path.flatten();
    assert_eq!(flat.first(), flat.last());
}

#[test]
fn test_stroke_covers_the_polyline() {
    let line = [Point::new(5.0, 10.5), Point::new(35.0, 10.5)];
    let mask = stroke_polyline(&line, 4.0, 40, 20).unwrap();
    for x in 5..35 {
        assert_eq!(mask.get_pixel(x, 10)[0], 255, "gap at x={x}");
    }
    assert_eq!(mask.get_pixel(20, 0)[0], 0);
    assert_eq!(mask.get_pixel(20, 19)[0], 0);
}

#[test]
fn test_triangle_area_is_about_half_the_box() {
    let triangle = [Point::new(0.0, 0.0), Point::new(40.0, 0.0), Point::new(0.0, 40.0)];
    let filled = set_count(&rasterize_polygon(&triangle, 40, 40).unwrap());
    assert!((760..=840).contains(&filled), "filled {filled}");
}

#[test]
fn test_empty_inputs_give_empty_masks() {
    assert_eq!(set_count(&stroke_polyline(&[], 3.0, 10, 10).unwrap()), 0);
    assert_eq!(set_count(&rasterize_polygon(&[], 10, 10).unwrap()), 0);
}
