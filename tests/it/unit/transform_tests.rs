//! Transform engine tests: edge clamping, snapping, flings, pinch and double tap.
//!
//! Every engine runs on a `ManualClock`, so animations only advance when a
//! test moves time forward.

use recolor::input::{EdgeCode, Gesture, ManualClock, TransformEngine};
use recolor::{Point, Rect, Settings};

const EPS: f32 = 1e-2;

/// 400×300 image in a 400×300 view: fit is 1 and the default inset allows 0.5
fn engine_with(settings: &Settings) -> (TransformEngine, ManualClock) {
    let clock = ManualClock::new();
    let mut engine = TransformEngine::with_clock(settings, Box::new(clock.clone()));
    engine.set_view_size(400.0, 300.0);
    engine.bind_image(400, 300);
    (engine, clock)
}

fn engine() -> (TransformEngine, ManualClock) {
    engine_with(&Settings::default())
}

fn rect(engine: &TransformEngine) -> Rect {
    engine.image_rect().unwrap()
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < EPS,
        "expected {expected}, got {actual}"
    );
}

/// Step every `frame_ms` until the fling ends, bounded
fn run_fling(engine: &mut TransformEngine, clock: &ManualClock, frame_ms: u64) {
    for _ in 0..1000 {
        if !engine.is_flinging() {
            return;
        }
        clock.advance(frame_ms);
        engine.step();
    }
    panic!("fling never stopped");
}

#[test]
fn test_fitted_image_cannot_move() {
    let (mut engine, _) = engine();
    assert_close(engine.scale_factor(), 1.0);
    assert_close(engine.min_scale(), 0.5);

    assert_eq!(engine.translate(10.0, 0.0), EdgeCode::YOnly);
    assert_eq!(engine.translate(0.0, -5.0), EdgeCode::XOnly);
    assert_eq!(engine.translate(10.0, 10.0), EdgeCode::None);
    assert_eq!(rect(&engine), Rect::new(0.0, 0.0, 400.0, 300.0));
}

#[test]
fn test_zoomed_image_translates_until_an_edge() {
    let (mut engine, _) = engine();
    engine.scale(1.5, 200.0, 150.0);
    let r = rect(&engine);
    assert_close(r.left, -100.0);
    assert_close(r.top, -75.0);
    assert_close(r.right, 500.0);
    assert_close(r.bottom, 375.0);

    assert_eq!(engine.translate(50.0, 20.0), EdgeCode::Both);
    assert_close(rect(&engine).left, -50.0);

    // Only 50 of the 80 fit before the left edge reaches the view
    assert_eq!(engine.translate(80.0, 0.0), EdgeCode::YOnly);
    assert_close(rect(&engine).left, 0.0);
    assert_close(rect(&engine).top, -55.0);
}

#[test]
fn test_undersized_image_stays_centered() {
    let (mut engine, _) = engine();
    engine.scale(0.5, 200.0, 150.0);
    let before = rect(&engine);
    assert_close(before.left, 100.0);
    assert_close(before.top, 75.0);

    assert_eq!(engine.translate(30.0, -20.0), EdgeCode::None);
    let after = rect(&engine);
    assert_close(after.left, 100.0);
    assert_close(after.top, 75.0);
    assert_close(after.right, 300.0);
    assert_close(after.bottom, 225.0);
}

#[test]
fn test_scale_clamps_to_min_and_overzoom() {
    let (mut engine, _) = engine();
    engine.scale(0.1, 200.0, 150.0);
    assert_close(engine.scale_factor(), 0.5);
    engine.scale(10.0, 200.0, 150.0);
    assert_close(engine.scale_factor(), 1.8 * 1.3);
}

#[test]
fn test_small_snap_applies_immediately() {
    let (mut engine, _) = engine();
    engine.scale(1.05, 200.0, 150.0);
    engine.scale(1.0, 0.0, 0.0);
    assert!(rect(&engine).left < -5.0);

    engine.snap();
    assert!(!engine.is_snapping());
    assert_close(rect(&engine).left, 0.0);
    assert_close(rect(&engine).top, 0.0);
}

#[test]
fn test_large_snap_waits_then_eases() {
    let (mut engine, clock) = engine();
    engine.scale(1.5, 200.0, 150.0);
    engine.scale(1.0, 0.0, 0.0);
    assert_close(rect(&engine).left, -66.67);
    assert_close(rect(&engine).top, -50.0);

    engine.snap();
    assert!(engine.is_snapping());

    clock.set(249);
    engine.step();
    assert_close(rect(&engine).left, -66.67);

    // Halfway through the ease-out three quarters of the distance is covered
    clock.set(300);
    engine.step();
    assert_close(rect(&engine).left, -66.67 * 0.25);
    assert_close(rect(&engine).top, -12.5);

    clock.set(350);
    assert!(!engine.step());
    assert_close(rect(&engine).left, 0.0);
    assert_close(rect(&engine).top, 0.0);
}

#[test]
fn test_fling_stops_at_the_edge() {
    let (mut engine, clock) = engine();
    engine.scale(1.5, 200.0, 150.0);
    engine.fling(3000.0, 0.0);
    assert!(engine.is_flinging());

    run_fling(&mut engine, &clock, 10);
    assert!(!engine.is_animating());
    assert_close(rect(&engine).left, 0.0);
    assert_close(rect(&engine).top, -75.0);
}

#[test]
fn test_diagonal_fling_locks_to_remaining_axis() {
    let (mut engine, clock) = engine();
    engine.scale(1.5, 200.0, 150.0);
    engine.fling(3000.0, 3000.0);

    // The top edge is 75 px away, the left edge 100
    let mut frames = 0;
    while rect(&engine).top < -EPS {
        assert!(engine.is_flinging());
        clock.advance(5);
        engine.step();
        frames += 1;
        assert!(frames < 1000);
    }
    let left_at_lock = rect(&engine).left;
    assert!(left_at_lock < -1.0, "x stopped together with y");
    assert!(engine.is_flinging());

    clock.advance(5);
    engine.step();
    assert!(rect(&engine).left > left_at_lock);
    assert_close(rect(&engine).top, 0.0);

    run_fling(&mut engine, &clock, 5);
    assert_close(rect(&engine).left, 0.0);
    assert_close(rect(&engine).top, 0.0);
}

#[test]
fn test_down_stops_a_fling() {
    let (mut engine, clock) = engine();
    engine.scale(1.5, 200.0, 150.0);
    engine.fling(1000.0, 0.0);
    clock.advance(10);
    engine.step();
    let left = rect(&engine).left;

    engine.on_gesture(&Gesture::Down);
    assert!(!engine.is_flinging());
    clock.advance(10);
    engine.step();
    assert_eq!(rect(&engine).left, left);
}

#[test]
fn test_pinch_overzooms_then_eases_back() {
    let (mut engine, clock) = engine();
    let center = Point::new(200.0, 150.0);
    assert!(engine.scale_begin(center));
    assert!(engine.scale_by(2.0, center));
    assert_close(engine.scale_factor(), 2.0);
    assert!(engine.scale_by(2.0, center));
    assert_close(engine.scale_factor(), 2.34);

    assert!(engine.scale_end());
    assert!(engine.is_animating());

    clock.advance(100);
    engine.step();
    assert_close(engine.scale_factor(), (2.34 + 1.8) / 2.0);

    clock.advance(100);
    engine.step();
    assert_close(engine.scale_factor(), 1.8);
    // Centered pinch leaves the view covered, so nothing to snap
    assert!(!engine.is_animating());
}

#[test]
fn test_double_tap_toggles_and_keeps_tap_fixed() {
    let settings = Settings {
        edge_inset_dp: 0.0,
        ..Settings::default()
    };
    let (mut engine, clock) = engine_with(&settings);
    assert_close(engine.min_scale(), 1.0);

    let tap = Point::new(100.0, 80.0);
    let under_tap = engine.map_to_image_space(tap).unwrap();
    assert!(engine.double_tap(tap));
    clock.advance(200);
    engine.step();

    // Twice the fit, capped at the max scale
    assert_close(engine.scale_factor(), 1.8);
    let after = engine.map_to_image_space(tap).unwrap();
    assert_close(after.x, under_tap.x);
    assert_close(after.y, under_tap.y);

    // Zoomed in, so the next double tap returns to the minimum
    assert!(engine.on_gesture(&Gesture::DoubleTap(Point::new(300.0, 200.0))));
    clock.advance(200);
    while engine.step() {
        clock.advance(50);
    }
    assert_close(engine.scale_factor(), 1.0);
    assert_close(rect(&engine).left, 0.0);
    assert_close(rect(&engine).top, 0.0);
}

#[test]
fn test_double_tap_near_edge_keeps_view_covered() {
    let settings = Settings {
        edge_inset_dp: 0.0,
        ..Settings::default()
    };
    let clock = ManualClock::new();
    let mut engine = TransformEngine::with_clock(&settings, Box::new(clock.clone()));
    engine.set_view_size(400.0, 300.0);
    // Letterboxed: the image spans y 50..250
    engine.bind_image(400, 200);
    assert_close(engine.min_scale(), 1.0);

    // Keeping y = 60 fixed would leave a band above the image
    assert!(engine.double_tap(Point::new(200.0, 60.0)));
    clock.advance(200);
    engine.step();

    let r = rect(&engine);
    assert_close(engine.scale_factor(), 1.8);
    assert_close(r.left, -160.0);
    assert_close(r.top, 0.0);
    assert!(r.bottom >= 300.0);
}

#[test]
fn test_first_double_tap_after_pinch_is_ignored() {
    let settings = Settings {
        edge_inset_dp: 0.0,
        ..Settings::default()
    };
    let (mut engine, clock) = engine_with(&settings);
    let center = Point::new(200.0, 150.0);
    engine.scale_begin(center);
    assert!(!engine.double_tap(center), "double tap during a pinch");
    engine.scale_end();

    assert!(!engine.double_tap(center));
    clock.advance(200);
    engine.step();
    assert_close(engine.scale_factor(), 1.0);

    assert!(engine.double_tap(center));
    clock.advance(200);
    engine.step();
    assert_close(engine.scale_factor(), 1.8);
}

#[test]
fn test_double_tap_can_be_disabled() {
    let settings = Settings {
        double_tap_zoom: false,
        ..Settings::default()
    };
    let (mut engine, _) = engine_with(&settings);
    assert!(!engine.double_tap(Point::new(100.0, 100.0)));
    assert!(!engine.is_animating());
}

#[test]
fn test_scroll_and_fling_need_two_pointers() {
    let (mut engine, _) = engine();
    engine.scale(1.5, 200.0, 150.0);

    let one_finger = Gesture::Scroll {
        dx: 10.0,
        dy: 0.0,
        pointers: 1,
    };
    assert!(!engine.on_gesture(&one_finger));
    assert_close(rect(&engine).left, -100.0);
    assert!(!engine.fling_with(3000.0, 0.0, 1));
    assert!(!engine.is_flinging());

    let two_fingers = Gesture::Scroll {
        dx: 10.0,
        dy: 0.0,
        pointers: 2,
    };
    assert!(engine.on_gesture(&two_fingers));
    assert_close(rect(&engine).left, -90.0);
    assert!(engine.on_gesture(&Gesture::Fling {
        vx: 3000.0,
        vy: 0.0,
        pointers: 2,
    }));
    assert!(engine.is_flinging());
}

#[test]
fn test_pan_ignored_while_zoom_animates() {
    let (mut engine, _) = engine();
    engine.scale(1.5, 200.0, 150.0);
    let center = Point::new(200.0, 150.0);
    engine.scale_begin(center);
    engine.scale_by(2.0, center);
    engine.scale_end();

    let left = rect(&engine).left;
    assert!(!engine.pan_by(10.0, 0.0, 2));
    assert_eq!(rect(&engine).left, left);
}
