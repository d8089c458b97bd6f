//! Brush and Eraser Tool Tests

use crate::helpers::{FakeOracle, TRANSPARENT, blue, composite_pixel, red, settle, small_session};
use image::Rgba;
use recolor::input::{Gesture, InteractionState, TouchEvent, TouchPhase};
use recolor::{Point, RecolorSession, Tool};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Drag one finger through `points`
fn stroke(session: &mut RecolorSession, points: &[(f32, f32)]) {
    let last = points.len() - 1;
    for (i, &(x, y)) in points.iter().enumerate() {
        let phase = match i {
            0 => TouchPhase::Down,
            i if i == last => TouchPhase::Up,
            _ => TouchPhase::Move,
        };
        assert!(session.on_touch(&TouchEvent::new(phase, x, y)).unwrap());
    }
}

#[test]
fn test_brush_stroke_paints_along_the_path() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_tool(Tool::Brush);
    session.set_color(red());

    stroke(&mut session, &[(10.0, 30.0), (40.0, 30.0), (70.0, 30.0)]);
    assert!(session.interaction().is_idle());
    settle(&mut session);

    let request = oracle.last_request().unwrap();
    assert!(request.freehand.is_some());
    assert!(request.seeds.is_empty());
    assert!(request.disable_exclusion);

    assert_eq!(composite_pixel(&session, 40, 30), RED);
    assert_eq!(composite_pixel(&session, 40, 5), TRANSPARENT);
    assert!(session.seeds().is_empty());
}

#[test]
fn test_brush_without_color_does_nothing() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_tool(Tool::Brush);

    stroke(&mut session, &[(10.0, 30.0), (40.0, 30.0), (70.0, 30.0)]);
    settle(&mut session);
    assert_eq!(oracle.mask_calls(), 0);
    assert!(!session.has_top_layer());
}

#[test]
fn test_next_brush_stroke_commits_the_previous_one() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_tool(Tool::Brush);
    session.set_color(red());
    stroke(&mut session, &[(10.0, 10.0), (40.0, 10.0), (70.0, 10.0)]);
    settle(&mut session);

    session.set_color(blue());
    stroke(&mut session, &[(10.0, 50.0), (40.0, 50.0), (70.0, 50.0)]);
    assert_eq!(session.history().len(), 1);
    settle(&mut session);

    assert_eq!(composite_pixel(&session, 40, 10), RED);
    assert_eq!(composite_pixel(&session, 40, 50), Rgba([0, 0, 255, 255]));
}

#[test]
fn test_eraser_removes_committed_paint() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    settle(&mut session);

    session.set_tool(Tool::Eraser);
    assert_eq!(session.history().len(), 1);
    stroke(&mut session, &[(5.0, 30.0), (20.0, 30.0), (35.0, 30.0)]);

    // Erasing is synchronous and never calls the oracle
    assert_eq!(session.history().len(), 2);
    assert_eq!(oracle.mask_calls(), 1);
    assert_eq!(composite_pixel(&session, 20, 30), TRANSPARENT);
    assert_eq!(composite_pixel(&session, 20, 5), RED);

    session.undo();
    assert_eq!(composite_pixel(&session, 20, 30), RED);
}

#[test]
fn test_eraser_with_nothing_painted_is_a_no_op() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_tool(Tool::Eraser);

    stroke(&mut session, &[(5.0, 30.0), (20.0, 30.0), (35.0, 30.0)]);
    assert!(session.history().is_empty());
}

#[test]
fn test_second_pointer_cancels_the_stroke() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_tool(Tool::Brush);
    session.set_color(red());

    session.on_touch(&TouchEvent::new(TouchPhase::Down, 10.0, 30.0)).unwrap();
    assert!(session.interaction().is_drawing());
    let consumed = session
        .on_touch(&TouchEvent::new(TouchPhase::Move, 20.0, 30.0).with_pointers(2))
        .unwrap();
    assert!(!consumed);
    assert!(session.interaction().is_idle());
    assert!(!session.freehand().is_tracking());

    session.on_touch(&TouchEvent::new(TouchPhase::Up, 30.0, 30.0)).unwrap();
    settle(&mut session);
    assert_eq!(oracle.mask_calls(), 0);
}

#[test]
fn test_pinch_discards_the_stroke() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_tool(Tool::Brush);
    session.set_color(red());

    session.on_touch(&TouchEvent::new(TouchPhase::Down, 10.0, 30.0)).unwrap();
    session
        .on_gesture(&Gesture::ScaleBegin {
            focus: Point::new(40.0, 30.0),
        })
        .unwrap();
    assert_eq!(session.interaction(), &InteractionState::Pinching);

    // Touches are ignored while pinching
    let consumed = session
        .on_touch(&TouchEvent::new(TouchPhase::Up, 30.0, 30.0))
        .unwrap();
    assert!(!consumed);

    session.on_gesture(&Gesture::ScaleEnd).unwrap();
    assert!(session.interaction().is_idle());
    settle(&mut session);
    assert_eq!(oracle.mask_calls(), 0);
}

#[test]
fn test_brush_size_sets_stroke_width() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_brush_size(3.0);
    assert_eq!(session.freehand().stroke_width(), 30.0);

    session.set_brush_size(0.0);
    assert_eq!(session.freehand().stroke_width(), 30.0);
}

#[test]
fn test_freehand_only_visible_for_stroke_tools() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    assert!(!session.freehand().is_visible());

    session.set_tool(Tool::Brush);
    assert!(session.freehand().is_visible());
    session.set_tool(Tool::Eraser);
    assert!(session.freehand().is_visible());
    session.set_tool(Tool::Polygon);
    assert!(!session.freehand().is_visible());

    // Touches with the fill tool are not consumed
    session.set_tool(Tool::Fill);
    let consumed = session
        .on_touch(&TouchEvent::new(TouchPhase::Down, 10.0, 10.0))
        .unwrap();
    assert!(!consumed);
}

#[test]
fn test_stroke_after_switching_from_a_computing_fill() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();

    // The wall layer is still computing when the brush takes over
    session.set_tool(Tool::Brush);
    session.set_color(blue());
    stroke(&mut session, &[(50.0, 50.0), (62.0, 50.0), (75.0, 50.0)]);
    settle(&mut session);

    assert_eq!(session.history().len(), 1);
    assert!(session.has_top_layer());
    assert_eq!(composite_pixel(&session, 10, 10), RED);
    assert_eq!(composite_pixel(&session, 10, 50), RED);
    assert_eq!(composite_pixel(&session, 62, 50), BLUE);
    assert_eq!(composite_pixel(&session, 62, 10), TRANSPARENT);
}
