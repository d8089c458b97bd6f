//! Layer History and Undo Integration Tests

use crate::helpers::{FakeOracle, blue, composite_pixel, green, red, settle, small_session};
use image::Rgba;
use recolor::input::{TouchEvent, TouchPhase};
use recolor::{PaintColor, Point, RecolorSession, Tool};
use std::collections::BTreeSet;

/// Fill at (x, y) with `color` and wait for the layer
fn fill(session: &mut RecolorSession, color: PaintColor, x: f32, y: f32) {
    session.set_color(color);
    session.on_tap(Point::new(x, y)).unwrap();
    settle(session);
}

fn assert_blank(session: &RecolorSession) {
    assert!(session.history().is_empty());
    assert!(session.seeds().is_empty());
    assert!(!session.has_top_layer());
    assert!(session.current_color().is_none());
    assert!(session.exclusion().is_empty());
    assert!(session.composite_image().unwrap().is_none());
}

#[test]
fn test_history_depth_is_bounded() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    let colors = [red(), blue(), green()];

    for i in 0..9 {
        fill(&mut session, colors[i % 3].clone(), 10.0 + i as f32, 10.0);
        assert!(session.history().len() <= 6);
    }
    session.set_tool(Tool::Eraser);
    assert_eq!(session.history().len(), 6);
}

#[test]
fn test_used_colors_only_grow() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    let colors = [red(), blue(), red(), green(), blue(), green(), red()];

    let mut previous: BTreeSet<PaintColor> = BTreeSet::new();
    for (i, color) in colors.into_iter().enumerate() {
        fill(&mut session, color, 10.0 + i as f32 * 10.0, 10.0);
        if let Some(top) = session.history().top() {
            assert!(top.used_colors.is_superset(&previous));
            previous = top.used_colors.clone();
        }
    }
    session.set_tool(Tool::Brush);
    let top = session.history().top().unwrap();
    assert!(top.used_colors.is_superset(&previous));
    assert_eq!(top.used_colors, BTreeSet::from([red(), blue(), green()]));
}

#[test]
fn test_eviction_keeps_colors_of_evicted_layers() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    fill(&mut session, green(), 10.0, 10.0);
    for i in 0..7 {
        let color = if i % 2 == 0 { red() } else { blue() };
        fill(&mut session, color, 70.0, 10.0 + i as f32);
    }
    session.set_tool(Tool::Eraser);

    assert_eq!(session.history().len(), 6);
    assert!(session.history().last_colors().contains(&green()));
}

#[test]
fn test_undo_steps_back_seed_then_layer_then_history() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    fill(&mut session, red(), 10.0, 10.0);
    fill(&mut session, blue(), 70.0, 10.0);
    session.on_tap(Point::new(75.0, 50.0)).unwrap();
    settle(&mut session);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.seeds().len(), 2);

    session.undo();
    assert_eq!(session.seeds().len(), 1);
    settle(&mut session);
    assert!(session.has_top_layer());

    session.undo();
    assert!(session.seeds().is_empty());
    assert!(!session.has_top_layer());
    assert!(session.current_color().is_none());
    assert_eq!(session.history().len(), 1);
    assert_eq!(composite_pixel(&session, 10, 10), Rgba([255, 0, 0, 255]));

    session.undo();
    assert!(session.history().is_empty());
    assert!(session.exclusion().is_empty());

    // Nothing left: undo is a no-op
    session.undo();
    assert_blank(&session);
}

#[test]
fn test_undo_drops_stale_in_flight_layer() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    session.undo();
    settle(&mut session);

    assert!(!session.has_top_layer());
    assert!(!session.is_updating());
}

#[test]
fn test_undo_drops_edit_waiting_to_commit() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    fill(&mut session, blue(), 70.0, 10.0);
    session.set_tool(Tool::Polygon);
    session.set_tool(Tool::Fill);
    assert_eq!(session.history().len(), 1);

    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    session.set_tool(Tool::Brush);
    assert_eq!(session.pending_commit_count(), 1);

    session.undo();
    assert_eq!(session.pending_commit_count(), 0);
    settle(&mut session);

    assert_eq!(session.history().len(), 1);
    assert!(!session.has_top_layer());
    assert_eq!(composite_pixel(&session, 10, 10), Rgba([0, 0, 0, 0]));
    assert_eq!(composite_pixel(&session, 70, 10), Rgba([0, 0, 255, 255]));

    // The next undo goes on to history
    session.undo();
    assert!(session.history().is_empty());
}

#[test]
fn test_undo_all_from_fresh_session() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.undo_all();
    settle(&mut session);
    assert_blank(&session);
}

#[test]
fn test_undo_all_while_computing() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    session.on_tap(Point::new(70.0, 10.0)).unwrap();
    session.undo_all();
    settle(&mut session);
    assert_blank(&session);
}

#[test]
fn test_undo_all_with_history_and_pending_layer() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    fill(&mut session, red(), 10.0, 10.0);
    fill(&mut session, blue(), 70.0, 10.0);
    session.undo_all();
    settle(&mut session);
    assert_blank(&session);
}

#[test]
fn test_undo_all_after_brush_and_eraser() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    fill(&mut session, red(), 10.0, 10.0);

    session.set_tool(Tool::Eraser);
    for (phase, x) in [(TouchPhase::Down, 5.0), (TouchPhase::Move, 20.0), (TouchPhase::Up, 35.0)] {
        session.on_touch(&TouchEvent::new(phase, x, 30.0)).unwrap();
    }
    session.set_tool(Tool::Brush);
    session.set_color(blue());
    session.on_touch(&TouchEvent::new(TouchPhase::Down, 50.0, 30.0)).unwrap();
    assert!(session.interaction().is_drawing());

    session.undo_all();
    settle(&mut session);
    assert_blank(&session);
    assert!(session.interaction().is_idle());
}

#[test]
fn test_commit_marks_session_unsaved() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    assert!(!session.is_image_changed());

    fill(&mut session, red(), 10.0, 10.0);
    session.set_tool(Tool::Polygon);
    assert!(session.is_image_changed());
    assert!(!session.is_saved());
}
