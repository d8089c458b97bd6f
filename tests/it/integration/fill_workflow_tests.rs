//! Fill Tool Workflow Tests

use crate::helpers::{
    DOOR, FakeOracle, TRANSPARENT, WALL, blue, composite_pixel, green, red, session_with_image,
    settle, small_session, two_tone_image,
};
use image::Rgba;
use recolor::constants::{DEFAULT_SEED_THRESHOLD, NOT_APPLICABLE};
use recolor::{Point, Tool};
use std::collections::BTreeSet;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

#[test]
fn test_fill_commit_and_undo_scenario() {
    let oracle = FakeOracle::new();
    let mut session = session_with_image(&oracle, two_tone_image(800, 600));
    session.set_color(red());

    assert!(session.on_tap(Point::new(100.0, 100.0)).unwrap());
    assert_eq!(session.seeds().len(), 1);

    // Switching tools while the layer is still computing defers the commit
    session.set_tool(Tool::Polygon);
    settle(&mut session);
    assert_eq!(session.history().len(), 1);
    assert!(!session.has_top_layer());
    assert_eq!(composite_pixel(&session, 100, 100), RED);

    session.undo();
    assert_eq!(session.history().len(), 0);
    assert!(session.composite_image().unwrap().is_none());
}

#[test]
fn test_fill_after_switching_away_and_back_is_kept() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();

    // Both switches happen before the wall layer arrives
    session.set_tool(Tool::Polygon);
    assert_eq!(session.pending_commit_count(), 1);
    assert!(session.seeds().is_empty());
    session.set_tool(Tool::Fill);
    session.on_tap(Point::new(60.0, 10.0)).unwrap();
    assert_eq!(session.seeds().len(), 1);
    settle(&mut session);

    assert_eq!(session.pending_commit_count(), 0);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.seeds().len(), 1);
    assert!(session.has_top_layer());
    assert_eq!(composite_pixel(&session, 10, 10), RED);
    assert_eq!(composite_pixel(&session, 60, 10), RED);
}

#[test]
fn test_edits_detached_in_a_row_commit_in_order() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    session.set_tool(Tool::Polygon);
    session.set_tool(Tool::Fill);
    session.set_color(blue());
    session.on_tap(Point::new(60.0, 10.0)).unwrap();
    session.set_tool(Tool::Eraser);
    assert_eq!(session.pending_commit_count(), 2);

    settle(&mut session);
    assert_eq!(session.pending_commit_count(), 0);
    assert_eq!(session.history().len(), 2);
    assert!(!session.has_top_layer());
    assert_eq!(composite_pixel(&session, 10, 10), RED);
    assert_eq!(composite_pixel(&session, 60, 10), BLUE);
    assert_eq!(
        session.history().last_colors(),
        BTreeSet::from([red(), blue()])
    );
    // One run per edit
    assert_eq!(oracle.mask_calls(), 2);
}

#[test]
fn test_fill_paints_only_the_tapped_region() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());

    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    settle(&mut session);

    assert!(session.has_top_layer());
    assert_eq!(session.current_color(), Some(&red()));
    assert_eq!(composite_pixel(&session, 10, 10), RED);
    assert_eq!(composite_pixel(&session, 70, 10), TRANSPARENT);
    assert_eq!(oracle.mask_calls(), 1);
}

#[test]
fn test_fill_tap_without_color_is_ignored() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);

    assert!(!session.on_tap(Point::new(10.0, 10.0)).unwrap());
    settle(&mut session);
    assert!(session.seeds().is_empty());
    assert_eq!(oracle.mask_calls(), 0);
}

#[test]
fn test_out_of_bounds_tap_changes_nothing() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    settle(&mut session);
    session.set_tool(Tool::Eraser);
    session.set_tool(Tool::Fill);
    session.set_color(blue());
    session.on_tap(Point::new(70.0, 10.0)).unwrap();
    settle(&mut session);

    let seeds = session.seeds().to_vec();
    let depth = session.history().len();
    let calls = oracle.mask_calls();
    let exclusion = format!("{:?}", session.exclusion());

    for (x, y) in [(-1.0, 10.0), (80.0, 10.0), (10.0, 60.0), (10.0, -0.5), (500.0, 500.0)] {
        assert!(!session.on_tap(Point::new(x, y)).unwrap());
    }
    settle(&mut session);

    assert_eq!(session.seeds(), seeds.as_slice());
    assert_eq!(session.history().len(), depth);
    assert_eq!(format!("{:?}", session.exclusion()), exclusion);
    assert_eq!(oracle.mask_calls(), calls);
}

#[test]
fn test_same_color_taps_accumulate_seeds() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());

    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    session.on_tap(Point::new(70.0, 10.0)).unwrap();
    settle(&mut session);

    assert_eq!(session.seeds().len(), 2);
    assert!(session.history().is_empty());
    assert_eq!(composite_pixel(&session, 10, 10), RED);
    assert_eq!(composite_pixel(&session, 70, 10), RED);
}

#[test]
fn test_color_change_commits_previous_fill() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    settle(&mut session);

    session.set_color(blue());
    session.on_tap(Point::new(70.0, 10.0)).unwrap();
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.seeds().len(), 1);
    settle(&mut session);

    assert_eq!(composite_pixel(&session, 10, 10), RED);
    assert_eq!(composite_pixel(&session, 70, 10), BLUE);
    let committed = &session.history().top().unwrap().used_colors;
    assert_eq!(committed, &BTreeSet::from([red()]));
}

#[test]
fn test_committed_paint_is_protected_from_the_next_fill() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    settle(&mut session);

    // Same region, new color: everything there is already painted
    session.set_color(blue());
    session.on_tap(Point::new(20.0, 20.0)).unwrap();
    settle(&mut session);

    assert!(oracle.last_request().unwrap().exclusion.is_some());
    assert_eq!(composite_pixel(&session, 20, 20), RED);
}

#[test]
fn test_rapid_updates_collapse_to_two_oracle_calls() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();

    let handles: Vec<_> = (1..=8)
        .map(|i| session.set_coverage(i as f32 / 10.0))
        .collect();
    assert!(session.is_updating());
    assert!(handles.windows(2).all(|pair| pair[0].same_as(&pair[1])));

    settle(&mut session);
    assert_eq!(oracle.mask_calls(), 2);
    assert!(!session.is_updating());
    assert_eq!(handles[0].result(), Some(Ok(())));
    assert_eq!(oracle.last_request().unwrap().coverage, 0.8);
}

#[test]
fn test_idle_update_without_work_resolves_immediately() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    let handle = session.update_mask();
    assert_eq!(handle.result(), Some(Ok(())));
    assert_eq!(oracle.mask_calls(), 0);
}

#[test]
fn test_threshold_and_coverage_controls() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    assert_eq!(session.fill_threshold(), NOT_APPLICABLE);
    assert_eq!(session.coverage(), NOT_APPLICABLE);

    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    assert_eq!(session.fill_threshold(), DEFAULT_SEED_THRESHOLD);
    assert_eq!(session.coverage(), red().default_coverage());

    session.set_fill_threshold(0.6);
    assert_eq!(session.seeds()[0].threshold, 0.6);
    session.set_fill_threshold(3.0);
    assert_eq!(session.fill_threshold(), 1.0);
    settle(&mut session);
    assert_eq!(oracle.last_request().unwrap().seeds[0].threshold, 1.0);

    session.set_tool(Tool::Eraser);
    assert_eq!(session.fill_threshold(), NOT_APPLICABLE);
    assert_eq!(session.coverage(), NOT_APPLICABLE);
}

#[test]
fn test_oracle_failure_keeps_last_good_layer() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    settle(&mut session);

    oracle.set_failing(true);
    let handle = session.set_coverage(0.5);
    settle(&mut session);

    assert!(matches!(handle.result(), Some(Err(_))));
    assert!(!session.is_updating());
    assert!(session.has_top_layer());
    assert_eq!(composite_pixel(&session, 10, 10), RED);

    // The slot is free again
    oracle.set_failing(false);
    let handle = session.set_coverage(0.7);
    settle(&mut session);
    assert_eq!(handle.result(), Some(Ok(())));
}

#[test]
fn test_repainting_fill_commits_before_next_seed() {
    let oracle = FakeOracle::new();
    oracle.set_repaint(true);
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    settle(&mut session);
    assert_eq!(session.fill_threshold(), NOT_APPLICABLE);

    session.on_tap(Point::new(70.0, 10.0)).unwrap();
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.seeds().len(), 1);
    assert_eq!(session.seeds()[0].position(), Point::new(70.0, 10.0));
    settle(&mut session);
    assert_eq!(composite_pixel(&session, 10, 10), RED);
    assert_eq!(composite_pixel(&session, 70, 10), RED);
}

#[test]
fn test_real_used_colors_matches_visible_hues() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();
    settle(&mut session);
    session.set_color(blue());
    session.on_tap(Point::new(70.0, 10.0)).unwrap();
    settle(&mut session);

    let used = session.real_used_colors();
    settle(&mut session);
    assert_eq!(used.result(), Some(Ok(BTreeSet::from([red(), blue()]))));

    // A picked but unused color is filtered out
    session.set_tool(Tool::Eraser);
    session.set_color(green());
    let used = session.real_used_colors();
    settle(&mut session);
    assert_eq!(used.result(), Some(Ok(BTreeSet::from([red(), blue()]))));
}

#[test]
fn test_real_used_colors_is_empty_without_history() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    let used = session.real_used_colors();
    assert_eq!(used.result(), Some(Ok(BTreeSet::new())));
}

#[test]
fn test_loading_a_new_image_drops_in_flight_results() {
    let oracle = FakeOracle::new();
    let mut session = small_session(&oracle);
    session.set_color(red());
    session.on_tap(Point::new(10.0, 10.0)).unwrap();

    session.load_image(two_tone_image(40, 30)).unwrap();
    settle(&mut session);

    assert!(!session.has_top_layer());
    assert!(session.seeds().is_empty());
    assert!(!session.is_updating());
    assert_eq!(session.image().unwrap().dimensions(), (40, 30));
    assert_eq!(session.image().unwrap().get_pixel(5, 5), &WALL);
    assert_eq!(session.image().unwrap().get_pixel(35, 5), &DOOR);
}
