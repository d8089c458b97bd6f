//! Application-wide constants.
//!
//! Centralizes magic numbers so the tuning of gestures, history and
//! persistence stays in one place. Distances marked "dp" are
//! density-independent and get multiplied by `Settings::density`.

// ============================================================================
// History
// ============================================================================

/// Maximum number of composited layers kept for undo
pub const MAX_HISTORY: usize = 6;

// ============================================================================
// Fill Tool
// ============================================================================

/// Threshold assigned to a freshly tapped seed point
pub const DEFAULT_SEED_THRESHOLD: f32 = 0.25;

/// Threshold of the single seed used to find a contour rectangle
pub const CONTOUR_SEED_THRESHOLD: f32 = 0.15;

/// Contour rects this small (either side) are grown before display
pub const MIN_CONTOUR_EXTENT: f32 = 10.0;

/// Amount a too-small contour rect is grown on every side
pub const CONTOUR_GROWTH: f32 = 10.0;

/// Sentinel returned by coverage/threshold getters when not applicable
pub const NOT_APPLICABLE: f32 = -1.0;

/// Gamma used when deriving a default coverage from a color's brightness
pub const COVERAGE_GAMMA: f32 = 2.2;

/// Divisor and bias of the default coverage curve
pub const COVERAGE_DIVISOR: f32 = 1.2;
pub const COVERAGE_BIAS: f32 = 0.05;

// ============================================================================
// Freehand & Polygon
// ============================================================================

/// Douglas-Peucker tolerance for simplifying freehand strokes
pub const STROKE_SIMPLIFY_TOLERANCE: f32 = 8.0;

/// Strokes ending this close to their start get closed (dp)
pub const STROKE_CLOSE_RADIUS_DP: f32 = 50.0;

/// Stroke width per unit of brush size (dp)
pub const BRUSH_WIDTH_PER_SIZE_DP: f32 = 10.0;

/// Polygon vertex hit-test radius (dp)
pub const VERTEX_HIT_RADIUS_DP: f32 = 80.0;

/// Radius of the dot renderers draw on each polygon vertex (dp)
pub const VERTEX_DOT_RADIUS_DP: f32 = 4.0;

/// Segments used when flattening one quadratic curve
pub const QUAD_FLATTEN_SEGMENTS: usize = 8;

// ============================================================================
// Transform Engine
// ============================================================================

/// Default upper zoom bound
pub const DEFAULT_MAX_SCALE: f32 = 1.8;

/// How far a live pinch may exceed the max scale before being clamped
pub const DEFAULT_OVERZOOM_FACTOR: f32 = 1.3;

/// Margin the image may shrink away from the view edges (dp, negative = inset)
pub const DEFAULT_EDGE_INSET_DP: f32 = -150.0;

/// Zoom-in multiplier for a double tap
pub const DOUBLE_TAP_SCALE_FACTOR: f32 = 2.0;

/// Minimum pointer count for scroll/fling gestures
pub const DEFAULT_SCROLL_MIN_POINTERS: usize = 2;

/// Displacement above which snapping animates instead of jumping (px)
pub const SNAP_THRESHOLD: f32 = 20.0;

/// Pause before a snap animation starts moving (ms)
pub const SNAP_DELAY_MS: u64 = 250;

/// Duration of the eased snap movement (ms)
pub const SNAP_DURATION_MS: u64 = 100;

/// Fling deceleration (px/s^2), split along the velocity vector
pub const FLING_DECELERATION: f32 = 20_000.0;

/// Duration of a scale animation (ms)
pub const SCALE_ANIMATION_MS: f32 = 200.0;

/// Duration of a rotation animation (ms)
pub const ROTATE_ANIMATION_MS: f32 = 500.0;

/// Quarter turn used by the rotate buttons (degrees)
pub const QUARTER_TURN: f32 = 90.0;

// ============================================================================
// Persistence
// ============================================================================

/// Version written into project and meta records
pub const RECORD_VERSION: i32 = 1;

/// Height of the swatch footer under a saved thumbnail (px)
pub const THUMBNAIL_FOOTER_HEIGHT: u32 = 150;

/// Maximum swatches drawn in the thumbnail footer
pub const THUMBNAIL_MAX_SWATCHES: usize = 4;

/// JPEG quality of saved thumbnails
pub const THUMBNAIL_JPEG_QUALITY: u8 = 90;

/// Default thumbnail size for project listings (px)
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 512;

/// File extension of full project records
pub const PROJECT_EXTENSION: &str = "recolor";

/// File extension of lightweight meta records
pub const META_EXTENSION: &str = "meta";

// ============================================================================
// Colors
// ============================================================================

/// Fallback numeric value of a color with no usable code (dark gray)
pub const DEFAULT_COLOR_VALUE: u32 = 0xFF44_4444;

/// Fill of a thumbnail requested before any image is loaded (light gray)
pub const PLACEHOLDER_GRAY: [u8; 4] = [0xCC, 0xCC, 0xCC, 0xFF];

/// Luminance above which a color counts as light
pub const LIGHT_LUMINANCE_THRESHOLD: f32 = 186.0;

/// Hue buckets per full turn (two degrees per bucket)
pub const HUE_BUCKETS: u16 = 180;

// ============================================================================
// Background Work
// ============================================================================

/// Worker threads used when settings don't specify a count
pub const DEFAULT_WORKER_THREADS: usize = 2;

/// Oracle calls slower than this get a warning (ms)
pub const ORACLE_WARN_MS: f64 = 250.0;

/// Compositing slower than this gets a warning (ms)
pub const COMPOSITE_WARN_MS: f64 = 50.0;
