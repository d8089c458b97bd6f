//! Interactive recoloring engine.
//!
//! A [`RecolorSession`] holds one photo and lets the user repaint regions of
//! it with catalogue paint colors: seed-point fills, freehand brush and
//! eraser strokes, and a polygon that confines either. Mask computation is
//! delegated to a [`MaskOracle`] running on background workers.

pub mod background;
pub mod compositing;
pub mod constants;
pub mod error;
pub mod freehand;
pub mod geometry;
pub mod host;
pub mod input;
pub mod logging;
pub mod oracle;
pub mod perf;
pub mod persistence;
pub mod polygon;
pub mod session;
pub mod settings;
pub mod single_flight;
pub mod spatial_index;
pub mod types;

pub use error::{RecolorError, RecolorResult};
pub use host::{HostEvent, ProviderHandle, SharedSession, ToolbarAction, dispatch};
pub use oracle::{MaskOracle, MaskOutcome, MaskRequest};
pub use session::RecolorSession;
pub use settings::Settings;
pub use types::{PaintColor, Point, Rect, SeedPoint, Tool};
