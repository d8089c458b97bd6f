//! Pure geometry for freehand strokes and selection polygons.

mod path;
mod raster;
mod simplify;

pub use path::{QuadPath, QuadSegment};
pub use raster::{rasterize_polygon, stroke_polyline};
pub use simplify::{douglas_peucker, perpendicular_distance};
