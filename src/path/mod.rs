//! Control-point path editing: the authored waypoints, derived Bezier handles, and undo history.

pub mod history;
pub mod model;

pub use history::History;
pub use model::{BezierHandle, ControlPoint, PathChange, PathModel, compute_handles, polyline_length};
