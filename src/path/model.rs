use std::fmt;

use crate::{
    foundation::core::{BezPath, Point},
    foundation::error::{PathlightError, PathlightResult},
    path::history::{DEFAULT_HISTORY_CAPACITY, History},
};

/// Authored waypoint: position in image pixels plus the focus size at that point.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ControlPoint {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl ControlPoint {
    pub fn new(x: f64, y: f64, size: f64) -> Self {
        Self { x, y, size }
    }

    pub fn pos(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &ControlPoint) -> f64 {
        self.pos().distance(other.pos())
    }

    pub fn validate(&self) -> PathlightResult<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(PathlightError::validation(
                "control point position must be finite",
            ));
        }
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(PathlightError::validation(
                "control point size must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// Derived tangent handles of one control point. Endpoints carry none.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BezierHandle {
    pub handle_in: Option<Point>,
    pub handle_out: Option<Point>,
}

/// Redraw notification delivered to [`PathModel`] listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathChange {
    Added(usize),
    Removed(usize),
    Moved(usize),
    /// Points were replaced from history (undo/redo) or a loaded project.
    Restored,
    Smoothing,
    Cleared,
}

type Listener = Box<dyn FnMut(PathChange) + Send>;

/// Sum of straight-line distances between consecutive points.
pub fn polyline_length(points: &[ControlPoint]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Tangent handle scale applied to `next - prev` before the smoothing factor.
const HANDLE_SCALE: f64 = 0.2;

/// Handles for every point of `points` with `smoothing` in `[0, 1]`.
pub fn compute_handles(points: &[ControlPoint], smoothing: f64) -> Vec<BezierHandle> {
    let n = points.len();
    (0..n)
        .map(|i| {
            if i == 0 || i + 1 == n {
                return BezierHandle::default();
            }
            let prev = points[i - 1].pos();
            let next = points[i + 1].pos();
            let curr = points[i].pos();
            let d = (next - prev) * (HANDLE_SCALE * smoothing);
            BezierHandle {
                handle_in: Some(curr - d),
                handle_out: Some(curr + d),
            }
        })
        .collect()
}

/// Ordered control points with derived Bezier handles and snapshot undo/redo.
///
/// Only discrete add/delete actions are checkpointed; [`PathModel::update_point`] (dragging)
/// edits in place and is not an undo step of its own.
pub struct PathModel {
    points: Vec<ControlPoint>,
    handles: Vec<BezierHandle>,
    smoothing: f64,
    history: History<Vec<ControlPoint>>,
    listeners: Vec<Listener>,
    revision: u64,
}

impl fmt::Debug for PathModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathModel")
            .field("points", &self.points)
            .field("smoothing", &self.smoothing)
            .field("history_depth", &self.history.depth())
            .field("listeners", &self.listeners.len())
            .field("revision", &self.revision)
            .finish()
    }
}

impl Default for PathModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PathModel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Empty model whose history keeps at most `history_capacity` snapshots.
    pub fn with_capacity(history_capacity: usize) -> Self {
        Self {
            points: Vec::new(),
            handles: Vec::new(),
            smoothing: 0.5,
            history: History::new(Vec::new(), history_capacity),
            listeners: Vec::new(),
            revision: 0,
        }
    }

    /// Model seeded with `points`, e.g. from a loaded project. History starts at that state.
    pub fn from_points(points: Vec<ControlPoint>) -> PathlightResult<Self> {
        for p in &points {
            p.validate()?;
        }
        let mut model = Self::new();
        model.history.reset(points.clone());
        model.points = points;
        model.rebuild_handles();
        Ok(model)
    }

    /// Register a redraw listener.
    pub fn subscribe(&mut self, listener: impl FnMut(PathChange) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn handles(&self) -> &[BezierHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Current smoothing in `[0, 1]`.
    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// Number of changes notified so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn total_length(&self) -> f64 {
        polyline_length(&self.points)
    }

    pub fn add_point(&mut self, pos: Point, size: f64) -> PathlightResult<usize> {
        let point = ControlPoint::new(pos.x, pos.y, size);
        point.validate()?;
        self.points.push(point);
        self.checkpoint();
        self.rebuild_handles();
        let index = self.points.len() - 1;
        self.notify(PathChange::Added(index));
        Ok(index)
    }

    /// Remove the point at `index`. Returns `false` (and changes nothing) when out of range.
    pub fn delete_point(&mut self, index: usize) -> bool {
        if index >= self.points.len() {
            return false;
        }
        self.points.remove(index);
        self.checkpoint();
        self.rebuild_handles();
        self.notify(PathChange::Removed(index));
        true
    }

    /// Move the point at `index` without checkpointing history.
    pub fn update_point(&mut self, index: usize, pos: Point) -> bool {
        let Some(p) = self.points.get_mut(index) else {
            return false;
        };
        p.x = pos.x;
        p.y = pos.y;
        self.rebuild_handles();
        self.notify(PathChange::Moved(index));
        true
    }

    /// First point (in insertion order) within `tolerance` of `pos`.
    pub fn find_nearest(&self, pos: Point, tolerance: f64) -> Option<usize> {
        self.points
            .iter()
            .position(|p| p.pos().distance(pos) <= tolerance)
    }

    pub fn undo(&mut self) -> bool {
        let Some(state) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(state);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(state) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(state);
        true
    }

    /// Set smoothing from a `0..=100` slider value. History is untouched.
    pub fn set_smoothing(&mut self, value: f64) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.smoothing = value.clamp(0.0, 100.0) / 100.0;
        self.rebuild_handles();
        self.notify(PathChange::Smoothing);
    }

    /// Drop every point and restart history from the empty path.
    pub fn clear(&mut self) {
        self.points.clear();
        self.handles.clear();
        self.history.reset(Vec::new());
        self.notify(PathChange::Cleared);
    }

    /// Replace every point, e.g. from a loaded project. History restarts at the new state and
    /// listeners are kept.
    pub fn load(&mut self, points: Vec<ControlPoint>) -> PathlightResult<()> {
        for p in &points {
            p.validate()?;
        }
        self.history.reset(points.clone());
        self.restore(points);
        Ok(())
    }

    /// The display curve: empty below 2 points, a line for exactly 2, otherwise one cubic per
    /// segment using the neighbouring handles (a line wherever a handle is missing).
    pub fn smoothed_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let Some(first) = self.points.first() else {
            return path;
        };
        if self.points.len() < 2 {
            return path;
        }

        path.move_to(first.pos());
        if self.points.len() == 2 {
            path.line_to(self.points[1].pos());
            return path;
        }

        for i in 1..self.points.len() {
            let end = self.points[i].pos();
            let out = self.handles.get(i - 1).and_then(|h| h.handle_out);
            let inn = self.handles.get(i).and_then(|h| h.handle_in);
            match (out, inn) {
                (Some(c1), Some(c2)) => path.curve_to(c1, c2, end),
                _ => path.line_to(end),
            }
        }
        path
    }

    fn checkpoint(&mut self) {
        self.history.push(self.points.clone());
    }

    fn restore(&mut self, points: Vec<ControlPoint>) {
        self.points = points;
        self.rebuild_handles();
        self.notify(PathChange::Restored);
    }

    fn rebuild_handles(&mut self) {
        self.handles = compute_handles(&self.points, self.smoothing);
    }

    fn notify(&mut self, change: PathChange) {
        self.revision += 1;
        for listener in &mut self.listeners {
            listener(change);
        }
    }
}
