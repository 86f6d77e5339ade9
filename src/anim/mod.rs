//! Time-quantized playback of a control-point path.
//!
//! A run walks the straight segments between control points at constant speed, one tick per
//! output frame, and composites each tick through the selected effect.

pub mod driver;
pub mod estimate;
pub mod playhead;

pub use driver::{
    AnimationDriver, AnimationRequest, CancelToken, RunEvent, RunStatus, RunSummary,
};
pub use estimate::RunEstimate;
pub use playhead::{Advance, Playhead};
