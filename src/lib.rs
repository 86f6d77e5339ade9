//! Pathlight animates a highlight region along a hand-authored path over a still image.
//!
//! - Edit control points in a [`PathModel`] (Bezier smoothing, undo/redo)
//! - Pick one of the registered effects ([`EffectKind`]) and its [`EffectParams`]
//! - Drive a run with an [`AnimationDriver`] into a [`FrameSink`]: a live preview channel or an
//!   `ffmpeg` MP4 encoder
//!
//! [`Session`] ties these together with a single background worker per editing session.
#![forbid(unsafe_code)]

mod foundation;

pub mod anim;
pub mod config;
pub mod effects;
pub mod encode;
pub mod overlay;
pub mod path;
pub mod profile;
pub mod project;
pub mod session;

pub use crate::foundation::core::{BezPath, Focus, Frame, FrameIndex, Point, Rgb8, Vec2};
pub use crate::foundation::error::{PathlightError, PathlightResult};

pub use crate::anim::{
    AnimationDriver, AnimationRequest, CancelToken, RunEstimate, RunEvent, RunStatus, RunSummary,
};
pub use crate::config::Settings;
pub use crate::effects::{EffectInput, EffectKind, EffectParams, Shape};
pub use crate::encode::{
    ChannelSink, FfmpegSink, FfmpegSinkOpts, FrameSink, InMemorySink, PreviewFrame, SinkConfig,
};
pub use crate::overlay::render_overlay;
pub use crate::path::{BezierHandle, ControlPoint, PathChange, PathModel};
pub use crate::profile::OutputProfile;
pub use crate::project::Project;
pub use crate::session::{PreviewHandle, RunKind, Session};
