//! Frame sinks: live preview channel, in-memory capture and the `ffmpeg` MP4 encoder.

pub mod ffmpeg;
pub mod sink;

pub use ffmpeg::{FfmpegSink, FfmpegSinkOpts, ensure_parent_dir, is_ffmpeg_on_path};
pub use sink::{ChannelSink, FrameSink, InMemorySink, PreviewFrame, SinkConfig};
