use std::{sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};

use crate::foundation::{
    core::{CancelToken, Frame, FrameIndex},
    error::{PathlightError, PathlightResult},
};

/// How often a blocked [`ChannelSink`] re-checks its cancel token.
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: f64,
}

/// Sink contract for consuming frames in path order.
///
/// Ordering contract: `push_frame` is called with strictly increasing [`FrameIndex`] values.
/// `end` is called exactly once after a successful `begin`, whatever way the run ends.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> PathlightResult<()>;
    /// Push one frame of exactly `cfg.width × cfg.height`.
    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> PathlightResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> PathlightResult<()>;
    /// Live sinks are fed at most one frame per `1/fps` seconds.
    fn realtime(&self) -> bool {
        false
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, Frame)>,
    ended: u32,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Frames in path order.
    pub fn frames(&self) -> &[(FrameIndex, Frame)] {
        &self.frames
    }

    /// How many times `end` has been called.
    pub fn end_calls(&self) -> u32 {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> PathlightResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> PathlightResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> PathlightResult<()> {
        self.ended += 1;
        Ok(())
    }
}

/// One preview frame as delivered to the UI side.
#[derive(Clone, Debug)]
pub struct PreviewFrame {
    pub index: FrameIndex,
    pub frame: Arc<Frame>,
}

/// Preview sink forwarding frames over a channel.
///
/// Dropping the receiving end stops the run with a resource error on the next frame.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Sender<PreviewFrame>,
    paced: bool,
    cancel: Option<CancelToken>,
}

impl ChannelSink {
    pub fn new(tx: Sender<PreviewFrame>) -> Self {
        Self {
            tx,
            paced: true,
            cancel: None,
        }
    }

    /// A sink plus its receiver, buffering at most `capacity` frames.
    pub fn bounded(capacity: usize) -> (Self, Receiver<PreviewFrame>) {
        let (tx, rx) = bounded(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Deliver frames as fast as they are produced.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Give up on a full channel once `cancel` is set instead of waiting for the receiver.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

impl FrameSink for ChannelSink {
    fn begin(&mut self, _cfg: SinkConfig) -> PathlightResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> PathlightResult<()> {
        let mut item = PreviewFrame {
            index: idx,
            frame: Arc::new(frame.clone()),
        };
        if self.cancel.is_none() {
            return self
                .tx
                .send(item)
                .map_err(|_| PathlightError::resource("preview receiver disconnected"));
        }
        loop {
            match self.tx.send_timeout(item, CANCEL_POLL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => {
                    if self.is_cancelled() {
                        return Err(PathlightError::resource(format!(
                            "preview frame {} dropped: run cancelled while the receiver was full",
                            idx.0
                        )));
                    }
                    item = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Err(PathlightError::resource("preview receiver disconnected"));
                }
            }
        }
    }

    fn end(&mut self) -> PathlightResult<()> {
        Ok(())
    }

    fn realtime(&self) -> bool {
        self.paced
    }
}
