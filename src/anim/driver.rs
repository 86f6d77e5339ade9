use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use crate::foundation::core::CancelToken;

use crate::{
    anim::{
        estimate::RunEstimate,
        playhead::{Advance, Playhead},
    },
    effects::{
        EffectInput, EffectKind, EffectParams,
        blur::sharpen_frame,
        composite::{darken, resize_bilinear},
    },
    encode::sink::{FrameSink, SinkConfig},
    foundation::core::{Focus, Frame, FrameIndex},
    foundation::error::{PathlightError, PathlightResult},
    path::ControlPoint,
};

/// Everything one run needs. Immutable for the run's duration.
#[derive(Clone, Debug)]
pub struct AnimationRequest {
    pub points: Vec<ControlPoint>,
    pub effect: EffectKind,
    pub params: EffectParams,
    /// Pixels per second along the path.
    pub speed: f64,
    pub fps: f64,
    pub source: Arc<Frame>,
    /// `None` keeps the source size.
    pub output_size: Option<(u32, u32)>,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
    /// Configuration error; the sink was never opened.
    Rejected,
    /// Resource or effect error after validation.
    Failed,
}

/// Terminal report of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub status: RunStatus,
    /// Frames handed to the sink.
    pub frames: u64,
    pub estimate: RunEstimate,
    /// The single user-facing message for `Rejected` and `Failed`.
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Notifications emitted while a run progresses. `Finished` is emitted exactly once per run.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    Started { estimate: RunEstimate, width: u32, height: u32 },
    /// Coalesced: only sent when the whole percentage changes.
    Progress { frame: u64, percent: u8 },
    Finished(RunSummary),
}

/// Layers derived once per run.
struct Prepared {
    focus_layer: Frame,
    darkened: Frame,
    target: (u32, u32),
}

/// Walks the path at constant speed and feeds one composited frame per tick to a sink.
#[derive(Clone, Debug)]
pub struct AnimationDriver {
    request: AnimationRequest,
}

impl AnimationDriver {
    pub fn new(request: AnimationRequest) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &AnimationRequest {
        &self.request
    }

    pub fn estimate(&self) -> RunEstimate {
        RunEstimate::new(&self.request.points, self.request.speed, self.request.fps)
    }

    /// Configuration checks made before a run starts.
    pub fn validate(&self) -> PathlightResult<()> {
        let r = &self.request;
        if !r.speed.is_finite() || r.speed <= 0.0 {
            return Err(PathlightError::validation(format!(
                "speed must be > 0 px/s, got {}",
                r.speed
            )));
        }
        if !r.fps.is_finite() || r.fps <= 0.0 {
            return Err(PathlightError::validation(format!(
                "fps must be > 0, got {}",
                r.fps
            )));
        }
        if r.points.len() < 2 {
            return Err(PathlightError::validation(format!(
                "need at least 2 control points, got {}",
                r.points.len()
            )));
        }
        for p in &r.points {
            p.validate()?;
        }
        let (w, h) = r.source.dimensions();
        if w == 0 || h == 0 {
            return Err(PathlightError::validation("source image is empty"));
        }
        if let Some((ow, oh)) = r.output_size
            && (ow == 0 || oh == 0)
        {
            return Err(PathlightError::validation(
                "output resolution must be non-zero",
            ));
        }
        Ok(())
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.request
            .output_size
            .unwrap_or_else(|| self.request.source.dimensions())
    }

    fn step(&self) -> f64 {
        self.request.speed / self.request.fps
    }

    fn prepare(&self) -> PathlightResult<Prepared> {
        let r = &self.request;
        let darkened = darken(&r.source, r.params.brightness_factor());
        let focus_layer = if r.params.sharpen {
            sharpen_frame(&r.source)?
        } else {
            (*r.source).clone()
        };
        Ok(Prepared {
            focus_layer,
            darkened,
            target: self.output_size(),
        })
    }

    fn compose(&self, prep: &Prepared, focus: Focus) -> PathlightResult<Frame> {
        let input = EffectInput {
            source: &prep.focus_layer,
            darkened: &prep.darkened,
            focus,
            target: prep.target,
        };
        let frame = self.request.effect.apply(&input, &self.request.params)?;
        let (tw, th) = prep.target;
        if frame.dimensions() == (tw, th) {
            return Ok(frame);
        }
        Ok(resize_bilinear(&frame, tw, th))
    }

    /// Focus at tick `tick`, or `None` past the landing frame.
    pub fn focus_at(&self, tick: u64) -> Option<Focus> {
        Playhead::seek(&self.request.points, self.step(), tick).map(|h| h.focus())
    }

    /// Render the single frame a run would emit at tick `tick`.
    pub fn render_frame_at(&self, tick: u64) -> PathlightResult<Frame> {
        self.validate()?;
        let focus = self.focus_at(tick).ok_or_else(|| {
            PathlightError::validation(format!("tick {tick} is past the end of the path"))
        })?;
        let prep = self.prepare()?;
        self.compose(&prep, focus)
    }

    /// Run to completion, cancellation or failure.
    ///
    /// The sink's `end` is called exactly once whenever its `begin` succeeded, and `on_event`
    /// receives exactly one [`RunEvent::Finished`] on every path.
    #[tracing::instrument(
        skip_all,
        fields(effect = %self.request.effect, points = self.request.points.len())
    )]
    pub fn run(
        &self,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
        on_event: &mut dyn FnMut(RunEvent),
    ) -> RunSummary {
        let started = Instant::now();
        let estimate = self.estimate();
        let finish = |status: RunStatus, frames: u64, error: Option<String>| RunSummary {
            status,
            frames,
            estimate,
            error,
            elapsed: started.elapsed(),
        };

        if let Err(e) = self.validate() {
            tracing::warn!(error = %e, "run rejected");
            let summary = finish(RunStatus::Rejected, 0, Some(e.to_string()));
            on_event(RunEvent::Finished(summary.clone()));
            return summary;
        }

        let opened = self.prepare().and_then(|prep| {
            let (width, height) = prep.target;
            sink.begin(SinkConfig {
                width,
                height,
                fps: self.request.fps,
            })?;
            Ok(prep)
        });
        let prep = match opened {
            Ok(prep) => prep,
            Err(e) => {
                tracing::error!(error = %e, "failed to open sink");
                let summary = finish(RunStatus::Failed, 0, Some(e.to_string()));
                on_event(RunEvent::Finished(summary.clone()));
                return summary;
            }
        };

        tracing::info!(
            frames = estimate.frames,
            duration = %estimate.timecode(),
            width = prep.target.0,
            height = prep.target.1,
            "run started"
        );
        on_event(RunEvent::Started {
            estimate,
            width: prep.target.0,
            height: prep.target.1,
        });

        let (mut status, frames, mut error) = self.drive(&prep, sink, cancel, estimate, on_event);

        if let Err(e) = sink.end() {
            tracing::error!(error = %e, "failed to finalize sink");
            if status != RunStatus::Failed {
                status = RunStatus::Failed;
                error = Some(e.to_string());
            }
        }

        let summary = finish(status, frames, error);
        tracing::info!(
            status = ?summary.status,
            frames = summary.frames,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "run finished"
        );
        on_event(RunEvent::Finished(summary.clone()));
        summary
    }

    fn drive(
        &self,
        prep: &Prepared,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
        estimate: RunEstimate,
        on_event: &mut dyn FnMut(RunEvent),
    ) -> (RunStatus, u64, Option<String>) {
        let pace = sink
            .realtime()
            .then(|| Duration::from_secs_f64(1.0 / self.request.fps));
        let mut head = Playhead::new(&self.request.points, self.step());
        let mut frames = 0u64;
        let mut last_percent = None;

        let mut emit = |focus: Focus, frames: &mut u64| -> PathlightResult<()> {
            let frame = self.compose(prep, focus)?;
            sink.push_frame(FrameIndex(*frames), &frame)?;
            *frames += 1;
            if estimate.frames > 0 {
                let percent = (*frames * 100 / estimate.frames).min(100) as u8;
                if last_percent != Some(percent) {
                    last_percent = Some(percent);
                    on_event(RunEvent::Progress {
                        frame: *frames,
                        percent,
                    });
                }
            }
            if let Some(pace) = pace {
                std::thread::sleep(pace);
            }
            Ok(())
        };

        // A sink that gave up because of the cancel flag ends the run as cancelled.
        let stopped = |e: PathlightError, frames: u64| {
            if cancel.is_cancelled() {
                tracing::info!(frames, "run cancelled while delivering a frame");
                return (RunStatus::Cancelled, frames, None);
            }
            tracing::error!(error = %e, frame = frames, "frame failed");
            (RunStatus::Failed, frames, Some(e.to_string()))
        };

        while !head.is_finished() {
            if cancel.is_cancelled() {
                tracing::info!(frames, "run cancelled");
                return (RunStatus::Cancelled, frames, None);
            }
            if let Err(e) = emit(head.focus(), &mut frames) {
                return stopped(e, frames);
            }
            match head.advance() {
                Advance::Within => {}
                Advance::NextSegment | Advance::Snapped => {
                    tracing::debug!(segment = head.segment(), frames, "segment reached");
                }
            }
        }

        // Land on the final control point.
        if cancel.is_cancelled() {
            return (RunStatus::Cancelled, frames, None);
        }
        if let Err(e) = emit(head.focus(), &mut frames) {
            return stopped(e, frames);
        }
        (RunStatus::Completed, frames, None)
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;
    use crate::encode::sink::InMemorySink;

    fn request(speed: f64, fps: f64) -> AnimationRequest {
        AnimationRequest {
            points: vec![
                ControlPoint::new(0.0, 0.0, 50.0),
                ControlPoint::new(100.0, 0.0, 50.0),
            ],
            effect: EffectKind::Spotlight,
            params: EffectParams::default(),
            speed,
            fps,
            source: Arc::new(Frame::from_pixel(120, 20, Rgb([200, 200, 200]))),
            output_size: None,
        }
    }

    fn collect(
        driver: &AnimationDriver,
        cancel: &CancelToken,
    ) -> (RunSummary, Vec<RunEvent>, InMemorySink) {
        let mut sink = InMemorySink::new();
        let mut events = Vec::new();
        let summary = driver.run(&mut sink, cancel, &mut |e| events.push(e));
        (summary, events, sink)
    }

    fn finished_count(events: &[RunEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, RunEvent::Finished(_)))
            .count()
    }

    #[test]
    fn non_positive_speed_or_fps_is_rejected_without_frames() {
        for (speed, fps) in [(0.0, 10.0), (-5.0, 10.0), (50.0, 0.0), (50.0, -1.0)] {
            let driver = AnimationDriver::new(request(speed, fps));
            let (summary, events, sink) = collect(&driver, &CancelToken::new());
            assert_eq!(summary.status, RunStatus::Rejected);
            assert_eq!(summary.frames, 0);
            assert!(sink.config().is_none());
            assert_eq!(sink.end_calls(), 0);
            assert_eq!(events.len(), 1);
            assert_eq!(finished_count(&events), 1);
        }
    }

    #[test]
    fn single_point_is_rejected() {
        let mut req = request(50.0, 10.0);
        req.points.truncate(1);
        let (summary, _, _) = collect(&AnimationDriver::new(req), &CancelToken::new());
        assert_eq!(summary.status, RunStatus::Rejected);
        assert!(summary.error.unwrap().contains("at least 2"));
    }

    #[test]
    fn completes_with_landing_frame() {
        let driver = AnimationDriver::new(request(50.0, 10.0));
        let (summary, events, sink) = collect(&driver, &CancelToken::new());
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.estimate.frames, 20);
        assert_eq!(summary.frames, 21);
        assert_eq!(sink.frames().len(), 21);
        assert_eq!(sink.end_calls(), 1);
        assert!(matches!(events.first(), Some(RunEvent::Started { .. })));
        assert!(matches!(events.last(), Some(RunEvent::Finished(_))));
        assert_eq!(finished_count(&events), 1);
        for (i, (idx, _)) in sink.frames().iter().enumerate() {
            assert_eq!(idx.0, i as u64);
        }
        assert_eq!(driver.focus_at(20), Some(Focus::new(100.0, 0.0, 50.0)));
        assert_eq!(driver.focus_at(21), None);
    }

    #[test]
    fn cancel_before_start_emits_nothing_but_closes_sink() {
        let driver = AnimationDriver::new(request(50.0, 10.0));
        let cancel = CancelToken::new();
        cancel.cancel();
        let (summary, events, sink) = collect(&driver, &cancel);
        assert_eq!(summary.status, RunStatus::Cancelled);
        assert_eq!(summary.frames, 0);
        assert_eq!(sink.end_calls(), 1);
        assert_eq!(finished_count(&events), 1);
    }

    #[test]
    fn progress_is_coalesced_and_reaches_100() {
        let driver = AnimationDriver::new(request(50.0, 10.0));
        let (_, events, _) = collect(&driver, &CancelToken::new());
        let percents: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(percents.last(), Some(&100));
    }

    #[test]
    fn output_size_resamples_frames() {
        let mut req = request(100.0, 5.0);
        req.output_size = Some((60, 10));
        let (summary, _, sink) = collect(&AnimationDriver::new(req), &CancelToken::new());
        assert!(summary.is_success());
        assert_eq!(sink.config().unwrap().width, 60);
        assert!(sink.frames().iter().all(|(_, f)| f.dimensions() == (60, 10)));
    }

    struct FailingSink {
        fail_begin: bool,
        pushed: u32,
        ended: u32,
    }

    impl FrameSink for FailingSink {
        fn begin(&mut self, _cfg: SinkConfig) -> PathlightResult<()> {
            if self.fail_begin {
                return Err(PathlightError::resource("cannot open encoder"));
            }
            Ok(())
        }

        fn push_frame(&mut self, _idx: FrameIndex, _frame: &Frame) -> PathlightResult<()> {
            self.pushed += 1;
            if self.pushed == 3 {
                return Err(PathlightError::resource("disk full"));
            }
            Ok(())
        }

        fn end(&mut self) -> PathlightResult<()> {
            self.ended += 1;
            Ok(())
        }
    }

    #[test]
    fn unopenable_sink_fails_without_frames() {
        let driver = AnimationDriver::new(request(50.0, 10.0));
        let mut sink = FailingSink {
            fail_begin: true,
            pushed: 0,
            ended: 0,
        };
        let mut finished = 0;
        let summary = driver.run(&mut sink, &CancelToken::new(), &mut |e| {
            if matches!(e, RunEvent::Finished(_)) {
                finished += 1;
            }
        });
        assert_eq!(summary.status, RunStatus::Failed);
        assert!(summary.error.unwrap().contains("cannot open encoder"));
        assert_eq!(sink.pushed, 0);
        assert_eq!(sink.ended, 0);
        assert_eq!(finished, 1);
    }

    #[test]
    fn push_failure_stops_run_and_closes_sink_once() {
        let driver = AnimationDriver::new(request(50.0, 10.0));
        let mut sink = FailingSink {
            fail_begin: false,
            pushed: 0,
            ended: 0,
        };
        let summary = driver.run(&mut sink, &CancelToken::new(), &mut |_| {});
        assert_eq!(summary.status, RunStatus::Failed);
        assert_eq!(summary.frames, 2);
        assert_eq!(sink.ended, 1);
    }

    #[test]
    fn render_frame_at_matches_focus() {
        let driver = AnimationDriver::new(request(50.0, 10.0));
        let frame = driver.render_frame_at(10).unwrap();
        // Focus sits at x = 50 with radius 25: inside is source, far right is darkened.
        assert_eq!(frame.get_pixel(50, 0), &Rgb([200, 200, 200]));
        assert_eq!(frame.get_pixel(110, 10), &Rgb([100, 100, 100]));
        assert!(driver.render_frame_at(99).is_err());
    }
}
