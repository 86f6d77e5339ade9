use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread::JoinHandle,
};

use crossbeam_channel::{Receiver, unbounded};

use crate::{
    anim::{AnimationDriver, AnimationRequest, CancelToken, RunEstimate, RunEvent, RunSummary},
    config::Settings,
    encode::{ChannelSink, FfmpegSink, FfmpegSinkOpts, FrameSink, PreviewFrame},
    foundation::core::Frame,
    foundation::error::{PathlightError, PathlightResult},
    path::PathModel,
    profile::OutputProfile,
    project::Project,
};

/// Preview frames buffered ahead of the consumer.
const PREVIEW_CAPACITY: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunKind {
    Preview,
    Export,
}

struct ActiveRun {
    kind: RunKind,
    cancel: CancelToken,
    handle: JoinHandle<RunSummary>,
}

/// Receivers handed out when a preview starts.
#[derive(Debug)]
pub struct PreviewHandle {
    pub frames: Receiver<PreviewFrame>,
    pub events: Receiver<RunEvent>,
}

/// Editing state plus at most one background run.
///
/// Point editing stays available while a run is active; every run works on a snapshot taken
/// when it starts.
pub struct Session {
    model: PathModel,
    settings: Settings,
    image: Option<Arc<Frame>>,
    image_path: Option<PathBuf>,
    active: Option<ActiveRun>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("points", &self.model.len())
            .field("image_path", &self.image_path)
            .field("active", &self.active.as_ref().map(|r| r.kind))
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        let mut model = PathModel::new();
        model.set_smoothing(settings.smoothing);
        Self {
            model,
            settings,
            image: None,
            image_path: None,
            active: None,
        }
    }

    pub fn model(&self) -> &PathModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut PathModel {
        &mut self.model
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings. Smoothing is pushed into the path model; a running job keeps the
    /// snapshot it started with.
    pub fn set_settings(&mut self, settings: Settings) {
        if settings.smoothing != self.settings.smoothing {
            self.model.set_smoothing(settings.smoothing);
        }
        self.settings = settings;
    }

    pub fn image(&self) -> Option<&Arc<Frame>> {
        self.image.as_ref()
    }

    pub fn set_image(&mut self, image: Frame) {
        self.image = Some(Arc::new(image));
        self.image_path = None;
    }

    pub fn load_image(&mut self, path: impl AsRef<Path>) -> PathlightResult<()> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| {
                PathlightError::resource(format!("open image '{}': {e}", path.display()))
            })?
            .to_rgb8();
        tracing::info!(path = %path.display(), width = img.width(), height = img.height(), "image loaded");
        self.image = Some(Arc::new(img));
        self.image_path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn save_project(&self, path: impl AsRef<Path>) -> PathlightResult<()> {
        Project::capture(&self.settings, &self.model).save(path)
    }

    pub fn load_project(&mut self, path: impl AsRef<Path>) -> PathlightResult<()> {
        let project = Project::from_path(path)?;
        self.model.load(project.path_points)?;
        self.model.set_smoothing(project.settings.smoothing);
        self.settings = project.settings;
        Ok(())
    }

    pub fn estimate(&self) -> RunEstimate {
        RunEstimate::new(self.model.points(), self.settings.speed, self.settings.fps)
    }

    /// Immutable run request from the current state.
    pub fn request(&self, output_size: Option<(u32, u32)>) -> PathlightResult<AnimationRequest> {
        self.settings.validate()?;
        let source = self
            .image
            .clone()
            .ok_or_else(|| PathlightError::validation("no image loaded"))?;
        if self.model.len() < 2 {
            return Err(PathlightError::validation(
                "need at least 2 control points to animate",
            ));
        }
        Ok(AnimationRequest {
            points: self.model.points().to_vec(),
            effect: self.settings.effect,
            params: self.settings.effect_params(),
            speed: self.settings.speed,
            fps: self.settings.fps,
            source,
            output_size,
        })
    }

    /// `true` while a run's worker has not finished.
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    pub fn active_kind(&self) -> Option<RunKind> {
        self.active.as_ref().map(|r| r.kind)
    }

    /// Start a paced preview at source size.
    pub fn start_preview(&mut self) -> PathlightResult<PreviewHandle> {
        let cancel = CancelToken::new();
        let (sink, frames) = ChannelSink::bounded(PREVIEW_CAPACITY);
        let sink = sink.with_cancel(cancel.clone());
        let events = self.spawn_run(RunKind::Preview, Box::new(sink), None, cancel)?;
        Ok(PreviewHandle { frames, events })
    }

    /// Start an MP4 export through `ffmpeg`.
    pub fn start_export(
        &mut self,
        out: impl Into<PathBuf>,
        profile: OutputProfile,
    ) -> PathlightResult<Receiver<RunEvent>> {
        let source_size = self
            .image
            .as_ref()
            .map(|img| img.dimensions())
            .ok_or_else(|| PathlightError::validation("no image loaded"))?;
        let size = profile.resolve(source_size)?;
        let sink = FfmpegSink::new(FfmpegSinkOpts::new(out));
        self.start_run(RunKind::Export, Box::new(sink), Some(size))
    }

    /// Start a run on a worker thread feeding `sink`.
    ///
    /// Rejected while another run is active.
    pub fn start_run(
        &mut self,
        kind: RunKind,
        sink: Box<dyn FrameSink>,
        output_size: Option<(u32, u32)>,
    ) -> PathlightResult<Receiver<RunEvent>> {
        self.spawn_run(kind, sink, output_size, CancelToken::new())
    }

    fn spawn_run(
        &mut self,
        kind: RunKind,
        mut sink: Box<dyn FrameSink>,
        output_size: Option<(u32, u32)>,
        cancel: CancelToken,
    ) -> PathlightResult<Receiver<RunEvent>> {
        if self.is_running() {
            return Err(PathlightError::validation(format!(
                "a {:?} run is already active",
                self.active_kind().unwrap_or(kind)
            )));
        }
        // Reap a finished run that was never waited on.
        if let Some(prev) = self.active.take() {
            let _ = prev.handle.join();
        }

        let driver = AnimationDriver::new(self.request(output_size)?);
        let (tx, rx) = unbounded();

        let worker_cancel = cancel.clone();
        let name = match kind {
            RunKind::Preview => "pathlight-preview",
            RunKind::Export => "pathlight-export",
        };
        let handle = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                driver.run(sink.as_mut(), &worker_cancel, &mut |event| {
                    // Progress is best-effort; a dropped receiver is fine.
                    let _ = tx.send(event);
                })
            })
            .map_err(|e| PathlightError::resource(format!("failed to spawn run worker: {e}")))?;

        tracing::debug!(?kind, "run worker spawned");
        self.active = Some(ActiveRun {
            kind,
            cancel,
            handle,
        });
        Ok(rx)
    }

    /// Ask the active run to stop at the next tick boundary.
    pub fn cancel(&self) {
        if let Some(run) = &self.active {
            run.cancel.cancel();
        }
    }

    /// Block until the active run ends. `None` when nothing was started.
    pub fn wait(&mut self) -> PathlightResult<Option<RunSummary>> {
        let Some(run) = self.active.take() else {
            return Ok(None);
        };
        run.handle
            .join()
            .map(Some)
            .map_err(|_| PathlightError::resource("run worker panicked"))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(run) = self.active.take() {
            run.cancel.cancel();
            let _ = run.handle.join();
        }
    }
}
