use std::{
    ffi::OsString,
    io::{Read, Write as _},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    thread::JoinHandle,
};

use crate::{
    encode::sink::{FrameSink, SinkConfig},
    foundation::core::{Frame, FrameIndex},
    foundation::error::{PathlightError, PathlightResult},
};

/// Where and how [`FfmpegSink`] writes its MP4.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// x264 constant rate factor, lower is better quality.
    pub crf: u8,
}

impl FfmpegSinkOpts {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            crf: 20,
        }
    }

    /// Full `ffmpeg` argument list for one run: raw `rgb24` on stdin, H.264 `yuv420p` out.
    pub fn encoder_args(&self, cfg: &SinkConfig) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![if self.overwrite { "-y" } else { "-n" }.into()];
        for a in [
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
        ] {
            args.push(a.into());
        }
        args.push("-video_size".into());
        args.push(format!("{}x{}", cfg.width, cfg.height).into());
        // Input rate, so it must come before `-i`.
        args.push("-framerate".into());
        args.push(cfg.fps.to_string().into());
        for a in ["-i", "pipe:0", "-an", "-c:v", "libx264", "-crf"] {
            args.push(a.into());
        }
        args.push(self.crf.to_string().into());
        for a in ["-pix_fmt", "yuv420p", "-movflags", "+faststart"] {
            args.push(a.into());
        }
        args.push(self.out_path.clone().into_os_string());
        args
    }
}

/// A running encoder: the child, its stdin and the thread collecting its stderr.
struct Encoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    cfg: SinkConfig,
    next_idx: u64,
}

impl Encoder {
    fn spawn(opts: &FfmpegSinkOpts, cfg: SinkConfig) -> PathlightResult<Self> {
        let mut child = Command::new("ffmpeg")
            .args(opts.encoder_args(&cfg))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PathlightError::resource(format!("cannot start ffmpeg: {e}")))?;

        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                // A read error only loses diagnostics.
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });
        if stdin.is_none() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PathlightError::resource("ffmpeg stdin was not captured"));
        }

        Ok(Self {
            child,
            stdin,
            stderr,
            cfg,
            next_idx: 0,
        })
    }

    fn write(&mut self, idx: FrameIndex, frame: &Frame) -> PathlightResult<()> {
        if idx.0 < self.next_idx {
            return Err(PathlightError::validation(format!(
                "frame {} arrived after frame {}",
                idx.0,
                self.next_idx - 1
            )));
        }
        if frame.dimensions() != (self.cfg.width, self.cfg.height) {
            return Err(PathlightError::validation(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.cfg.width,
                self.cfg.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| PathlightError::resource("ffmpeg input already closed"))?;
        stdin.write_all(frame.as_raw()).map_err(|e| {
            PathlightError::resource(format!("ffmpeg stopped accepting frames: {e}"))
        })?;
        self.next_idx = idx.0 + 1;
        Ok(())
    }

    /// Close stdin, wait for the process and report its stderr on failure.
    fn finish(mut self) -> PathlightResult<u64> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| PathlightError::resource(format!("waiting for ffmpeg failed: {e}")))?;
        let log = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(PathlightError::resource(format!(
                "ffmpeg exited with {status}: {}",
                String::from_utf8_lossy(&log).trim()
            )));
        }
        Ok(self.next_idx)
    }
}

/// Encodes frames into an MP4 through the system `ffmpeg`.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    encoder: Option<Encoder>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            encoder: None,
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }
}

/// `libx264` with `yuv420p` needs non-zero even dimensions and a positive frame rate.
pub fn check_encoder_config(cfg: &SinkConfig) -> PathlightResult<()> {
    if !cfg.fps.is_finite() || cfg.fps <= 0.0 {
        return Err(PathlightError::validation(format!(
            "encoder fps must be > 0, got {}",
            cfg.fps
        )));
    }
    if cfg.width == 0 || cfg.height == 0 {
        return Err(PathlightError::validation("encoder frame size is empty"));
    }
    if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
        return Err(PathlightError::validation(format!(
            "encoder frame size {}x{} must be even",
            cfg.width, cfg.height
        )));
    }
    Ok(())
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> PathlightResult<()> {
        check_encoder_config(&cfg)?;
        if self.encoder.is_some() {
            return Err(PathlightError::validation("ffmpeg sink is already open"));
        }
        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(PathlightError::validation(format!(
                "refusing to overwrite '{}'",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(PathlightError::resource("ffmpeg was not found on PATH"));
        }

        self.encoder = Some(Encoder::spawn(&self.opts, cfg)?);
        tracing::debug!(
            out = %self.opts.out_path.display(),
            width = cfg.width,
            height = cfg.height,
            fps = cfg.fps,
            crf = self.opts.crf,
            "encoder opened"
        );
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> PathlightResult<()> {
        self.encoder
            .as_mut()
            .ok_or_else(|| PathlightError::resource("ffmpeg sink is not open"))?
            .write(idx, frame)
    }

    fn end(&mut self) -> PathlightResult<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| PathlightError::resource("ffmpeg sink is not open"))?;
        match encoder.finish() {
            Ok(frames) => {
                tracing::debug!(out = %self.opts.out_path.display(), frames, "encoder closed");
                Ok(())
            }
            Err(e) => {
                // Don't leave a truncated container behind.
                if std::fs::remove_file(&self.opts.out_path).is_ok() {
                    tracing::warn!(out = %self.opts.out_path.display(), "removed partial output");
                }
                Err(e)
            }
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            tracing::warn!("ffmpeg sink dropped while open; killing encoder");
            drop(encoder.stdin.take());
            let _ = encoder.child.kill();
            let _ = encoder.child.wait();
        }
    }
}

/// Create the parent directory of `path` if it has one.
pub fn ensure_parent_dir(path: &Path) -> PathlightResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// `true` when `ffmpeg -version` runs.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(width: u32, height: u32, fps: f64) -> SinkConfig {
        SinkConfig { width, height, fps }
    }

    #[test]
    fn encoder_needs_even_size_and_positive_fps() {
        assert!(check_encoder_config(&cfg(641, 480, 25.0)).unwrap_err().is_configuration());
        assert!(check_encoder_config(&cfg(640, 480, 25.0)).is_ok());
        assert!(check_encoder_config(&cfg(640, 480, 0.0)).is_err());
        assert!(check_encoder_config(&cfg(0, 0, 25.0)).is_err());
    }

    #[test]
    fn args_describe_raw_input_and_h264_output() {
        let opts = FfmpegSinkOpts {
            crf: 18,
            ..FfmpegSinkOpts::new("out/run.mp4")
        };
        let args: Vec<String> = opts
            .encoder_args(&cfg(320, 240, 12.5))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(args.last().map(String::as_str), Some("out/run.mp4"));
        let after = |flag: &str| {
            let i = args.iter().position(|a| a == flag).unwrap();
            args[i + 1].clone()
        };
        assert_eq!(after("-video_size"), "320x240");
        assert_eq!(after("-framerate"), "12.5");
        assert_eq!(after("-crf"), "18");
        assert_eq!(after("-c:v"), "libx264");
        let rate = args.iter().position(|a| a == "-framerate").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(rate < input);
    }

    #[test]
    fn push_before_begin_fails() {
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("unused.mp4"));
        assert!(sink.push_frame(FrameIndex(0), &Frame::new(2, 2)).is_err());
        assert!(sink.end().is_err());
    }

    #[test]
    fn parent_dir_is_created() {
        let dir = std::env::temp_dir().join(format!("pathlight_parent_{}", std::process::id()));
        let out = dir.join("nested").join("out.mp4");
        ensure_parent_dir(&out).unwrap();
        assert!(out.parent().unwrap().is_dir());
        let _ = std::fs::remove_dir_all(&dir);
        ensure_parent_dir(Path::new("bare.mp4")).unwrap();
    }
}
