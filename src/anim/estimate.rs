use crate::path::{ControlPoint, polyline_length};

/// Up-front figures for a run, used for progress reporting and display only.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunEstimate {
    /// Straight-line distance through all control points, in pixels.
    pub distance: f64,
    pub duration_secs: f64,
    /// `floor(distance / speed · fps)`.
    pub frames: u64,
    pub fps: f64,
}

impl RunEstimate {
    pub fn new(points: &[ControlPoint], speed: f64, fps: f64) -> Self {
        if points.len() < 2 || speed <= 0.0 || fps <= 0.0 || !speed.is_finite() {
            return Self {
                fps: fps.max(0.0),
                ..Self::default()
            };
        }
        let distance = polyline_length(points);
        let duration_secs = distance / speed;
        Self {
            distance,
            duration_secs,
            frames: (duration_secs * fps).floor() as u64,
            fps,
        }
    }

    /// `MM:SS:FF` where `FF` counts frames within the last whole second.
    pub fn timecode(&self) -> String {
        if self.fps <= 0.0 || self.frames == 0 {
            return "00:00:00".to_owned();
        }
        let whole_secs = (self.frames as f64 / self.fps).floor();
        let ff = (self.frames as f64 - whole_secs * self.fps).floor().max(0.0) as u64;
        let whole_secs = whole_secs as u64;
        format!("{:02}:{:02}:{:02}", whole_secs / 60, whole_secs % 60, ff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(len: f64) -> Vec<ControlPoint> {
        vec![ControlPoint::new(0.0, 0.0, 50.0), ControlPoint::new(len, 0.0, 50.0)]
    }

    #[test]
    fn counts_frames_from_distance() {
        let e = RunEstimate::new(&line(100.0), 50.0, 10.0);
        assert_eq!(e.distance, 100.0);
        assert_eq!(e.duration_secs, 2.0);
        assert_eq!(e.frames, 20);
        assert_eq!(e.timecode(), "00:02:00");
    }

    #[test]
    fn timecode_carries_frames_and_minutes() {
        // 75.5 s at 24 fps -> 1812 frames -> 01:15:12
        let e = RunEstimate::new(&line(755.0), 10.0, 24.0);
        assert_eq!(e.frames, 1812);
        assert_eq!(e.timecode(), "01:15:12");
    }

    #[test]
    fn degenerate_inputs_are_zero() {
        assert_eq!(RunEstimate::new(&line(100.0), 0.0, 10.0).frames, 0);
        assert_eq!(RunEstimate::new(&line(100.0), 50.0, 0.0).frames, 0);
        assert_eq!(RunEstimate::new(&line(100.0)[..1], 50.0, 10.0).frames, 0);
        assert_eq!(RunEstimate::default().timecode(), "00:00:00");
    }
}
