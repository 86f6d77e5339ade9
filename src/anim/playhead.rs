use crate::{foundation::core::Focus, foundation::math::lerp, path::ControlPoint};

/// Constant-speed cursor over the straight segments between control points.
///
/// Progress inside a segment is `ticks · step / segment_length`, so it never accumulates
/// floating-point drift. A segment ends once progress reaches `1`.
#[derive(Clone, Debug)]
pub struct Playhead<'a> {
    points: &'a [ControlPoint],
    step: f64,
    segment: usize,
    ticks: u64,
}

/// What one [`Playhead::advance`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Still inside the same segment.
    Within,
    /// Moved on to the next segment.
    NextSegment,
    /// The segment had zero length and was skipped after a single tick.
    Snapped,
}

impl<'a> Playhead<'a> {
    /// `step` is the distance covered per tick (`speed / fps`) and must be positive.
    pub fn new(points: &'a [ControlPoint], step: f64) -> Self {
        Self {
            points,
            step,
            segment: 0,
            ticks: 0,
        }
    }

    /// Jump to tick `tick` from the start of the path.
    ///
    /// The tick right after the last segment is the landing on the final control point;
    /// anything later is `None`.
    pub fn seek(points: &'a [ControlPoint], step: f64, tick: u64) -> Option<Self> {
        let mut head = Self::new(points, step);
        for _ in 0..tick {
            if head.is_finished() {
                return None;
            }
            head.advance();
        }
        Some(head)
    }

    pub fn is_finished(&self) -> bool {
        self.segment + 1 >= self.points.len()
    }

    pub fn segment(&self) -> usize {
        self.segment
    }

    fn segment_length(&self) -> f64 {
        match (self.points.get(self.segment), self.points.get(self.segment + 1)) {
            (Some(a), Some(b)) => a.distance_to(b),
            _ => 0.0,
        }
    }

    /// Fraction of the current segment covered, in `[0, 1)`.
    pub fn progress(&self) -> f64 {
        let len = self.segment_length();
        if len <= 0.0 {
            return 0.0;
        }
        (self.ticks as f64 * self.step / len).min(1.0)
    }

    /// Focus interpolated linearly between the current segment's endpoints.
    ///
    /// Once finished, this is the last control point.
    pub fn focus(&self) -> Focus {
        match (self.points.get(self.segment), self.points.get(self.segment + 1)) {
            (Some(a), Some(b)) => {
                let t = self.progress();
                Focus::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t), lerp(a.size, b.size, t))
            }
            (Some(a), None) => Focus::new(a.x, a.y, a.size),
            _ => Focus::new(0.0, 0.0, 0.0),
        }
    }

    pub fn advance(&mut self) -> Advance {
        if self.is_finished() {
            return Advance::Within;
        }
        let len = self.segment_length();
        if len <= 0.0 {
            tracing::warn!(segment = self.segment, "zero-length segment, skipping");
            self.segment += 1;
            self.ticks = 0;
            return Advance::Snapped;
        }
        self.ticks += 1;
        if self.ticks as f64 * self.step >= len {
            self.segment += 1;
            self.ticks = 0;
            return Advance::NextSegment;
        }
        Advance::Within
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64, f64)]) -> Vec<ControlPoint> {
        raw.iter().map(|&(x, y, s)| ControlPoint::new(x, y, s)).collect()
    }

    #[test]
    fn walks_a_single_segment_in_even_steps() {
        let points = pts(&[(0.0, 0.0, 50.0), (100.0, 0.0, 50.0)]);
        let mut head = Playhead::new(&points, 5.0);
        let mut xs = Vec::new();
        while !head.is_finished() {
            xs.push(head.focus().x);
            head.advance();
        }
        assert_eq!(xs.len(), 20);
        for (i, x) in xs.iter().enumerate() {
            assert!((x - 5.0 * i as f64).abs() < 1e-9);
        }
        assert_eq!(head.focus(), Focus::new(100.0, 0.0, 50.0));
    }

    #[test]
    fn size_is_interpolated() {
        let points = pts(&[(0.0, 0.0, 10.0), (10.0, 0.0, 30.0)]);
        let mut head = Playhead::new(&points, 5.0);
        head.advance();
        assert_eq!(head.focus().size, 20.0);
    }

    #[test]
    fn zero_length_segment_snaps() {
        let points = pts(&[(5.0, 5.0, 10.0), (5.0, 5.0, 10.0), (15.0, 5.0, 10.0)]);
        let mut head = Playhead::new(&points, 5.0);
        assert_eq!(head.advance(), Advance::Snapped);
        assert_eq!(head.segment(), 1);
        assert_eq!(head.advance(), Advance::Within);
        assert_eq!(head.advance(), Advance::NextSegment);
        assert!(head.is_finished());
    }

    #[test]
    fn progress_is_monotonic_across_segments() {
        let points = pts(&[(0.0, 0.0, 10.0), (7.0, 0.0, 10.0), (7.0, 13.0, 10.0)]);
        let mut head = Playhead::new(&points, 2.0);
        let mut last = (0usize, 0.0f64);
        while !head.is_finished() {
            let cur = (head.segment(), head.progress());
            assert!(cur >= last, "{cur:?} < {last:?}");
            last = cur;
            head.advance();
        }
    }

    #[test]
    fn seek_matches_stepping() {
        let points = pts(&[(0.0, 0.0, 10.0), (40.0, 0.0, 10.0)]);
        let head = Playhead::seek(&points, 4.0, 3).unwrap();
        assert!((head.focus().x - 12.0).abs() < 1e-9);
        let landing = Playhead::seek(&points, 4.0, 10).unwrap();
        assert!(landing.is_finished());
        assert_eq!(landing.focus().x, 40.0);
        assert!(Playhead::seek(&points, 4.0, 11).is_none());
    }
}
