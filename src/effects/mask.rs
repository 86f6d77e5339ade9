use crate::{effects::params::Shape, foundation::core::Focus};

/// Filled circle or axis-aligned square on the integer pixel grid.
///
/// Center and radius are truncated to whole pixels; the boundary is inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardMask {
    pub cx: i64,
    pub cy: i64,
    pub radius: i64,
    pub shape: Shape,
}

impl HardMask {
    pub fn new(focus: Focus, shape: Shape) -> Self {
        Self {
            cx: focus.x as i64,
            cy: focus.y as i64,
            radius: (focus.size / 2.0) as i64,
            shape,
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        // Deltas saturate for far-away centers; squares are taken in f64 so they cannot wrap.
        let dx = i64::from(x).saturating_sub(self.cx).unsigned_abs();
        let dy = i64::from(y).saturating_sub(self.cy).unsigned_abs();
        let r = self.radius.unsigned_abs();
        match self.shape {
            Shape::Circle => {
                let (dx, dy, r) = (dx as f64, dy as f64, r as f64);
                dx * dx + dy * dy <= r * r
            }
            Shape::Square => dx <= r && dy <= r,
        }
    }

    /// 8-bit coverage buffer (`255` inside, `0` outside) of `width × height`.
    pub fn rasterize(&self, width: u32, height: u32) -> Vec<u8> {
        let mut out = vec![0u8; width as usize * height as usize];
        for y in 0..height {
            for x in 0..width {
                if self.contains(x, y) {
                    out[y as usize * width as usize + x as usize] = 255;
                }
            }
        }
        out
    }
}

/// Distance from `(dx, dy)` to an axis-aligned square of half-side `half` (zero inside).
pub fn square_distance(dx: f64, dy: f64, half: f64) -> f64 {
    let ox = (dx.abs() - half).max(0.0);
    let oy = (dy.abs() - half).max(0.0);
    ox.hypot(oy)
}

/// Smooth falloff: `1` up to `inner`, `0` from `outer` on, linear in between.
///
/// A collapsed band (`outer <= inner`) degrades to a hard edge at `inner`.
pub fn falloff(distance: f64, inner: f64, outer: f64) -> f32 {
    if outer <= inner {
        return if distance <= inner { 1.0 } else { 0.0 };
    }
    ((outer - distance) / (outer - inner)).clamp(0.0, 1.0) as f32
}
