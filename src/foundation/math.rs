/// `w·a + (1−w)·b` on one channel, rounded. `w` is clamped to `[0, 1]`.
pub(crate) fn mix_u8(a: u8, b: u8, w: f32) -> u8 {
    let w = w.clamp(0.0, 1.0);
    (f32::from(a) * w + f32::from(b) * (1.0 - w))
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Per-channel mix of two RGB pixels, see [`mix_u8`].
pub(crate) fn mix_rgb(a: &[u8], b: &[u8], out: &mut [u8], w: f32) {
    for c in 0..3 {
        out[c] = mix_u8(a[c], b[c], w);
    }
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// OpenCV-compatible sigma for a Gaussian kernel of size `ksize` when no sigma is given.
pub(crate) fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}
