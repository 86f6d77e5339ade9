use crate::{
    effects::{
        EffectInput,
        blur::{blur_frame, gaussian_blur_ksize, odd_kernel_size},
        composite::compose_weighted,
        mask::HardMask,
        params::EffectParams,
    },
    foundation::core::Frame,
    foundation::error::PathlightResult,
};

/// Kernel used to feather the focus mask edge.
pub const FEATHER_KSIZE: u32 = 21;

/// Background blur kernel for `blur_intensity`: `max(3, ⌊bi/5⌋·2 + 1)`.
pub fn blur_kernel_size(blur_intensity: f64) -> u32 {
    let steps = (blur_intensity.max(0.0) / 5.0) as u32;
    odd_kernel_size(steps.saturating_mul(2).saturating_add(1))
}

/// Sharp focus region over a blurred copy of the whole frame, joined by a feathered edge.
pub fn blur_focus(input: &EffectInput<'_>, params: &EffectParams) -> PathlightResult<Frame> {
    let src = input.source;
    let (w, h) = src.dimensions();
    let blurred = blur_frame(src, blur_kernel_size(params.blur_intensity))?;

    let mask = HardMask::new(input.focus, params.shape).rasterize(w, h);
    let feathered = gaussian_blur_ksize(&mask, w, h, 1, FEATHER_KSIZE)?;

    compose_weighted(src, &blurred, |x, y| {
        f32::from(feathered[y as usize * w as usize + x as usize]) / 255.0
    })
}
