use crate::{
    effects::{EffectInput, composite::compose_weighted, params::EffectParams},
    foundation::core::Frame,
    foundation::error::PathlightResult,
};

/// Weight of the darkened layer at `distance` from the focus center.
///
/// A non-positive radius darkens everything except the exact center.
pub fn vignette_weight(distance: f64, radius: f64) -> f32 {
    if radius <= 0.0 {
        return if distance <= 0.0 { 0.0 } else { 1.0 };
    }
    (distance / radius).clamp(0.0, 1.0) as f32
}

/// Radial blend: full source at the center, fully darkened at `vignette_radius`.
pub fn vignette(input: &EffectInput<'_>, params: &EffectParams) -> PathlightResult<Frame> {
    let (cx, cy) = (input.focus.x, input.focus.y);
    let radius = params.vignette_radius;
    compose_weighted(input.darkened, input.source, |x, y| {
        let d = (f64::from(x) - cx).hypot(f64::from(y) - cy);
        vignette_weight(d, radius)
    })
}
