use rayon::prelude::*;

use crate::{
    effects::{
        EffectInput,
        composite::{compose_masked, compose_weighted, tint_pixel},
        mask::{HardMask, falloff, square_distance},
        params::{EffectParams, Shape},
    },
    foundation::core::Frame,
    foundation::error::PathlightResult,
};

/// Source inside the focus shape, darkened background outside. Hard edge.
pub fn spotlight(input: &EffectInput<'_>, params: &EffectParams) -> PathlightResult<Frame> {
    let mask = HardMask::new(input.focus, params.shape);
    compose_masked(input.source, input.darkened, |x, y| mask.contains(x, y))
}

/// Source-over-darkened weight at `(x, y)` for the glow variant.
pub fn glow_weight(input: &EffectInput<'_>, params: &EffectParams, x: u32, y: u32) -> f32 {
    let gi = (params.glow_intensity / 100.0).max(0.0);
    let radius = input.focus.size / 2.0;
    let glow_radius = radius * (1.0 + gi);
    let dx = f64::from(x) - input.focus.x;
    let dy = f64::from(y) - input.focus.y;
    match params.shape {
        Shape::Circle => falloff(dx.hypot(dy), radius, glow_radius),
        Shape::Square => falloff(square_distance(dx, dy, radius), 0.0, glow_radius - radius),
    }
}

/// Spotlight whose edge fades out linearly over `glow_intensity` percent of the radius.
pub fn spotlight_glow(input: &EffectInput<'_>, params: &EffectParams) -> PathlightResult<Frame> {
    compose_weighted(input.source, input.darkened, |x, y| {
        glow_weight(input, params, x, y)
    })
}

/// Hard spotlight whose inside is tinted with `effect_color` at `color_intensity` percent.
pub fn color_grading(input: &EffectInput<'_>, params: &EffectParams) -> PathlightResult<Frame> {
    let mask = HardMask::new(input.focus, params.shape);
    let alpha = (params.color_intensity / 100.0).clamp(0.0, 1.0) as f32;
    let color = params.effect_color;

    let graded = compose_masked(input.source, input.darkened, |x, y| mask.contains(x, y))?;
    let (w, _) = graded.dimensions();
    let stride = w as usize * 3;
    let mut out = graded;
    if stride == 0 {
        return Ok(out);
    }
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                if !mask.contains(x, y as u32) {
                    continue;
                }
                let i = x as usize * 3;
                let px = tint_pixel([row[i], row[i + 1], row[i + 2]], color, alpha);
                row[i..i + 3].copy_from_slice(&px);
            }
        });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;
    use crate::{
        effects::composite::darken,
        foundation::core::{Focus, Rgb8},
    };

    fn gradient(w: u32, h: u32) -> Frame {
        Frame::from_fn(w, h, |x, y| Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 200]))
    }

    fn input<'a>(src: &'a Frame, dark: &'a Frame, focus: Focus) -> EffectInput<'a> {
        EffectInput {
            source: src,
            darkened: dark,
            focus,
            target: src.dimensions(),
        }
    }

    #[test]
    fn far_off_canvas_focus_gives_the_darkened_frame() {
        let src = gradient(32, 24);
        let dark = darken(&src, 0.5);
        let far = Focus::new(5.0e9, 10.0, 40.0);
        for shape in [Shape::Circle, Shape::Square] {
            let params = EffectParams {
                shape,
                ..EffectParams::default()
            };
            let inp = input(&src, &dark, far);
            assert_eq!(spotlight(&inp, &params).unwrap(), dark);
            assert_eq!(spotlight_glow(&inp, &params).unwrap(), dark);
            assert_eq!(color_grading(&inp, &params).unwrap(), dark);
        }
    }

    #[test]
    fn classic_inside_is_source_outside_is_darkened() {
        let src = gradient(40, 40);
        let params = EffectParams {
            brightness: 30.0,
            ..EffectParams::default()
        };
        let dark = darken(&src, params.brightness_factor());
        let out = spotlight(&input(&src, &dark, Focus::new(20.0, 20.0, 16.0)), &params).unwrap();

        assert_eq!(out.get_pixel(20, 20), src.get_pixel(20, 20));
        assert_eq!(out.get_pixel(25, 22), src.get_pixel(25, 22));
        for (x, y) in [(0, 0), (39, 39), (20, 30), (35, 20)] {
            let s = src.get_pixel(x, y);
            let o = out.get_pixel(x, y);
            for c in 0..3 {
                let expected = f32::from(s[c]) * 0.3;
                assert!((f32::from(o[c]) - expected).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn classic_square_reaches_corners() {
        let src = gradient(30, 30);
        let dark = darken(&src, 0.0);
        let params = EffectParams {
            shape: Shape::Square,
            ..EffectParams::default()
        };
        let out = spotlight(&input(&src, &dark, Focus::new(15.0, 15.0, 10.0)), &params).unwrap();
        assert_eq!(out.get_pixel(19, 19), src.get_pixel(19, 19));
        assert_eq!(out.get_pixel(21, 15), &Rgb([0, 0, 0]));
    }

    #[test]
    fn glow_weight_is_one_in_core_and_zero_past_glow() {
        let src = gradient(100, 100);
        let dark = darken(&src, 0.5);
        let params = EffectParams {
            glow_intensity: 50.0,
            ..EffectParams::default()
        };
        // radius 20, glow radius 30
        let inp = input(&src, &dark, Focus::new(50.0, 50.0, 40.0));
        assert_eq!(glow_weight(&inp, &params, 50, 50), 1.0);
        assert_eq!(glow_weight(&inp, &params, 70, 50), 1.0);
        assert_eq!(glow_weight(&inp, &params, 75, 50), 0.5);
        assert_eq!(glow_weight(&inp, &params, 80, 50), 0.0);
        assert_eq!(glow_weight(&inp, &params, 99, 99), 0.0);

        let out = spotlight_glow(&inp, &params).unwrap();
        assert_eq!(out.get_pixel(50, 50), src.get_pixel(50, 50));
        assert_eq!(out.get_pixel(95, 50), dark.get_pixel(95, 50));
    }

    #[test]
    fn glow_square_uses_rounded_distance() {
        let src = gradient(100, 100);
        let dark = darken(&src, 0.5);
        let params = EffectParams {
            shape: Shape::Square,
            glow_intensity: 100.0,
            ..EffectParams::default()
        };
        // half 10, glow band 10
        let inp = input(&src, &dark, Focus::new(50.0, 50.0, 20.0));
        assert_eq!(glow_weight(&inp, &params, 60, 60), 1.0);
        assert_eq!(glow_weight(&inp, &params, 65, 50), 0.5);
        assert_eq!(glow_weight(&inp, &params, 70, 70), 0.0);
    }

    #[test]
    fn zero_glow_is_a_hard_edge() {
        let src = gradient(60, 60);
        let dark = darken(&src, 0.2);
        let params = EffectParams {
            glow_intensity: 0.0,
            ..EffectParams::default()
        };
        let inp = input(&src, &dark, Focus::new(30.0, 30.0, 20.0));
        assert_eq!(glow_weight(&inp, &params, 40, 30), 1.0);
        assert_eq!(glow_weight(&inp, &params, 41, 30), 0.0);
    }

    #[test]
    fn color_grading_tints_only_inside() {
        let src = Frame::from_pixel(30, 30, Rgb([100, 100, 100]));
        let dark = darken(&src, 0.5);
        let params = EffectParams {
            effect_color: Rgb8::new(200, 0, 100),
            color_intensity: 50.0,
            ..EffectParams::default()
        };
        let out = color_grading(&input(&src, &dark, Focus::new(15.0, 15.0, 10.0)), &params)
            .unwrap();
        assert_eq!(out.get_pixel(15, 15), &Rgb([150, 50, 100]));
        assert_eq!(out.get_pixel(0, 0), &Rgb([50, 50, 50]));
    }
}
