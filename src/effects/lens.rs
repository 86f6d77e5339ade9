use image::imageops;
use rayon::prelude::*;

use crate::{
    effects::{
        EffectInput,
        composite::{paste_where, resize_bilinear},
        params::{EffectParams, Shape},
    },
    foundation::core::Frame,
    foundation::error::PathlightResult,
};

/// Pixel rectangle `[x0, x1) × [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roi {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Roi {
    /// Clamp `[x0, x0 + w) × [y0, y0 + h)` to a `width × height` image. `None` if nothing is left.
    pub fn clamped(x0: i64, y0: i64, w: i64, h: i64, width: u32, height: u32) -> Option<Self> {
        let x1 = x0.saturating_add(w).min(i64::from(width));
        let y1 = y0.saturating_add(h).min(i64::from(height));
        let x0 = x0.max(0);
        let y0 = y0.max(0);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x0: x0 as u32,
            y0: y0 as u32,
            x1: x1 as u32,
            y1: y1 as u32,
        })
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn crop(&self, src: &Frame) -> Frame {
        imageops::crop_imm(src, self.x0, self.y0, self.width(), self.height()).to_image()
    }
}

fn in_centered_circle(x: u32, y: u32, w: u32, h: u32) -> bool {
    let r = i64::from(w.min(h) / 2);
    let dx = i64::from(x) - i64::from(w / 2);
    let dy = i64::from(y) - i64::from(h / 2);
    dx * dx + dy * dy <= r * r
}

/// Magnify the focus region by `1 + zoom_intensity/100` inside a circular lens drawn over the
/// darkened background.
pub fn zoom_lens(input: &EffectInput<'_>, params: &EffectParams) -> PathlightResult<Frame> {
    let src = input.source;
    let (w, h) = src.dimensions();
    let zf = (1.0 + params.zoom_intensity / 100.0).max(1.0);
    let r = (input.focus.size / 2.0) as i64;
    let x0 = (input.focus.x - r as f64) as i64;
    let y0 = (input.focus.y - r as f64) as i64;

    let side = r.saturating_mul(2);
    let Some(roi) = Roi::clamped(x0, y0, side, side, w, h) else {
        tracing::warn!(x = input.focus.x, y = input.focus.y, "zoom lens region is empty");
        return Ok(input.darkened.clone());
    };
    let (zw, zh) = (roi.width(), roi.height());
    let new_w = (f64::from(zw) / zf) as u32;
    let new_h = (f64::from(zh) / zf) as u32;
    if new_w == 0 || new_h == 0 {
        tracing::warn!(zw, zh, zf, "zoom lens crop collapsed");
        return Ok(input.darkened.clone());
    }

    let region = roi.crop(src);
    let inner = Roi::clamped(
        i64::from(zw / 2) - i64::from(new_w / 2),
        i64::from(zh / 2) - i64::from(new_h / 2),
        i64::from(new_w),
        i64::from(new_h),
        zw,
        zh,
    );
    let Some(inner) = inner else {
        return Ok(input.darkened.clone());
    };
    let zoomed = resize_bilinear(&inner.crop(&region), zw, zh);

    let mut out = input.darkened.clone();
    paste_where(
        &mut out,
        &zoomed,
        i64::from(roi.x0),
        i64::from(roi.y0),
        |x, y| in_centered_circle(x, y, zw, zh),
    );
    Ok(out)
}

/// Sample `src` at fractional `(x, y)` with bilinear weights. `None` outside the image.
fn sample_bilinear(src: &Frame, x: f64, y: f64) -> Option<[u8; 3]> {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 || x < 0.0 || y < 0.0 || x > f64::from(w - 1) || y > f64::from(h - 1) {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - f64::from(x0);
    let fy = y - f64::from(y0);

    let p00 = src.get_pixel(x0, y0);
    let p10 = src.get_pixel(x1, y0);
    let p01 = src.get_pixel(x0, y1);
    let p11 = src.get_pixel(x1, y1);
    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}

/// Radial lens remap with coefficient `k1` (negative = barrel).
///
/// The camera model uses `fx = width`, `fy = height` and the image center as principal point.
/// Each output pixel reads the source at `x·(1 + k1·r²)`; samples falling outside are black.
pub fn undistort(src: &Frame, k1: f64) -> Frame {
    let (w, h) = src.dimensions();
    let mut out = Frame::new(w, h);
    let stride = w as usize * 3;
    if stride == 0 || h == 0 || k1 == 0.0 {
        return src.clone();
    }
    let (fx, fy) = (f64::from(w), f64::from(h));
    let (cx, cy) = (fx / 2.0, fy / 2.0);

    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(v, row)| {
            let y = (v as f64 - cy) / fy;
            for u in 0..w as usize {
                let x = (u as f64 - cx) / fx;
                let factor = 1.0 + k1 * (x * x + y * y);
                let su = x * factor * fx + cx;
                let sv = y * factor * fy + cy;
                if let Some(px) = sample_bilinear(src, su, sv) {
                    row[u * 3..u * 3 + 3].copy_from_slice(&px);
                }
            }
        });
    out
}

/// Crop a square of side `size` around the focus, optionally bend it through [`undistort`],
/// and show it as a centered tunnel of side `min(out_w, out_h)` on a black frame.
///
/// Composes directly at `input.target`.
pub fn tubo(input: &EffectInput<'_>, params: &EffectParams, distort: bool) -> PathlightResult<Frame> {
    let (ow, oh) = input.target;
    let mut out = Frame::new(ow, oh);
    let d = ow.min(oh);
    if d == 0 {
        return Ok(out);
    }

    let (w, h) = input.source.dimensions();
    let side = input.focus.size as i64;
    let half = side / 2;
    let x0 = (input.focus.x as i64).saturating_sub(half);
    let y0 = (input.focus.y as i64).saturating_sub(half);
    let Some(roi) = Roi::clamped(x0, y0, side, side, w, h) else {
        tracing::warn!(
            x = input.focus.x,
            y = input.focus.y,
            size = input.focus.size,
            "tunnel crop is empty, emitting black frame"
        );
        return Ok(out);
    };

    let mut region = roi.crop(input.source);
    if distort && params.distortion != 0.0 {
        region = undistort(&region, -params.distortion / 200.0);
    }
    let lens = resize_bilinear(&region, d, d);

    let ox = i64::from((ow - d) / 2);
    let oy = i64::from((oh - d) / 2);
    match params.shape {
        Shape::Circle => paste_where(&mut out, &lens, ox, oy, |x, y| {
            in_centered_circle(x, y, d, d)
        }),
        Shape::Square => paste_where(&mut out, &lens, ox, oy, |_, _| true),
    }
    Ok(out)
}
