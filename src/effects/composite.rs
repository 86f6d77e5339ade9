use rayon::prelude::*;

use crate::{
    foundation::core::{Frame, Rgb8},
    foundation::error::{PathlightError, PathlightResult},
    foundation::math::mix_rgb,
};

/// `source * factor` per channel, truncated. This is the "outside focus" layer.
pub fn darken(source: &Frame, factor: f32) -> Frame {
    let factor = factor.clamp(0.0, 1.0);
    let (w, h) = source.dimensions();
    let mut out = Frame::new(w, h);
    out.par_chunks_mut(3)
        .zip(source.par_chunks(3))
        .for_each(|(d, s)| {
            for c in 0..3 {
                d[c] = (f32::from(s[c]) * factor) as u8;
            }
        });
    out
}

fn ensure_same_size(a: &Frame, b: &Frame, what: &str) -> PathlightResult<()> {
    if a.dimensions() != b.dimensions() {
        return Err(PathlightError::validation(format!(
            "{what} expects equal-size frames, got {:?} and {:?}",
            a.dimensions(),
            b.dimensions()
        )));
    }
    Ok(())
}

/// Per pixel `w·fg + (1−w)·bg` where `w = weight(x, y)` in `[0, 1]`.
pub fn compose_weighted<F>(fg: &Frame, bg: &Frame, weight: F) -> PathlightResult<Frame>
where
    F: Fn(u32, u32) -> f32 + Sync,
{
    ensure_same_size(fg, bg, "compose_weighted")?;
    let (w, h) = fg.dimensions();
    let stride = w as usize * 3;
    let mut out = Frame::new(w, h);
    if stride == 0 {
        return Ok(out);
    }
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let base = y * stride;
            for x in 0..w as usize {
                let i = base + x * 3;
                let wgt = weight(x as u32, y as u32);
                mix_rgb(
                    &fg.as_raw()[i..i + 3],
                    &bg.as_raw()[i..i + 3],
                    &mut row[x * 3..x * 3 + 3],
                    wgt,
                );
            }
        });
    Ok(out)
}

/// Hard selection: `fg` where `inside(x, y)`, `bg` elsewhere.
pub fn compose_masked<F>(fg: &Frame, bg: &Frame, inside: F) -> PathlightResult<Frame>
where
    F: Fn(u32, u32) -> bool + Sync,
{
    ensure_same_size(fg, bg, "compose_masked")?;
    let (w, h) = fg.dimensions();
    let stride = w as usize * 3;
    let mut out = bg.clone();
    if stride == 0 {
        return Ok(out);
    }
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let base = y * stride;
            for x in 0..w as usize {
                if inside(x as u32, y as u32) {
                    let i = base + x * 3;
                    row[x * 3..x * 3 + 3].copy_from_slice(&fg.as_raw()[i..i + 3]);
                }
            }
        });
    Ok(out)
}

/// Alpha-blend a solid color over one pixel: `(1−a)·px + a·color`.
pub fn tint_pixel(px: [u8; 3], color: Rgb8, alpha: f32) -> [u8; 3] {
    let mut out = [0u8; 3];
    mix_rgb(&color.to_array(), &px, &mut out, alpha);
    out
}

/// Bilinear resample of `src` to `width × height` (pixel-center aligned).
pub fn resize_bilinear(src: &Frame, width: u32, height: u32) -> Frame {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    image::imageops::resize(src, width, height, image::imageops::FilterType::Triangle)
}

/// Copy `src` into `dst` with its top-left corner at `(x0, y0)`; pixels falling outside `dst`
/// are dropped. Only pixels where `keep(x, y)` (in `src` coordinates) are copied.
pub fn paste_where<F>(dst: &mut Frame, src: &Frame, x0: i64, y0: i64, keep: F)
where
    F: Fn(u32, u32) -> bool,
{
    let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));
    for (x, y, px) in src.enumerate_pixels() {
        let tx = x0 + i64::from(x);
        let ty = y0 + i64::from(y);
        if tx < 0 || ty < 0 || tx >= dw || ty >= dh || !keep(x, y) {
            continue;
        }
        dst.put_pixel(tx as u32, ty as u32, *px);
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn darken_truncates() {
        let f = Frame::from_pixel(2, 2, Rgb([201, 100, 3]));
        let d = darken(&f, 0.5);
        assert_eq!(d.get_pixel(1, 1), &Rgb([100, 50, 1]));
        assert_eq!(darken(&f, 1.0), f);
    }

    #[test]
    fn weighted_endpoints_select_layers() {
        let fg = Frame::from_pixel(3, 1, Rgb([200, 200, 200]));
        let bg = Frame::from_pixel(3, 1, Rgb([0, 0, 0]));
        let out = compose_weighted(&fg, &bg, |x, _| x as f32 / 2.0).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([100, 100, 100]));
        assert_eq!(out.get_pixel(2, 0), &Rgb([200, 200, 200]));
    }

    #[test]
    fn masked_selects_per_pixel() {
        let fg = Frame::from_pixel(2, 2, Rgb([9, 9, 9]));
        let bg = Frame::from_pixel(2, 2, Rgb([1, 1, 1]));
        let out = compose_masked(&fg, &bg, |x, y| x == y).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([9, 9, 9]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([1, 1, 1]));
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let a = Frame::new(2, 2);
        let b = Frame::new(3, 2);
        assert!(compose_masked(&a, &b, |_, _| true).is_err());
        assert!(compose_weighted(&a, &b, |_, _| 1.0).is_err());
    }

    #[test]
    fn tint_endpoints() {
        let c = Rgb8::new(255, 0, 255);
        assert_eq!(tint_pixel([10, 20, 30], c, 0.0), [10, 20, 30]);
        assert_eq!(tint_pixel([10, 20, 30], c, 1.0), [255, 0, 255]);
    }

    #[test]
    fn paste_clips_to_destination() {
        let mut dst = Frame::new(4, 4);
        let src = Frame::from_pixel(3, 3, Rgb([7, 7, 7]));
        paste_where(&mut dst, &src, -1, 2, |_, _| true);
        assert_eq!(dst.get_pixel(0, 2), &Rgb([7, 7, 7]));
        assert_eq!(dst.get_pixel(1, 3), &Rgb([7, 7, 7]));
        assert_eq!(dst.get_pixel(2, 2), &Rgb([0, 0, 0]));
    }
}
