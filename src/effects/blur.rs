use rayon::prelude::*;

use crate::{
    foundation::core::Frame,
    foundation::error::{PathlightError, PathlightResult},
    foundation::math::sigma_for_kernel,
};

/// Separable Gaussian blur over an interleaved 8-bit buffer with `channels` per pixel.
///
/// Edges replicate the border pixel. `radius == 0` returns a copy.
pub fn gaussian_blur(
    src: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    radius: u32,
    sigma: f32,
) -> PathlightResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(channels))
        .ok_or_else(|| PathlightError::validation("blur buffer size overflow"))?;
    if channels == 0 || src.len() != expected_len {
        return Err(PathlightError::validation(
            "gaussian_blur expects src matching width*height*channels",
        ));
    }
    if radius == 0 || width == 0 || height == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    horizontal_pass(src, &mut tmp, width, channels, &kernel);
    vertical_pass(&tmp, &mut out, width, height, channels, &kernel);
    Ok(out)
}

/// Blur with an odd kernel size, deriving sigma the way OpenCV does for `sigma = 0`.
pub fn gaussian_blur_ksize(
    src: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    ksize: u32,
) -> PathlightResult<Vec<u8>> {
    let ksize = odd_kernel_size(ksize);
    gaussian_blur(src, width, height, channels, ksize / 2, sigma_for_kernel(ksize))
}

pub fn blur_frame(frame: &Frame, ksize: u32) -> PathlightResult<Frame> {
    let (w, h) = frame.dimensions();
    let data = gaussian_blur_ksize(frame.as_raw(), w, h, 3, ksize)?;
    Frame::from_raw(w, h, data)
        .ok_or_else(|| PathlightError::validation("blurred buffer does not match frame size"))
}

/// Unsharp mask: `1.5·src − 0.5·gaussian(σ=3)`.
pub fn sharpen_frame(frame: &Frame) -> PathlightResult<Frame> {
    const SIGMA: f32 = 3.0;
    let (w, h) = frame.dimensions();
    let blurred = gaussian_blur(frame.as_raw(), w, h, 3, (SIGMA * 3.0).ceil() as u32, SIGMA)?;
    let data: Vec<u8> = frame
        .as_raw()
        .iter()
        .zip(&blurred)
        .map(|(&s, &b)| (1.5 * f32::from(s) - 0.5 * f32::from(b)).round().clamp(0.0, 255.0) as u8)
        .collect();
    Frame::from_raw(w, h, data)
        .ok_or_else(|| PathlightError::validation("sharpened buffer does not match frame size"))
}

/// Smallest odd kernel size `>= max(ksize, 3)`.
pub fn odd_kernel_size(ksize: u32) -> u32 {
    let k = ksize.max(3);
    if k % 2 == 0 { k + 1 } else { k }
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> PathlightResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(PathlightError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = i as f64;
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(PathlightError::validation("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Keep the kernel summing to exactly 1.0 in Q16 so flat regions stay flat.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, ch: usize, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let stride = width as usize * ch;
    dst.par_chunks_mut(stride)
        .zip(src.par_chunks(stride))
        .for_each(|(out_row, in_row)| {
            let mut acc = vec![0u64; ch];
            for x in 0..w {
                acc.iter_mut().for_each(|a| *a = 0);
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i32 - radius).clamp(0, w - 1) as usize;
                    for c in 0..ch {
                        acc[c] += u64::from(kw) * u64::from(in_row[sx * ch + c]);
                    }
                }
                let o = x as usize * ch;
                for c in 0..ch {
                    out_row[o + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, ch: usize, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let h = height as i32;
    let stride = width as usize * ch;
    dst.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, out_row)| {
            for i in 0..stride {
                let mut acc = 0u64;
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y as i32 + ki as i32 - radius).clamp(0, h - 1) as usize;
                    acc += u64::from(kw) * u64::from(src[sy * stride + i]);
                }
                out_row[i] = q16_to_u8(acc);
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    (v.min(255)) as u8
}
