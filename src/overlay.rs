//! Editor-style overlay: the smoothed path and each control point's focus outline drawn over
//! the source image.

use image::Rgb;
use kurbo::PathEl;

use crate::{
    config::Settings,
    effects::Shape,
    foundation::core::{Frame, Point, Rgb8},
    path::PathModel,
};

const FLATTEN_TOLERANCE: f64 = 0.25;
const MARKER_RADIUS: i64 = 3;
const MAX_CIRCLE_SEGMENTS: f64 = 4096.0;

fn plot(img: &mut Frame, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Clip `a -> b` to `[x0, x1] × [y0, y1]` (Liang-Barsky). `None` when nothing is inside.
fn clip_segment(
    a: Point,
    b: Point,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
) -> Option<(Point, Point)> {
    let d = b - a;
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [
        (-d.x, a.x - x0),
        (d.x, x1 - a.x),
        (-d.y, a.y - y0),
        (d.y, y1 - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((a.lerp(b, t0), a.lerp(b, t1)))
}

/// 2 px wide line from `a` to `b`, clipped to the image.
fn draw_line(img: &mut Frame, a: Point, b: Point, color: Rgb<u8>) {
    let (w, h) = (f64::from(img.width()), f64::from(img.height()));
    let Some((a, b)) = clip_segment(a, b, -1.0, -1.0, w, h) else {
        return;
    };
    let steps = (b - a).hypot().ceil().max(1.0) as u64;
    for i in 0..=steps {
        let p = a.lerp(b, i as f64 / steps as f64);
        let (x, y) = (p.x.round() as i64, p.y.round() as i64);
        plot(img, x, y, color);
        plot(img, x + 1, y, color);
        plot(img, x, y + 1, color);
    }
}

fn draw_outline(img: &mut Frame, center: Point, size: f64, shape: Shape, color: Rgb<u8>) {
    let r = size / 2.0;
    let (w, h) = (f64::from(img.width()), f64::from(img.height()));
    if center.x + r < 0.0 || center.y + r < 0.0 || center.x - r > w || center.y - r > h {
        return;
    }
    match shape {
        Shape::Circle => {
            let n = (std::f64::consts::TAU * r).ceil().clamp(8.0, MAX_CIRCLE_SEGMENTS) as u64;
            let at = |i: u64| {
                let t = std::f64::consts::TAU * i as f64 / n as f64;
                Point::new(center.x + r * t.cos(), center.y + r * t.sin())
            };
            for i in 0..n {
                draw_line(img, at(i), at(i + 1), color);
            }
        }
        Shape::Square => {
            let corners = [
                Point::new(center.x - r, center.y - r),
                Point::new(center.x + r, center.y - r),
                Point::new(center.x + r, center.y + r),
                Point::new(center.x - r, center.y + r),
            ];
            for i in 0..4 {
                draw_line(img, corners[i], corners[(i + 1) % 4], color);
            }
        }
    }
}

fn draw_marker(img: &mut Frame, center: Point, color: Rgb<u8>) {
    let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);
    for dy in -MARKER_RADIUS..=MARKER_RADIUS {
        for dx in -MARKER_RADIUS..=MARKER_RADIUS {
            if dx * dx + dy * dy <= MARKER_RADIUS * MARKER_RADIUS {
                plot(img, cx.saturating_add(dx), cy.saturating_add(dy), color);
            }
        }
    }
}

fn rgb(c: Rgb8) -> Rgb<u8> {
    Rgb(c.to_array())
}

/// Copy of `image` with the path in `trace_color` and every focus outline in `shape_color`.
pub fn render_overlay(image: &Frame, model: &PathModel, settings: &Settings) -> Frame {
    let mut out = image.clone();
    let trace = rgb(settings.trace_color);
    let outline = rgb(settings.shape_color);

    for p in model.points() {
        draw_outline(&mut out, p.pos(), p.size, settings.shape, outline);
    }

    let path = model.smoothed_path();
    let mut pen: Option<Point> = None;
    kurbo::flatten(path.iter(), FLATTEN_TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => pen = Some(p),
        PathEl::LineTo(p) => {
            if let Some(from) = pen {
                draw_line(&mut out, from, p, trace);
            }
            pen = Some(p);
        }
        _ => {}
    });

    for p in model.points() {
        draw_marker(&mut out, p.pos(), trace);
    }
    out
}
