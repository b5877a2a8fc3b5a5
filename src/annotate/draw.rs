//! Stroke primitives used by the annotation tools

use image::{Rgba, RgbaImage};

/// Annotation stroke color
pub const STROKE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
/// Annotation stroke width in pixels
pub const STROKE_WIDTH: f32 = 2.0;
/// Length of each arrow head barb in pixels
pub const ARROW_HEAD_LEN: f32 = 15.0;

/// A canvas position in pixels
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

fn stamp(img: &mut RgbaImage, center: Point, radius: f32, color: Rgba<u8>) {
    let radius_sq = radius * radius;
    let width = img.width() as i64;
    let height = img.height() as i64;
    let min_x = ((center.x - radius).floor() as i64).max(0);
    let max_x = ((center.x + radius).ceil() as i64).min(width - 1);
    let min_y = ((center.y - radius).floor() as i64).max(0);
    let max_y = ((center.y + radius).ceil() as i64).min(height - 1);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            if dx * dx + dy * dy <= radius_sq {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Part of the segment `a`-`b` inside `[min_x, max_x] x [min_y, max_y]`
/// (Liang-Barsky), computed in `f64` so far-away endpoints stay precise.
fn clip_segment(a: Point, b: Point, min: (f64, f64), max: (f64, f64)) -> Option<(Point, Point)> {
    if ![a.x, a.y, b.x, b.y].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [(-dx, ax - min.0), (dx, max.0 - ax), (-dy, ay - min.1), (dy, max.1 - ay)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    let at = |t: f64| Point::new((ax + dx * t) as f32, (ay + dy * t) as f32);
    Some((at(t0), at(t1)))
}

/// Straight stroke from `a` to `b`. Only the part that can touch the canvas
/// is stamped, so the work is bounded by the canvas size.
pub fn draw_line(img: &mut RgbaImage, a: Point, b: Point) {
    let radius = (STROKE_WIDTH / 2.0).max(0.5);
    let pad = radius as f64 + 1.0;
    let Some((a, b)) = clip_segment(
        a,
        b,
        (-pad, -pad),
        (img.width() as f64 + pad, img.height() as f64 + pad),
    ) else {
        return;
    };
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp(img, Point::new(a.x + dx * t, a.y + dy * t), radius, STROKE_COLOR);
    }
}

/// Rectangle outline spanned by two opposite corners.
pub fn draw_rect(img: &mut RgbaImage, a: Point, b: Point) {
    let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
    let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
    let corners = [
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
    ];
    for i in 0..4 {
        draw_line(img, corners[i], corners[(i + 1) % 4]);
    }
}

/// Shaft from `from` to `to` with a two-barbed head at `to`.
pub fn draw_arrow(img: &mut RgbaImage, from: Point, to: Point) {
    draw_line(img, from, to);
    let angle = (to.y - from.y).atan2(to.x - from.x);
    let spread = std::f32::consts::PI / 6.0;
    for barb in [angle - spread, angle + spread] {
        let end = Point::new(
            to.x - ARROW_HEAD_LEN * barb.cos(),
            to.y - ARROW_HEAD_LEN * barb.sin(),
        );
        draw_line(img, to, end);
    }
}
