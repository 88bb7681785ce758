//! SVG path-data builders for the shapes layouts hand to a renderer.
//!
//! Angles follow the chord convention: zero at 12 o'clock, increasing
//! clockwise, so a point at angle `a` on radius `r` is `(r sin a, -r cos a)`.

use std::f32::consts::{PI, TAU};
use std::fmt::Write;

use super::types::SplineEdge;

pub(crate) fn fmt_num(value: f32) -> String {
    let mut text = format!("{value:.3}");
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

pub(crate) fn polar(radius: f32, angle: f32) -> (f32, f32) {
    (radius * angle.sin(), -radius * angle.cos())
}

pub fn line(x1: f32, y1: f32, x2: f32, y2: f32) -> String {
    format!(
        "M{},{}L{},{}",
        fmt_num(x1),
        fmt_num(y1),
        fmt_num(x2),
        fmt_num(y2)
    )
}

pub fn spline(edge: &SplineEdge) -> String {
    format!(
        "M{},{}C{},{} {},{} {},{}",
        fmt_num(edge.source_x),
        fmt_num(edge.source_y),
        fmt_num(edge.source_bisect_x),
        fmt_num(edge.source_bisect_y),
        fmt_num(edge.target_bisect_x),
        fmt_num(edge.target_bisect_y),
        fmt_num(edge.target_x),
        fmt_num(edge.target_y)
    )
}

/// Horizontal flow band centerline between two columns.
pub fn flow_link(x0: f32, y0: f32, x1: f32, y1: f32) -> String {
    let mid = (x0 + x1) / 2.0;
    format!(
        "M{},{}C{},{} {},{} {},{}",
        fmt_num(x0),
        fmt_num(y0),
        fmt_num(mid),
        fmt_num(y0),
        fmt_num(mid),
        fmt_num(y1),
        fmt_num(x1),
        fmt_num(y1)
    )
}

fn arc_to(out: &mut String, radius: f32, from: f32, to: f32, clockwise: bool) {
    let (x, y) = polar(radius, to);
    let large = if (to - from).abs() > PI { 1 } else { 0 };
    let sweep = if clockwise { 1 } else { 0 };
    let r = fmt_num(radius);
    let _ = write!(out, "A{r},{r},0,{large},{sweep},{},{}", fmt_num(x), fmt_num(y));
}

/// Ring segment between two radii, as drawn for chord groups.
pub fn annulus_arc(inner: f32, outer: f32, start: f32, end: f32) -> String {
    let mut out = String::new();
    let (sx, sy) = polar(outer, start);
    let _ = write!(out, "M{},{}", fmt_num(sx), fmt_num(sy));
    if end - start >= TAU - 1e-6 {
        // Full circle: two half arcs per radius, no connecting line.
        let mid = start + PI;
        arc_to(&mut out, outer, start, mid, true);
        arc_to(&mut out, outer, mid, end, true);
        let (ix, iy) = polar(inner, end);
        let _ = write!(out, "M{},{}", fmt_num(ix), fmt_num(iy));
        arc_to(&mut out, inner, end, mid, false);
        arc_to(&mut out, inner, mid, start, false);
    } else {
        arc_to(&mut out, outer, start, end, true);
        let (ix, iy) = polar(inner, end);
        let _ = write!(out, "L{},{}", fmt_num(ix), fmt_num(iy));
        arc_to(&mut out, inner, end, start, false);
    }
    out.push('Z');
    out
}

/// Chord ribbon joining two angular spans on the same radius through the
/// circle center.
pub fn ribbon(radius: f32, source: (f32, f32), target: (f32, f32)) -> String {
    let mut out = String::new();
    let (sx, sy) = polar(radius, source.0);
    let _ = write!(out, "M{},{}", fmt_num(sx), fmt_num(sy));
    arc_to(&mut out, radius, source.0, source.1, true);
    if source != target {
        let (tx, ty) = polar(radius, target.0);
        let _ = write!(out, "Q0,0,{},{}", fmt_num(tx), fmt_num(ty));
        arc_to(&mut out, radius, target.0, target.1, true);
    }
    let _ = write!(out, "Q0,0,{},{}", fmt_num(sx), fmt_num(sy));
    out.push('Z');
    out
}
