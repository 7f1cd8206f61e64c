//! Edge rendering and hit-testing on the builder canvas.

use egui::{Color32, Pos2, Stroke};

/// Horizontal cubic bezier from an output port to an input port, sampled
/// into `steps` segments.
pub fn bezier_points(p1: Pos2, p2: Pos2, steps: usize) -> Vec<Pos2> {
    let control_offset = ((p2.x - p1.x).abs() * 0.5).max(50.0);
    let cp1 = Pos2::new(p1.x + control_offset, p1.y);
    let cp2 = Pos2::new(p2.x - control_offset, p2.y);

    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            let it = 1.0 - t;
            let a = it.powi(3);
            let b = 3.0 * it.powi(2) * t;
            let c = 3.0 * it * t.powi(2);
            let d = t.powi(3);
            Pos2::new(
                a * p1.x + b * cp1.x + c * cp2.x + d * p2.x,
                a * p1.y + b * cp1.y + c * cp2.y + d * p2.y,
            )
        })
        .collect()
}

/// Draw a bezier whose color fades from `from` to `to`.
pub fn draw_bezier(painter: &egui::Painter, p1: Pos2, p2: Pos2, from: Color32, to: Color32, width: f32) {
    let points = bezier_points(p1, p2, 30);
    let last = (points.len() - 1) as f32;
    for (i, pair) in points.windows(2).enumerate() {
        let t = i as f32 / last;
        let color = lerp_color(from, to, t);
        painter.line_segment([pair[0], pair[1]], Stroke::new(width, color));
    }
}

fn lerp_color(from: Color32, to: Color32, t: f32) -> Color32 {
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - t) + b as f32 * t) as u8;
    Color32::from_rgb(mix(from.r(), to.r()), mix(from.g(), to.g()), mix(from.b(), to.b()))
}

/// Whether `pos` lies within `threshold` pixels of the edge curve.
pub fn hit_test_bezier(pos: Pos2, p1: Pos2, p2: Pos2, threshold: f32) -> bool {
    bezier_points(p1, p2, 20)
        .windows(2)
        .any(|pair| distance_to_segment(pos, pair[0], pair[1]) < threshold)
}

pub fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    if ab.length_sq() == 0.0 {
        return (p - a).length();
    }
    let proj = (ab.dot(p - a) / ab.length_sq()).clamp(0.0, 1.0);
    (p - (a + ab * proj)).length()
}
