//! Conversions between canvas coordinates (stored on nodes) and screen
//! coordinates, accounting for pan and zoom.

use crate::document::Position;
use egui::{Pos2, Vec2};

pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 2.0;

/// Canvas position to screen position.
///
/// # Arguments
/// * `pos` - Position in canvas space
/// * `pan` - Current pan offset
/// * `zoom` - Current zoom level
/// * `canvas_origin` - Top-left corner of the canvas in screen space
pub fn to_screen(pos: Position, pan: Vec2, zoom: f32, canvas_origin: Pos2) -> Pos2 {
    canvas_origin + pan + Vec2::new(pos.x, pos.y) * zoom
}

/// Screen position to canvas position. Inverse of [`to_screen`].
pub fn from_screen(screen_pos: Pos2, pan: Vec2, zoom: f32, canvas_origin: Pos2) -> Position {
    let relative = (screen_pos - canvas_origin - pan) / zoom.max(f32::EPSILON);
    Position::new(relative.x, relative.y)
}

/// New pan that keeps the canvas point under `pointer` fixed while the
/// zoom changes from `old_zoom` to `new_zoom`.
pub fn zoom_about(pointer: Vec2, pan: Vec2, old_zoom: f32, new_zoom: f32) -> Vec2 {
    pointer - (pointer - pan) * (new_zoom / old_zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_round_trip_with_pan_and_zoom() {
        let origin = Pos2::new(200.0, 40.0);
        let pan = Vec2::new(-30.0, 15.0);
        let p = Position::new(120.0, 80.0);

        let screen = to_screen(p, pan, 1.5, origin);
        assert_eq!(screen, Pos2::new(350.0, 175.0));
        assert_eq!(from_screen(screen, pan, 1.5, origin), p);
    }

    #[test]
    fn zoom_keeps_pointer_anchor() {
        let pointer = Vec2::new(100.0, 100.0);
        let pan = Vec2::new(20.0, 0.0);
        let new_pan = zoom_about(pointer, pan, 1.0, 2.0);
        let before = from_screen(pointer.to_pos2(), pan, 1.0, Pos2::ZERO);
        let after = from_screen(pointer.to_pos2(), new_pan, 2.0, Pos2::ZERO);
        assert_eq!(before, after);
    }
}
