//! Canvas styling and layout constants.

use crate::node_types::{NodeCategory, NodeType};
use egui::{Color32, Vec2};
use serde::{Deserialize, Serialize};

pub const NODE_WIDTH: f32 = 180.0;
pub const HEADER_HEIGHT: f32 = 24.0;
pub const PORT_RADIUS: f32 = 6.0;
pub const PORT_HIT_RADIUS: f32 = 10.0;

/// Visual settings for the builder canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorStyle {
    pub use_gradient_connections: bool,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    pub show_grid: bool,
}

fn default_font_size() -> f32 {
    14.0
}

impl Default for EditorStyle {
    fn default() -> Self {
        Self {
            use_gradient_connections: true,
            font_size: default_font_size(),
            show_grid: true,
        }
    }
}

impl EditorStyle {
    pub fn node_color(&self, node_type: NodeType) -> Color32 {
        let [r, g, b] = node_type.descriptor().color;
        Color32::from_rgb(r, g, b)
    }

    pub fn category_color(&self, category: NodeCategory) -> Color32 {
        match category {
            NodeCategory::Input => Color32::from_rgb(50, 120, 200),
            NodeCategory::Processing => Color32::from_rgb(60, 150, 100),
            NodeCategory::Analytics => Color32::from_rgb(150, 100, 200),
            NodeCategory::Output => Color32::from_rgb(200, 80, 60),
        }
    }

    /// Unzoomed node size; one body row per configured field.
    pub fn node_size(&self, field_rows: usize) -> Vec2 {
        Vec2::new(NODE_WIDTH, HEADER_HEIGHT + 28.0 + field_rows as f32 * 16.0)
    }
}
