//! Drag-and-drop from the node palette onto the builder canvas.
//!
//! The palette attaches a [`DragPayload`] when a drag starts; the canvas
//! reads it back on release. A drop without a usable payload does nothing.

use crate::document::Position;
use crate::editor::coordinate_transform::from_screen;
use crate::graph::{NodeId, PipelineGraph};
use crate::node_types::NodeType;
use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};

/// Data carried from a palette entry to the canvas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    pub node_type: String,
    pub name: String,
}

impl DragPayload {
    pub fn for_type(node_type: NodeType) -> Self {
        Self {
            node_type: node_type.tag().to_string(),
            name: node_type.descriptor().label.to_string(),
        }
    }
}

/// Canvas coordinates of a drop at screen point `pointer`.
pub fn drop_position(pointer: Pos2, canvas_origin: Pos2, pan: Vec2, zoom: f32) -> Position {
    from_screen(pointer, pan, zoom, canvas_origin)
}

/// Create the node described by `payload` at `position`.
///
/// Returns `None` and leaves the graph untouched when the payload is
/// missing, has an empty type, or names a type the registry does not know.
pub fn place_dropped_node(
    graph: &mut PipelineGraph,
    payload: Option<&DragPayload>,
    position: Position,
) -> Option<NodeId> {
    let Some(payload) = payload else {
        log::debug!("[Builder] drop without payload ignored");
        return None;
    };
    if payload.node_type.trim().is_empty() {
        log::debug!("[Builder] drop with empty node type ignored");
        return None;
    }
    let Some(node_type) = NodeType::from_tag(&payload.node_type) else {
        log::debug!("[Builder] drop of unknown type '{}' ignored", payload.node_type);
        return None;
    };

    let label = if payload.name.trim().is_empty() {
        node_type.descriptor().label
    } else {
        payload.name.as_str()
    };
    let node = graph.add_typed_node(node_type, position, label);
    log::info!("[Builder] placed {} at ({:.0}, {:.0})", node.id, position.x, position.y);
    Some(node.id.clone())
}
