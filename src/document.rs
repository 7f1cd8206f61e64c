//! Wire format of a saved widget pipeline.
//!
//! ```json
//! {
//!   "name": "lobby-occupancy",
//!   "createdAt": "2026-01-01T12:00:00Z",
//!   "nodes": [{ "id": "cameraInput-1", "type": "cameraInput",
//!               "position": { "x": 10, "y": 20 },
//!               "data": { "label": "Camera Input", "type": "cameraInput", "frameRate": 30 } }],
//!   "edges": [{ "id": "edge-...", "source": "cameraInput-1", "target": "objectDetection-2" }]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Node-level `type` written by the generic canvas renderer; the real tag
/// then lives in `data.type`.
pub const GENERIC_NODE_TYPE: &str = "customNode";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub edges: Vec<EdgeDocument>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NodeDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Position,
    /// `label`, `type` and the type's configuration fields.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDocument {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl GraphDocument {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
