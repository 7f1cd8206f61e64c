use serde::{Deserialize, Serialize};

/// Event types used by the built-in widgets. The protocol treats `type`
/// as an open tag, so this list is not exhaustive.
pub mod event_types {
    pub const OCCUPANCY_UPDATE: &str = "occupancy_update";
    pub const PACKAGE_DETECTION: &str = "package_detection";
    pub const ATTENDANCE_UPDATE: &str = "attendance_update";
    pub const ATTENTION_UPDATE: &str = "attention_update";
    pub const TRAFFIC_UPDATE: &str = "traffic_update";
    pub const GET_TRAFFIC_DATA: &str = "get_traffic_data";
    pub const GET_OCCUPANCY_DATA: &str = "get_occupancy_data";
}

/// Message frame in both directions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
