//! # Node Type Registry
//!
//! Static catalog of the processing nodes a pipeline can be built from.
//! The palette, the properties panel and the graph store all read from
//! here; nothing writes to it after start-up.
//!
//! ## Key Items
//! - [`NodeType`]: closed set of node tags (`cameraInput`, `objectDetection`, ...)
//! - [`NodeTypeDescriptor`]: label, icon, ports and configurable fields of a type
//! - [`describe`]: look a descriptor up by its wire tag
//! - [`FieldKind::parse`]: validate an untyped JSON value against a field

use crate::error::GraphError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    CameraInput,
    ImageProcessing,
    ObjectDetection,
    PersonTracking,
    VehicleTracking,
    Analytics,
    TimeSeriesAnalysis,
    Alert,
    IncidentDetection,
}

impl NodeType {
    pub const ALL: [NodeType; 9] = [
        NodeType::CameraInput,
        NodeType::ImageProcessing,
        NodeType::ObjectDetection,
        NodeType::PersonTracking,
        NodeType::VehicleTracking,
        NodeType::Analytics,
        NodeType::TimeSeriesAnalysis,
        NodeType::Alert,
        NodeType::IncidentDetection,
    ];

    /// Wire tag used in persisted documents and drag payloads.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeType::CameraInput => "cameraInput",
            NodeType::ImageProcessing => "imageProcessing",
            NodeType::ObjectDetection => "objectDetection",
            NodeType::PersonTracking => "personTracking",
            NodeType::VehicleTracking => "vehicleTracking",
            NodeType::Analytics => "analytics",
            NodeType::TimeSeriesAnalysis => "timeSeriesAnalysis",
            NodeType::Alert => "alert",
            NodeType::IncidentDetection => "incidentDetection",
        }
    }

    pub fn from_tag(tag: &str) -> Option<NodeType> {
        NodeType::ALL.into_iter().find(|t| t.tag() == tag)
    }

    pub fn descriptor(&self) -> &'static NodeTypeDescriptor {
        // DESCRIPTORS is declared in the same order as NodeType::ALL
        &DESCRIPTORS[*self as usize]
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Palette grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeCategory {
    Input,
    Processing,
    Analytics,
    Output,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 4] = [
        NodeCategory::Input,
        NodeCategory::Processing,
        NodeCategory::Analytics,
        NodeCategory::Output,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            NodeCategory::Input => "Input Nodes",
            NodeCategory::Processing => "Processing Nodes",
            NodeCategory::Analytics => "Analytics Nodes",
            NodeCategory::Output => "Output Nodes",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldKind {
    Text,
    /// An empty option list accepts any value (options are fetched at runtime).
    /// Such dynamic selects also accept numeric keys and keep them numeric.
    Select { options: &'static [&'static str] },
    MultiSelect { options: &'static [&'static str] },
    /// Values must lie in `min..=max` on a multiple of `step` from `min`.
    Slider { min: f64, max: f64, step: f64 },
    Switch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug, PartialEq)]
pub struct NodeTypeDescriptor {
    pub node_type: NodeType,
    pub label: &'static str,
    pub icon: &'static str,
    pub category: NodeCategory,
    pub description: &'static str,
    /// Header color (RGB).
    pub color: [u8; 3],
    pub fields: &'static [FieldDescriptor],
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
}

impl NodeTypeDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_input(&self, port: &str) -> bool {
        self.inputs.contains(&port)
    }

    pub fn has_output(&self, port: &str) -> bool {
        self.outputs.contains(&port)
    }
}

/// A validated configuration value. The variant always matches the
/// [`FieldKind`] it was parsed against.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Choice(String),
    /// Numeric key picked from a dynamic select, e.g. a backend camera id.
    NumericChoice(serde_json::Number),
    Choices(Vec<String>),
    Number(f64),
    Flag(bool),
}

impl FieldValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => serde_json::Value::String(s.clone()),
            FieldValue::NumericChoice(n) => serde_json::Value::Number(n.clone()),
            FieldValue::Choices(list) => serde_json::json!(list),
            FieldValue::Number(n) => serde_json::json!(*n),
            FieldValue::Flag(b) => serde_json::Value::Bool(*b),
        }
    }
}

/// Slack for float error when checking slider steps, in units of one step.
const STEP_TOLERANCE: f64 = 1e-6;

impl FieldKind {
    /// Validate `value` against this field kind and its domain.
    pub fn parse(&self, field: &str, value: &serde_json::Value) -> Result<FieldValue, GraphError> {
        let invalid = |reason: String| GraphError::InvalidValue {
            field: field.to_string(),
            reason,
        };

        match self {
            FieldKind::Text => value
                .as_str()
                .map(|s| FieldValue::Text(s.to_string()))
                .ok_or_else(|| invalid(format!("expected a string, got {}", value))),
            FieldKind::Select { options } => {
                // Camera ids come back from the backend as numbers
                let choice = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) if options.is_empty() => {
                        return Ok(FieldValue::NumericChoice(n.clone()));
                    }
                    other => return Err(invalid(format!("expected a string, got {}", other))),
                };
                if !options.is_empty() && !options.contains(&choice.as_str()) {
                    return Err(invalid(format!("'{}' is not one of {:?}", choice, options)));
                }
                Ok(FieldValue::Choice(choice))
            }
            FieldKind::MultiSelect { options } => {
                let items = value
                    .as_array()
                    .ok_or_else(|| invalid(format!("expected a list, got {}", value)))?;
                let mut choices = Vec::with_capacity(items.len());
                for item in items {
                    let choice = item
                        .as_str()
                        .ok_or_else(|| invalid(format!("expected a string, got {}", item)))?;
                    if !options.contains(&choice) {
                        return Err(invalid(format!("'{}' is not one of {:?}", choice, options)));
                    }
                    if !choices.iter().any(|c: &String| c == choice) {
                        choices.push(choice.to_string());
                    }
                }
                Ok(FieldValue::Choices(choices))
            }
            FieldKind::Slider { min, max, step } => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| invalid(format!("expected a number, got {}", value)))?;
                if n < *min || n > *max {
                    return Err(invalid(format!("{} is outside {}..={}", n, min, max)));
                }
                if *step > 0.0 {
                    let steps = (n - min) / step;
                    if (steps - steps.round()).abs() > STEP_TOLERANCE {
                        return Err(invalid(format!("{} is not a multiple of {} from {}", n, step, min)));
                    }
                }
                Ok(FieldValue::Number(n))
            }
            FieldKind::Switch => value
                .as_bool()
                .map(FieldValue::Flag)
                .ok_or_else(|| invalid(format!("expected a boolean, got {}", value))),
        }
    }
}

const CAMERA_INPUT_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "cameraId",
        label: "Camera",
        kind: FieldKind::Select { options: &[] },
    },
    FieldDescriptor {
        name: "frameRate",
        label: "Frame Rate",
        kind: FieldKind::Slider { min: 1.0, max: 60.0, step: 1.0 },
    },
    FieldDescriptor {
        name: "resolution",
        label: "Resolution",
        kind: FieldKind::Select {
            options: &["640x480", "1280x720", "1920x1080"],
        },
    },
];

const IMAGE_PROCESSING_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "preprocessing",
        label: "Preprocessing",
        kind: FieldKind::Select {
            options: &["none", "grayscale", "blur", "sharpen"],
        },
    },
    FieldDescriptor {
        name: "contrast",
        label: "Contrast",
        kind: FieldKind::Slider { min: -100.0, max: 100.0, step: 1.0 },
    },
    FieldDescriptor {
        name: "brightness",
        label: "Brightness",
        kind: FieldKind::Slider { min: -100.0, max: 100.0, step: 1.0 },
    },
];

const OBJECT_DETECTION_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "model",
        label: "Detection Model",
        kind: FieldKind::Select {
            options: &["yolov5", "faster_rcnn", "ssd"],
        },
    },
    FieldDescriptor {
        name: "confidence",
        label: "Confidence Threshold",
        kind: FieldKind::Slider { min: 0.0, max: 1.0, step: 0.01 },
    },
    FieldDescriptor {
        name: "classes",
        label: "Object Classes",
        kind: FieldKind::MultiSelect {
            options: &["person", "car", "truck", "bicycle", "motorcycle"],
        },
    },
];

const ANALYTICS_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "metricType",
        label: "Metric Type",
        kind: FieldKind::Select {
            options: &["count", "speed", "direction", "dwell_time"],
        },
    },
    FieldDescriptor {
        name: "interval",
        label: "Update Interval",
        kind: FieldKind::Select {
            options: &["1s", "5s", "10s", "30s", "1m"],
        },
    },
    FieldDescriptor {
        name: "aggregation",
        label: "Aggregation",
        kind: FieldKind::Select {
            options: &["sum", "average", "max", "min"],
        },
    },
];

const ALERT_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "condition",
        label: "Trigger Condition",
        kind: FieldKind::Select {
            options: &["threshold", "anomaly", "pattern"],
        },
    },
    FieldDescriptor {
        name: "severity",
        label: "Severity",
        kind: FieldKind::Select {
            options: &["low", "medium", "high"],
        },
    },
    FieldDescriptor {
        name: "notification",
        label: "Notification Methods",
        kind: FieldKind::MultiSelect {
            options: &["email", "sms", "webhook", "dashboard"],
        },
    },
];

const SOURCE_PORTS: &[&str] = &[];
const IN: &[&str] = &["in"];
const OUT: &[&str] = &["out"];

static DESCRIPTORS: [NodeTypeDescriptor; 9] = [
    NodeTypeDescriptor {
        node_type: NodeType::CameraInput,
        label: "Camera Input",
        icon: "📹",
        category: NodeCategory::Input,
        description: "Capture video feed from camera",
        color: [76, 175, 80],
        fields: CAMERA_INPUT_FIELDS,
        inputs: SOURCE_PORTS,
        outputs: OUT,
    },
    NodeTypeDescriptor {
        node_type: NodeType::ImageProcessing,
        label: "Image Processing",
        icon: "🖼",
        category: NodeCategory::Processing,
        description: "Preprocess frames before detection",
        color: [96, 125, 139],
        fields: IMAGE_PROCESSING_FIELDS,
        inputs: IN,
        outputs: OUT,
    },
    NodeTypeDescriptor {
        node_type: NodeType::ObjectDetection,
        label: "Object Detection",
        icon: "🔍",
        category: NodeCategory::Processing,
        description: "Detect objects in video stream",
        color: [33, 150, 243],
        fields: OBJECT_DETECTION_FIELDS,
        inputs: IN,
        outputs: OUT,
    },
    NodeTypeDescriptor {
        node_type: NodeType::PersonTracking,
        label: "Person Tracking",
        icon: "🚶",
        category: NodeCategory::Processing,
        description: "Track people across frames",
        color: [244, 67, 54],
        fields: &[],
        inputs: IN,
        outputs: OUT,
    },
    NodeTypeDescriptor {
        node_type: NodeType::VehicleTracking,
        label: "Vehicle Tracking",
        icon: "🚗",
        category: NodeCategory::Processing,
        description: "Track vehicles across frames",
        color: [121, 85, 72],
        fields: &[],
        inputs: IN,
        outputs: OUT,
    },
    NodeTypeDescriptor {
        node_type: NodeType::Analytics,
        label: "Analytics",
        icon: "📊",
        category: NodeCategory::Analytics,
        description: "Analyze video data",
        color: [255, 152, 0],
        fields: ANALYTICS_FIELDS,
        inputs: IN,
        outputs: OUT,
    },
    NodeTypeDescriptor {
        node_type: NodeType::TimeSeriesAnalysis,
        label: "Time Series Analysis",
        icon: "📈",
        category: NodeCategory::Analytics,
        description: "Aggregate metrics over time",
        color: [0, 188, 212],
        fields: &[],
        inputs: IN,
        outputs: OUT,
    },
    NodeTypeDescriptor {
        node_type: NodeType::Alert,
        label: "Alert",
        icon: "🔔",
        category: NodeCategory::Output,
        description: "Generate alerts based on conditions",
        color: [156, 39, 176],
        fields: ALERT_FIELDS,
        inputs: IN,
        outputs: OUT,
    },
    NodeTypeDescriptor {
        node_type: NodeType::IncidentDetection,
        label: "Incident Detection",
        icon: "⚠",
        category: NodeCategory::Output,
        description: "Flag safety incidents",
        color: [233, 30, 99],
        fields: &[],
        inputs: IN,
        outputs: OUT,
    },
];

/// Look up a node type descriptor by its wire tag.
pub fn describe(tag: &str) -> Result<&'static NodeTypeDescriptor, GraphError> {
    NodeType::from_tag(tag)
        .map(|t| t.descriptor())
        .ok_or_else(|| GraphError::InvalidType(tag.to_string()))
}

/// Descriptors grouped by category, in palette order.
pub fn palette() -> Vec<(NodeCategory, Vec<&'static NodeTypeDescriptor>)> {
    NodeCategory::ALL
        .into_iter()
        .map(|category| {
            let entries = DESCRIPTORS
                .iter()
                .filter(|d| d.category == category)
                .collect();
            (category, entries)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptors_line_up_with_node_types() {
        for t in NodeType::ALL {
            assert_eq!(t.descriptor().node_type, t);
            assert_eq!(NodeType::from_tag(t.tag()), Some(t));
        }
    }

    #[test]
    fn serde_tag_matches_wire_tag() {
        for t in NodeType::ALL {
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.tag()));
        }
    }

    #[test]
    fn describe_unknown_type_fails() {
        assert_eq!(
            describe("teleporter"),
            Err(GraphError::InvalidType("teleporter".into()))
        );
        assert_eq!(describe("alert").unwrap().label, "Alert");
    }

    #[test]
    fn camera_input_has_no_input_port() {
        let d = NodeType::CameraInput.descriptor();
        assert!(!d.has_input("in"));
        assert!(d.has_output("out"));
    }

    #[test]
    fn palette_covers_every_type_once() {
        let count: usize = palette().iter().map(|(_, entries)| entries.len()).sum();
        assert_eq!(count, NodeType::ALL.len());
    }

    #[test]
    fn slider_rejects_out_of_range() {
        let kind = NodeType::ObjectDetection.descriptor().field("confidence").unwrap().kind;
        assert_eq!(kind.parse("confidence", &json!(0.5)), Ok(FieldValue::Number(0.5)));
        assert!(matches!(
            kind.parse("confidence", &json!(1.5)),
            Err(GraphError::InvalidValue { .. })
        ));
    }

    #[test]
    fn select_checks_options_unless_dynamic() {
        let model = NodeType::ObjectDetection.descriptor().field("model").unwrap().kind;
        assert!(model.parse("model", &json!("ssd")).is_ok());
        assert!(model.parse("model", &json!("resnet")).is_err());

        let camera = NodeType::CameraInput.descriptor().field("cameraId").unwrap().kind;
        let numeric = camera.parse("cameraId", &json!(7)).unwrap();
        assert_eq!(numeric.to_json(), json!(7));
        assert_eq!(
            camera.parse("cameraId", &json!("lobby")),
            Ok(FieldValue::Choice("lobby".into()))
        );
        assert!(model.parse("model", &json!(3)).is_err());
    }

    #[test]
    fn slider_enforces_step() {
        let rate = NodeType::CameraInput.descriptor().field("frameRate").unwrap().kind;
        assert_eq!(rate.parse("frameRate", &json!(30)), Ok(FieldValue::Number(30.0)));
        assert!(matches!(
            rate.parse("frameRate", &json!(29.5)),
            Err(GraphError::InvalidValue { .. })
        ));

        let confidence = NodeType::ObjectDetection.descriptor().field("confidence").unwrap().kind;
        assert_eq!(confidence.parse("confidence", &json!(0.8)), Ok(FieldValue::Number(0.8)));
        assert!(confidence.parse("confidence", &json!(0.805)).is_err());
    }

    #[test]
    fn multiselect_drops_duplicates() {
        let kind = NodeType::Alert.descriptor().field("notification").unwrap().kind;
        assert_eq!(
            kind.parse("notification", &json!(["sms", "email", "sms"])),
            Ok(FieldValue::Choices(vec!["sms".into(), "email".into()]))
        );
    }
}
