//! # Pipeline Graph Store
//!
//! Holds the graph being edited in the Widget Builder: typed nodes and the
//! directed edges between their ports. Every mutation goes through a method
//! on [`PipelineGraph`] and either fully applies or returns an error with the
//! graph untouched.
//!
//! Node configuration is a [`NodeConfig`] variant per node type. Untyped JSON
//! (property edits, loaded documents) is validated against the
//! [`crate::node_types`] registry before it reaches a config record.

use crate::document::{EdgeDocument, GraphDocument, NodeDocument, GENERIC_NODE_TYPE};
use crate::error::GraphError;
use crate::node_types::{FieldValue, NodeType, NodeTypeDescriptor, describe};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

pub use crate::document::Position;

pub type NodeId = String;
pub type EdgeId = String;

/// Camera key as the backend reports it. Numeric ids stay numeric on the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum CameraId {
    Name(String),
    Number(serde_json::Number),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraInputConfig {
    pub camera_id: Option<CameraId>,
    pub frame_rate: Option<f64>,
    pub resolution: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageProcessingConfig {
    pub preprocessing: Option<String>,
    pub contrast: Option<f64>,
    pub brightness: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectDetectionConfig {
    pub model: Option<String>,
    pub confidence: Option<f64>,
    pub classes: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalyticsConfig {
    pub metric_type: Option<String>,
    pub interval: Option<String>,
    pub aggregation: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlertConfig {
    pub condition: Option<String>,
    pub severity: Option<String>,
    pub notification: Option<Vec<String>>,
}

/// Per-type configuration record. Fields left `None` were never set.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeConfig {
    CameraInput(CameraInputConfig),
    ImageProcessing(ImageProcessingConfig),
    ObjectDetection(ObjectDetectionConfig),
    PersonTracking,
    VehicleTracking,
    Analytics(AnalyticsConfig),
    TimeSeriesAnalysis,
    Alert(AlertConfig),
    IncidentDetection,
}

fn expect_text(field: &str, value: FieldValue) -> Result<String, GraphError> {
    match value {
        FieldValue::Text(s) | FieldValue::Choice(s) => Ok(s),
        other => Err(mismatch(field, &other)),
    }
}

fn expect_camera(field: &str, value: FieldValue) -> Result<CameraId, GraphError> {
    match value {
        FieldValue::NumericChoice(n) => Ok(CameraId::Number(n)),
        other => expect_text(field, other).map(CameraId::Name),
    }
}

fn expect_number(field: &str, value: FieldValue) -> Result<f64, GraphError> {
    match value {
        FieldValue::Number(n) => Ok(n),
        other => Err(mismatch(field, &other)),
    }
}

fn expect_choices(field: &str, value: FieldValue) -> Result<Vec<String>, GraphError> {
    match value {
        FieldValue::Choices(list) => Ok(list),
        other => Err(mismatch(field, &other)),
    }
}

fn mismatch(field: &str, value: &FieldValue) -> GraphError {
    GraphError::InvalidValue {
        field: field.to_string(),
        reason: format!("unexpected value {:?}", value),
    }
}

type FieldList = Vec<(&'static str, FieldValue)>;

fn push_choice(out: &mut FieldList, name: &'static str, value: &Option<String>) {
    if let Some(s) = value {
        out.push((name, FieldValue::Choice(s.clone())));
    }
}

fn push_number(out: &mut FieldList, name: &'static str, value: Option<f64>) {
    if let Some(n) = value {
        out.push((name, FieldValue::Number(n)));
    }
}

fn push_choices(out: &mut FieldList, name: &'static str, value: &Option<Vec<String>>) {
    if let Some(list) = value {
        out.push((name, FieldValue::Choices(list.clone())));
    }
}

impl NodeConfig {
    pub fn default_for(node_type: NodeType) -> Self {
        match node_type {
            NodeType::CameraInput => NodeConfig::CameraInput(Default::default()),
            NodeType::ImageProcessing => NodeConfig::ImageProcessing(Default::default()),
            NodeType::ObjectDetection => NodeConfig::ObjectDetection(Default::default()),
            NodeType::PersonTracking => NodeConfig::PersonTracking,
            NodeType::VehicleTracking => NodeConfig::VehicleTracking,
            NodeType::Analytics => NodeConfig::Analytics(Default::default()),
            NodeType::TimeSeriesAnalysis => NodeConfig::TimeSeriesAnalysis,
            NodeType::Alert => NodeConfig::Alert(Default::default()),
            NodeType::IncidentDetection => NodeConfig::IncidentDetection,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeConfig::CameraInput(_) => NodeType::CameraInput,
            NodeConfig::ImageProcessing(_) => NodeType::ImageProcessing,
            NodeConfig::ObjectDetection(_) => NodeType::ObjectDetection,
            NodeConfig::PersonTracking => NodeType::PersonTracking,
            NodeConfig::VehicleTracking => NodeType::VehicleTracking,
            NodeConfig::Analytics(_) => NodeType::Analytics,
            NodeConfig::TimeSeriesAnalysis => NodeType::TimeSeriesAnalysis,
            NodeConfig::Alert(_) => NodeType::Alert,
            NodeConfig::IncidentDetection => NodeType::IncidentDetection,
        }
    }

    /// Store an already validated value. `field` must be declared for this type.
    pub fn set(&mut self, field: &str, value: FieldValue) -> Result<(), GraphError> {
        match self {
            NodeConfig::CameraInput(c) => match field {
                "cameraId" => c.camera_id = Some(expect_camera(field, value)?),
                "frameRate" => c.frame_rate = Some(expect_number(field, value)?),
                "resolution" => c.resolution = Some(expect_text(field, value)?),
                _ => return Err(self.undeclared(field)),
            },
            NodeConfig::ImageProcessing(c) => match field {
                "preprocessing" => c.preprocessing = Some(expect_text(field, value)?),
                "contrast" => c.contrast = Some(expect_number(field, value)?),
                "brightness" => c.brightness = Some(expect_number(field, value)?),
                _ => return Err(self.undeclared(field)),
            },
            NodeConfig::ObjectDetection(c) => match field {
                "model" => c.model = Some(expect_text(field, value)?),
                "confidence" => c.confidence = Some(expect_number(field, value)?),
                "classes" => c.classes = Some(expect_choices(field, value)?),
                _ => return Err(self.undeclared(field)),
            },
            NodeConfig::Analytics(c) => match field {
                "metricType" => c.metric_type = Some(expect_text(field, value)?),
                "interval" => c.interval = Some(expect_text(field, value)?),
                "aggregation" => c.aggregation = Some(expect_text(field, value)?),
                _ => return Err(self.undeclared(field)),
            },
            NodeConfig::Alert(c) => match field {
                "condition" => c.condition = Some(expect_text(field, value)?),
                "severity" => c.severity = Some(expect_text(field, value)?),
                "notification" => c.notification = Some(expect_choices(field, value)?),
                _ => return Err(self.undeclared(field)),
            },
            NodeConfig::PersonTracking
            | NodeConfig::VehicleTracking
            | NodeConfig::TimeSeriesAnalysis
            | NodeConfig::IncidentDetection => return Err(self.undeclared(field)),
        }
        Ok(())
    }

    /// Current value of a field, if it has been set.
    pub fn get(&self, field: &str) -> Option<FieldValue> {
        self.fields()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    /// Set fields in declaration order.
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut out = Vec::new();
        match self {
            NodeConfig::CameraInput(c) => {
                if let Some(id) = &c.camera_id {
                    let value = match id {
                        CameraId::Name(name) => FieldValue::Choice(name.clone()),
                        CameraId::Number(n) => FieldValue::NumericChoice(n.clone()),
                    };
                    out.push(("cameraId", value));
                }
                push_number(&mut out, "frameRate", c.frame_rate);
                push_choice(&mut out, "resolution", &c.resolution);
            }
            NodeConfig::ImageProcessing(c) => {
                push_choice(&mut out, "preprocessing", &c.preprocessing);
                push_number(&mut out, "contrast", c.contrast);
                push_number(&mut out, "brightness", c.brightness);
            }
            NodeConfig::ObjectDetection(c) => {
                push_choice(&mut out, "model", &c.model);
                push_number(&mut out, "confidence", c.confidence);
                push_choices(&mut out, "classes", &c.classes);
            }
            NodeConfig::Analytics(c) => {
                push_choice(&mut out, "metricType", &c.metric_type);
                push_choice(&mut out, "interval", &c.interval);
                push_choice(&mut out, "aggregation", &c.aggregation);
            }
            NodeConfig::Alert(c) => {
                push_choice(&mut out, "condition", &c.condition);
                push_choice(&mut out, "severity", &c.severity);
                push_choices(&mut out, "notification", &c.notification);
            }
            NodeConfig::PersonTracking
            | NodeConfig::VehicleTracking
            | NodeConfig::TimeSeriesAnalysis
            | NodeConfig::IncidentDetection => {}
        }
        out
    }

    fn undeclared(&self, field: &str) -> GraphError {
        GraphError::InvalidField {
            node_type: self.node_type().tag().to_string(),
            field: field.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub position: Position,
    pub config: NodeConfig,
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        self.config.node_type()
    }

    pub fn descriptor(&self) -> &'static NodeTypeDescriptor {
        self.node_type().descriptor()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub source_port: String,
    pub target: NodeId,
    pub target_port: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelfLoopPolicy {
    #[default]
    Forbid,
    Allow,
}

/// Apply a JSON patch of field values onto `config`/`label`, validating each
/// key against the node type. Works on copies; the caller commits.
fn apply_patch(
    descriptor: &NodeTypeDescriptor,
    config: &mut NodeConfig,
    label: &mut String,
    patch: &Map<String, Value>,
) -> Result<(), GraphError> {
    for (key, value) in patch {
        match key.as_str() {
            "label" => {
                *label = value
                    .as_str()
                    .ok_or_else(|| GraphError::InvalidValue {
                        field: "label".into(),
                        reason: format!("expected a string, got {}", value),
                    })?
                    .to_string();
            }
            "type" => {
                if value.as_str() != Some(descriptor.node_type.tag()) {
                    return Err(GraphError::InvalidValue {
                        field: "type".into(),
                        reason: format!("node type cannot change to {}", value),
                    });
                }
            }
            _ => {
                let field = descriptor.field(key).ok_or_else(|| GraphError::InvalidField {
                    node_type: descriptor.node_type.tag().to_string(),
                    field: key.clone(),
                })?;
                let parsed = field.kind.parse(field.name, value)?;
                config.set(field.name, parsed)?;
            }
        }
    }
    Ok(())
}

/// Largest loaded id suffix the sequence will continue from. Bigger
/// suffixes are still valid ids but are not adopted.
const MAX_ADOPTED_SEQUENCE: u64 = u64::MAX / 2;

/// Numeric suffix of a `{type}-{sequence}` id.
fn id_sequence(id: &str) -> Option<u64> {
    id.rsplit_once('-')
        .and_then(|(_, n)| n.parse().ok())
        .filter(|seq| *seq <= MAX_ADOPTED_SEQUENCE)
}

#[derive(Clone, Debug, Default)]
pub struct PipelineGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    next_sequence: u64,
    self_loops: SelfLoopPolicy,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_self_loop_policy(policy: SelfLoopPolicy) -> Self {
        Self {
            self_loops: policy,
            ..Self::default()
        }
    }

    pub fn self_loop_policy(&self) -> SelfLoopPolicy {
        self.self_loops
    }

    pub fn set_self_loop_policy(&mut self, policy: SelfLoopPolicy) {
        self.self_loops = policy;
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Edges with `node_id` at either end.
    pub fn edges_of<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source == node_id || e.target == node_id)
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, GraphError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))
    }

    fn next_node_id(&mut self, node_type: NodeType) -> NodeId {
        loop {
            // Wrapping only revisits numbers; the lookup below still skips taken ids.
            self.next_sequence = self.next_sequence.checked_add(1).unwrap_or(1);
            let id = format!("{}-{}", node_type.tag(), self.next_sequence);
            if self.node(&id).is_none() {
                return id;
            }
        }
    }

    /// Add a node of the type named by `tag` at `position`.
    pub fn add_node(&mut self, tag: &str, position: Position) -> Result<&Node, GraphError> {
        let descriptor = describe(tag)?;
        Ok(self.add_typed_node(descriptor.node_type, position, descriptor.label))
    }

    /// Add a node with a known type and label.
    pub fn add_typed_node(&mut self, node_type: NodeType, position: Position, label: &str) -> &Node {
        let id = self.next_node_id(node_type);
        log::debug!("[Graph] add node {} at ({}, {})", id, position.x, position.y);
        self.nodes.push(Node {
            id,
            label: label.to_string(),
            position,
            config: NodeConfig::default_for(node_type),
        });
        &self.nodes[self.nodes.len() - 1]
    }

    /// Merge `patch` into a node's configuration. Keys other than `label`
    /// (and a `type` equal to the node's own) must be declared by the node type.
    pub fn update_node_config(
        &mut self,
        node_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<(), GraphError> {
        let node = self.node_mut(node_id)?;
        let mut config = node.config.clone();
        let mut label = node.label.clone();
        apply_patch(node.descriptor(), &mut config, &mut label, patch)?;
        node.config = config;
        node.label = label;
        Ok(())
    }

    /// Set a single field from a typed value (properties panel path).
    pub fn set_node_field(
        &mut self,
        node_id: &str,
        field: &str,
        value: &Value,
    ) -> Result<(), GraphError> {
        let mut patch = Map::new();
        patch.insert(field.to_string(), value.clone());
        self.update_node_config(node_id, &patch)
    }

    pub fn move_node(&mut self, node_id: &str, position: Position) -> Result<(), GraphError> {
        self.node_mut(node_id)?.position = position;
        Ok(())
    }

    /// Remove a node together with every edge that references it.
    pub fn remove_node(&mut self, node_id: &str) -> Result<Node, GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| GraphError::NotFound(node_id.to_string()))?;
        let node = self.nodes.remove(index);
        self.edges.retain(|e| e.source != node_id && e.target != node_id);
        log::debug!("[Graph] removed node {}", node_id);
        Ok(node)
    }

    /// Connect `source`'s output port to `target`'s input port. Connecting the
    /// same ports twice returns the existing edge.
    pub fn connect(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Result<&Edge, GraphError> {
        let source_node = self
            .node(source)
            .ok_or_else(|| GraphError::NotFound(source.to_string()))?;
        let target_node = self
            .node(target)
            .ok_or_else(|| GraphError::NotFound(target.to_string()))?;
        if source == target && self.self_loops == SelfLoopPolicy::Forbid {
            return Err(GraphError::SelfLoop(source.to_string()));
        }
        if !source_node.descriptor().has_output(source_port) {
            return Err(GraphError::UnknownPort {
                node_id: source.to_string(),
                port: source_port.to_string(),
            });
        }
        if !target_node.descriptor().has_input(target_port) {
            return Err(GraphError::UnknownPort {
                node_id: target.to_string(),
                port: target_port.to_string(),
            });
        }

        let existing = self.edges.iter().position(|e| {
            e.source == source
                && e.source_port == source_port
                && e.target == target
                && e.target_port == target_port
        });
        let index = match existing {
            Some(index) => index,
            None => {
                self.edges.push(Edge {
                    id: format!("edge-{}", Uuid::new_v4()),
                    source: source.to_string(),
                    source_port: source_port.to_string(),
                    target: target.to_string(),
                    target_port: target_port.to_string(),
                });
                self.edges.len() - 1
            }
        };
        Ok(&self.edges[index])
    }

    pub fn disconnect(&mut self, edge_id: &str) -> Result<Edge, GraphError> {
        let index = self
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| GraphError::NotFound(edge_id.to_string()))?;
        Ok(self.edges.remove(index))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Persistence-ready document stamped with the current time.
    pub fn serialize(&self, name: &str) -> GraphDocument {
        self.serialize_at(name, Utc::now())
    }

    pub fn serialize_at(&self, name: &str, created_at: DateTime<Utc>) -> GraphDocument {
        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                let tag = node.node_type().tag();
                let mut data = Map::new();
                data.insert("label".into(), Value::String(node.label.clone()));
                data.insert("type".into(), Value::String(tag.to_string()));
                for (field, value) in node.config.fields() {
                    data.insert(field.to_string(), value.to_json());
                }
                NodeDocument {
                    id: node.id.clone(),
                    node_type: tag.to_string(),
                    position: node.position,
                    data,
                }
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|edge| EdgeDocument {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                source_handle: Some(edge.source_port.clone()),
                target_handle: Some(edge.target_port.clone()),
            })
            .collect();

        GraphDocument {
            name: name.to_string(),
            created_at,
            nodes,
            edges,
        }
    }

    /// Replace the current graph with `doc`. On any validation failure the
    /// current graph is left as it was.
    pub fn load(&mut self, doc: &GraphDocument) -> Result<(), GraphError> {
        let mut nodes: Vec<Node> = Vec::with_capacity(doc.nodes.len());
        let mut seen = HashSet::new();
        let mut max_sequence = self.next_sequence;

        for entry in &doc.nodes {
            if !seen.insert(entry.id.as_str()) {
                return Err(GraphError::Validation(format!("duplicate node id '{}'", entry.id)));
            }
            let node = Self::node_from_document(entry)?;
            if let Some(seq) = id_sequence(&node.id) {
                max_sequence = max_sequence.max(seq);
            }
            nodes.push(node);
        }

        let find = |id: &str| nodes.iter().find(|n| n.id == id);
        let mut edges: Vec<Edge> = Vec::with_capacity(doc.edges.len());
        let mut edge_ids = HashSet::new();
        for entry in &doc.edges {
            if !edge_ids.insert(entry.id.as_str()) {
                return Err(GraphError::Validation(format!("duplicate edge id '{}'", entry.id)));
            }
            let source = find(&entry.source).ok_or_else(|| {
                GraphError::Validation(format!(
                    "edge '{}' references missing node '{}'",
                    entry.id, entry.source
                ))
            })?;
            let target = find(&entry.target).ok_or_else(|| {
                GraphError::Validation(format!(
                    "edge '{}' references missing node '{}'",
                    entry.id, entry.target
                ))
            })?;
            if source.id == target.id && self.self_loops == SelfLoopPolicy::Forbid {
                return Err(GraphError::Validation(format!(
                    "edge '{}' connects node '{}' to itself",
                    entry.id, source.id
                )));
            }
            let source_port = entry.source_handle.clone().unwrap_or_else(|| "out".into());
            let target_port = entry.target_handle.clone().unwrap_or_else(|| "in".into());
            if !source.descriptor().has_output(&source_port)
                || !target.descriptor().has_input(&target_port)
            {
                return Err(GraphError::Validation(format!(
                    "edge '{}' uses undeclared ports {} -> {}",
                    entry.id, source_port, target_port
                )));
            }
            edges.push(Edge {
                id: entry.id.clone(),
                source: source.id.clone(),
                source_port,
                target: target.id.clone(),
                target_port,
            });
        }

        log::info!(
            "[Graph] loaded '{}' ({} nodes, {} edges)",
            doc.name,
            nodes.len(),
            edges.len()
        );
        self.nodes = nodes;
        self.edges = edges;
        self.next_sequence = max_sequence;
        Ok(())
    }

    fn node_from_document(entry: &NodeDocument) -> Result<Node, GraphError> {
        let data_type = entry.data.get("type").and_then(Value::as_str);
        let tag = if entry.node_type == GENERIC_NODE_TYPE {
            data_type.unwrap_or_default()
        } else {
            entry.node_type.as_str()
        };
        let descriptor = describe(tag).map_err(|_| {
            GraphError::Validation(format!("node '{}' has unknown type '{}'", entry.id, tag))
        })?;
        if let Some(declared) = data_type {
            if declared != tag {
                return Err(GraphError::Validation(format!(
                    "node '{}' declares type '{}' but data says '{}'",
                    entry.id, tag, declared
                )));
            }
        }

        let mut config = NodeConfig::default_for(descriptor.node_type);
        let mut label = descriptor.label.to_string();
        apply_patch(descriptor, &mut config, &mut label, &entry.data)
            .map_err(|e| GraphError::Validation(format!("node '{}': {}", entry.id, e)))?;

        Ok(Node {
            id: entry.id.clone(),
            label,
            position: entry.position,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn camera_and_detector() -> (PipelineGraph, NodeId, NodeId) {
        let mut graph = PipelineGraph::new();
        let camera = graph.add_node("cameraInput", Position::new(0.0, 0.0)).unwrap().id.clone();
        let detect = graph
            .add_node("objectDetection", Position::new(200.0, 0.0))
            .unwrap()
            .id
            .clone();
        (graph, camera, detect)
    }

    #[test]
    fn add_node_assigns_type_sequence_ids() {
        let (graph, camera, detect) = camera_and_detector();
        assert_eq!(camera, "cameraInput-1");
        assert_eq!(detect, "objectDetection-2");
        assert_eq!(graph.node(&camera).unwrap().label, "Camera Input");
    }

    #[test]
    fn add_node_rejects_unknown_type() {
        let mut graph = PipelineGraph::new();
        assert_eq!(
            graph.add_node("lidar", Position::default()).map(|n| n.id.clone()),
            Err(GraphError::InvalidType("lidar".into()))
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn ids_are_not_reused_after_remove() {
        let mut graph = PipelineGraph::new();
        let first = graph.add_node("alert", Position::default()).unwrap().id.clone();
        graph.remove_node(&first).unwrap();
        let second = graph.add_node("alert", Position::default()).unwrap().id.clone();
        assert_ne!(first, second);
    }

    #[test]
    fn update_config_merges_fields() {
        let (mut graph, _, detect) = camera_and_detector();
        graph
            .update_node_config(&detect, &patch(json!({ "model": "ssd" })))
            .unwrap();
        graph
            .update_node_config(&detect, &patch(json!({ "confidence": 0.8, "classes": ["car"] })))
            .unwrap();

        let node = graph.node(&detect).unwrap();
        assert_eq!(
            node.config,
            NodeConfig::ObjectDetection(ObjectDetectionConfig {
                model: Some("ssd".into()),
                confidence: Some(0.8),
                classes: Some(vec!["car".into()]),
            })
        );
    }

    #[test]
    fn update_config_is_all_or_nothing() {
        let (mut graph, camera, _) = camera_and_detector();
        let before = graph.node(&camera).unwrap().clone();
        let err = graph
            .update_node_config(&camera, &patch(json!({ "frameRate": 30, "zoom": 2 })))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::InvalidField {
                node_type: "cameraInput".into(),
                field: "zoom".into()
            }
        );
        assert_eq!(graph.node(&camera), Some(&before));
    }

    #[test]
    fn update_config_on_missing_node() {
        let mut graph = PipelineGraph::new();
        assert_eq!(
            graph.update_node_config("nope", &Map::new()),
            Err(GraphError::NotFound("nope".into()))
        );
    }

    #[test]
    fn label_is_always_editable() {
        let mut graph = PipelineGraph::new();
        let id = graph.add_node("personTracking", Position::default()).unwrap().id.clone();
        graph
            .update_node_config(&id, &patch(json!({ "label": "Lobby people", "type": "personTracking" })))
            .unwrap();
        assert_eq!(graph.node(&id).unwrap().label, "Lobby people");
        assert!(graph
            .update_node_config(&id, &patch(json!({ "type": "alert" })))
            .is_err());
    }

    #[test]
    fn remove_node_cascades_edges() {
        let (mut graph, camera, detect) = camera_and_detector();
        let alert = graph.add_node("alert", Position::default()).unwrap().id.clone();
        graph.connect(&camera, "out", &detect, "in").unwrap();
        graph.connect(&detect, "out", &alert, "in").unwrap();

        graph.remove_node(&detect).unwrap();
        assert_eq!(graph.nodes().len(), 2);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn connect_validates_endpoints() {
        let (mut graph, camera, detect) = camera_and_detector();
        assert_eq!(
            graph.connect("ghost", "out", &detect, "in").map(|e| e.id.clone()),
            Err(GraphError::NotFound("ghost".into()))
        );
        assert_eq!(
            graph.connect(&detect, "out", &detect, "in").map(|e| e.id.clone()),
            Err(GraphError::SelfLoop(detect.clone()))
        );
        assert!(matches!(
            graph.connect(&detect, "out", &camera, "in"),
            Err(GraphError::UnknownPort { .. })
        ));
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn self_loops_allowed_by_policy() {
        let mut graph = PipelineGraph::with_self_loop_policy(SelfLoopPolicy::Allow);
        let id = graph.add_node("analytics", Position::default()).unwrap().id.clone();
        assert!(graph.connect(&id, "out", &id, "in").is_ok());
    }

    #[test]
    fn duplicate_connection_returns_existing_edge() {
        let (mut graph, camera, detect) = camera_and_detector();
        let first = graph.connect(&camera, "out", &detect, "in").unwrap().id.clone();
        let second = graph.connect(&camera, "out", &detect, "in").unwrap().id.clone();
        assert_eq!(first, second);
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn disconnect_unknown_edge() {
        let (mut graph, camera, detect) = camera_and_detector();
        let edge = graph.connect(&camera, "out", &detect, "in").unwrap().id.clone();
        graph.disconnect(&edge).unwrap();
        assert_eq!(graph.disconnect(&edge), Err(GraphError::NotFound(edge)));
    }

    #[test]
    fn serialize_then_load_round_trips() {
        let (mut graph, camera, detect) = camera_and_detector();
        graph
            .update_node_config(&camera, &patch(json!({ "frameRate": 24, "resolution": "1280x720" })))
            .unwrap();
        graph.connect(&camera, "out", &detect, "in").unwrap();
        graph.move_node(&detect, Position::new(310.5, -12.0)).unwrap();

        let doc = graph.serialize("gate");
        let mut restored = PipelineGraph::new();
        restored.load(&doc).unwrap();
        assert_eq!(restored.nodes(), graph.nodes());
        assert_eq!(restored.edges(), graph.edges());

        // Loading the same document twice gives the same graph
        restored.load(&doc).unwrap();
        assert_eq!(restored.nodes(), graph.nodes());
    }

    #[test]
    fn load_rejects_dangling_edge_and_keeps_graph() {
        let (mut graph, camera, detect) = camera_and_detector();
        let mut doc = graph.serialize("broken");
        doc.edges.push(EdgeDocument {
            id: "edge-x".into(),
            source: camera.clone(),
            target: "missing".into(),
            source_handle: None,
            target_handle: None,
        });

        let before = graph.nodes().to_vec();
        assert!(matches!(graph.load(&doc), Err(GraphError::Validation(_))));
        assert_eq!(graph.nodes(), &before[..]);
        assert!(graph.node(&detect).is_some());
    }

    #[test]
    fn load_rejects_unknown_config_field() {
        let mut graph = PipelineGraph::new();
        let doc: GraphDocument = serde_json::from_value(json!({
            "name": "bad",
            "createdAt": "2024-01-01T00:00:00Z",
            "nodes": [{
                "id": "alert-1", "type": "alert", "position": { "x": 0, "y": 0 },
                "data": { "label": "Alert", "type": "alert", "volume": 11 }
            }],
            "edges": []
        }))
        .unwrap();
        assert!(matches!(graph.load(&doc), Err(GraphError::Validation(_))));
    }

    #[test]
    fn load_reads_type_from_data_for_generic_nodes() {
        let mut graph = PipelineGraph::new();
        let doc: GraphDocument = serde_json::from_value(json!({
            "name": "canvas",
            "createdAt": "2024-01-01T00:00:00Z",
            "nodes": [
                { "id": "cameraInput-4", "type": "customNode", "position": { "x": 1, "y": 2 },
                  "data": { "label": "Gate cam", "type": "cameraInput" } },
                { "id": "alert-9", "type": "customNode", "position": { "x": 3, "y": 4 },
                  "data": { "label": "Alert", "type": "alert", "severity": "high" } }
            ],
            "edges": [{ "id": "e1", "source": "cameraInput-4", "target": "alert-9" }]
        }))
        .unwrap();

        graph.load(&doc).unwrap();
        assert_eq!(graph.node("cameraInput-4").unwrap().label, "Gate cam");
        assert_eq!(graph.edges()[0].source_port, "out");

        // New ids continue past the highest loaded sequence
        let next = graph.add_node("alert", Position::default()).unwrap().id.clone();
        assert_eq!(next, "alert-10");
    }

    #[test]
    fn oversized_loaded_suffix_does_not_exhaust_ids() {
        let mut graph = PipelineGraph::new();
        let doc: GraphDocument = serde_json::from_value(json!({
            "name": "imported",
            "createdAt": "2024-01-01T00:00:00Z",
            "nodes": [{ "id": "alert-18446744073709551615", "type": "alert",
                        "position": { "x": 0, "y": 0 }, "data": { "label": "Alert" } }],
            "edges": []
        }))
        .unwrap();
        graph.load(&doc).unwrap();

        let next = graph.add_node("alert", Position::default()).unwrap().id.clone();
        assert_eq!(next, "alert-1");
        assert_eq!(graph.nodes().len(), 2);
    }

    #[test]
    fn sequence_wraps_without_colliding() {
        let mut graph = PipelineGraph::new();
        let first = graph.add_node("alert", Position::default()).unwrap().id.clone();
        assert_eq!(first, "alert-1");
        graph.next_sequence = u64::MAX;
        let next = graph.add_node("alert", Position::default()).unwrap().id.clone();
        assert_eq!(next, "alert-2");
    }

    #[test]
    fn numeric_camera_id_keeps_its_json_type() {
        let (mut graph, camera, _) = camera_and_detector();
        graph.set_node_field(&camera, "cameraId", &json!(7)).unwrap();
        let doc = graph.serialize("cams");
        assert_eq!(doc.nodes[0].data["cameraId"], json!(7));

        let mut restored = PipelineGraph::new();
        restored.load(&doc).unwrap();
        let again = restored.serialize_at("cams", doc.created_at);
        assert_eq!(again.nodes[0].data["cameraId"], json!(7));

        graph.set_node_field(&camera, "cameraId", &json!("lobby")).unwrap();
        assert_eq!(graph.serialize("cams").nodes[0].data["cameraId"], json!("lobby"));
    }
}
