//! # Persistence
//!
//! Saving and loading widget pipelines.
//!
//! ## Key Types
//! - [`WidgetApi`]: backend seam (`save`, `list`, `load`)
//! - [`HttpWidgetApi`]: the REST backend, `POST/GET {base}/api/widgets`
//! - [`MemoryWidgetApi`]: in-process store, last write wins
//! - [`ApiWorker`]: runs requests off the UI thread
//! - [`DraftCache`]: local autosave of unsaved edits

pub mod drafts;
pub mod http;
pub mod memory;
pub mod worker;

pub use drafts::DraftCache;
pub use http::HttpWidgetApi;
pub use memory::MemoryWidgetApi;
pub use worker::{ApiRequest, ApiResponse, ApiResult, ApiWorker};

use crate::document::GraphDocument;
use crate::error::PersistenceError;
use crate::graph::PipelineGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry of the saved-widget listing. Extra fields in the backend's
/// response (nodes, edges) are ignored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSummary {
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

pub trait WidgetApi: Send + Sync {
    /// Store `doc` under `doc.name`, replacing any previous version.
    fn save(&self, doc: &GraphDocument) -> Result<(), PersistenceError>;
    fn list(&self) -> Result<Vec<WidgetSummary>, PersistenceError>;
    fn load(&self, name: &str) -> Result<GraphDocument, PersistenceError>;
}

/// Trimmed widget name, or `EmptyName`.
pub fn validate_name(name: &str) -> Result<&str, PersistenceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(PersistenceError::EmptyName)
    } else {
        Ok(trimmed)
    }
}

/// Snapshot `graph` as a document ready to send, stamped with the
/// current time.
pub fn document_for_save(graph: &PipelineGraph, name: &str) -> Result<GraphDocument, PersistenceError> {
    let name = validate_name(name)?;
    Ok(graph.serialize(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Position;

    #[test]
    fn blank_names_are_rejected() {
        let graph = PipelineGraph::new();
        assert!(matches!(
            document_for_save(&graph, "   "),
            Err(PersistenceError::EmptyName)
        ));
    }

    #[test]
    fn document_uses_trimmed_name() {
        let mut graph = PipelineGraph::new();
        graph.add_node("cameraInput", Position::new(0.0, 0.0)).unwrap();
        let doc = document_for_save(&graph, "  gate-counter ").unwrap();
        assert_eq!(doc.name, "gate-counter");
        assert_eq!(doc.nodes.len(), 1);
    }

    #[test]
    fn summary_ignores_document_body() {
        let json = r#"[{"name":"a","createdAt":"2026-01-01T00:00:00Z","nodes":[],"edges":[]},{"name":"b"}]"#;
        let list: Vec<WidgetSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].created_at.is_some());
        assert!(list[1].created_at.is_none());
    }
}
