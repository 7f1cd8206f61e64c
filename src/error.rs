//! Error types shared by the dashboard library.
//!
//! Each subsystem has its own enum so callers can match on the failures
//! they can actually recover from. All mutations that return one of these
//! leave the underlying state untouched.

use thiserror::Error;

/// Failures raised by the pipeline graph store and node type registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("node or edge not found: {0}")]
    NotFound(String),

    #[error("unknown node type: {0}")]
    InvalidType(String),

    #[error("field '{field}' is not declared for node type '{node_type}'")]
    InvalidField { node_type: String, field: String },

    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("port '{port}' does not exist on node '{node_id}'")]
    UnknownPort { node_id: String, port: String },

    #[error("node '{0}' cannot be connected to itself")]
    SelfLoop(String),

    #[error("invalid graph document: {0}")]
    Validation(String),
}

/// Failures raised by the widget activation state machine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActivationError {
    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("no module is selected")]
    NoModuleSelected,

    #[error("widget not found: {0}")]
    NotFound(String),

    #[error("widget '{0}' is permanent and cannot be removed")]
    PermanentWidget(String),

    #[error("new order is not a permutation of the active widgets")]
    SetMismatch,
}

/// Network and WebSocket failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection closed: {0}")]
    Closed(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("server rejected request with status {status}: {message}")]
    Status { status: u16, message: String },
}

/// Failures raised while saving or loading widget configurations.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("widget name must not be empty")]
    EmptyName,

    #[error("widget configuration not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Request(err.to_string())
    }
}

impl From<reqwest::Error> for PersistenceError {
    fn from(err: reqwest::Error) -> Self {
        PersistenceError::Transport(err.into())
    }
}
