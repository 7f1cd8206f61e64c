//! # Vision Dashboard
//!
//! Composition model for a video-analytics dashboard: per-module widget
//! activation, a node-graph widget builder with drag-and-drop placement,
//! persistence of built pipelines, and a real-time data feed with a bounded
//! reconnect budget.
//!
//! ## Modules
//! - [`node_types`]: registry of builder node types and their fields
//! - [`graph`]: node/edge store for one pipeline
//! - [`document`]: JSON wire format of a saved pipeline
//! - [`modules`] / [`activation`]: dashboard widget catalog and active set
//! - [`dashboard`]: active widgets bound to their feeds, timers and subscriptions
//! - [`dnd`]: palette-to-canvas drop protocol
//! - [`persistence`]: backend API, background worker, local drafts
//! - [`realtime`]: WebSocket pub/sub with reconnects
//! - [`refresh`] / [`feeds`]: widget polling timers and last-known data

pub mod activation;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod dnd;
pub mod document;
pub mod editor;
pub mod error;
pub mod feeds;
pub mod graph;
pub mod history;
pub mod modules;
pub mod node_types;
pub mod persistence;
pub mod realtime;
pub mod refresh;

pub use error::{ActivationError, GraphError, PersistenceError, TransportError};
