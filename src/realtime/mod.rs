//! # Real-time Widget Feed
//!
//! Publish/subscribe layer over a WebSocket. Widgets subscribe to an event
//! type and receive each matching payload as it arrives.
//!
//! ## Submodules
//! - [`envelope`]: `{ "type", "payload" }` message frame and known event types
//! - [`hub`]: handler registry and in-order fan-out
//! - [`transport`]: transport trait plus a scripted in-memory transport
//! - [`ws`]: tungstenite transport running on a background thread
//! - [`client`]: connection state machine with the reconnect budget

pub mod client;
pub mod envelope;
pub mod hub;
pub mod transport;
pub mod ws;

pub use client::{ConnectionState, RealtimeClient, ReconnectPolicy};
pub use envelope::{Envelope, event_types};
pub use hub::{Subscription, SubscriptionHub};
pub use transport::{ScriptedTransport, Transport, TransportEvent};
pub use ws::WsTransport;
