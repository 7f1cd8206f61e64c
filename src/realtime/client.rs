//! Connection state machine for the real-time feed.
//!
//! ```text
//! Disconnected --connect()--> Connecting --Opened--> Connected
//!      ^                         |                      |
//!      |                      Closed                 Closed
//!  disconnect()                  v                      v
//!                     WaitingRetry{attempt} --delay--> Connecting
//!                                |
//!                   attempt == max_attempts
//!                                v
//!                            Exhausted --connect()--> Connecting
//! ```
//!
//! The client is driven by [`RealtimeClient::tick`] from the UI loop. The
//! subscriber set lives in a [`SubscriptionHub`] that is independent of the
//! connection, so handlers survive any number of reconnects.

use super::envelope::Envelope;
use super::hub::{Subscription, SubscriptionHub};
use super::transport::{Transport, TransportEvent};
use crate::clock::Clock;
use serde_json::Value;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(3),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// `attempt` is 0 for a manual connect, otherwise the retry number.
    Connecting { attempt: u32 },
    Connected,
    WaitingRetry { attempt: u32, retry_at: Instant },
    /// Retry budget spent; only a manual `connect()` tries again.
    Exhausted,
}

pub struct RealtimeClient<T: Transport, C: Clock> {
    url: String,
    transport: T,
    clock: C,
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
    last_error: Option<String>,
    hub: SubscriptionHub,
}

impl<T: Transport, C: Clock> RealtimeClient<T, C> {
    pub fn new(url: impl Into<String>, transport: T, clock: C, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            transport,
            clock,
            policy,
            state: ConnectionState::Disconnected,
            attempts: 0,
            last_error: None,
            hub: SubscriptionHub::new(),
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Reconnect attempts made since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn hub(&self) -> &SubscriptionHub {
        &self.hub
    }

    pub fn subscribe<F>(&self, event_type: &str, handler: F) -> Subscription
    where
        F: FnMut(&Value) + 'static,
    {
        self.hub.subscribe(event_type, handler)
    }

    /// Manual connect. Resets the retry budget.
    pub fn connect(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Connecting { .. }
        ) {
            return;
        }
        self.attempts = 0;
        self.start_attempt(0);
    }

    /// Manual disconnect; no automatic reconnect follows.
    pub fn disconnect(&mut self) {
        self.transport.close();
        self.state = ConnectionState::Disconnected;
        log::info!("[Realtime] disconnected");
    }

    /// Send a client message. Dropped with an error log when not connected.
    pub fn send(&mut self, event_type: &str, payload: Value) {
        if !self.is_connected() {
            log::error!("[Realtime] WebSocket is not connected, dropping '{}'", event_type);
            return;
        }
        let text = match Envelope::new(event_type, payload).encode() {
            Ok(text) => text,
            Err(e) => {
                log::error!("[Realtime] could not encode '{}': {}", event_type, e);
                return;
            }
        };
        if let Err(e) = self.transport.send_text(text) {
            log::error!("[Realtime] send '{}' failed: {}", event_type, e);
        }
    }

    /// Fire a due retry and drain transport events in arrival order.
    /// Returns the number of handler invocations.
    pub fn tick(&mut self) -> usize {
        if let ConnectionState::WaitingRetry { attempt, retry_at } = self.state {
            if self.clock.now() >= retry_at {
                log::info!(
                    "[Realtime] Attempting to reconnect... ({}/{})",
                    attempt,
                    self.policy.max_attempts
                );
                self.start_attempt(attempt);
            }
        }

        let mut delivered = 0;
        while let Some(event) = self.transport.poll_event() {
            match event {
                TransportEvent::Opened => {
                    if matches!(self.state, ConnectionState::Connecting { .. }) {
                        log::info!("[Realtime] WebSocket Connected");
                        self.state = ConnectionState::Connected;
                        self.attempts = 0;
                        self.last_error = None;
                    }
                }
                TransportEvent::Message(text) => {
                    if self.is_connected() {
                        delivered += self.deliver(&text);
                    }
                }
                TransportEvent::Closed(reason) => self.connection_lost(reason),
            }
        }
        delivered
    }

    fn deliver(&self, text: &str) -> usize {
        match Envelope::decode(text) {
            Ok(envelope) => self.hub.dispatch(&envelope),
            Err(e) => {
                log::warn!("[Realtime] dropping malformed frame: {}", e);
                0
            }
        }
    }

    fn start_attempt(&mut self, attempt: u32) {
        self.state = ConnectionState::Connecting { attempt };
        if let Err(e) = self.transport.open(&self.url) {
            self.connection_lost(e.to_string());
        }
    }

    fn connection_lost(&mut self, reason: String) {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Exhausted => return,
            ConnectionState::WaitingRetry { .. } => return,
            ConnectionState::Connecting { .. } | ConnectionState::Connected => {}
        }
        log::warn!("[Realtime] WebSocket Disconnected: {}", reason);
        self.last_error = Some(reason);

        if self.attempts < self.policy.max_attempts {
            self.attempts += 1;
            self.state = ConnectionState::WaitingRetry {
                attempt: self.attempts,
                retry_at: self.clock.now() + self.policy.delay,
            };
        } else {
            log::error!(
                "[Realtime] giving up after {} reconnect attempts; reconnect manually",
                self.policy.max_attempts
            );
            self.state = ConnectionState::Exhausted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::realtime::transport::ScriptedTransport;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn client() -> (RealtimeClient<ScriptedTransport, ManualClock>, ScriptedTransport, ManualClock) {
        let transport = ScriptedTransport::new();
        let clock = ManualClock::new();
        let client = RealtimeClient::new(
            "ws://test/ws",
            transport.clone(),
            clock.clone(),
            ReconnectPolicy::default(),
        );
        (client, transport, clock)
    }

    #[test]
    fn connects_and_delivers() {
        let (mut client, transport, _) = client();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = client.subscribe("occupancy_update", move |p| sink.borrow_mut().push(p.clone()));

        client.connect();
        client.tick();
        assert!(client.is_connected());

        transport.push_message(r#"{"type":"occupancy_update","payload":{"current_occupancy":5}}"#);
        assert_eq!(client.tick(), 1);
        assert_eq!(*seen.borrow(), vec![json!({ "current_occupancy": 5 })]);
    }

    #[test]
    fn send_requires_connection() {
        let (mut client, transport, _) = client();
        client.send("get_traffic_data", json!({}));
        assert!(transport.sent().is_empty());

        client.connect();
        client.tick();
        client.send("get_traffic_data", json!({}));
        assert_eq!(transport.sent(), vec![r#"{"type":"get_traffic_data","payload":{}}"#]);
    }

    #[test]
    fn malformed_frames_are_dropped() {
        let (mut client, transport, _) = client();
        let _sub = client.subscribe("traffic_update", |_| {});
        client.connect();
        client.tick();
        transport.push_message("not json");
        transport.push_message(r#"{"type":"traffic_update","payload":1}"#);
        assert_eq!(client.tick(), 1);
    }

    #[test]
    fn retries_after_delay_and_resets_on_success() {
        let (mut client, transport, clock) = client();
        client.connect();
        client.tick();
        transport.drop_connection();
        client.tick();
        assert!(matches!(client.state(), ConnectionState::WaitingRetry { attempt: 1, .. }));

        clock.advance(Duration::from_millis(2999));
        client.tick();
        assert_eq!(transport.open_count(), 1);

        clock.advance(Duration::from_millis(1));
        client.tick();
        assert_eq!(transport.open_count(), 2);
        assert!(client.is_connected());
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[test]
    fn stops_after_budget_and_keeps_subscribers() {
        let (mut client, transport, clock) = client();
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        let _sub = client.subscribe("traffic_update", move |_| *counter.borrow_mut() += 1);

        transport.refuse_next_opens(usize::MAX);
        client.connect();
        client.tick();
        for _ in 0..5 {
            clock.advance(Duration::from_secs(3));
            client.tick();
        }
        assert_eq!(transport.open_count(), 6);
        assert_eq!(client.state(), &ConnectionState::Exhausted);

        clock.advance(Duration::from_secs(60));
        client.tick();
        assert_eq!(transport.open_count(), 6);

        transport.refuse_next_opens(0);
        client.connect();
        client.tick();
        transport.push_message(r#"{"type":"traffic_update","payload":{}}"#);
        client.tick();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn manual_disconnect_does_not_retry() {
        let (mut client, transport, clock) = client();
        client.connect();
        client.tick();
        client.disconnect();
        clock.advance(Duration::from_secs(10));
        client.tick();
        assert_eq!(client.state(), &ConnectionState::Disconnected);
        assert_eq!(transport.open_count(), 1);
    }
}
