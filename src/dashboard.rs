//! Dashboard session: the active widget set together with the data feeds,
//! refresh timers and real-time subscriptions that back it.
//!
//! Every widget that leaves the active set (deactivated, or its module
//! deselected) has its timer cancelled, its subscription dropped and its
//! feed closed in the same call, so late data for it is never shown.

use crate::activation::WidgetActivation;
use crate::clock::Clock;
use crate::error::ActivationError;
use crate::feeds::{Feed, FeedBoard};
use crate::modules::{ModuleId, WidgetDescriptor};
use crate::realtime::{RealtimeClient, Subscription, Transport};
use crate::refresh::RefreshScheduler;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// Payload received by a widget subscription, tagged with the feed
/// generation it was subscribed under.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub widget_id: &'static str,
    pub generation: u64,
    pub payload: Value,
}

pub struct DashboardSession<C: Clock> {
    activation: WidgetActivation,
    feeds: FeedBoard,
    refresh: RefreshScheduler<C>,
    refresh_interval: Duration,
    subscriptions: HashMap<&'static str, Subscription>,
    inbox: Rc<RefCell<Vec<Delivery>>>,
}

impl<C: Clock> DashboardSession<C> {
    pub fn new(clock: C, refresh_interval: Duration) -> Self {
        Self {
            activation: WidgetActivation::new(),
            feeds: FeedBoard::new(),
            refresh: RefreshScheduler::new(clock),
            refresh_interval,
            subscriptions: HashMap::new(),
            inbox: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn module(&self) -> Option<ModuleId> {
        self.activation.module()
    }

    pub fn active(&self) -> &[&'static WidgetDescriptor] {
        self.activation.active()
    }

    pub fn available(&self) -> &[&'static WidgetDescriptor] {
        self.activation.available()
    }

    pub fn feed(&self, widget_id: &str) -> Option<&Feed> {
        self.feeds.feed(widget_id)
    }

    pub fn is_polling(&self, widget_id: &str) -> bool {
        self.refresh.is_scheduled(widget_id)
    }

    pub fn is_subscribed(&self, widget_id: &str) -> bool {
        self.subscriptions.contains_key(widget_id)
    }

    /// Applies to timers scheduled from now on.
    pub fn set_refresh_interval(&mut self, interval: Duration) {
        self.refresh_interval = interval;
    }

    /// Switch to `module_id`. The previous module's widgets are torn down
    /// first; an unknown id leaves everything as it was.
    pub fn select_module<T: Transport, K: Clock>(
        &mut self,
        module_id: &str,
        client: &mut RealtimeClient<T, K>,
    ) -> Result<ModuleId, ActivationError> {
        let module: ModuleId = module_id.parse()?;
        self.leave_module();
        let module = self.activation.select_module(module.as_str())?;
        log::info!("[Dashboard] entered '{}'", module);
        let active: Vec<&'static WidgetDescriptor> = self.activation.active().to_vec();
        for widget in active {
            self.start_feed(widget, client);
        }
        Ok(module)
    }

    /// Leave the current module, releasing every widget's resources.
    pub fn leave_module(&mut self) {
        for id in self.activation.deselect_module() {
            self.stop_feed(id);
        }
        self.refresh.cancel_all();
        self.feeds.close_all();
        for (_, sub) in self.subscriptions.drain() {
            sub.unsubscribe();
        }
    }

    pub fn activate<T: Transport, K: Clock>(
        &mut self,
        widget_id: &str,
        client: &mut RealtimeClient<T, K>,
    ) -> Result<&'static WidgetDescriptor, ActivationError> {
        let widget = self.activation.activate(widget_id)?;
        self.start_feed(widget, client);
        Ok(widget)
    }

    pub fn deactivate(&mut self, widget_id: &str) -> Result<&'static WidgetDescriptor, ActivationError> {
        let widget = self.activation.deactivate(widget_id)?;
        self.stop_feed(widget.id);
        Ok(widget)
    }

    pub fn nudge(&mut self, widget_id: &str, up: bool) -> Result<(), ActivationError> {
        self.activation.nudge(widget_id, up)
    }

    fn start_feed<T: Transport, K: Clock>(
        &mut self,
        widget: &'static WidgetDescriptor,
        client: &mut RealtimeClient<T, K>,
    ) {
        let generation = self.feeds.open(widget.id);
        if let Some(event) = widget.feed.event {
            let inbox = Rc::clone(&self.inbox);
            let widget_id = widget.id;
            let sub = client.subscribe(event, move |payload| {
                inbox.borrow_mut().push(Delivery {
                    widget_id,
                    generation,
                    payload: payload.clone(),
                });
            });
            if let Some(old) = self.subscriptions.insert(widget.id, sub) {
                old.unsubscribe();
            }
        }
        if let Some(request) = widget.feed.request {
            // Requested again on (re)connect when offline now.
            if client.is_connected() {
                client.send(request, json!({}));
            }
            self.refresh.schedule(widget.id, self.refresh_interval);
        }
    }

    fn stop_feed(&mut self, widget_id: &str) {
        self.feeds.close(widget_id);
        self.refresh.cancel(widget_id);
        if let Some(sub) = self.subscriptions.remove(widget_id) {
            sub.unsubscribe();
        }
    }

    /// Store a payload for `widget_id` if `generation` is still current.
    pub fn deliver(&mut self, widget_id: &str, generation: u64, payload: Value) -> bool {
        self.feeds.accept(widget_id, generation, payload)
    }

    /// Apply queued subscription payloads, then fire due refreshes. Returns
    /// how many payloads were accepted.
    pub fn pump<T: Transport, K: Clock>(&mut self, client: &mut RealtimeClient<T, K>) -> usize {
        let received: Vec<Delivery> = self.inbox.borrow_mut().drain(..).collect();
        let accepted = received
            .into_iter()
            .filter(|d| self.deliver(d.widget_id, d.generation, d.payload.clone()))
            .count();

        for widget_id in self.refresh.due() {
            let widget = self.activation.active().iter().find(|w| w.id == widget_id).copied();
            let Some(request) = widget.and_then(|w| w.feed.request) else {
                self.refresh.cancel(&widget_id);
                continue;
            };
            if client.is_connected() {
                client.send(request, json!({}));
            } else if let Some(generation) = self.feeds.generation(&widget_id) {
                self.feeds.mark_stale(&widget_id, generation, "not connected");
            }
        }
        accepted
    }

    /// Re-request every polled widget right away.
    pub fn on_connected<T: Transport, K: Clock>(&mut self, client: &mut RealtimeClient<T, K>) {
        let polled: Vec<&'static str> = self
            .activation
            .active()
            .iter()
            .filter_map(|w| w.feed.request)
            .collect();
        for request in polled {
            client.send(request, json!({}));
        }
    }

    /// Keep showing the last data, marked stale.
    pub fn on_disconnected(&mut self, reason: &str) {
        self.feeds.mark_all_stale(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::feeds::FeedStatus;
    use crate::realtime::{ReconnectPolicy, ScriptedTransport};

    const OCCUPANCY_FRAME: &str = r#"{"type":"occupancy_update","payload":{"current_occupancy":5}}"#;

    fn setup() -> (
        DashboardSession<ManualClock>,
        RealtimeClient<ScriptedTransport, ManualClock>,
        ScriptedTransport,
        ManualClock,
    ) {
        let clock = ManualClock::new();
        let transport = ScriptedTransport::new();
        let mut client = RealtimeClient::new(
            "ws://test/ws",
            transport.clone(),
            clock.clone(),
            ReconnectPolicy::default(),
        );
        client.connect();
        client.tick();
        let mut session = DashboardSession::new(clock.clone(), Duration::from_secs(30));
        session.select_module("residential", &mut client).unwrap();
        (session, client, transport, clock)
    }

    #[test]
    fn activation_starts_polling_and_subscription() {
        let (mut session, mut client, transport, _) = setup();
        session.activate("occupancy", &mut client).unwrap();
        assert!(session.is_polling("occupancy"));
        assert!(session.is_subscribed("occupancy"));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(session.feed("occupancy").unwrap().status, FeedStatus::Waiting);
    }

    #[test]
    fn deactivated_widget_is_never_polled_again() {
        let (mut session, mut client, transport, clock) = setup();
        session.activate("occupancy", &mut client).unwrap();
        session.deactivate("occupancy").unwrap();
        assert!(!session.is_polling("occupancy"));
        assert!(!session.is_subscribed("occupancy"));
        assert!(session.feed("occupancy").is_none());

        clock.advance(Duration::from_secs(120));
        session.pump(&mut client);
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn module_switch_cancels_every_timer() {
        let (mut session, mut client, transport, clock) = setup();
        session.activate("occupancy", &mut client).unwrap();
        session.activate("package", &mut client).unwrap();

        session.select_module("school", &mut client).unwrap();
        assert!(!session.is_polling("occupancy"));
        assert!(!session.is_subscribed("package"));
        assert!(session.feed("occupancy").is_none());

        let sent_before = transport.sent().len();
        clock.advance(Duration::from_secs(90));
        session.pump(&mut client);
        assert_eq!(transport.sent().len(), sent_before);
    }

    #[test]
    fn unknown_module_keeps_current_widgets() {
        let (mut session, mut client, _, _) = setup();
        session.activate("occupancy", &mut client).unwrap();
        assert!(session.select_module("airport", &mut client).is_err());
        assert_eq!(session.module(), Some(ModuleId::Residential));
        assert!(session.is_polling("occupancy"));
    }

    #[test]
    fn payload_from_previous_activation_is_rejected() {
        let (mut session, mut client, transport, _) = setup();
        session.activate("occupancy", &mut client).unwrap();
        transport.push_message(OCCUPANCY_FRAME);
        client.tick();

        // Re-activated before the queued payload was applied.
        session.deactivate("occupancy").unwrap();
        session.activate("occupancy", &mut client).unwrap();
        assert_eq!(session.pump(&mut client), 0);
        assert_eq!(session.feed("occupancy").unwrap().status, FeedStatus::Waiting);

        transport.push_message(OCCUPANCY_FRAME);
        client.tick();
        assert_eq!(session.pump(&mut client), 1);
        let feed = session.feed("occupancy").unwrap();
        assert_eq!(feed.status, FeedStatus::Live);
        assert_eq!(feed.payload, Some(json!({ "current_occupancy": 5 })));
    }

    #[test]
    fn offline_activation_defers_request() {
        let clock = ManualClock::new();
        let transport = ScriptedTransport::new();
        let mut client =
            RealtimeClient::new("ws://test/ws", transport.clone(), clock.clone(), ReconnectPolicy::default());
        let mut session = DashboardSession::new(clock.clone(), Duration::from_secs(30));
        session.select_module("residential", &mut client).unwrap();
        session.activate("occupancy", &mut client).unwrap();
        assert!(session.is_polling("occupancy"));

        client.connect();
        client.tick();
        assert!(transport.sent().is_empty());
        session.on_connected(&mut client);
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn due_refresh_while_offline_marks_stale() {
        let (mut session, mut client, transport, clock) = setup();
        session.activate("occupancy", &mut client).unwrap();
        transport.push_message(OCCUPANCY_FRAME);
        client.tick();
        session.pump(&mut client);

        client.disconnect();
        clock.advance(Duration::from_secs(30));
        session.pump(&mut client);
        let feed = session.feed("occupancy").unwrap();
        assert!(matches!(feed.status, FeedStatus::Stale(_)));
        assert!(feed.payload.is_some());
    }
}
