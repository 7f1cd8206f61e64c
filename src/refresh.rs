//! Periodic refresh timers for polling widgets.
//!
//! One timer per widget id. The UI loop calls [`RefreshScheduler::due`]
//! every frame and sends the widget's poll request for each id returned.

use crate::clock::Clock;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
struct Timer {
    interval: Duration,
    next_at: Instant,
}

pub struct RefreshScheduler<C: Clock> {
    clock: C,
    timers: BTreeMap<String, Timer>,
}

impl<C: Clock> RefreshScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            timers: BTreeMap::new(),
        }
    }

    /// Start (or restart) the timer for `widget_id`. The first tick fires
    /// one `interval` from now.
    pub fn schedule(&mut self, widget_id: &str, interval: Duration) {
        let interval = interval.max(Duration::from_millis(1));
        let next_at = self.clock.now() + interval;
        self.timers
            .insert(widget_id.to_string(), Timer { interval, next_at });
        log::debug!("[Refresh] '{}' every {:?}", widget_id, interval);
    }

    /// Returns true if a timer was running.
    pub fn cancel(&mut self, widget_id: &str) -> bool {
        let removed = self.timers.remove(widget_id).is_some();
        if removed {
            log::debug!("[Refresh] '{}' cancelled", widget_id);
        }
        removed
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_scheduled(&self, widget_id: &str) -> bool {
        self.timers.contains_key(widget_id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Widgets whose timer has elapsed. Each returned timer is re-armed one
    /// interval after now; missed ticks are coalesced into one.
    pub fn due(&mut self) -> Vec<String> {
        let now = self.clock.now();
        let mut fired = Vec::new();
        for (id, timer) in self.timers.iter_mut() {
            if now >= timer.next_at {
                timer.next_at = now + timer.interval;
                fired.push(id.clone());
            }
        }
        fired
    }
}
