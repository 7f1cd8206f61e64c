//! Live data held for each active dashboard widget.
//!
//! A feed is opened when its widget is activated and closed when it is
//! deactivated. Every open hands out a fresh generation; data tagged with
//! an older generation, or for a widget that is no longer open, is dropped.

use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub enum FeedStatus {
    /// Opened, nothing received yet.
    Waiting,
    Live,
    /// Last refresh failed. Any previous payload is still shown.
    Stale(String),
}

#[derive(Clone, Debug)]
pub struct Feed {
    pub status: FeedStatus,
    pub payload: Option<Value>,
    pub updated_at: Option<DateTime<Local>>,
    generation: u64,
}

impl Feed {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
pub struct FeedBoard {
    feeds: HashMap<String, Feed>,
    next_generation: u64,
}

impl FeedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reopen) the feed for `widget_id`, discarding old data.
    pub fn open(&mut self, widget_id: &str) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.feeds.insert(
            widget_id.to_string(),
            Feed {
                status: FeedStatus::Waiting,
                payload: None,
                updated_at: None,
                generation,
            },
        );
        generation
    }

    pub fn close(&mut self, widget_id: &str) -> bool {
        self.feeds.remove(widget_id).is_some()
    }

    pub fn close_all(&mut self) {
        self.feeds.clear();
    }

    pub fn feed(&self, widget_id: &str) -> Option<&Feed> {
        self.feeds.get(widget_id)
    }

    pub fn generation(&self, widget_id: &str) -> Option<u64> {
        self.feeds.get(widget_id).map(|f| f.generation)
    }

    fn current_mut(&mut self, widget_id: &str, generation: u64) -> Option<&mut Feed> {
        match self.feeds.get_mut(widget_id) {
            Some(feed) if feed.generation == generation => Some(feed),
            _ => {
                log::debug!("[Feeds] dropped late data for '{}' (gen {})", widget_id, generation);
                None
            }
        }
    }

    /// Store a payload. Returns false when the data was discarded.
    pub fn accept(&mut self, widget_id: &str, generation: u64, payload: Value) -> bool {
        match self.current_mut(widget_id, generation) {
            Some(feed) => {
                feed.payload = Some(payload);
                feed.status = FeedStatus::Live;
                feed.updated_at = Some(Local::now());
                true
            }
            None => false,
        }
    }

    /// Record a failed refresh; the last good payload is kept.
    pub fn mark_stale(&mut self, widget_id: &str, generation: u64, reason: impl Into<String>) -> bool {
        match self.current_mut(widget_id, generation) {
            Some(feed) => {
                feed.status = FeedStatus::Stale(reason.into());
                true
            }
            None => false,
        }
    }

    /// Mark every open feed stale, e.g. after the connection dropped.
    pub fn mark_all_stale(&mut self, reason: &str) {
        for feed in self.feeds.values_mut() {
            if feed.status == FeedStatus::Live {
                feed.status = FeedStatus::Stale(reason.to_string());
            }
        }
    }
}
