//! Transport seam between the connection state machine and the socket.
//!
//! Opening is asynchronous: [`Transport::open`] only starts the attempt and
//! its outcome shows up later from [`Transport::poll_event`] as `Opened` or
//! `Closed`.

use crate::error::TransportError;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed(String),
}

pub trait Transport {
    fn open(&mut self, url: &str) -> Result<(), TransportError>;
    fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    fn poll_event(&mut self) -> Option<TransportEvent>;
    fn close(&mut self);
}

#[derive(Debug, Default)]
struct Script {
    open_calls: Vec<String>,
    refuse_opens: usize,
    connected: bool,
    events: VecDeque<TransportEvent>,
    sent: Vec<String>,
}

/// In-memory transport driven from a test. Clones share the same script.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    script: Rc<RefCell<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` open attempts fail.
    pub fn refuse_next_opens(&self, n: usize) {
        self.script.borrow_mut().refuse_opens = n;
    }

    /// Queue an inbound text frame.
    pub fn push_message(&self, text: &str) {
        self.script
            .borrow_mut()
            .events
            .push_back(TransportEvent::Message(text.to_string()));
    }

    /// Simulate the server dropping the connection.
    pub fn drop_connection(&self) {
        let mut script = self.script.borrow_mut();
        script.connected = false;
        script.events.push_back(TransportEvent::Closed("connection reset".into()));
    }

    pub fn open_count(&self) -> usize {
        self.script.borrow().open_calls.len()
    }

    pub fn sent(&self) -> Vec<String> {
        self.script.borrow().sent.clone()
    }
}

impl Transport for ScriptedTransport {
    fn open(&mut self, url: &str) -> Result<(), TransportError> {
        let mut script = self.script.borrow_mut();
        script.open_calls.push(url.to_string());
        if script.refuse_opens > 0 {
            script.refuse_opens -= 1;
            script
                .events
                .push_back(TransportEvent::Closed("connection refused".into()));
        } else {
            script.connected = true;
            script.events.push_back(TransportEvent::Opened);
        }
        Ok(())
    }

    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let mut script = self.script.borrow_mut();
        if !script.connected {
            return Err(TransportError::NotConnected);
        }
        script.sent.push(text);
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.script.borrow_mut().events.pop_front()
    }

    fn close(&mut self) {
        let mut script = self.script.borrow_mut();
        script.connected = false;
        script.events.clear();
    }
}
