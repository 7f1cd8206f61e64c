//! WebSocket transport backed by tungstenite.
//!
//! The socket lives on its own thread; the UI thread talks to it through a
//! pair of crossbeam channels and never blocks.

use super::transport::{Transport, TransportEvent};
use crate::error::TransportError;
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use std::io::ErrorKind;
use std::thread;
use std::time::Duration;
use tungstenite::Message;
use tungstenite::stream::MaybeTlsStream;

/// How long a socket read may block before outgoing frames are flushed.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(50);

enum Command {
    Send(String),
    Close,
}

#[derive(Default)]
pub struct WsTransport {
    commands: Option<Sender<Command>>,
    events: Option<Receiver<TransportEvent>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WsTransport {
    fn open(&mut self, url: &str) -> Result<(), TransportError> {
        self.close();
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let url = url.to_string();

        thread::Builder::new()
            .name("ws-feed".into())
            .spawn(move || run_socket(url, command_rx, event_tx))
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        self.commands = Some(command_tx);
        self.events = Some(event_rx);
        Ok(())
    }

    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        match &self.commands {
            Some(tx) => tx
                .send(Command::Send(text))
                .map_err(|_| TransportError::NotConnected),
            None => Err(TransportError::NotConnected),
        }
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        let rx = self.events.as_ref()?;
        match rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.commands = None;
                self.events = None;
                None
            }
        }
    }

    fn close(&mut self) {
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(Command::Close);
        }
        self.events = None;
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_socket(url: String, commands: Receiver<Command>, events: Sender<TransportEvent>) {
    let (mut socket, _response) = match tungstenite::connect(url.as_str()) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = events.send(TransportEvent::Closed(e.to_string()));
            return;
        }
    };
    if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
        if let Err(e) = stream.set_read_timeout(Some(READ_POLL_INTERVAL)) {
            log::warn!("[Realtime] could not set read timeout: {}", e);
        }
    }
    log::info!("[Realtime] socket open: {}", url);
    let _ = events.send(TransportEvent::Opened);

    loop {
        loop {
            match commands.try_recv() {
                Ok(Command::Send(text)) => {
                    if let Err(e) = socket.send(Message::text(text)) {
                        let _ = events.send(TransportEvent::Closed(e.to_string()));
                        return;
                    }
                }
                Ok(Command::Close) | Err(TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if events.send(TransportEvent::Message(text.to_string())).is_err() {
                    let _ = socket.close(None);
                    return;
                }
            }
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .unwrap_or_else(|| "closed by server".into());
                let _ = events.send(TransportEvent::Closed(reason));
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                let _ = events.send(TransportEvent::Closed(e.to_string()));
                return;
            }
        }
    }
}
