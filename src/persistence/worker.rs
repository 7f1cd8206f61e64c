//! Background execution of widget API requests.
//!
//! Each request runs on its own thread and reports back over a crossbeam
//! channel. The UI drains finished results with [`ApiWorker::poll`] once per
//! frame and never blocks on the network.

use super::{WidgetApi, WidgetSummary};
use crate::document::GraphDocument;
use crate::error::PersistenceError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Clone, Debug)]
pub enum ApiRequest {
    Save(GraphDocument),
    List,
    Load(String),
}

impl ApiRequest {
    fn describe(&self) -> String {
        match self {
            ApiRequest::Save(doc) => format!("save '{}'", doc.name),
            ApiRequest::List => "list".to_string(),
            ApiRequest::Load(name) => format!("load '{}'", name),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ApiResponse {
    Saved(String),
    Listed(Vec<WidgetSummary>),
    Loaded(GraphDocument),
}

#[derive(Debug)]
pub struct ApiResult {
    pub id: u64,
    pub outcome: Result<ApiResponse, PersistenceError>,
}

pub struct ApiWorker {
    api: Arc<dyn WidgetApi>,
    tx: Sender<ApiResult>,
    rx: Receiver<ApiResult>,
    next_id: u64,
    in_flight: usize,
}

impl ApiWorker {
    pub fn new(api: Arc<dyn WidgetApi>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            api,
            tx,
            rx,
            next_id: 0,
            in_flight: 0,
        }
    }

    /// Start `request` in the background. Returns its id.
    pub fn submit(&mut self, request: ApiRequest) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let label = request.describe();
        log::debug!("[Persistence] request #{}: {}", id, label);

        let spawned = thread::Builder::new()
            .name(format!("widget-api-{}", id))
            .spawn(move || {
                let outcome = run(api.as_ref(), request);
                let _ = tx.send(ApiResult { id, outcome });
            });
        match spawned {
            Ok(_) => self.in_flight += 1,
            Err(e) => {
                log::error!("[Persistence] could not start {}: {}", label, e);
                let _ = self.tx.send(ApiResult {
                    id,
                    outcome: Err(PersistenceError::Io(e)),
                });
                self.in_flight += 1;
            }
        }
        id
    }

    /// Next finished request, if any.
    pub fn poll(&mut self) -> Option<ApiResult> {
        let result = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(result)
    }

    /// Block up to `timeout` for the next result.
    pub fn wait(&mut self, timeout: Duration) -> Option<ApiResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }
}

fn run(api: &dyn WidgetApi, request: ApiRequest) -> Result<ApiResponse, PersistenceError> {
    match request {
        ApiRequest::Save(doc) => api.save(&doc).map(|_| ApiResponse::Saved(doc.name)),
        ApiRequest::List => api.list().map(ApiResponse::Listed),
        ApiRequest::Load(name) => api.load(&name).map(ApiResponse::Loaded),
    }
}
