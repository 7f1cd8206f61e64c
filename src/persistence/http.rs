use super::{WidgetApi, WidgetSummary, validate_name};
use crate::document::GraphDocument;
use crate::error::{PersistenceError, TransportError};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use std::time::Duration;

/// Widget store backed by the dashboard REST API.
pub struct HttpWidgetApi {
    client: Client,
    base_url: String,
}

impl HttpWidgetApi {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/api/widgets", self.base_url)
    }

    fn item_url(&self, name: &str) -> Result<reqwest::Url, TransportError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| TransportError::Request(format!("bad base url '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::Request(format!("bad base url '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "widgets", name]);
        Ok(url)
    }
}

/// Turn any non-2xx response into `TransportError::Status`.
fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .ok()
        .filter(|body| !body.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(TransportError::Status {
        status: status.as_u16(),
        message,
    })
}

impl WidgetApi for HttpWidgetApi {
    fn save(&self, doc: &GraphDocument) -> Result<(), PersistenceError> {
        validate_name(&doc.name)?;
        let response = self.client.post(self.collection_url()).json(doc).send()?;
        check_status(response)?;
        log::info!("[Persistence] saved '{}' to {}", doc.name, self.base_url);
        Ok(())
    }

    fn list(&self) -> Result<Vec<WidgetSummary>, PersistenceError> {
        let response = self.client.get(self.collection_url()).send()?;
        let widgets = check_status(response)?.json::<Vec<WidgetSummary>>()?;
        Ok(widgets)
    }

    fn load(&self, name: &str) -> Result<GraphDocument, PersistenceError> {
        let name = validate_name(name)?;
        let response = self.client.get(self.item_url(name)?).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PersistenceError::NotFound(name.to_string()));
        }
        let doc = check_status(response)?.json::<GraphDocument>()?;
        Ok(doc)
    }
}
