use super::{WidgetApi, WidgetSummary, validate_name};
use crate::document::GraphDocument;
use crate::error::{PersistenceError, TransportError};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Store {
    documents: BTreeMap<String, GraphDocument>,
    failure: Option<TransportError>,
    saves: usize,
}

/// In-process widget store. Saving an existing name replaces it.
#[derive(Default)]
pub struct MemoryWidgetApi {
    store: Mutex<Store>,
}

impl MemoryWidgetApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every request fail with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<TransportError>) {
        self.store().failure = error;
    }

    pub fn save_count(&self) -> usize {
        self.store().saves
    }

    pub fn get(&self, name: &str) -> Option<GraphDocument> {
        self.store().documents.get(name).cloned()
    }
}

impl WidgetApi for MemoryWidgetApi {
    fn save(&self, doc: &GraphDocument) -> Result<(), PersistenceError> {
        let name = validate_name(&doc.name)?.to_string();
        let mut store = self.store();
        if let Some(err) = &store.failure {
            return Err(err.clone().into());
        }
        store.saves += 1;
        store.documents.insert(name, doc.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<WidgetSummary>, PersistenceError> {
        let store = self.store();
        if let Some(err) = &store.failure {
            return Err(err.clone().into());
        }
        Ok(store
            .documents
            .values()
            .map(|doc| WidgetSummary {
                name: doc.name.clone(),
                created_at: Some(doc.created_at),
            })
            .collect())
    }

    fn load(&self, name: &str) -> Result<GraphDocument, PersistenceError> {
        let name = validate_name(name)?;
        let store = self.store();
        if let Some(err) = &store.failure {
            return Err(err.clone().into());
        }
        store
            .documents
            .get(name)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(name.to_string()))
    }
}
