//! Load service - owns the worker thread and tracks the latest request

use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};
use log::debug;

use super::loader::{DocumentError, DocumentLoader};
use super::request::{LoadRequest, LoadResponse, RequestId};
use super::types::{DocumentSource, LoadedDocument};
use super::worker::load_worker;

/// Outcome of the most recent load, as seen by the viewer
#[derive(Debug)]
pub enum LoadEvent {
    Loaded(LoadedDocument),
    Failed(DocumentError),
}

/// Loads documents off the UI thread.
///
/// Only the newest request matters: choosing another file while a previous
/// one is still parsing makes the older response stale, and it is dropped.
pub struct DocumentService {
    request_tx: Sender<LoadRequest>,
    response_rx: Receiver<LoadResponse>,
    next_request_id: u64,
    pending: Option<RequestId>,
}

impl DocumentService {
    #[must_use]
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        std::thread::spawn(move || {
            load_worker(loader, request_rx, response_tx);
        });

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            pending: None,
        }
    }

    /// Queue a load, superseding any load still in flight
    pub fn request(&mut self, source: DocumentSource) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        self.pending = Some(id);

        if self
            .request_tx
            .send(LoadRequest::Load { id, source })
            .is_err()
        {
            debug!("Load worker is gone, request {} dropped", id.0);
        }
        id
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Non-blocking check for the current load's result
    pub fn poll(&mut self) -> Option<LoadEvent> {
        while let Ok(response) = self.response_rx.try_recv() {
            if let Some(event) = self.accept(response) {
                return Some(event);
            }
        }
        None
    }

    /// Block up to `timeout` for the current load's result
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadEvent> {
        let deadline = std::time::Instant::now() + timeout;
        while self.pending.is_some() {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            let response = self.response_rx.recv_timeout(remaining).ok()?;
            if let Some(event) = self.accept(response) {
                return Some(event);
            }
        }
        None
    }

    fn accept(&mut self, response: LoadResponse) -> Option<LoadEvent> {
        if self.pending != Some(response.id()) {
            debug!("Dropping stale load response {}", response.id().0);
            return None;
        }
        self.pending = None;

        Some(match response {
            LoadResponse::Loaded { document, .. } => LoadEvent::Loaded(document),
            LoadResponse::Error { error, .. } => LoadEvent::Failed(error),
        })
    }
}

impl Drop for DocumentService {
    fn drop(&mut self) {
        let _ = self.request_tx.send(LoadRequest::Shutdown);
    }
}
