//! Load worker - runs in a dedicated thread

use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::loader::DocumentLoader;
use super::request::{LoadRequest, LoadResponse};

/// Main worker function
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn load_worker(
    loader: Arc<dyn DocumentLoader>,
    requests: Receiver<LoadRequest>,
    responses: Sender<LoadResponse>,
) {
    for request in requests {
        match request {
            LoadRequest::Load { id, source } => {
                debug!("Loading {} (request {})", source.display_name(), id.0);
                let response = match loader.load(&source) {
                    Ok(document) => LoadResponse::Loaded { id, document },
                    Err(error) => {
                        warn!("Failed to load {}: {error}", source.display_name());
                        LoadResponse::Error { id, error }
                    }
                };
                if responses.send(response).is_err() {
                    break;
                }
            }

            LoadRequest::Shutdown => break,
        }
    }
}
