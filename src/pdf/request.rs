//! Load request and response types

use super::loader::DocumentError;
use super::types::{DocumentSource, LoadedDocument};

/// Unique identifier for load requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Request sent to the load worker
#[derive(Debug)]
pub enum LoadRequest {
    /// Parse a document
    Load {
        id: RequestId,
        source: DocumentSource,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Response from the load worker
#[derive(Debug)]
pub enum LoadResponse {
    /// Document parsed
    Loaded {
        id: RequestId,
        document: LoadedDocument,
    },

    /// Parsing failed
    Error { id: RequestId, error: DocumentError },
}

impl LoadResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            LoadResponse::Loaded { id, .. } | LoadResponse::Error { id, .. } => *id,
        }
    }
}
