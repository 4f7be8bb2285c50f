//! PDF loading and text-layer infrastructure

mod loader;
mod request;
mod selection;
mod service;
mod text_layer;
mod types;
mod worker;

pub use loader::{DocumentError, DocumentLoader, default_loader};
#[cfg(feature = "pdf")]
pub use loader::MupdfLoader;
pub use request::{LoadRequest, LoadResponse, RequestId};
pub use selection::{LayerMapping, SelectionPoint, SelectionSnapshot, TextSelection};
pub use service::{DocumentService, LoadEvent};
pub use text_layer::{
    LayerPos, LayerRow, LayerSpan, RowKind, TextLayer, WIDE_TAIL, centering_offset,
};
pub use types::*;
