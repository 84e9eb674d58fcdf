mod doc_sync_engine;
mod document_store;
mod merge;

pub use doc_sync_engine::*;
pub use document_store::*;
pub use merge::*;
