//! In-process backends for local development and tests.

mod document_store;
mod object_store;

pub use document_store::MemoryDocumentStore;
pub use object_store::MemoryObjectStore;
