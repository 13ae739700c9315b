pub mod blob_store;
pub mod models;

pub use blob_store::{BlobStore, MemoryBlobStore, SqliteBlobStore};
