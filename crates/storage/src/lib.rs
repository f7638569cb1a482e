#![forbid(unsafe_code)]

pub mod blob;
pub mod repository;

pub use blob::BlobResultHistory;
pub use repository::{
    BlobStore, InMemoryBlobStore, ResultHistoryRepository, Storage, StorageError,
};
