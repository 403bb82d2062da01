//! Document and annotation artifact store.
//!
//! Couples the PostgreSQL metadata store (`annostore-db`) with a
//! filesystem blob repository holding serialized annotation graphs, and
//! materializes each document's baseline graph lazily on first use.

pub mod baseline;
pub mod blob;
pub mod config;
pub mod error;
pub mod locks;
pub mod service;

pub use baseline::BaselineCache;
pub use blob::BlobStore;
pub use config::StorageConfig;
pub use error::{ErrorKind, StoreError, StoreResult};
pub use service::{AccessUpdate, DocumentService, SweepReport};
