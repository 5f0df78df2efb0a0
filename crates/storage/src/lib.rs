//! Durable state of the pipeline.
//!
//! - [`blob`]: artifact bytes on disk, addressed by logical path.
//! - [`catalog`]: JSON-file backed list of completed models.

pub mod blob;
pub mod catalog;
pub mod error;

mod atomic;

pub use blob::{BlobStore, LocalBlobStore};
pub use catalog::{ModelCatalog, ModelRecord};
pub use error::{CatalogError, StorageError};
