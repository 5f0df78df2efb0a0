//! Shared domain types for the image-to-3D pipeline.
//!
//! Everything here is free of I/O so the storage, generation, pipeline and
//! API crates can all depend on it.

pub mod error;
pub mod job;
pub mod naming;
pub mod types;
pub mod upload;
