//! Image-to-3D generation client.
//!
//! [`ModelGenerator`] is the seam the pipeline depends on;
//! [`StabilityClient`] implements it against the Stability AI
//! stable-point-aware-3d endpoint, which answers a multipart image upload
//! with binary glTF in the response body.

pub mod client;
pub mod config;

pub use client::{GenerationError, ModelGenerator, StabilityClient, GLTF_MAGIC};
pub use config::StabilityConfig;
