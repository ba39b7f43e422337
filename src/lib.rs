//! # meshpipe
//!
//! A mesh validation, preprocessing and augmentation pipeline for uploaded
//! 3D models.
//!
//! Meshes arrive as raw bytes in one of the common interchange formats
//! (OBJ, STL, OFF, PLY) and flow through three operations: validation
//! (watertightness, volume, bounds), preprocessing (deduplication, winding
//! repair, hole filling, cleanup) and augmentation (scaled, rotated,
//! mirrored and simplified variants). Results are returned as serializable
//! structures ready for a JSON API.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Decode and encode OBJ, STL, OFF and PLY meshes
//! - Watertightness, volume and bounding-box validation
//! - Repair pipeline with per-step reporting and before/after statistics
//! - Quadric-based decimation for simplified variants
//!
//! ## Example
//!
//! ```no_run
//! use meshpipe::{service, PreprocessOptions};
//!
//! # fn main() -> meshpipe::Result<()> {
//! let bytes = std::fs::read("model.obj")?;
//! let response = service::preprocess(&bytes, "obj", &PreprocessOptions::default())?;
//!
//! println!("Applied {} steps", response.steps.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod augment;
pub mod codec;
pub mod error;
pub mod mesh;
pub mod mesh_ops;
pub mod pipeline;
pub mod service;
pub mod transport;
pub mod validator;

pub use augment::{AugmentOptions, AugmentResult};
pub use codec::MeshFormat;
pub use error::{Error, Result};
pub use mesh::{
    BoundingBox, Geometry, Mesh, Point3d, Scene, TexCoord, Triangle, Vector3, Vertex,
    DEGENERATE_AREA_EPSILON,
};
pub use pipeline::{PipelineResult, PreprocessOptions, Statistics};
pub use transport::MeshTransport;
pub use validator::ValidationReport;
