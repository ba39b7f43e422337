//! Boundary operations for an HTTP layer
//!
//! Each function takes raw uploaded bytes plus a file extension, decodes
//! the mesh, runs one stage of the pipeline and returns a serializable
//! response. Error-to-status mapping lives on [`crate::Error`].

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::augment::{self, AugmentOptions};
use crate::codec::{self, MeshFormat};
use crate::error::Result;
use crate::pipeline::{self, PreprocessOptions, Statistics};
use crate::transport::MeshTransport;
use crate::validator::{self, ValidationReport};

/// Response to an upload request
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    /// Validation metadata for the uploaded mesh
    pub validation: ValidationReport,
    /// The uploaded mesh, flattened for transport
    pub mesh: MeshTransport,
}

/// Response to a preprocess request
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessResponse {
    /// The cleaned mesh, flattened for transport
    pub mesh: MeshTransport,
    /// Before/after statistics
    pub statistics: Statistics,
    /// Human-readable descriptions of the steps that had an effect
    pub steps: Vec<String>,
}

/// Response to an augment request
#[derive(Debug, Clone, Serialize)]
pub struct AugmentResponse {
    /// Variant name -> flattened mesh
    pub variants: BTreeMap<String, MeshTransport>,
    /// Descriptions of the variants produced
    pub steps: Vec<String>,
}

/// Decode and validate an uploaded mesh
pub fn upload(bytes: &[u8], extension: &str) -> Result<UploadResponse> {
    let format = MeshFormat::from_extension(extension)?;
    let mut mesh = codec::load(bytes, format)?;
    info!(
        %format,
        vertices = mesh.vertices.len(),
        faces = mesh.triangles.len(),
        "mesh uploaded"
    );
    let validation = validator::validate(&mut mesh)?;
    let transport = MeshTransport::from_mesh(&mut mesh)?;
    Ok(UploadResponse {
        validation,
        mesh: transport,
    })
}

/// Decode an uploaded mesh and run the preprocessing pipeline
pub fn preprocess(
    bytes: &[u8],
    extension: &str,
    options: &PreprocessOptions,
) -> Result<PreprocessResponse> {
    let format = MeshFormat::from_extension(extension)?;
    let mesh = codec::load(bytes, format)?;
    let mut result = pipeline::preprocess(&mesh, options)?;
    let transport = MeshTransport::from_mesh(&mut result.mesh)?;
    Ok(PreprocessResponse {
        mesh: transport,
        statistics: result.statistics,
        steps: result.steps,
    })
}

/// Decode an uploaded mesh and produce augmentation variants
pub fn augment(bytes: &[u8], extension: &str, options: &AugmentOptions) -> Result<AugmentResponse> {
    let format = MeshFormat::from_extension(extension)?;
    let mesh = codec::load(bytes, format)?;
    let result = augment::augment(&mesh, options)?;

    let mut variants = BTreeMap::new();
    for (name, mut variant) in result.variants {
        let transport = MeshTransport::from_mesh(&mut variant)?;
        variants.insert(name, transport);
    }
    Ok(AugmentResponse {
        variants,
        steps: result.steps,
    })
}
