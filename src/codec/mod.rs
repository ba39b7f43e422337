//! Mesh file codecs
//!
//! Decoding and encoding of the supported upload formats. Each format lives
//! in its own submodule; this module provides the [`MeshFormat`] dispatch
//! and the [`load`] entry point used by the pipeline boundary.
//!
//! Decoding produces a [`Scene`] rather than a mesh: OBJ files can carry
//! multiple objects, and OBJ/PLY files without faces decode to point
//! clouds. [`load`] is the strict path that turns a scene into exactly one
//! valid polygonal [`Mesh`] or fails with the appropriate error.

mod obj;
mod off;
mod ply;
mod stl;

use tracing::debug;

use crate::error::{Error, Result};
use crate::mesh::{Geometry, Mesh, Scene};

/// A supported mesh file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// Wavefront OBJ (text)
    Obj,
    /// Stereolithography STL (binary or ASCII)
    Stl,
    /// Object File Format (text)
    Off,
    /// Stanford polygon format (ASCII or binary)
    Ply,
}

impl MeshFormat {
    /// Resolve a file extension (without the leading dot) to a format
    ///
    /// Matching is case insensitive. Anything outside `obj|stl|off|ply` is
    /// an [`Error::UnsupportedFormat`], which the boundary maps to a client
    /// error.
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "obj" => Ok(MeshFormat::Obj),
            "stl" => Ok(MeshFormat::Stl),
            "off" => Ok(MeshFormat::Off),
            "ply" => Ok(MeshFormat::Ply),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    /// The canonical file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            MeshFormat::Obj => "obj",
            MeshFormat::Stl => "stl",
            MeshFormat::Off => "off",
            MeshFormat::Ply => "ply",
        }
    }
}

impl std::fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Decode raw bytes into a scene of geometries
pub fn decode(bytes: &[u8], format: MeshFormat) -> Result<Scene> {
    match format {
        MeshFormat::Obj => obj::decode(bytes),
        MeshFormat::Stl => stl::decode(bytes),
        MeshFormat::Off => off::decode(bytes),
        MeshFormat::Ply => ply::decode(bytes),
    }
}

/// Encode a mesh into the given format
pub fn encode(mesh: &Mesh, format: MeshFormat) -> Result<Vec<u8>> {
    match format {
        MeshFormat::Obj => obj::encode(mesh),
        MeshFormat::Stl => stl::encode(mesh),
        MeshFormat::Off => off::encode(mesh),
        MeshFormat::Ply => ply::encode(mesh),
    }
}

/// Load a single polygonal mesh from raw bytes
///
/// Decodes the buffer, selects the first geometry of a multi-object scene,
/// and rejects anything that is not a valid triangle mesh:
/// - a scene with no geometry at all is an [`Error::EmptyScene`];
/// - a point cloud or other non-mesh geometry is an [`Error::InvalidMesh`];
/// - a face index outside the vertex list is an [`Error::InvalidMesh`].
pub fn load(bytes: &[u8], format: MeshFormat) -> Result<Mesh> {
    let scene = decode(bytes, format)?;

    if scene.geometries.len() > 1 {
        debug!(
            "scene contains {} geometries; selecting the first",
            scene.geometries.len()
        );
    }

    let geometry = scene
        .geometries
        .into_iter()
        .next()
        .ok_or_else(|| Error::EmptyScene(format!("{} file contains no geometry", format)))?;

    let mesh = match geometry {
        Geometry::Mesh(mesh) => mesh,
        other => {
            return Err(Error::InvalidMesh(format!(
                "loaded geometry is a {}, not a polygonal mesh",
                other.kind()
            )));
        }
    };

    if mesh.triangles.is_empty() {
        return Err(Error::InvalidMesh(
            "mesh contains no faces".to_string(),
        ));
    }

    for (face_idx, t) in mesh.triangles.iter().enumerate() {
        for idx in t.indices() {
            if idx >= mesh.vertices.len() {
                return Err(Error::InvalidMesh(format!(
                    "face {} references missing vertex {} (mesh has {} vertices)",
                    face_idx,
                    idx,
                    mesh.vertices.len()
                )));
            }
        }
    }

    Ok(mesh)
}
