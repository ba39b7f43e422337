//! Serializable mesh representation for API responses
//!
//! [`MeshTransport`] flattens a mesh into plain coordinate and index
//! lists, with vertex normals and summary metadata, ready for JSON
//! serialization. Very large or very small meshes are rescaled to a
//! friendly size in the serialized copy only.

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::mesh::{BoundingBox, Mesh, Point3d};
use crate::mesh_ops;

/// Extents above this trigger normalization of the serialized coordinates
pub const NORMALIZE_MAX_EXTENT: f64 = 10.0;
/// Extents below this trigger normalization of the serialized coordinates
pub const NORMALIZE_MIN_EXTENT: f64 = 0.1;

/// A mesh flattened for transport
#[derive(Debug, Clone, Serialize)]
pub struct MeshTransport {
    /// Vertex positions, possibly rescaled to a friendly size
    pub vertices: Vec<[f64; 3]>,
    /// Triangle vertex indices
    pub faces: Vec<[usize; 3]>,
    /// Per-vertex unit normals
    pub normals: Vec<[f64; 3]>,
    /// Bounding box of the serialized vertices
    pub bounds: BoundingBox,
    /// Center of mass of the serialized vertices
    pub center: Point3d,
}

impl MeshTransport {
    /// Flatten `mesh` for serialization
    ///
    /// Fills the normal caches if needed. When the largest bounding-box
    /// extent is above [`NORMALIZE_MAX_EXTENT`] or below
    /// [`NORMALIZE_MIN_EXTENT`], the serialized coordinates are scaled by
    /// the reciprocal of that extent; the mesh itself is left untouched.
    pub fn from_mesh(mesh: &mut Mesh) -> Result<Self> {
        mesh_ops::ensure_normals(mesh);
        let (min, max) = mesh_ops::compute_mesh_aabb(mesh)?;

        // Zero extent (all vertices coincident) cannot be rescaled
        let extent = (max.0 - min.0).max(max.1 - min.1).max(max.2 - min.2);
        let scale = if extent > NORMALIZE_MAX_EXTENT
            || (extent > 0.0 && extent < NORMALIZE_MIN_EXTENT)
        {
            debug!(extent, "normalizing transport coordinates");
            1.0 / extent
        } else {
            1.0
        };

        let vertices: Vec<[f64; 3]> = mesh
            .vertices
            .iter()
            .map(|v| [v.x * scale, v.y * scale, v.z * scale])
            .collect();
        let faces: Vec<[usize; 3]> = mesh.triangles.iter().map(|t| t.indices()).collect();
        let normals: Vec<[f64; 3]> = mesh
            .vertex_normals()
            .unwrap_or(&[])
            .iter()
            .map(|n| [n.0, n.1, n.2])
            .collect();

        let bounds = (
            (min.0 * scale, min.1 * scale, min.2 * scale),
            (max.0 * scale, max.1 * scale, max.2 * scale),
        );
        let center = mesh_ops::compute_center_mass(mesh);
        let center = (center.0 * scale, center.1 * scale, center.2 * scale);

        Ok(Self {
            vertices,
            faces,
            normals,
            bounds,
            center,
        })
    }

    /// Largest extent of the serialized bounding box
    pub fn max_extent(&self) -> f64 {
        let (min, max) = self.bounds;
        (max.0 - min.0).max(max.1 - min.1).max(max.2 - min.2)
    }
}
