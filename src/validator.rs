//! Mesh validation and description
//!
//! Produces a [`ValidationReport`] summarizing a mesh: counts, watertight
//! status, bounds, volume and face quality. Validation never mutates
//! topology; it only forces the derived normal caches, which the report
//! relies on being fresh.

use serde::Serialize;

use crate::error::Result;
use crate::mesh::{BoundingBox, Mesh, Point3d, DEGENERATE_AREA_EPSILON};
use crate::mesh_ops;

/// Summary of a mesh's structure and quality
///
/// `volume` is present only for watertight meshes; absence means the
/// quantity is undefined for this surface, not that it is zero.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Number of vertices
    pub vertex_count: usize,
    /// Number of triangular faces
    pub face_count: usize,
    /// Whether every edge is shared by exactly two faces
    pub is_watertight: bool,
    /// Whether the mesh has no vertices or no faces
    pub is_empty: bool,
    /// Axis-aligned bounding box (min corner, max corner)
    pub bounds: Option<BoundingBox>,
    /// Enclosed volume; `None` unless watertight
    pub volume: Option<f64>,
    /// Center of mass
    pub center_mass: Point3d,
    /// True iff no face has area at or below the degeneracy epsilon
    /// (vacuously true when there are no faces)
    pub has_valid_faces: bool,
}

/// Validate a mesh and return a detailed report
///
/// Face and vertex normals are computed (and cached on the mesh) if they
/// are not already present; this is the only mutation performed.
pub fn validate(mesh: &mut Mesh) -> Result<ValidationReport> {
    mesh_ops::ensure_normals(mesh);

    let is_empty = mesh.is_empty();
    let bounds = if is_empty {
        None
    } else {
        Some(mesh_ops::compute_mesh_aabb(mesh)?)
    };

    // Vacuously true for a mesh with no faces
    let has_valid_faces = mesh_ops::face_areas(mesh)
        .iter()
        .all(|&area| area > DEGENERATE_AREA_EPSILON);

    Ok(ValidationReport {
        vertex_count: mesh.vertices.len(),
        face_count: mesh.triangles.len(),
        is_watertight: mesh_ops::is_watertight(mesh),
        is_empty,
        bounds,
        volume: mesh_ops::compute_volume(mesh),
        center_mass: mesh_ops::compute_center_mass(mesh),
        has_valid_faces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Triangle, Vertex};

    fn triangle_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::new(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::new(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::new(0.0, 1.0, 0.0));
        mesh.triangles.push(Triangle::new(0, 1, 2));
        mesh
    }

    #[test]
    fn test_validate_open_triangle() {
        let mut mesh = triangle_mesh();
        let report = validate(&mut mesh).unwrap();
        assert_eq!(report.vertex_count, 3);
        assert_eq!(report.face_count, 1);
        assert!(!report.is_watertight);
        assert!(!report.is_empty);
        assert!(report.volume.is_none());
        assert!(report.has_valid_faces);
        // Validation fills the normal caches as a side effect
        assert!(mesh.face_normals().is_some());
        assert!(mesh.vertex_normals().is_some());
    }

    #[test]
    fn test_validate_empty_mesh() {
        let mut mesh = Mesh::new();
        let report = validate(&mut mesh).unwrap();
        assert!(report.is_empty);
        assert!(report.bounds.is_none());
        assert!(!report.is_watertight);
        // No faces means no degenerate faces
        assert!(report.has_valid_faces);
    }

    #[test]
    fn test_validate_flags_degenerate_faces() {
        let mut mesh = triangle_mesh();
        // A sliver face well below the area epsilon
        mesh.vertices.push(Vertex::new(0.0, 0.0, 1e-12));
        mesh.triangles.push(Triangle::new(0, 1, 3));
        let report = validate(&mut mesh).unwrap();
        assert!(!report.has_valid_faces);
    }

    #[test]
    fn test_report_serializes() {
        let mut mesh = triangle_mesh();
        let report = validate(&mut mesh).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["vertex_count"], 3);
        assert!(json["volume"].is_null());
    }
}
