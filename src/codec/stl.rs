//! STL (stereolithography) decoding and encoding
//!
//! Binary and ASCII STL are both handled by the `stl_io` crate, which also
//! indexes the per-triangle vertex soup into a shared vertex list. Stored
//! facet normals are discarded; the pipeline recomputes normals from
//! geometry.

use std::io::Cursor;

use crate::error::{Error, Result};
use crate::mesh::{Geometry, Mesh, Scene, Triangle, Vertex};
use crate::mesh_ops::calculate_face_normal;

const FORMAT: &str = "stl";

/// Decode an STL buffer into a scene
///
/// STL carries exactly one solid; the scene holds a single mesh, or a
/// point-cloud/empty scene for degenerate files.
pub(crate) fn decode(bytes: &[u8]) -> Result<Scene> {
    let mut reader = Cursor::new(bytes);
    let stl = stl_io::read_stl(&mut reader)
        .map_err(|e| Error::decode(FORMAT, e.to_string()))?;

    if stl.vertices.is_empty() {
        return Ok(Scene::new());
    }

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.vertices
            .push(Vertex::new(v[0] as f64, v[1] as f64, v[2] as f64));
    }
    for face in &stl.faces {
        mesh.triangles.push(Triangle::new(
            face.vertices[0],
            face.vertices[1],
            face.vertices[2],
        ));
    }

    if mesh.triangles.is_empty() {
        return Ok(Scene {
            geometries: vec![Geometry::Points(mesh.vertices)],
        });
    }

    Ok(Scene::from_mesh(mesh))
}

/// Encode a mesh as binary STL
pub(crate) fn encode(mesh: &Mesh) -> Result<Vec<u8>> {
    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles
        .iter()
        .map(|t| {
            let p0 = &mesh.vertices[t.v1];
            let p1 = &mesh.vertices[t.v2];
            let p2 = &mesh.vertices[t.v3];
            let n = calculate_face_normal(p0, p1, p2);

            stl_io::Triangle {
                normal: stl_io::Normal::new([n.0 as f32, n.1 as f32, n.2 as f32]),
                vertices: [
                    stl_io::Vertex::new([p0.x as f32, p0.y as f32, p0.z as f32]),
                    stl_io::Vertex::new([p1.x as f32, p1.y as f32, p1.z as f32]),
                    stl_io::Vertex::new([p2.x as f32, p2.y as f32, p2.z as f32]),
                ],
            }
        })
        .collect();

    let mut writer = Cursor::new(Vec::new());
    stl_io::write_stl(&mut writer, triangles.iter())
        .map_err(|e| Error::decode(FORMAT, format!("encode failed: {}", e)))?;
    Ok(writer.into_inner())
}
