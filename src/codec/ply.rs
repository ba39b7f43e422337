//! PLY (Stanford polygon format) decoding and encoding
//!
//! Parsing is delegated to `ply-rs`, which handles ASCII and binary
//! variants. Encoding writes ASCII PLY. Polygon faces are fan-triangulated.

use std::io::Cursor;

use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::{Error, Result};
use crate::mesh::{Geometry, Mesh, Scene, Triangle, Vertex};

const FORMAT: &str = "ply";

/// Decode a PLY buffer into a scene
///
/// A file with vertices but no faces decodes to a point cloud.
pub(crate) fn decode(bytes: &[u8]) -> Result<Scene> {
    let mut reader = Cursor::new(bytes);
    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| Error::decode(FORMAT, e.to_string()))?;

    let Some(vertex_element) = ply.payload.get("vertex") else {
        return Err(Error::decode(FORMAT, "file has no vertex element"));
    };

    let mut vertices: Vec<Vertex> = Vec::with_capacity(vertex_element.len());
    for vertex in vertex_element {
        let x = get_float_property(vertex, "x")
            .ok_or_else(|| Error::decode(FORMAT, "vertex missing x coordinate"))?;
        let y = get_float_property(vertex, "y")
            .ok_or_else(|| Error::decode(FORMAT, "vertex missing y coordinate"))?;
        let z = get_float_property(vertex, "z")
            .ok_or_else(|| Error::decode(FORMAT, "vertex missing z coordinate"))?;
        vertices.push(Vertex::new(x, y, z));
    }

    if vertices.is_empty() {
        return Ok(Scene::new());
    }

    let mut triangles: Vec<Triangle> = Vec::new();
    if let Some(face_element) = ply.payload.get("face") {
        for face in face_element {
            let raw = get_list_property(face, "vertex_indices")
                .or_else(|| get_list_property(face, "vertex_index"))
                .ok_or_else(|| {
                    Error::decode(FORMAT, "face missing vertex_indices property")
                })?;
            let mut indices: Vec<usize> = Vec::with_capacity(raw.len());
            for idx in raw {
                if idx < 0 {
                    return Err(Error::decode(
                        FORMAT,
                        format!("negative vertex index {} in face list", idx),
                    ));
                }
                indices.push(idx as usize);
            }
            if indices.len() == 3 {
                triangles.push(Triangle::new(indices[0], indices[1], indices[2]));
            } else if indices.len() > 3 {
                for i in 1..indices.len() - 1 {
                    triangles.push(Triangle::new(indices[0], indices[i], indices[i + 1]));
                }
            }
        }
    }

    if triangles.is_empty() {
        return Ok(Scene {
            geometries: vec![Geometry::Points(vertices)],
        });
    }

    let mut mesh = Mesh::with_capacity(vertices.len(), triangles.len());
    mesh.vertices = vertices;
    mesh.triangles = triangles;
    Ok(Scene::from_mesh(mesh))
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

/// List property values widened to `i64` so the caller can reject
/// negative indices instead of letting them wrap
fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<i64>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as i64).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as i64).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as i64).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as i64).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as i64).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as i64).collect()),
        _ => None,
    }
}

/// Encode a mesh as ASCII PLY
pub(crate) fn encode(mesh: &Mesh) -> Result<Vec<u8>> {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "ply");
    let _ = writeln!(out, "format ascii 1.0");
    let _ = writeln!(out, "comment generated by meshpipe");
    let _ = writeln!(out, "element vertex {}", mesh.vertices.len());
    let _ = writeln!(out, "property double x");
    let _ = writeln!(out, "property double y");
    let _ = writeln!(out, "property double z");
    let _ = writeln!(out, "element face {}", mesh.triangles.len());
    let _ = writeln!(out, "property list uchar int vertex_indices");
    let _ = writeln!(out, "end_header");

    for v in &mesh.vertices {
        let _ = writeln!(out, "{} {} {}", v.x, v.y, v.z);
    }
    for t in &mesh.triangles {
        let _ = writeln!(out, "3 {} {} {}", t.v1, t.v2, t.v3);
    }
    Ok(out.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_PLY: &[u8] = b"ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n";

    #[test]
    fn test_decode_triangle() {
        let scene = decode(TRIANGLE_PLY).unwrap();
        let Geometry::Mesh(mesh) = &scene.geometries[0] else {
            panic!("expected a mesh");
        };
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.triangles.len(), 1);
    }

    #[test]
    fn test_decode_point_cloud() {
        let src = b"ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n1 1 1\n";
        let scene = decode(src).unwrap();
        assert!(matches!(scene.geometries[0], Geometry::Points(_)));
    }

    #[test]
    fn test_negative_face_index_is_rejected() {
        let src = b"ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n0 0 0\n1 0 0\n0 1 0\n3 0 -1 2\n";
        let err = decode(src).unwrap_err();
        assert!(err.to_string().contains("negative vertex index"));
    }

    #[test]
    fn test_round_trip() {
        let scene = decode(TRIANGLE_PLY).unwrap();
        let Geometry::Mesh(mesh) = &scene.geometries[0] else {
            panic!("expected a mesh");
        };
        let encoded = encode(mesh).unwrap();
        let scene2 = decode(&encoded).unwrap();
        let Geometry::Mesh(mesh2) = &scene2.geometries[0] else {
            panic!("expected a mesh");
        };
        assert_eq!(mesh2.vertices.len(), 3);
        assert_eq!(mesh2.triangles.len(), 1);
    }
}
