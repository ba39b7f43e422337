//! OFF (Object File Format) decoding and encoding
//!
//! Plain-text OFF: an `OFF` header, a counts line, vertex lines, then face
//! lines (`n i0 i1 ... i(n-1)`). Polygon faces are fan-triangulated.
//! Comments (`#`) and blank lines are skipped.

use crate::error::{Error, Result};
use crate::mesh::{Geometry, Mesh, Scene, Triangle, Vertex};

const FORMAT: &str = "off";

/// Decode an OFF buffer into a scene
pub(crate) fn decode(bytes: &[u8]) -> Result<Scene> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::decode(FORMAT, "file is not valid UTF-8 text"))?;

    let mut lines = text
        .lines()
        .map(|l| match l.find('#') {
            Some(pos) => l[..pos].trim(),
            None => l.trim(),
        })
        .filter(|l| !l.is_empty());

    let header = lines
        .next()
        .ok_or_else(|| Error::decode(FORMAT, "file is empty"))?;

    // The counts may share the header line ("OFF 8 12 6") or follow it
    let counts_line = if let Some(rest) = header.strip_prefix("OFF") {
        let rest = rest.trim();
        if rest.is_empty() {
            lines
                .next()
                .ok_or_else(|| Error::decode(FORMAT, "missing element counts"))?
        } else {
            rest
        }
    } else {
        return Err(Error::decode(FORMAT, "missing OFF header"));
    };

    let counts: Vec<usize> = counts_line
        .split_whitespace()
        .take(3)
        .map(|t| t.parse::<usize>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::decode(FORMAT, "invalid element counts"))?;
    if counts.len() < 2 {
        return Err(Error::decode(FORMAT, "invalid element counts"));
    }
    let (vertex_count, face_count) = (counts[0], counts[1]);

    let mut mesh = Mesh::with_capacity(vertex_count, face_count);

    for i in 0..vertex_count {
        let line = lines
            .next()
            .ok_or_else(|| Error::decode(FORMAT, format!("missing vertex {}", i)))?;
        let coords: Vec<f64> = line
            .split_whitespace()
            .take(3)
            .map(|t| t.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| Error::decode(FORMAT, format!("invalid vertex {}", i)))?;
        if coords.len() < 3 {
            return Err(Error::decode(FORMAT, format!("invalid vertex {}", i)));
        }
        mesh.vertices
            .push(Vertex::new(coords[0], coords[1], coords[2]));
    }

    for i in 0..face_count {
        let line = lines
            .next()
            .ok_or_else(|| Error::decode(FORMAT, format!("missing face {}", i)))?;
        let indices: Vec<usize> = line
            .split_whitespace()
            .map(|t| t.parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| Error::decode(FORMAT, format!("invalid face {}", i)))?;

        let Some((&n, corners)) = indices.split_first() else {
            return Err(Error::decode(FORMAT, format!("invalid face {}", i)));
        };
        if corners.len() < n || n < 3 {
            return Err(Error::decode(
                FORMAT,
                format!("face {} declares {} corners but lists {}", i, n, corners.len()),
            ));
        }
        let corners = &corners[..n];
        for window in 1..n - 1 {
            mesh.triangles.push(Triangle::new(
                corners[0],
                corners[window],
                corners[window + 1],
            ));
        }
    }

    if mesh.vertices.is_empty() {
        return Ok(Scene::new());
    }
    if mesh.triangles.is_empty() {
        return Ok(Scene {
            geometries: vec![Geometry::Points(mesh.vertices)],
        });
    }
    Ok(Scene::from_mesh(mesh))
}

/// Encode a mesh as OFF text
pub(crate) fn encode(mesh: &Mesh) -> Result<Vec<u8>> {
    use std::fmt::Write;

    let mut out = String::from("OFF\n");
    let _ = writeln!(
        out,
        "{} {} 0",
        mesh.vertices.len(),
        mesh.triangles.len()
    );
    for v in &mesh.vertices {
        let _ = writeln!(out, "{} {} {}", v.x, v.y, v.z);
    }
    for t in &mesh.triangles {
        let _ = writeln!(out, "3 {} {} {}", t.v1, t.v2, t.v3);
    }
    Ok(out.into_bytes())
}
