//! Wavefront OBJ decoding and encoding
//!
//! Supports the polygonal subset of OBJ: `v`, `vt`, `f`, with `o`/`g`
//! starting a new object. Polygon faces are fan-triangulated. Normals in
//! the file (`vn`) are ignored; the pipeline recomputes them explicitly.
//!
//! Texture coordinates are kept per vertex (last assignment wins when a
//! vertex is used with different `vt` indices); they participate in the
//! vertex-merge key during cleanup.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mesh::{Geometry, Mesh, Scene, TexCoord, Triangle, Vertex};

const FORMAT: &str = "obj";

/// Decode an OBJ buffer into a scene
///
/// Each `o`/`g` group with faces becomes its own geometry. A file with
/// vertices but no faces decodes to a single point cloud; a file with
/// neither decodes to an empty scene.
pub(crate) fn decode(bytes: &[u8]) -> Result<Scene> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::decode(FORMAT, "file is not valid UTF-8 text"))?;

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut tex_coords: Vec<TexCoord> = Vec::new();
    // uv assigned to each global vertex index, if any corner declared one
    let mut vertex_uvs: HashMap<usize, TexCoord> = HashMap::new();
    // Faces per object, in global vertex indices
    let mut objects: Vec<Vec<Triangle>> = vec![Vec::new()];

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();

        match keyword {
            "v" => {
                let coords = parse_floats(&mut tokens, 3, line_no, "vertex")?;
                vertices.push(Vertex::new(coords[0], coords[1], coords[2]));
            }
            "vt" => {
                let mut coords = [0.0_f64; 2];
                for (slot, token) in coords.iter_mut().zip(tokens.by_ref()) {
                    *slot = token.parse().map_err(|_| {
                        Error::decode(
                            FORMAT,
                            format!("line {}: invalid texture coordinate", line_no + 1),
                        )
                    })?;
                }
                tex_coords.push(TexCoord::new(coords[0], coords[1]));
            }
            "f" => {
                let mut corners: Vec<usize> = Vec::new();
                for token in tokens {
                    let (v_idx, vt_idx) = parse_face_corner(token, line_no)?;
                    let v = resolve_index(v_idx, vertices.len(), line_no, "vertex")?;
                    if let Some(vt) = vt_idx {
                        let vt = resolve_index(vt, tex_coords.len(), line_no, "texture")?;
                        vertex_uvs.insert(v, tex_coords[vt]);
                    }
                    corners.push(v);
                }
                if corners.len() < 3 {
                    return Err(Error::decode(
                        FORMAT,
                        format!("line {}: face has fewer than 3 corners", line_no + 1),
                    ));
                }
                let current = objects.len() - 1;
                for i in 1..corners.len() - 1 {
                    objects[current].push(Triangle::new(corners[0], corners[i], corners[i + 1]));
                }
            }
            "o" | "g" => {
                // Start a new object only once the current one has content
                if !objects.last().map(|o| o.is_empty()).unwrap_or(true) {
                    objects.push(Vec::new());
                }
            }
            // vn, s, usemtl, mtllib and friends carry no geometry
            _ => {}
        }
    }

    let mut scene = Scene::new();
    for faces in objects {
        if faces.is_empty() {
            continue;
        }
        scene
            .geometries
            .push(Geometry::Mesh(build_object(&vertices, &vertex_uvs, faces)));
    }

    if scene.geometries.is_empty() && !vertices.is_empty() {
        scene.geometries.push(Geometry::Points(vertices));
    }

    Ok(scene)
}

/// Extract one object's mesh, compacting global indices to a local list
fn build_object(
    vertices: &[Vertex],
    vertex_uvs: &HashMap<usize, TexCoord>,
    faces: Vec<Triangle>,
) -> Mesh {
    let mut remap: HashMap<usize, usize> = HashMap::new();
    let mut mesh = Mesh::new();
    let has_uvs = !vertex_uvs.is_empty();
    let mut uvs: Vec<TexCoord> = Vec::new();

    for face in faces {
        let mut mapped = [0usize; 3];
        for (slot, global) in mapped.iter_mut().zip(face.indices()) {
            let next = remap.len();
            let local = *remap.entry(global).or_insert(next);
            if local == mesh.vertices.len() {
                mesh.vertices.push(vertices[global]);
                if has_uvs {
                    uvs.push(
                        vertex_uvs
                            .get(&global)
                            .copied()
                            .unwrap_or(TexCoord::new(0.0, 0.0)),
                    );
                }
            }
            *slot = local;
        }
        mesh.triangles
            .push(Triangle::new(mapped[0], mapped[1], mapped[2]));
    }

    if has_uvs {
        mesh.uvs = Some(uvs);
    }
    mesh
}

fn parse_floats<'a, I: Iterator<Item = &'a str>>(
    tokens: &mut I,
    count: usize,
    line_no: usize,
    what: &str,
) -> Result<Vec<f64>> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let token = tokens.next().ok_or_else(|| {
            Error::decode(
                FORMAT,
                format!("line {}: {} is missing coordinates", line_no + 1, what),
            )
        })?;
        values.push(token.parse::<f64>().map_err(|_| {
            Error::decode(
                FORMAT,
                format!("line {}: invalid {} coordinate '{}'", line_no + 1, what, token),
            )
        })?);
    }
    Ok(values)
}

/// Parse a face corner token: `v`, `v/vt`, `v//vn` or `v/vt/vn`
fn parse_face_corner(token: &str, line_no: usize) -> Result<(i64, Option<i64>)> {
    let mut parts = token.split('/');
    let v = parts
        .next()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            Error::decode(
                FORMAT,
                format!("line {}: invalid face corner '{}'", line_no + 1, token),
            )
        })?;
    let vt = match parts.next() {
        Some("") | None => None,
        Some(s) => Some(s.parse::<i64>().map_err(|_| {
            Error::decode(
                FORMAT,
                format!("line {}: invalid face corner '{}'", line_no + 1, token),
            )
        })?),
    };
    Ok((v, vt))
}

/// Resolve a 1-based (or negative, from-the-end) OBJ index
fn resolve_index(index: i64, len: usize, line_no: usize, what: &str) -> Result<usize> {
    let resolved = if index > 0 {
        (index - 1) as usize
    } else if index < 0 {
        let back = (-index) as usize;
        if back > len {
            return Err(Error::decode(
                FORMAT,
                format!("line {}: {} index {} out of range", line_no + 1, what, index),
            ));
        }
        len - back
    } else {
        return Err(Error::decode(
            FORMAT,
            format!("line {}: {} index 0 is not valid", line_no + 1, what),
        ));
    };

    if resolved >= len {
        return Err(Error::decode(
            FORMAT,
            format!("line {}: {} index {} out of range", line_no + 1, what, index),
        ));
    }
    Ok(resolved)
}

/// Encode a mesh as OBJ text
pub(crate) fn encode(mesh: &Mesh) -> Result<Vec<u8>> {
    use std::fmt::Write;

    let mut out = String::new();
    for v in &mesh.vertices {
        let _ = writeln!(out, "v {} {} {}", v.x, v.y, v.z);
    }
    if let Some(uvs) = &mesh.uvs {
        for uv in uvs {
            let _ = writeln!(out, "vt {} {}", uv.u, uv.v);
        }
        for t in &mesh.triangles {
            let _ = writeln!(
                out,
                "f {}/{} {}/{} {}/{}",
                t.v1 + 1,
                t.v1 + 1,
                t.v2 + 1,
                t.v2 + 1,
                t.v3 + 1,
                t.v3 + 1
            );
        }
    } else {
        for t in &mesh.triangles {
            let _ = writeln!(out, "f {} {} {}", t.v1 + 1, t.v2 + 1, t.v3 + 1);
        }
    }
    Ok(out.into_bytes())
}
