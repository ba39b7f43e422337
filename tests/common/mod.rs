//! Shared mesh fixtures for integration tests

#![allow(dead_code)]

use meshpipe::{Mesh, Triangle, Vertex};

/// A unit cube with outward-wound faces, 8 vertices and 12 triangles
pub fn unit_cube() -> Mesh {
    let mut mesh = Mesh::new();
    for (x, y, z) in [
        (0.0, 0.0, 0.0),
        (1.0, 0.0, 0.0),
        (1.0, 1.0, 0.0),
        (0.0, 1.0, 0.0),
        (0.0, 0.0, 1.0),
        (1.0, 0.0, 1.0),
        (1.0, 1.0, 1.0),
        (0.0, 1.0, 1.0),
    ] {
        mesh.vertices.push(Vertex::new(x, y, z));
    }
    for (a, b, c) in cube_faces() {
        mesh.triangles.push(Triangle::new(a, b, c));
    }
    mesh
}

/// The cube with its two +Z faces removed, leaving a square hole
pub fn open_cube() -> Mesh {
    let mut mesh = unit_cube();
    mesh.triangles.retain(|t| {
        let [a, b, c] = t.indices();
        !(a >= 4 && b >= 4 && c >= 4)
    });
    mesh
}

/// The unit cube as an ASCII OBJ document
pub fn cube_obj() -> String {
    let mesh = unit_cube();
    let mut out = String::new();
    for v in &mesh.vertices {
        out.push_str(&format!("v {} {} {}\n", v.x, v.y, v.z));
    }
    for t in &mesh.triangles {
        out.push_str(&format!("f {} {} {}\n", t.v1 + 1, t.v2 + 1, t.v3 + 1));
    }
    out
}

/// The cube OBJ with one face repeated
pub fn cube_obj_with_duplicate_face() -> String {
    let mut out = cube_obj();
    out.push_str("f 1 3 2\n");
    out
}

fn cube_faces() -> [(usize, usize, usize); 12] {
    [
        (0, 2, 1),
        (0, 3, 2),
        (4, 5, 6),
        (4, 6, 7),
        (0, 1, 5),
        (0, 5, 4),
        (1, 2, 6),
        (1, 6, 5),
        (2, 3, 7),
        (2, 7, 6),
        (3, 0, 4),
        (3, 4, 7),
    ]
}
