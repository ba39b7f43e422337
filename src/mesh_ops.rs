//! Triangle mesh operations
//!
//! This module is the geometry kernel behind the pipeline. It provides:
//! - Face and vertex normal computation (explicit, cached on the mesh)
//! - Volume, bounding box and center-of-mass queries
//! - Duplicate / degenerate / unreferenced / non-finite removal
//! - Vertex welding with texture-coordinate-aware merge keys
//! - Winding order repair
//! - Boundary loop detection and hole filling
//! - Quadric-error decimation
//! - Affine transforms
//!
//! Every topology-mutating operation invalidates the mesh's cached normals
//! and returns how many elements it touched, so the pipeline can decide
//! whether a step had an observable effect.

use std::collections::{BinaryHeap, HashMap, HashSet};

use nalgebra::{Matrix4, Point3};
use parry3d::math::Vector as ParryVector;
use parry3d::shape::TriMesh as ParryTriMesh;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::mesh::{BoundingBox, Mesh, Point3d, Triangle, Vector3, Vertex};

/// Default weld tolerance for merging coincident vertices
pub const MERGE_TOLERANCE: f64 = 1e-8;

/// Holes with more boundary edges than this are left open rather than filled
pub const MAX_HOLE_EDGES: usize = 512;

// ---------------------------------------------------------------------------
// Normals and per-face queries
// ---------------------------------------------------------------------------

#[inline]
fn sub(a: &Vertex, b: &Vertex) -> Vector3 {
    (a.x - b.x, a.y - b.y, a.z - b.z)
}

#[inline]
fn cross_product(v1: Vector3, v2: Vector3) -> Vector3 {
    (
        v1.1 * v2.2 - v1.2 * v2.1,
        v1.2 * v2.0 - v1.0 * v2.2,
        v1.0 * v2.1 - v1.1 * v2.0,
    )
}

#[inline]
fn norm(v: Vector3) -> f64 {
    (v.0 * v.0 + v.1 * v.1 + v.2 * v.2).sqrt()
}

/// Calculate the normal vector for a single triangle face
///
/// The normal is computed using the cross product of two edges of the
/// triangle and normalized to unit length. If the triangle is degenerate
/// (zero area), returns a zero vector.
pub fn calculate_face_normal(v0: &Vertex, v1: &Vertex, v2: &Vertex) -> Vector3 {
    let edge1 = sub(v1, v0);
    let edge2 = sub(v2, v0);
    let cross = cross_product(edge1, edge2);
    let magnitude = norm(cross);

    if magnitude > 0.0 {
        (cross.0 / magnitude, cross.1 / magnitude, cross.2 / magnitude)
    } else {
        (0.0, 0.0, 0.0)
    }
}

/// Geometric area of a single triangle
pub fn triangle_area(v0: &Vertex, v1: &Vertex, v2: &Vertex) -> f64 {
    let cross = cross_product(sub(v1, v0), sub(v2, v0));
    norm(cross) * 0.5
}

/// Per-face areas in triangle order
///
/// Triangles with out-of-range indices get area zero.
pub fn face_areas(mesh: &Mesh) -> Vec<f64> {
    mesh.triangles
        .iter()
        .map(|t| {
            if t.v1 >= mesh.vertices.len()
                || t.v2 >= mesh.vertices.len()
                || t.v3 >= mesh.vertices.len()
            {
                return 0.0;
            }
            triangle_area(
                &mesh.vertices[t.v1],
                &mesh.vertices[t.v2],
                &mesh.vertices[t.v3],
            )
        })
        .collect()
}

/// Compute and cache face and vertex normals on the mesh
///
/// This is the single entry point for filling the normal caches; nothing
/// computes normals implicitly. Calling it on a mesh whose caches are
/// already filled is a no-op.
///
/// Vertex normals are area-weighted averages of adjacent face normals,
/// normalized to unit length. Degenerate triangles and triangles with
/// invalid indices contribute nothing; an unreferenced vertex gets a zero
/// normal.
pub fn ensure_normals(mesh: &mut Mesh) {
    if mesh.face_normals().is_some() && mesh.vertex_normals().is_some() {
        return;
    }

    let mut face_normals = Vec::with_capacity(mesh.triangles.len());
    let mut accum: Vec<Vector3> = vec![(0.0, 0.0, 0.0); mesh.vertices.len()];

    for triangle in &mesh.triangles {
        if triangle.v1 >= mesh.vertices.len()
            || triangle.v2 >= mesh.vertices.len()
            || triangle.v3 >= mesh.vertices.len()
        {
            face_normals.push((0.0, 0.0, 0.0));
            continue;
        }

        let v0 = &mesh.vertices[triangle.v1];
        let v1 = &mesh.vertices[triangle.v2];
        let v2 = &mesh.vertices[triangle.v3];

        let cross = cross_product(sub(v1, v0), sub(v2, v0));
        let magnitude = norm(cross);

        if magnitude > 0.0 {
            face_normals.push((cross.0 / magnitude, cross.1 / magnitude, cross.2 / magnitude));
            // The cross product magnitude is twice the area, which gives the
            // area weighting for free.
            for idx in [triangle.v1, triangle.v2, triangle.v3] {
                accum[idx].0 += cross.0;
                accum[idx].1 += cross.1;
                accum[idx].2 += cross.2;
            }
        } else {
            face_normals.push((0.0, 0.0, 0.0));
        }
    }

    let vertex_normals = accum
        .into_iter()
        .map(|n| {
            let magnitude = norm(n);
            if magnitude > 0.0 {
                (n.0 / magnitude, n.1 / magnitude, n.2 / magnitude)
            } else {
                (0.0, 0.0, 0.0)
            }
        })
        .collect();

    mesh.set_normals(face_normals, vertex_normals);
}

// ---------------------------------------------------------------------------
// Global queries
// ---------------------------------------------------------------------------

/// Compute the signed volume of a mesh using the divergence theorem
///
/// For a watertight mesh with correct winding order the volume is positive.
/// Negative volume indicates inverted triangles. The value is only
/// geometrically meaningful for watertight meshes.
pub fn compute_signed_volume(mesh: &Mesh) -> f64 {
    let mut volume = 0.0_f64;
    for triangle in &mesh.triangles {
        if triangle.v1 >= mesh.vertices.len()
            || triangle.v2 >= mesh.vertices.len()
            || triangle.v3 >= mesh.vertices.len()
        {
            continue;
        }

        let v1 = &mesh.vertices[triangle.v1];
        let v2 = &mesh.vertices[triangle.v2];
        let v3 = &mesh.vertices[triangle.v3];

        volume += v1.x * (v2.y * v3.z - v2.z * v3.y)
            + v2.x * (v3.y * v1.z - v3.z * v1.y)
            + v3.x * (v1.y * v2.z - v1.z * v2.y);
    }
    volume / 6.0
}

/// Compute the axis-aligned bounding box (AABB) of a mesh
///
/// Returns the minimum and maximum corners of the bounding box, or an error
/// for a mesh with no vertices or triangles.
pub fn compute_mesh_aabb(mesh: &Mesh) -> Result<BoundingBox> {
    if mesh.vertices.is_empty() {
        return Err(Error::Validation(
            "Cannot compute bounding box of empty mesh".to_string(),
        ));
    }
    if mesh.triangles.is_empty() {
        return Err(Error::Validation(
            "Cannot compute bounding box of mesh with no triangles".to_string(),
        ));
    }

    // Convert mesh to parry3d format
    let vertices: Vec<ParryVector> = mesh
        .vertices
        .iter()
        .map(|v| ParryVector::new(v.x as f32, v.y as f32, v.z as f32))
        .collect();

    let indices: Vec<[u32; 3]> = mesh
        .triangles
        .iter()
        .map(|t| [t.v1 as u32, t.v2 as u32, t.v3 as u32])
        .collect();

    let trimesh = ParryTriMesh::new(vertices, indices)
        .map_err(|e| Error::Validation(format!("cannot build triangle mesh: {}", e)))?;
    let aabb = trimesh.local_aabb();

    Ok((
        (aabb.mins.x as f64, aabb.mins.y as f64, aabb.mins.z as f64),
        (aabb.maxs.x as f64, aabb.maxs.y as f64, aabb.maxs.z as f64),
    ))
}

/// Compute the center of mass of a mesh
///
/// Uses signed tetrahedron integration, which gives the true volumetric
/// centroid for watertight meshes. For open or flat geometry (near-zero
/// enclosed volume) it falls back to the vertex average.
pub fn compute_center_mass(mesh: &Mesh) -> Point3d {
    if mesh.vertices.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let mut volume = 0.0_f64;
    let mut centroid = (0.0_f64, 0.0_f64, 0.0_f64);

    for triangle in &mesh.triangles {
        if triangle.v1 >= mesh.vertices.len()
            || triangle.v2 >= mesh.vertices.len()
            || triangle.v3 >= mesh.vertices.len()
        {
            continue;
        }

        let v1 = &mesh.vertices[triangle.v1];
        let v2 = &mesh.vertices[triangle.v2];
        let v3 = &mesh.vertices[triangle.v3];

        // Signed volume of the tetrahedron (origin, v1, v2, v3); its
        // centroid is the average of the four corners.
        let det = v1.x * (v2.y * v3.z - v2.z * v3.y)
            + v2.x * (v3.y * v1.z - v3.z * v1.y)
            + v3.x * (v1.y * v2.z - v1.z * v2.y);
        volume += det;
        centroid.0 += det * (v1.x + v2.x + v3.x);
        centroid.1 += det * (v1.y + v2.y + v3.y);
        centroid.2 += det * (v1.z + v2.z + v3.z);
    }

    if volume.abs() > 1e-12 {
        let scale = 1.0 / (4.0 * volume);
        (centroid.0 * scale, centroid.1 * scale, centroid.2 * scale)
    } else {
        let n = mesh.vertices.len() as f64;
        let sum = mesh.vertices.iter().fold((0.0, 0.0, 0.0), |acc, v| {
            (acc.0 + v.x, acc.1 + v.y, acc.2 + v.z)
        });
        (sum.0 / n, sum.1 / n, sum.2 / n)
    }
}

fn undirected_edge(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

fn edge_use_counts(mesh: &Mesh) -> HashMap<(usize, usize), usize> {
    let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
    for triangle in &mesh.triangles {
        let [a, b, c] = triangle.indices();
        for (u, v) in [(a, b), (b, c), (c, a)] {
            *counts.entry(undirected_edge(u, v)).or_insert(0) += 1;
        }
    }
    counts
}

/// Whether every edge of the surface is shared by exactly two faces
///
/// An empty mesh is not watertight.
pub fn is_watertight(mesh: &Mesh) -> bool {
    if mesh.is_empty() {
        return false;
    }
    let counts = edge_use_counts(mesh);
    !counts.is_empty() && counts.values().all(|&c| c == 2)
}

/// The enclosed volume of the mesh, or `None` if it is not watertight
///
/// Never returns `Some(0.0)` as a stand-in for "undefined": absence means
/// the volume is not a meaningful quantity for this surface.
pub fn compute_volume(mesh: &Mesh) -> Option<f64> {
    if is_watertight(mesh) {
        Some(compute_signed_volume(mesh))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Repair primitives
// ---------------------------------------------------------------------------

/// Remove duplicate faces from the mesh
///
/// Faces are considered duplicate if they have the same vertex set,
/// regardless of winding order or starting vertex. The first occurrence is
/// kept. Returns the number of faces removed.
pub fn remove_duplicate_faces(mesh: &mut Mesh) -> usize {
    let original_count = mesh.triangles.len();

    let mut seen: HashSet<[usize; 3]> = HashSet::with_capacity(original_count);
    mesh.triangles.retain(|t| seen.insert(t.sorted_indices()));

    let removed = original_count - mesh.triangles.len();
    if removed > 0 {
        mesh.invalidate_normals();
    }
    removed
}

/// Remove degenerate faces (area at or below `area_epsilon`)
///
/// Faces that repeat a vertex index are always degenerate. Returns the
/// number of faces removed.
pub fn remove_degenerate_faces(mesh: &mut Mesh, area_epsilon: f64) -> usize {
    let original_count = mesh.triangles.len();
    let vertex_count = mesh.vertices.len();

    let vertices = std::mem::take(&mut mesh.vertices);
    mesh.triangles.retain(|t| {
        if t.is_collapsed() {
            return false;
        }
        if t.v1 >= vertex_count || t.v2 >= vertex_count || t.v3 >= vertex_count {
            return false;
        }
        triangle_area(&vertices[t.v1], &vertices[t.v2], &vertices[t.v3]) > area_epsilon
    });
    mesh.vertices = vertices;

    let removed = original_count - mesh.triangles.len();
    if removed > 0 {
        mesh.invalidate_normals();
    }
    removed
}

/// Rebuild the vertex list keeping only vertices referenced by some face
///
/// Face indices (and texture coordinates, when present) are remapped to the
/// compacted list. Returns the number of vertices removed.
pub fn remove_unreferenced_vertices(mesh: &mut Mesh) -> usize {
    let original_count = mesh.vertices.len();

    let mut referenced: HashSet<usize> = HashSet::with_capacity(original_count);
    for t in &mesh.triangles {
        referenced.insert(t.v1);
        referenced.insert(t.v2);
        referenced.insert(t.v3);
    }

    if referenced.len() == original_count {
        return 0;
    }

    let mut remap: HashMap<usize, usize> = HashMap::with_capacity(referenced.len());
    let mut new_vertices = Vec::with_capacity(referenced.len());
    let mut new_uvs = mesh.uvs.as_ref().map(|u| Vec::with_capacity(u.len()));

    for (old_idx, vertex) in mesh.vertices.iter().enumerate() {
        if referenced.contains(&old_idx) {
            remap.insert(old_idx, new_vertices.len());
            new_vertices.push(*vertex);
            if let (Some(out), Some(uvs)) = (new_uvs.as_mut(), mesh.uvs.as_ref()) {
                out.push(uvs[old_idx]);
            }
        }
    }

    for t in &mut mesh.triangles {
        t.v1 = remap[&t.v1];
        t.v2 = remap[&t.v2];
        t.v3 = remap[&t.v3];
    }

    let removed = original_count - new_vertices.len();
    mesh.vertices = new_vertices;
    mesh.uvs = new_uvs;
    mesh.invalidate_normals();
    removed
}

/// Remove vertices with NaN or infinite coordinates, and every face that
/// references one
///
/// Returns the number of vertices removed.
pub fn remove_nonfinite_vertices(mesh: &mut Mesh) -> usize {
    if mesh.vertices.iter().all(Vertex::is_finite) {
        return 0;
    }

    let finite: Vec<bool> = mesh.vertices.iter().map(Vertex::is_finite).collect();
    mesh.triangles
        .retain(|t| finite[t.v1] && finite[t.v2] && finite[t.v3]);

    let mut remap: HashMap<usize, usize> = HashMap::new();
    let mut new_vertices = Vec::with_capacity(mesh.vertices.len());
    let mut new_uvs = mesh.uvs.as_ref().map(|u| Vec::with_capacity(u.len()));

    for (old_idx, vertex) in mesh.vertices.iter().enumerate() {
        if finite[old_idx] {
            remap.insert(old_idx, new_vertices.len());
            new_vertices.push(*vertex);
            if let (Some(out), Some(uvs)) = (new_uvs.as_mut(), mesh.uvs.as_ref()) {
                out.push(uvs[old_idx]);
            }
        }
    }

    for t in &mut mesh.triangles {
        t.v1 = remap[&t.v1];
        t.v2 = remap[&t.v2];
        t.v3 = remap[&t.v3];
    }

    let removed = mesh.vertices.len() - new_vertices.len();
    mesh.vertices = new_vertices;
    mesh.uvs = new_uvs;
    mesh.invalidate_normals();
    removed
}

fn quantize(value: f64, tolerance: f64) -> i64 {
    (value / tolerance).round() as i64
}

/// Merge vertices that are coincident within `tolerance`
///
/// Uses a spatial hash over quantized coordinates. When the mesh carries
/// texture coordinates they are part of the merge key, so vertices on a
/// texture seam stay separate even when their positions coincide. Faces
/// collapsed by the merge are dropped and the vertex list is compacted.
/// Returns the number of vertices merged away.
pub fn merge_vertices(mesh: &mut Mesh, tolerance: f64) -> usize {
    if mesh.vertices.is_empty() {
        return 0;
    }

    type MergeKey = (i64, i64, i64, Option<(i64, i64)>);
    let mut buckets: HashMap<MergeKey, usize> = HashMap::with_capacity(mesh.vertices.len());
    let mut remap: Vec<usize> = Vec::with_capacity(mesh.vertices.len());
    let mut merged = 0;

    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        let uv_key = mesh.uvs.as_ref().map(|uvs| {
            let uv = uvs[idx];
            (quantize(uv.u, tolerance), quantize(uv.v, tolerance))
        });
        let key = (
            quantize(vertex.x, tolerance),
            quantize(vertex.y, tolerance),
            quantize(vertex.z, tolerance),
            uv_key,
        );
        match buckets.get(&key) {
            Some(&canonical) => {
                remap.push(canonical);
                merged += 1;
            }
            None => {
                buckets.insert(key, idx);
                remap.push(idx);
            }
        }
    }

    if merged == 0 {
        return 0;
    }

    for t in &mut mesh.triangles {
        t.v1 = remap[t.v1];
        t.v2 = remap[t.v2];
        t.v3 = remap[t.v3];
    }
    mesh.triangles.retain(|t| !t.is_collapsed());
    remove_unreferenced_vertices(mesh);
    mesh.invalidate_normals();
    merged
}

// ---------------------------------------------------------------------------
// Winding repair
// ---------------------------------------------------------------------------

/// Make face winding consistent across the surface, oriented outward
///
/// Propagates orientation face-to-face across manifold edges (two adjacent
/// faces are consistent when their shared edge runs in opposite directions).
/// If the resulting surface is watertight and encloses negative signed
/// volume, all faces are flipped so normals point outward.
///
/// Returns the number of faces flipped. Fails on non-orientable surfaces,
/// where no consistent winding exists.
pub fn fix_winding_order(mesh: &mut Mesh) -> Result<usize> {
    if mesh.triangles.is_empty() {
        return Ok(0);
    }

    // Map each undirected edge to the faces using it. Collapsed faces have
    // no orientation and are excluded from propagation.
    let mut edge_faces: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (face_idx, t) in mesh.triangles.iter().enumerate() {
        if t.is_collapsed() {
            continue;
        }
        let [a, b, c] = t.indices();
        for (u, v) in [(a, b), (b, c), (c, a)] {
            edge_faces
                .entry(undirected_edge(u, v))
                .or_default()
                .push(face_idx);
        }
    }

    // Directed edges of a face under its current (possibly flipped) state
    let directed = |t: &Triangle, flipped: bool| -> [(usize, usize); 3] {
        let [a, b, c] = t.indices();
        if flipped {
            [(b, a), (c, b), (a, c)]
        } else {
            [(a, b), (b, c), (c, a)]
        }
    };

    let face_count = mesh.triangles.len();
    let mut flip = vec![false; face_count];
    let mut visited = vec![false; face_count];
    let mut flipped_count = 0usize;

    for start in 0..face_count {
        if visited[start] || mesh.triangles[start].is_collapsed() {
            continue;
        }
        visited[start] = true;
        let mut stack = vec![start];

        while let Some(face_idx) = stack.pop() {
            let edges = directed(&mesh.triangles[face_idx], flip[face_idx]);
            for (u, v) in edges {
                let users = &edge_faces[&undirected_edge(u, v)];
                // Propagation across non-manifold edges (3+ faces) is
                // ambiguous; leave those faces to their own component.
                if users.len() != 2 {
                    continue;
                }
                for &other in users {
                    if other == face_idx {
                        continue;
                    }
                    // Consistent orientation means the neighbor traverses
                    // the shared edge in the opposite direction (v, u).
                    let other_edges = directed(&mesh.triangles[other], flip[other]);
                    let agrees = other_edges.contains(&(v, u));
                    let conflicts = other_edges.contains(&(u, v));
                    if visited[other] {
                        if conflicts {
                            return Err(Error::InvalidMesh(
                                "surface is not orientable; winding cannot be made consistent"
                                    .to_string(),
                            ));
                        }
                        continue;
                    }
                    visited[other] = true;
                    if conflicts && !agrees {
                        flip[other] = !flip[other];
                        flipped_count += 1;
                    }
                    stack.push(other);
                }
            }
        }
    }

    for (t, &f) in mesh.triangles.iter_mut().zip(&flip) {
        if f {
            std::mem::swap(&mut t.v2, &mut t.v3);
        }
    }

    // Outward orientation: a consistently wound closed surface with negative
    // signed volume is inside-out.
    if is_watertight(mesh) && compute_signed_volume(mesh) < 0.0 {
        for t in &mut mesh.triangles {
            std::mem::swap(&mut t.v2, &mut t.v3);
        }
        flipped_count += mesh.triangles.len();
    }

    if flipped_count > 0 {
        mesh.invalidate_normals();
    }
    Ok(flipped_count)
}

// ---------------------------------------------------------------------------
// Hole detection and filling
// ---------------------------------------------------------------------------

/// A closed loop of boundary edges representing a hole in the surface
#[derive(Debug, Clone)]
pub struct BoundaryLoop {
    /// Ordered vertex indices along the loop, in face-winding direction
    pub vertices: Vec<usize>,
}

impl BoundaryLoop {
    /// Number of edges (and vertices) in the loop
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Detect all boundary loops (holes) in the mesh
///
/// A boundary edge is a directed edge with no opposing partner. Boundary
/// edges are chained head-to-tail into closed loops; open chains (possible
/// on non-manifold geometry) are discarded.
pub fn detect_holes(mesh: &Mesh) -> Vec<BoundaryLoop> {
    let mut directed: HashSet<(usize, usize)> = HashSet::new();
    for t in &mesh.triangles {
        let [a, b, c] = t.indices();
        for edge in [(a, b), (b, c), (c, a)] {
            directed.insert(edge);
        }
    }

    // Boundary edges in face-winding direction
    let mut successors: HashMap<usize, usize> = HashMap::new();
    let mut boundary_count = 0;
    for &(u, v) in &directed {
        if !directed.contains(&(v, u)) {
            successors.insert(u, v);
            boundary_count += 1;
        }
    }

    if boundary_count == 0 {
        return Vec::new();
    }
    debug!("found {} boundary edges", boundary_count);

    let mut visited: HashSet<usize> = HashSet::new();
    let mut loops = Vec::new();

    let starts: Vec<usize> = successors.keys().copied().collect();
    for start in starts {
        if visited.contains(&start) {
            continue;
        }

        let mut loop_vertices = Vec::new();
        let mut current = start;
        loop {
            if !visited.insert(current) {
                // Reconverged without closing at the start vertex; the
                // chain is not a simple loop.
                loop_vertices.clear();
                break;
            }
            loop_vertices.push(current);
            match successors.get(&current) {
                Some(&next) if next == start => break,
                Some(&next) => current = next,
                None => {
                    loop_vertices.clear();
                    break;
                }
            }
        }

        if loop_vertices.len() >= 3 {
            loops.push(BoundaryLoop {
                vertices: loop_vertices,
            });
        }
    }

    loops
}

/// Triangulate boundary loops to close the surface
///
/// Each hole is closed with a triangle fan wound opposite to the boundary,
/// so the repaired surface stays consistently oriented. Loops larger than
/// `max_hole_edges` are logged and left open. Returns the number of faces
/// added.
///
/// Fails when boundary edges exist but no loop could be closed; callers in
/// the pipeline treat that as a skippable condition, never a fatal one.
pub fn fill_holes(mesh: &mut Mesh, max_hole_edges: usize) -> Result<usize> {
    let holes = detect_holes(mesh);
    if holes.is_empty() {
        return Ok(0);
    }

    let (fillable, skipped): (Vec<_>, Vec<_>) = holes
        .into_iter()
        .partition(|hole| hole.edge_count() <= max_hole_edges);

    for hole in &skipped {
        warn!(
            "leaving hole with {} edges open (max: {})",
            hole.edge_count(),
            max_hole_edges
        );
    }

    if fillable.is_empty() {
        return Err(Error::preprocessing(
            "hole filling",
            "all holes exceed the fillable size limit",
        ));
    }

    let mut added = 0;
    let mut filled = 0;
    for hole in &fillable {
        let ring = &hole.vertices;
        // Fan triangulation wound against the boundary direction: each
        // boundary edge (v_i, v_{i+1}) is consumed as (v_{i+1}, v_i) by the
        // new face, which keeps every undirected edge used exactly twice.
        for i in 1..ring.len() - 1 {
            mesh.triangles
                .push(Triangle::new(ring[0], ring[i + 1], ring[i]));
            added += 1;
        }
        filled += 1;
    }

    if filled > 0 {
        info!("filled {} holes with {} faces", filled, added);
        mesh.invalidate_normals();
    }
    Ok(added)
}

// ---------------------------------------------------------------------------
// Decimation
// ---------------------------------------------------------------------------

/// Quadric error matrix (symmetric 4x4, stored as its upper triangle)
#[derive(Debug, Clone, Copy, Default)]
struct Quadric {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
    g: f64,
    h: f64,
    i: f64,
    j: f64,
}

impl Quadric {
    /// Build a quadric from a plane equation ax + by + cz + d = 0 with a
    /// unit normal (a, b, c)
    fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            a: a * a,
            b: a * b,
            c: a * c,
            d: a * d,
            e: b * b,
            f: b * c,
            g: b * d,
            h: c * c,
            i: c * d,
            j: d * d,
        }
    }

    fn add(&mut self, other: &Self) {
        self.a += other.a;
        self.b += other.b;
        self.c += other.c;
        self.d += other.d;
        self.e += other.e;
        self.f += other.f;
        self.g += other.g;
        self.h += other.h;
        self.i += other.i;
        self.j += other.j;
    }

    fn combined(&self, other: &Self) -> Self {
        let mut q = *self;
        q.add(other);
        q
    }

    /// v^T Q v for v = [x, y, z, 1]: the sum of squared distances to all
    /// contributing planes
    fn evaluate(&self, x: f64, y: f64, z: f64) -> f64 {
        x * (x * self.a + 2.0 * (y * self.b + z * self.c + self.d))
            + y * (y * self.e + 2.0 * (z * self.f + self.g))
            + z * (z * self.h + 2.0 * self.i)
            + self.j
    }
}

#[derive(Debug)]
struct EdgeCollapse {
    cost: f64,
    v_keep: usize,
    v_drop: usize,
    keep_version: u32,
    drop_version: u32,
    position: Vertex,
}

impl PartialEq for EdgeCollapse {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl Eq for EdgeCollapse {}

impl Ord for EdgeCollapse {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap on cost
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}
impl PartialOrd for EdgeCollapse {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

fn best_collapse(
    quadrics: &[Quadric],
    positions: &[Vertex],
    versions: &[u32],
    a: usize,
    b: usize,
) -> EdgeCollapse {
    let q = quadrics[a].combined(&quadrics[b]);
    let pa = positions[a];
    let pb = positions[b];
    let mid = Vertex::new(
        (pa.x + pb.x) * 0.5,
        (pa.y + pb.y) * 0.5,
        (pa.z + pb.z) * 0.5,
    );

    // Cheap optimal-position approximation: best of the two endpoints and
    // the midpoint.
    let candidates = [pa, pb, mid];
    let mut best = pa;
    let mut best_cost = f64::INFINITY;
    for candidate in candidates {
        let cost = q.evaluate(candidate.x, candidate.y, candidate.z);
        if cost < best_cost {
            best_cost = cost;
            best = candidate;
        }
    }

    EdgeCollapse {
        cost: best_cost,
        v_keep: a,
        v_drop: b,
        keep_version: versions[a],
        drop_version: versions[b],
        position: best,
    }
}

/// Simplify a mesh to approximately `target_faces` using quadric error
/// metrics
///
/// Classic Garland-Heckbert edge collapse with a lazily invalidated heap.
/// The input is not modified; a new simplified mesh is returned. Texture
/// coordinates do not survive decimation.
///
/// Fails if the target is zero or the mesh has no faces.
pub fn decimate(mesh: &Mesh, target_faces: usize) -> Result<Mesh> {
    if target_faces == 0 {
        return Err(Error::Validation(
            "decimation target must be at least one face".to_string(),
        ));
    }
    if mesh.triangles.is_empty() {
        return Err(Error::Validation(
            "cannot decimate a mesh with no faces".to_string(),
        ));
    }
    if mesh.triangles.len() <= target_faces {
        return Ok(mesh.clone());
    }

    let mut positions: Vec<Vertex> = mesh.vertices.clone();
    let mut faces: Vec<Triangle> = mesh.triangles.clone();
    let mut alive: Vec<bool> = vec![true; faces.len()];
    let mut active_faces = faces.len();

    // Per-vertex quadrics from incident face planes
    let mut quadrics: Vec<Quadric> = vec![Quadric::default(); positions.len()];
    for t in &faces {
        let v0 = &positions[t.v1];
        let normal = calculate_face_normal(v0, &positions[t.v2], &positions[t.v3]);
        if normal == (0.0, 0.0, 0.0) {
            continue;
        }
        let d = -(normal.0 * v0.x + normal.1 * v0.y + normal.2 * v0.z);
        let q = Quadric::from_plane(normal.0, normal.1, normal.2, d);
        quadrics[t.v1].add(&q);
        quadrics[t.v2].add(&q);
        quadrics[t.v3].add(&q);
    }

    // Vertex -> incident face indices
    let mut vertex_faces: Vec<Vec<usize>> = vec![Vec::new(); positions.len()];
    for (face_idx, t) in faces.iter().enumerate() {
        vertex_faces[t.v1].push(face_idx);
        vertex_faces[t.v2].push(face_idx);
        vertex_faces[t.v3].push(face_idx);
    }

    let mut versions: Vec<u32> = vec![0; positions.len()];

    let mut edges: HashSet<(usize, usize)> = HashSet::new();
    for t in &faces {
        let [a, b, c] = t.indices();
        for (u, v) in [(a, b), (b, c), (c, a)] {
            edges.insert(undirected_edge(u, v));
        }
    }

    let mut heap: BinaryHeap<EdgeCollapse> = edges
        .iter()
        .map(|&(a, b)| best_collapse(&quadrics, &positions, &versions, a, b))
        .collect();

    while active_faces > target_faces {
        let Some(collapse) = heap.pop() else {
            warn!(
                "decimation heap exhausted at {} faces (target {})",
                active_faces, target_faces
            );
            break;
        };

        // Stale entry: one of the endpoints changed since this was queued
        if versions[collapse.v_keep] != collapse.keep_version
            || versions[collapse.v_drop] != collapse.drop_version
        {
            continue;
        }

        let keep = collapse.v_keep;
        let drop = collapse.v_drop;

        positions[keep] = collapse.position;
        let drop_quadric = quadrics[drop];
        quadrics[keep].add(&drop_quadric);
        versions[keep] += 1;
        versions[drop] += 1;

        // Rewire faces incident to the dropped vertex
        let drop_faces = std::mem::take(&mut vertex_faces[drop]);
        for face_idx in drop_faces {
            if !alive[face_idx] {
                continue;
            }
            let t = &mut faces[face_idx];
            if t.v1 == drop {
                t.v1 = keep;
            }
            if t.v2 == drop {
                t.v2 = keep;
            }
            if t.v3 == drop {
                t.v3 = keep;
            }
            if t.is_collapsed() {
                alive[face_idx] = false;
                active_faces -= 1;
            } else if !vertex_faces[keep].contains(&face_idx) {
                vertex_faces[keep].push(face_idx);
            }
        }

        // Refresh candidate collapses around the surviving vertex
        let mut neighbors: HashSet<usize> = HashSet::new();
        for &face_idx in &vertex_faces[keep] {
            if !alive[face_idx] {
                continue;
            }
            for idx in faces[face_idx].indices() {
                if idx != keep {
                    neighbors.insert(idx);
                }
            }
        }
        for n in neighbors {
            heap.push(best_collapse(&quadrics, &positions, &versions, keep, n));
        }
    }

    // Compact the result
    let mut result = Mesh::with_capacity(positions.len(), active_faces);
    let mut remap: HashMap<usize, usize> = HashMap::new();
    for (face_idx, t) in faces.iter().enumerate() {
        if !alive[face_idx] {
            continue;
        }
        let mut mapped = [0usize; 3];
        for (slot, idx) in mapped.iter_mut().zip(t.indices()) {
            let next = remap.len();
            let new_idx = *remap.entry(idx).or_insert(next);
            if new_idx == result.vertices.len() {
                result.vertices.push(positions[idx]);
            }
            *slot = new_idx;
        }
        result
            .triangles
            .push(Triangle::new(mapped[0], mapped[1], mapped[2]));
    }

    debug!(
        "decimated {} -> {} faces (target {})",
        mesh.triangles.len(),
        result.triangles.len(),
        target_faces
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Apply an affine transform to every vertex of the mesh in place
///
/// Cached normals are invalidated; callers that need them recompute via
/// [`ensure_normals`].
pub fn apply_transform(mesh: &mut Mesh, transform: &Matrix4<f64>) {
    for v in &mut mesh.vertices {
        let p = transform.transform_point(&Point3::new(v.x, v.y, v.z));
        v.x = p.x;
        v.y = p.y;
        v.z = p.z;
    }
    mesh.invalidate_normals();
}

/// Uniformly scale the mesh about the origin in place
pub fn apply_scale(mesh: &mut Mesh, factor: f64) {
    for v in &mut mesh.vertices {
        v.x *= factor;
        v.y *= factor;
        v.z *= factor;
    }
    mesh.invalidate_normals();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::DEGENERATE_AREA_EPSILON;

    fn unit_cube() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::new(0.0, 0.0, 0.0)); // 0
        mesh.vertices.push(Vertex::new(1.0, 0.0, 0.0)); // 1
        mesh.vertices.push(Vertex::new(1.0, 1.0, 0.0)); // 2
        mesh.vertices.push(Vertex::new(0.0, 1.0, 0.0)); // 3
        mesh.vertices.push(Vertex::new(0.0, 0.0, 1.0)); // 4
        mesh.vertices.push(Vertex::new(1.0, 0.0, 1.0)); // 5
        mesh.vertices.push(Vertex::new(1.0, 1.0, 1.0)); // 6
        mesh.vertices.push(Vertex::new(0.0, 1.0, 1.0)); // 7

        // Outward winding
        mesh.triangles.push(Triangle::new(0, 2, 1)); // bottom
        mesh.triangles.push(Triangle::new(0, 3, 2));
        mesh.triangles.push(Triangle::new(4, 5, 6)); // top
        mesh.triangles.push(Triangle::new(4, 6, 7));
        mesh.triangles.push(Triangle::new(0, 1, 5)); // front
        mesh.triangles.push(Triangle::new(0, 5, 4));
        mesh.triangles.push(Triangle::new(1, 2, 6)); // right
        mesh.triangles.push(Triangle::new(1, 6, 5));
        mesh.triangles.push(Triangle::new(2, 3, 7)); // back
        mesh.triangles.push(Triangle::new(2, 7, 6));
        mesh.triangles.push(Triangle::new(3, 0, 4)); // left
        mesh.triangles.push(Triangle::new(3, 4, 7));
        mesh
    }

    #[test]
    fn test_cube_volume_and_watertight() {
        let cube = unit_cube();
        assert!(is_watertight(&cube));
        approx::assert_relative_eq!(compute_volume(&cube).unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_open_mesh_has_no_volume() {
        let mut cube = unit_cube();
        cube.triangles.truncate(10); // remove the left face pair
        assert!(!is_watertight(&cube));
        assert!(compute_volume(&cube).is_none());
    }

    #[test]
    fn test_face_normal_direction() {
        let n = calculate_face_normal(
            &Vertex::new(0.0, 0.0, 0.0),
            &Vertex::new(1.0, 0.0, 0.0),
            &Vertex::new(0.0, 1.0, 0.0),
        );
        assert!((n.2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_face_normal_is_zero() {
        let v = Vertex::new(1.0, 1.0, 1.0);
        assert_eq!(calculate_face_normal(&v, &v, &v), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_ensure_normals_unit_length() {
        let mut cube = unit_cube();
        ensure_normals(&mut cube);
        for n in cube.face_normals().unwrap() {
            assert!((norm(*n) - 1.0).abs() < 1e-9);
        }
        for n in cube.vertex_normals().unwrap() {
            assert!((norm(*n) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_remove_duplicate_faces() {
        let mut cube = unit_cube();
        // Same vertex set, rotated start and reversed winding
        cube.triangles.push(Triangle::new(2, 1, 0));
        cube.triangles.push(Triangle::new(1, 0, 2));
        assert_eq!(remove_duplicate_faces(&mut cube), 2);
        assert_eq!(cube.triangles.len(), 12);
    }

    #[test]
    fn test_remove_degenerate_faces() {
        let mut cube = unit_cube();
        cube.triangles.push(Triangle::new(0, 0, 1));
        cube.triangles.push(Triangle::new(0, 1, 1));
        assert_eq!(remove_degenerate_faces(&mut cube, DEGENERATE_AREA_EPSILON), 2);
    }

    #[test]
    fn test_remove_unreferenced_vertices_remaps_faces() {
        let mut cube = unit_cube();
        cube.vertices.push(Vertex::new(99.0, 99.0, 99.0));
        assert_eq!(remove_unreferenced_vertices(&mut cube), 1);
        assert_eq!(cube.vertices.len(), 8);
        assert!(is_watertight(&cube));
        assert!((compute_volume(&cube).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_remove_nonfinite_vertices() {
        let mut cube = unit_cube();
        cube.vertices.push(Vertex::new(f64::NAN, 0.0, 0.0));
        cube.triangles.push(Triangle::new(0, 1, 8));
        assert_eq!(remove_nonfinite_vertices(&mut cube), 1);
        assert_eq!(cube.vertices.len(), 8);
        assert_eq!(cube.triangles.len(), 12);
    }

    #[test]
    fn test_merge_vertices_welds_coincident() {
        let mut cube = unit_cube();
        // Duplicate vertex 0 and reroute one face corner to it
        cube.vertices.push(Vertex::new(0.0, 0.0, 0.0));
        cube.triangles[0].v1 = 8;
        assert!(!is_watertight(&cube));
        let merged = merge_vertices(&mut cube, MERGE_TOLERANCE);
        assert_eq!(merged, 1);
        assert_eq!(cube.vertices.len(), 8);
        assert!(is_watertight(&cube));
    }

    #[test]
    fn test_merge_vertices_respects_uv_seams() {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::new(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::new(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::new(0.0, 1.0, 0.0));
        // Coincides with vertex 0 but carries a different uv
        mesh.vertices.push(Vertex::new(0.0, 0.0, 0.0));
        mesh.uvs = Some(vec![
            crate::mesh::TexCoord::new(0.0, 0.0),
            crate::mesh::TexCoord::new(1.0, 0.0),
            crate::mesh::TexCoord::new(0.0, 1.0),
            crate::mesh::TexCoord::new(0.5, 0.5),
        ]);
        mesh.triangles.push(Triangle::new(0, 1, 2));
        mesh.triangles.push(Triangle::new(3, 2, 1));
        assert_eq!(merge_vertices(&mut mesh, MERGE_TOLERANCE), 0);
        assert_eq!(mesh.vertices.len(), 4);
    }

    #[test]
    fn test_fix_winding_repairs_flipped_face() {
        let mut cube = unit_cube();
        // Flip a top face: unlike the bottom faces (coplanar with the
        // origin) its tetrahedron contributes to the signed volume, so the
        // damage is observable before the repair.
        let t = &mut cube.triangles[2];
        std::mem::swap(&mut t.v2, &mut t.v3);
        assert!(compute_signed_volume(&cube) < 1.0 - 1e-9);
        let flipped = fix_winding_order(&mut cube).unwrap();
        assert!(flipped >= 1);
        assert!((compute_signed_volume(&cube) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fix_winding_flips_inside_out_mesh() {
        let mut cube = unit_cube();
        for t in &mut cube.triangles {
            std::mem::swap(&mut t.v2, &mut t.v3);
        }
        assert!(compute_signed_volume(&cube) < 0.0);
        fix_winding_order(&mut cube).unwrap();
        assert!(compute_signed_volume(&cube) > 0.0);
    }

    #[test]
    fn test_detect_and_fill_hole() {
        let mut cube = unit_cube();
        // Remove the top face pair, leaving a square hole
        cube.triangles.retain(|t| {
            t.sorted_indices() != [4, 5, 6] && t.sorted_indices() != [4, 6, 7]
        });
        assert!(!is_watertight(&cube));

        let holes = detect_holes(&cube);
        assert_eq!(holes.len(), 1);
        assert_eq!(holes[0].edge_count(), 4);

        let added = fill_holes(&mut cube, MAX_HOLE_EDGES).unwrap();
        assert_eq!(added, 2);
        assert!(is_watertight(&cube));
        assert!((compute_volume(&cube).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_holes_noop_on_watertight() {
        let mut cube = unit_cube();
        assert_eq!(fill_holes(&mut cube, MAX_HOLE_EDGES).unwrap(), 0);
    }

    #[test]
    fn test_fill_holes_respects_size_limit() {
        let mut cube = unit_cube();
        cube.triangles.retain(|t| {
            t.sorted_indices() != [4, 5, 6] && t.sorted_indices() != [4, 6, 7]
        });
        // The 4-edge hole exceeds a limit of 3, so nothing is fillable
        assert!(fill_holes(&mut cube, 3).is_err());
    }

    #[test]
    fn test_decimate_reduces_face_count() {
        // Subdivided ground plane: enough faces to collapse meaningfully
        let mut mesh = Mesh::new();
        let n = 11;
        for y in 0..n {
            for x in 0..n {
                mesh.vertices.push(Vertex::new(x as f64, y as f64, 0.0));
            }
        }
        for y in 0..n - 1 {
            for x in 0..n - 1 {
                let i = y * n + x;
                mesh.triangles.push(Triangle::new(i, i + 1, i + n));
                mesh.triangles.push(Triangle::new(i + 1, i + n + 1, i + n));
            }
        }
        let original = mesh.triangles.len();
        let simplified = decimate(&mesh, original / 2).unwrap();
        assert!(simplified.triangles.len() <= original / 2 + 2);
        assert!(!simplified.triangles.is_empty());
        for t in &simplified.triangles {
            assert!(t.v1 < simplified.vertices.len());
            assert!(t.v2 < simplified.vertices.len());
            assert!(t.v3 < simplified.vertices.len());
        }
    }

    #[test]
    fn test_decimate_below_target_is_identity() {
        let cube = unit_cube();
        let result = decimate(&cube, 100).unwrap();
        assert_eq!(result.triangles.len(), 12);
    }

    #[test]
    fn test_apply_scale_scales_volume() {
        let mut cube = unit_cube();
        apply_scale(&mut cube, 2.0);
        assert!((compute_volume(&cube).unwrap() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_apply_transform_mirror_flips_volume_sign() {
        let mut cube = unit_cube();
        let mut mirror = Matrix4::identity();
        mirror[(0, 0)] = -1.0;
        apply_transform(&mut cube, &mirror);
        // Mirroring inverts orientation; the signed volume flips sign
        assert!(compute_signed_volume(&cube) < 0.0);
    }

    #[test]
    fn test_center_mass_of_cube() {
        let cube = unit_cube();
        let c = compute_center_mass(&cube);
        approx::assert_relative_eq!(c.0, 0.5, epsilon = 1e-9);
        approx::assert_relative_eq!(c.1, 0.5, epsilon = 1e-9);
        approx::assert_relative_eq!(c.2, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_aabb_of_cube() {
        let cube = unit_cube();
        let (min, max) = compute_mesh_aabb(&cube).unwrap();
        for (value, expected) in [
            (min.0, 0.0),
            (min.1, 0.0),
            (min.2, 0.0),
            (max.0, 1.0),
            (max.1, 1.0),
            (max.2, 1.0),
        ] {
            approx::assert_relative_eq!(value, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_aabb_errors_on_empty_mesh() {
        assert!(compute_mesh_aabb(&Mesh::new()).is_err());
        let mut points_only = Mesh::new();
        points_only.vertices.push(Vertex::new(0.0, 0.0, 0.0));
        assert!(compute_mesh_aabb(&points_only).is_err());
    }
}
