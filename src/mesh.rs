//! Core mesh types and structures
//!
//! A [`Mesh`] is an indexed triangle surface: a list of vertices and a list
//! of index triples into that list. Derived data (face normals, vertex
//! normals) is cached on the mesh but only ever filled by an explicit call
//! to [`crate::mesh_ops::ensure_normals`]; topology-mutating operations
//! invalidate the caches.

/// A 3D vector represented as (x, y, z)
pub type Vector3 = (f64, f64, f64);

/// A 3D point represented as (x, y, z)
pub type Point3d = (f64, f64, f64);

/// An axis-aligned bounding box represented as (min_point, max_point)
pub type BoundingBox = (Point3d, Point3d);

/// Faces with area at or below this threshold are considered degenerate
pub const DEGENERATE_AREA_EPSILON: f64 = 1e-8;

/// A mesh vertex with 3D coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Whether all coordinates are finite (no NaN or infinity)
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A texture coordinate (u, v)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexCoord {
    /// U coordinate
    pub u: f64,
    /// V coordinate
    pub v: f64,
}

impl TexCoord {
    /// Create a new texture coordinate
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

/// A triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: usize,
    /// Index of second vertex
    pub v2: usize,
    /// Index of third vertex
    pub v3: usize,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v1: usize, v2: usize, v3: usize) -> Self {
        Self { v1, v2, v3 }
    }

    /// The three vertex indices as an array
    pub fn indices(&self) -> [usize; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// Canonical orderless identity of this triangle
    ///
    /// Two triangles with the same vertex set compare equal under this key
    /// regardless of winding or starting vertex.
    pub fn sorted_indices(&self) -> [usize; 3] {
        let mut key = self.indices();
        key.sort_unstable();
        key
    }

    /// Whether the triangle repeats a vertex index
    pub fn is_collapsed(&self) -> bool {
        self.v1 == self.v2 || self.v2 == self.v3 || self.v1 == self.v3
    }
}

/// An indexed triangle mesh with cached derived normals
///
/// Normal caches start empty and are only filled by
/// [`crate::mesh_ops::ensure_normals`]. Any operation that changes the
/// vertex or triangle lists must call [`Mesh::invalidate_normals`].
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// List of vertices
    pub vertices: Vec<Vertex>,
    /// List of triangles
    pub triangles: Vec<Triangle>,
    /// Optional texture coordinates, parallel to `vertices`
    ///
    /// When present, texture coordinates participate in the vertex-merge key
    /// so that seams are not welded shut.
    pub uvs: Option<Vec<TexCoord>>,
    face_normals: Option<Vec<Vector3>>,
    vertex_normals: Option<Vec<Vector3>>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new mesh with pre-allocated capacity
    ///
    /// This is useful for performance when the number of vertices and
    /// triangles is known in advance, as it avoids multiple reallocations.
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
            uvs: None,
            face_normals: None,
            vertex_normals: None,
        }
    }

    /// Whether the mesh has no vertices or no triangles
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }

    /// Cached per-face normals, if they have been computed
    pub fn face_normals(&self) -> Option<&[Vector3]> {
        self.face_normals.as_deref()
    }

    /// Cached per-vertex normals, if they have been computed
    pub fn vertex_normals(&self) -> Option<&[Vector3]> {
        self.vertex_normals.as_deref()
    }

    /// Store computed normals in the caches
    pub(crate) fn set_normals(&mut self, face: Vec<Vector3>, vertex: Vec<Vector3>) {
        self.face_normals = Some(face);
        self.vertex_normals = Some(vertex);
    }

    /// Drop cached normals after a topology change
    pub fn invalidate_normals(&mut self) {
        self.face_normals = None;
        self.vertex_normals = None;
    }
}

/// A single piece of geometry decoded from an input file
///
/// Mesh files can carry things other than polygonal surfaces; the loader
/// rejects anything that is not a [`Geometry::Mesh`].
#[derive(Debug, Clone)]
pub enum Geometry {
    /// A polygonal triangle mesh
    Mesh(Mesh),
    /// A bare point cloud (vertices without any faces)
    Points(Vec<Vertex>),
}

impl Geometry {
    /// A short human-readable name for the geometry kind
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Mesh(_) => "mesh",
            Geometry::Points(_) => "point cloud",
        }
    }
}

/// The decoded content of an input file: zero or more geometries
///
/// Multi-object files (e.g. OBJ with several `o` groups) decode to a scene
/// with multiple entries; the loader selects the first one.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Decoded geometries in file order
    pub geometries: Vec<Geometry>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a single mesh in a scene
    pub fn from_mesh(mesh: Mesh) -> Self {
        Self {
            geometries: vec![Geometry::Mesh(mesh)],
        }
    }
}
