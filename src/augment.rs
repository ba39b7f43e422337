//! Mesh augmentation
//!
//! Produces named variants of an input mesh: a mirror image
//! (unconditionally), plus scaled, rotated and simplified variants
//! depending on the parameters and the mesh size. Every variant is an
//! independent copy; the input mesh is never mutated.

use std::collections::BTreeMap;

use nalgebra::{Matrix4, Rotation3, Unit, Vector3 as NVector3};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::mesh::Mesh;
use crate::mesh_ops;

/// Meshes with more faces than this get a `simplified` variant
pub const SIMPLIFY_FACE_THRESHOLD: usize = 1000;

/// Parameters for the augmentation pipeline
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AugmentOptions {
    /// Uniform scale factor; a `scaled` variant is produced iff != 1.0
    pub scale: f64,
    /// Rotation about the X axis, in degrees
    pub rotate_x: f64,
    /// Rotation about the Y axis, in degrees
    pub rotate_y: f64,
    /// Rotation about the Z axis, in degrees
    pub rotate_z: f64,
}

impl Default for AugmentOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotate_x: 0.0,
            rotate_y: 0.0,
            rotate_z: 0.0,
        }
    }
}

impl AugmentOptions {
    /// Whether any rotation angle is nonzero
    pub fn has_rotation(&self) -> bool {
        self.rotate_x != 0.0 || self.rotate_y != 0.0 || self.rotate_z != 0.0
    }
}

/// The produced variants and step descriptions
#[derive(Debug, Clone)]
pub struct AugmentResult {
    /// Variant name -> mesh, in stable (sorted) order
    pub variants: BTreeMap<String, Mesh>,
    /// Descriptions of the variants produced, with their parameters
    pub steps: Vec<String>,
}

/// Produce augmentation variants of `mesh`
///
/// - `scaled`: uniform scale about the origin, only when `scale != 1.0`.
/// - `rotated`: per-axis rotations applied sequentially in X, Y, Z order
///   (order matters; this is not a combined Euler matrix), only when at
///   least one angle is nonzero.
/// - `mirrored`: reflection across the X axis, always produced.
/// - `simplified`: quadric decimation to half the face count, only when
///   the input has more than [`SIMPLIFY_FACE_THRESHOLD`] faces.
pub fn augment(mesh: &Mesh, options: &AugmentOptions) -> Result<AugmentResult> {
    let mut variants: BTreeMap<String, Mesh> = BTreeMap::new();
    let mut steps: Vec<String> = Vec::new();

    if options.scale != 1.0 {
        let mut scaled = mesh.clone();
        mesh_ops::apply_scale(&mut scaled, options.scale);
        variants.insert("scaled".to_string(), scaled);
        steps.push(format!("Scaled by factor {}", options.scale));
    }

    if options.has_rotation() {
        let mut rotated = mesh.clone();
        let axes: [(f64, Unit<NVector3<f64>>); 3] = [
            (options.rotate_x, NVector3::x_axis()),
            (options.rotate_y, NVector3::y_axis()),
            (options.rotate_z, NVector3::z_axis()),
        ];
        // Sequential application: each rotation acts on the already
        // rotated mesh, so X-then-Y differs from Y-then-X.
        for (degrees, axis) in axes {
            if degrees != 0.0 {
                let rotation = Rotation3::from_axis_angle(&axis, degrees.to_radians());
                mesh_ops::apply_transform(&mut rotated, &rotation.to_homogeneous());
            }
        }
        variants.insert("rotated".to_string(), rotated);
        steps.push(format!(
            "Rotated: X={}°, Y={}°, Z={}°",
            options.rotate_x, options.rotate_y, options.rotate_z
        ));
    }

    let mut mirrored = mesh.clone();
    let mut mirror = Matrix4::identity();
    mirror[(0, 0)] = -1.0;
    mesh_ops::apply_transform(&mut mirrored, &mirror);
    // A reflection inverts orientation; swap winding so normals still
    // point outward.
    for t in &mut mirrored.triangles {
        std::mem::swap(&mut t.v2, &mut t.v3);
    }
    variants.insert("mirrored".to_string(), mirrored);
    steps.push("Mirrored along X-axis".to_string());

    if mesh.triangles.len() > SIMPLIFY_FACE_THRESHOLD {
        let target_faces = mesh.triangles.len() / 2;
        let simplified = mesh_ops::decimate(mesh, target_faces)?;
        debug!(
            "simplified variant: {} -> {} faces",
            mesh.triangles.len(),
            simplified.triangles.len()
        );
        variants.insert("simplified".to_string(), simplified);
        steps.push(format!("Simplified to {} faces", target_faces));
    }

    Ok(AugmentResult { variants, steps })
}
