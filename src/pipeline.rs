//! The mesh preprocessing pipeline
//!
//! A fixed, order-dependent sequence of repair stages over a copy of the
//! input mesh:
//!
//! 1. Deduplication (optional): duplicate faces, unreferenced vertices,
//!    degenerate faces.
//! 2. Normal repair (optional): consistent outward winding, fresh face
//!    normals; fresh vertex normals too when the mesh is watertight.
//! 3. Hole filling (optional, only when not watertight): best effort —
//!    failure degrades to a logged step, never an error.
//! 4. Final cleanup (always): degenerate/unreferenced/non-finite removal,
//!    vertex welding, normal recomputation. Also never fails the request.
//!
//! Steps that had no observable effect leave no entry in the step log.
//! The original mesh is kept untouched for before/after statistics.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mesh::{BoundingBox, Mesh, DEGENERATE_AREA_EPSILON};
use crate::mesh_ops::{self, MAX_HOLE_EDGES, MERGE_TOLERANCE};

/// Flags controlling which optional pipeline stages run
///
/// The final cleanup stage is unconditional and not represented here.
#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    /// Stage 1: remove duplicate faces, unreferenced vertices and
    /// degenerate faces
    pub remove_duplicates: bool,
    /// Stage 2: repair winding and recompute normals
    pub fix_normals: bool,
    /// Stage 3: close boundary loops when the mesh is not watertight
    pub fill_holes: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            remove_duplicates: true,
            fix_normals: true,
            fill_holes: true,
        }
    }
}

/// Counts describing the mesh before processing
#[derive(Debug, Clone, Serialize)]
pub struct OriginalStats {
    /// Vertex count
    pub vertices: usize,
    /// Face count
    pub faces: usize,
    /// Enclosed volume; `None` unless watertight
    pub volume: Option<f64>,
}

/// Counts and properties of the processed mesh
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedStats {
    /// Vertex count
    pub vertices: usize,
    /// Face count
    pub faces: usize,
    /// Enclosed volume; `None` unless watertight
    pub volume: Option<f64>,
    /// Whether the processed mesh is watertight
    pub is_watertight: bool,
    /// Bounding box of the processed mesh, if it still has geometry
    pub bounds: Option<BoundingBox>,
}

/// Deltas between original and processed meshes
///
/// Reductions are signed: hole filling can add faces, making the net
/// reduction negative.
#[derive(Debug, Clone, Serialize)]
pub struct Improvements {
    /// `original.vertices - processed.vertices`
    pub vertices_reduced: i64,
    /// `original.faces - processed.faces`
    pub faces_reduced: i64,
    /// `processed.volume - original.volume`; `None` unless both meshes are
    /// watertight
    pub volume_change: Option<f64>,
}

/// Before/after statistics for one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    /// The mesh as uploaded
    pub original: OriginalStats,
    /// The mesh after all stages
    pub processed: ProcessedStats,
    /// Derived deltas
    pub improvements: Improvements,
}

/// The outcome of a preprocessing run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The processed mesh
    pub mesh: Mesh,
    /// Human-readable descriptions of the steps that had an effect
    pub steps: Vec<String>,
    /// Before/after statistics
    pub statistics: Statistics,
}

/// Run the preprocessing pipeline over a copy of `mesh`
///
/// Fatal errors can only arise from stage 1 or 2 (and surface as
/// [`Error::Preprocessing`]); stages 3 and 4 degrade to logged step
/// entries on failure.
pub fn preprocess(mesh: &Mesh, options: &PreprocessOptions) -> Result<PipelineResult> {
    let mut processed = mesh.clone();
    let mut steps: Vec<String> = Vec::new();

    let original = OriginalStats {
        vertices: processed.vertices.len(),
        faces: processed.triangles.len(),
        volume: mesh_ops::compute_volume(&processed),
    };

    // Stage 1: deduplication
    if options.remove_duplicates {
        let initial_vertices = processed.vertices.len();
        let initial_faces = processed.triangles.len();

        let duplicates = mesh_ops::remove_duplicate_faces(&mut processed);
        if duplicates > 0 {
            steps.push(format!("Removed {} duplicate faces", duplicates));
        }

        let unreferenced = mesh_ops::remove_unreferenced_vertices(&mut processed);
        if unreferenced > 0 {
            steps.push(format!("Removed {} unreferenced vertices", unreferenced));
        }

        let degenerate =
            mesh_ops::remove_degenerate_faces(&mut processed, DEGENERATE_AREA_EPSILON);
        if degenerate > 0 {
            steps.push(format!("Removed {} degenerate faces", degenerate));
        }

        let vertices_reduced = initial_vertices - processed.vertices.len();
        let faces_reduced = initial_faces - processed.triangles.len();
        if vertices_reduced > 0 {
            steps.push(format!("Reduced {} vertices", vertices_reduced));
        }
        if faces_reduced > 0 {
            steps.push(format!("Reduced {} faces", faces_reduced));
        }
    }

    // Stage 2: normal repair
    if options.fix_normals {
        let flipped = mesh_ops::fix_winding_order(&mut processed)
            .map_err(|e| Error::preprocessing("normal repair", e.to_string()))?;
        debug!("winding repair flipped {} faces", flipped);
        processed.invalidate_normals();
        mesh_ops::ensure_normals(&mut processed);
        steps.push("Fixed surface normals".to_string());

        // Watertight meshes additionally get vertex normals guaranteed
        // consistent with the repaired winding
        if mesh_ops::is_watertight(&processed) {
            steps.push("Fixed face winding order".to_string());
        }
    }

    // Stage 3: hole filling (best effort, never fatal)
    if options.fill_holes && !mesh_ops::is_watertight(&processed) {
        match mesh_ops::fill_holes(&mut processed, MAX_HOLE_EDGES) {
            Ok(added) if added > 0 => {
                steps.push(format!("Filled holes (added {} faces)", added));
            }
            Ok(_) => {}
            Err(e) => {
                warn!("could not fill holes: {}", e);
                steps.push("Hole filling skipped".to_string());
            }
        }
    }

    // Stage 4: final cleanup (always runs, never fatal)
    match final_cleanup(&mut processed) {
        Ok(()) => {
            steps.push("Performed final geometry cleanup".to_string());
            steps.push("Finalized surface normals".to_string());
        }
        Err(e) => {
            warn!("some cleanup steps skipped: {}", e);
            steps.push("Some cleanup steps skipped".to_string());
        }
    }

    let processed_stats = ProcessedStats {
        vertices: processed.vertices.len(),
        faces: processed.triangles.len(),
        volume: mesh_ops::compute_volume(&processed),
        is_watertight: mesh_ops::is_watertight(&processed),
        bounds: mesh_ops::compute_mesh_aabb(&processed).ok(),
    };

    let improvements = Improvements {
        vertices_reduced: original.vertices as i64 - processed_stats.vertices as i64,
        faces_reduced: original.faces as i64 - processed_stats.faces as i64,
        volume_change: match (original.volume, processed_stats.volume) {
            (Some(before), Some(after)) => Some(after - before),
            _ => None,
        },
    };

    Ok(PipelineResult {
        mesh: processed,
        steps,
        statistics: Statistics {
            original,
            processed: processed_stats,
            improvements,
        },
    })
}

/// The unconditional cleanup stage
///
/// Kernel failures here are reported to the caller, which downgrades them
/// to a "skipped" step entry.
fn final_cleanup(mesh: &mut Mesh) -> Result<()> {
    mesh_ops::remove_degenerate_faces(mesh, DEGENERATE_AREA_EPSILON);
    mesh_ops::remove_unreferenced_vertices(mesh);
    mesh_ops::remove_nonfinite_vertices(mesh);
    mesh_ops::merge_vertices(mesh, MERGE_TOLERANCE);
    mesh_ops::fix_winding_order(mesh)?;
    mesh.invalidate_normals();
    mesh_ops::ensure_normals(mesh);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Triangle, Vertex};

    fn unit_cube() -> Mesh {
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
        for (a, b, c) in [
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
        ] {
            mesh.triangles.push(Triangle::new(a, b, c));
        }
        mesh
    }

    #[test]
    fn test_clean_cube_passes_through() {
        let cube = unit_cube();
        let result = preprocess(&cube, &PreprocessOptions::default()).unwrap();
        assert_eq!(result.statistics.improvements.vertices_reduced, 0);
        assert_eq!(result.statistics.improvements.faces_reduced, 0);
        assert!(result.statistics.processed.is_watertight);
        let volume = result.statistics.processed.volume.unwrap();
        assert!((volume - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicated_face_is_removed() {
        let mut cube = unit_cube();
        cube.triangles.push(Triangle::new(0, 2, 1));
        let result = preprocess(&cube, &PreprocessOptions::default()).unwrap();
        assert_eq!(result.statistics.improvements.faces_reduced, 1);
        assert!(result.statistics.processed.is_watertight);
        let volume = result.statistics.processed.volume.unwrap();
        assert!((volume - 1.0).abs() < 1e-9);
        assert!(result.steps.iter().any(|s| s.contains("duplicate")));
    }

    #[test]
    fn test_preprocess_is_idempotent() {
        let mut cube = unit_cube();
        cube.triangles.push(Triangle::new(0, 2, 1));
        let first = preprocess(&cube, &PreprocessOptions::default()).unwrap();
        let second = preprocess(&first.mesh, &PreprocessOptions::default()).unwrap();
        assert_eq!(second.statistics.improvements.vertices_reduced, 0);
        assert_eq!(second.statistics.improvements.faces_reduced, 0);
        assert_eq!(second.statistics.improvements.volume_change, Some(0.0));
    }

    #[test]
    fn test_hole_is_filled() {
        let mut cube = unit_cube();
        cube.triangles
            .retain(|t| t.sorted_indices() != [4, 5, 6] && t.sorted_indices() != [4, 6, 7]);
        let result = preprocess(&cube, &PreprocessOptions::default()).unwrap();
        assert!(result.statistics.processed.is_watertight);
        assert!(result.steps.iter().any(|s| s.contains("Filled holes")));
        // Closing the square hole adds a fan of two faces
        assert_eq!(result.statistics.improvements.faces_reduced, -2);
    }

    #[test]
    fn test_fill_holes_disabled_leaves_mesh_open() {
        let mut cube = unit_cube();
        cube.triangles
            .retain(|t| t.sorted_indices() != [4, 5, 6] && t.sorted_indices() != [4, 6, 7]);
        let options = PreprocessOptions {
            fill_holes: false,
            ..Default::default()
        };
        let result = preprocess(&cube, &options).unwrap();
        assert!(!result.statistics.processed.is_watertight);
        assert!(result.statistics.processed.volume.is_none());
        assert!(result.statistics.improvements.volume_change.is_none());
    }

    #[test]
    fn test_normal_repair_steps() {
        let cube = unit_cube();
        let result = preprocess(&cube, &PreprocessOptions::default()).unwrap();
        assert!(result.steps.iter().any(|s| s == "Fixed surface normals"));
        assert!(result.steps.iter().any(|s| s == "Fixed face winding order"));
    }

    #[test]
    fn test_winding_entry_absent_for_open_mesh() {
        let mut cube = unit_cube();
        cube.triangles
            .retain(|t| t.sorted_indices() != [4, 5, 6] && t.sorted_indices() != [4, 6, 7]);
        let options = PreprocessOptions {
            fill_holes: false,
            ..Default::default()
        };
        let result = preprocess(&cube, &options).unwrap();
        assert!(result.steps.iter().any(|s| s == "Fixed surface normals"));
        assert!(!result.steps.iter().any(|s| s == "Fixed face winding order"));
    }

    #[test]
    fn test_original_not_mutated() {
        let mut cube = unit_cube();
        cube.triangles.push(Triangle::new(0, 2, 1));
        let before = cube.triangles.len();
        let _ = preprocess(&cube, &PreprocessOptions::default()).unwrap();
        assert_eq!(cube.triangles.len(), before);
    }

    #[test]
    fn test_nonfinite_vertices_cleaned_up() {
        let mut cube = unit_cube();
        cube.vertices.push(Vertex::new(f64::NAN, 0.0, 0.0));
        let result = preprocess(&cube, &PreprocessOptions::default()).unwrap();
        assert_eq!(result.mesh.vertices.len(), 8);
        assert!(result.mesh.vertices.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_statistics_serialize_shape() {
        let cube = unit_cube();
        let result = preprocess(&cube, &PreprocessOptions::default()).unwrap();
        let json = serde_json::to_value(&result.statistics).unwrap();
        assert_eq!(json["original"]["vertices"], 8);
        assert_eq!(json["processed"]["is_watertight"], true);
        assert!(json["improvements"]["volume_change"].is_number());
    }
}
