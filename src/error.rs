//! Error types for mesh pipeline operations
//!
//! This module provides the error taxonomy for loading, validating,
//! preprocessing and augmenting meshes. All errors include error codes for
//! categorization.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and decode errors
//! - **E2xxx**: Scene and mesh shape errors
//! - **E3xxx**: Pipeline processing errors
//! - **E4xxx**: Validation errors
//!
//! ## Common Error Codes
//!
//! - `E1001`: I/O error reading input
//! - `E1002`: Malformed or unsupported input bytes
//! - `E1003`: Unsupported file format / extension
//! - `E2001`: Decoded scene contains no geometry
//! - `E2002`: Decoded object is not a polygonal mesh
//! - `E3001`: Unrecoverable preprocessing failure
//! - `E4001`: Malformed validation query
//!
//! Hole-filling and final-cleanup failures are deliberately not part of this
//! taxonomy: the pipeline absorbs them and records a "skipped" step instead.

use std::io;
use thiserror::Error;

/// Result type for mesh pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or processing a mesh
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading input bytes
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - Truncated upload
    /// - Read failure on the underlying buffer
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or undecodable input bytes
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted file contents
    /// - File contents not matching the declared format
    /// - Numbers or indices that cannot be parsed
    ///
    /// **Suggestions**:
    /// - Verify the file opens in a mesh viewer
    /// - Check that the extension matches the actual format
    #[error("[E1002] Decode error ({format}): {message}")]
    Decode {
        /// The format that was being decoded
        format: &'static str,
        /// What went wrong
        message: String,
    },

    /// The requested file format is not supported
    ///
    /// **Error Code**: E1003
    ///
    /// Supported extensions are `obj`, `stl`, `off` and `ply`. Anything else
    /// is a client error at the boundary.
    #[error("[E1003] Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The decoded scene contains no geometry at all
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - An OBJ/PLY file with no vertex or face data
    /// - An exporter that wrote an empty scene
    #[error("[E2001] Empty scene: {0}")]
    EmptyScene(String),

    /// The decoded object is not a single polygonal mesh
    ///
    /// **Error Code**: E2002
    ///
    /// **Common Causes**:
    /// - A point cloud (vertices without faces)
    /// - Face indices referencing vertices that do not exist
    #[error("[E2002] Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Unrecoverable failure in the deduplication or normal-repair stages
    ///
    /// **Error Code**: E3001
    ///
    /// Hole filling and final cleanup never produce this error; they degrade
    /// to a logged-and-skipped pipeline step instead.
    #[error("[E3001] Preprocessing failed in {stage}: {message}")]
    Preprocessing {
        /// The pipeline stage that failed
        stage: &'static str,
        /// What went wrong
        message: String,
    },

    /// Malformed validate-time query
    ///
    /// **Error Code**: E4001
    #[error("[E4001] Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Create a decode error for the given format
    pub fn decode(format: &'static str, message: impl Into<String>) -> Self {
        Error::Decode {
            format,
            message: message.into(),
        }
    }

    /// Create a preprocessing error for the given stage
    pub fn preprocessing(stage: &'static str, message: impl Into<String>) -> Self {
        Error::Preprocessing {
            stage,
            message: message.into(),
        }
    }

    /// The HTTP-equivalent status code for this error kind
    ///
    /// Client-side problems (bad format, undecodable bytes, empty or invalid
    /// geometry) map to 400; internal processing failures map to 500. The
    /// boundary layer uses this to build its response without inspecting
    /// error internals.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::UnsupportedFormat(_)
            | Error::Decode { .. }
            | Error::EmptyScene(_)
            | Error::InvalidMesh(_)
            | Error::Validation(_) => 400,
            Error::Io(_) | Error::Preprocessing { .. } => 500,
        }
    }

    /// The stable error code string for this error kind (e.g. `E1002`)
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "E1001",
            Error::Decode { .. } => "E1002",
            Error::UnsupportedFormat(_) => "E1003",
            Error::EmptyScene(_) => "E2001",
            Error::InvalidMesh(_) => "E2002",
            Error::Preprocessing { .. } => "E3001",
            Error::Validation(_) => "E4001",
        }
    }
}
