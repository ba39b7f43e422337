//! Boundary operations: decode, process, respond

mod common;

use common::{cube_obj, cube_obj_with_duplicate_face};
use meshpipe::service::{augment, preprocess, upload};
use meshpipe::{AugmentOptions, PreprocessOptions};

#[test]
fn test_upload_flow() {
    let obj = cube_obj();
    let response = upload(obj.as_bytes(), "obj").unwrap();
    assert_eq!(response.validation.vertex_count, 8);
    assert_eq!(response.validation.face_count, 12);
    assert!(response.validation.is_watertight);
    assert!(!response.validation.is_empty);
    assert!((response.validation.volume.unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(response.mesh.faces.len(), 12);
}

#[test]
fn test_preprocess_flow_repairs_duplicates() {
    let obj = cube_obj_with_duplicate_face();
    let response = preprocess(obj.as_bytes(), "obj", &PreprocessOptions::default()).unwrap();
    assert_eq!(response.statistics.improvements.faces_reduced, 1);
    assert_eq!(response.mesh.faces.len(), 12);
    assert!(response
        .steps
        .iter()
        .any(|s| s.contains("duplicate faces")));
}

#[test]
fn test_augment_flow_returns_transport_variants() {
    let obj = cube_obj();
    let options = AugmentOptions {
        scale: 2.0,
        ..Default::default()
    };
    let response = augment(obj.as_bytes(), "obj", &options).unwrap();
    assert_eq!(response.variants.len(), 2);
    let scaled = &response.variants["scaled"];
    assert_eq!(scaled.vertices.len(), 8);
    assert_eq!(scaled.faces.len(), 12);
}

#[test]
fn test_bad_extension_maps_to_client_error() {
    let err = upload(b"whatever", "exe").unwrap_err();
    assert_eq!(err.http_status(), 400);
}

#[test]
fn test_garbage_bytes_map_to_client_error() {
    let err = upload(&[0xff, 0xfe, 0x00, 0x01], "obj").unwrap_err();
    assert_eq!(err.http_status(), 400);
}

#[test]
fn test_upload_response_json_shape() {
    let obj = cube_obj();
    let response = upload(obj.as_bytes(), "obj").unwrap();
    let json = serde_json::to_value(&response).unwrap();
    for field in ["vertex_count", "face_count", "is_watertight", "volume"] {
        assert!(
            json["validation"].get(field).is_some(),
            "missing field {field}"
        );
    }
    for field in ["vertices", "faces", "normals", "bounds", "center"] {
        assert!(json["mesh"].get(field).is_some(), "missing field {field}");
    }
}
