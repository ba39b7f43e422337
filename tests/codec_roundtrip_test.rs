//! Format decode/encode and transport round-trip tests

mod common;

use common::{cube_obj, unit_cube};
use meshpipe::mesh_ops::compute_signed_volume;
use meshpipe::{codec, Error, MeshFormat, MeshTransport};

#[test]
fn test_extension_parsing() {
    assert_eq!(MeshFormat::from_extension("obj").unwrap(), MeshFormat::Obj);
    assert_eq!(MeshFormat::from_extension("STL").unwrap(), MeshFormat::Stl);
    assert_eq!(MeshFormat::from_extension("Off").unwrap(), MeshFormat::Off);
    assert_eq!(MeshFormat::from_extension("ply").unwrap(), MeshFormat::Ply);
    assert!(matches!(
        MeshFormat::from_extension("gltf"),
        Err(Error::UnsupportedFormat(_))
    ));
}

#[test]
fn test_obj_cube_loads_with_expected_counts() {
    let obj = cube_obj();
    let mesh = codec::load(obj.as_bytes(), MeshFormat::Obj).unwrap();
    assert_eq!(mesh.vertices.len(), 8);
    assert_eq!(mesh.triangles.len(), 12);
    assert!((compute_signed_volume(&mesh) - 1.0).abs() < 1e-9);
}

#[test]
fn test_every_format_round_trips_the_cube() {
    let cube = unit_cube();
    for format in [
        MeshFormat::Obj,
        MeshFormat::Stl,
        MeshFormat::Off,
        MeshFormat::Ply,
    ] {
        let bytes = codec::encode(&cube, format).unwrap();
        let decoded = codec::load(&bytes, format).unwrap();
        assert_eq!(
            decoded.triangles.len(),
            12,
            "face count after {format} round trip"
        );
        // STL loses connectivity (one vertex per corner) but the enclosed
        // volume survives every format
        assert!(
            (compute_signed_volume(&decoded) - 1.0).abs() < 1e-6,
            "volume after {format} round trip"
        );
    }
}

#[test]
fn test_transport_preserves_counts() {
    let obj = cube_obj();
    let mut mesh = codec::load(obj.as_bytes(), MeshFormat::Obj).unwrap();
    let transport = MeshTransport::from_mesh(&mut mesh).unwrap();
    assert_eq!(transport.vertices.len(), mesh.vertices.len());
    assert_eq!(transport.faces.len(), mesh.triangles.len());
    assert_eq!(transport.normals.len(), mesh.vertices.len());
}

#[test]
fn test_malformed_obj_is_a_decode_error() {
    let err = codec::load(b"f 1 2", MeshFormat::Obj).unwrap_err();
    assert!(matches!(err, Error::Decode { .. } | Error::EmptyScene(_)));
}

#[test]
fn test_face_index_out_of_range_is_rejected() {
    let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n";
    assert!(codec::load(obj.as_bytes(), MeshFormat::Obj).is_err());
}

#[test]
fn test_empty_input_is_rejected() {
    let err = codec::load(b"", MeshFormat::Obj).unwrap_err();
    assert!(matches!(err, Error::EmptyScene(_)));
}
