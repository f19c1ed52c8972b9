mod common;

use common::{ring_params, square_ring};
use track_engine::{
    extract_path, ExtractionStatus, TerrainExtent, TrackError, TrackFile, TrackMask, Vec2, Vec3,
    FORMAT_VERSION,
};

#[test]
fn extracted_track_survives_every_format() {
    let graph = extract_path(&square_ring(), ring_params()).unwrap().graph;
    let file = TrackFile::from_graph("square", &graph);
    let dir = tempfile::tempdir().unwrap();

    for name in ["square.ron", "square.json", "square.bin"] {
        let path = dir.path().join(name);
        file.save(&path).unwrap();
        let loaded = TrackFile::load(&path).unwrap();
        assert_eq!(loaded, file, "{name}");
        assert_eq!(loaded.version, FORMAT_VERSION);
        assert_eq!(loaded.to_graph().unwrap(), graph, "{name}");
    }
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("square.yaml");
    let err = TrackFile::default().save(&path).unwrap_err();
    assert!(matches!(err, TrackError::UnknownFormat(_)));
    assert!(!path.exists());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TrackFile::load(dir.path().join("nope.ron")).unwrap_err();
    assert!(matches!(err, TrackError::Io(_)));
}

#[test]
fn mask_loads_from_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mask.png");
    let procedural = square_ring();
    let img = image::GrayImage::from_fn(120, 120, |x, y| {
        // image rows run top-down
        let on = procedural.sample(Vec2::new((x as f32 + 0.5) / 120.0, (119.5 - y as f32) / 120.0));
        image::Luma([if on > 0.5 { 255 } else { 0 }])
    });
    img.save(&path).unwrap();

    let extent = TerrainExtent::new(Vec3::ZERO, Vec2::new(120.0, 120.0));
    let mask = TrackMask::open(&path, extent).unwrap();
    assert!((mask.coverage() - procedural.coverage()).abs() < 1e-6);

    let from_png = extract_path(&mask, ring_params()).unwrap();
    let from_fn = extract_path(&procedural, ring_params()).unwrap();
    assert_eq!(from_png.status, ExtractionStatus::Closed);
    assert_eq!(from_png.graph, from_fn.graph);
}
