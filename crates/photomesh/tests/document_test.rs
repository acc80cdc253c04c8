//! Exchange document scenarios: decoding engine output into regions.

use proptest::prelude::*;
use serde_json::json;

use photomesh::*;
use photomesh_structures::document;
use photomesh_structures::region::reconstruct;

#[test]
fn test_numbered_surfaces_become_regions() {
    let doc = document::decode(json!({
        "_DataInfo_": {"JMeshVersion": "0.5", "Comment": "engine output"},
        "MeshVertex3": [[0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 1], [3, 3, 3]],
        "MeshTri3(1)": [[1, 2, 3]],
        "MeshTri3(2)": [[1, 2, 4], [2, 3, 4]]
    }))
    .unwrap();
    let rec = reconstruct(&doc, "region_").unwrap();

    let names: Vec<&str> = rec.regions.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["region_1", "region_2"]);
    for region in &rec.regions {
        let n = u32::try_from(region.vertices.len()).unwrap();
        assert!(region.faces.indices().all(|i| i < n));
    }
    assert_eq!(rec.regions[0].vertices.len(), 3);
    assert_eq!(rec.regions[1].vertices.len(), 4);
    // The unreferenced vertex does not widen the box.
    assert_eq!(rec.bounds.max, DVec3::ONE);
    assert_eq!(rec.bounds.min, DVec3::ZERO);
}

#[test]
fn test_legacy_engine_output() {
    let doc = document::decode(json!({
        "MeshNode": [[0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 1]],
        "MeshSurf": [[1, 2, 3]],
        "MeshTet4": [[1, 2, 3, 4]]
    }))
    .unwrap();
    let rec = reconstruct(&doc, "region_").unwrap();
    assert_eq!(rec.regions.len(), 2);
    assert_eq!(rec.regions[0].kind, FaceKind::Tri3);
    assert_eq!(rec.regions[1].kind, FaceKind::Tet4);
}

#[test]
fn test_region_source_position_above_geometry() {
    let doc = document::decode(json!({
        "MeshVertex3": [[-1, -1, 0], [1, -1, 0], [1, 1, 10]],
        "MeshTri3": [[1, 2, 3]]
    }))
    .unwrap();
    let rec = reconstruct(&doc, "region_").unwrap();
    assert_eq!(rec.source_position(), DVec3::new(0.0, 0.0, 11.0));
}

#[test]
fn test_empty_document_keeps_sentinel_box() {
    let doc = document::decode(json!({"MeshVertex3": []})).unwrap();
    let rec = reconstruct(&doc, "region_").unwrap();
    assert!(rec.regions.is_empty());
    assert!(rec.bounds.is_empty());
    assert_eq!(rec.bounds.min, DVec3::splat(f64::INFINITY));
    assert_eq!(rec.bounds.max, DVec3::splat(f64::NEG_INFINITY));
}

#[test]
fn test_saved_document_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blendermesh.jmsh");
    let mut doc = MeshDocument::from_triangles(
        vec![DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z],
        &[[0, 1, 2], [0, 2, 3]],
    )
    .with_comment("round trip");
    doc.params.insert("maxvol", 25.0);
    doc.params.insert("dorepair", true);
    document::save(&doc, &path).unwrap();

    let back = document::load(&path).unwrap();
    assert_eq!(back, doc);
}

proptest! {
    #[test]
    fn region_indices_stay_in_range(
        n in 3usize..40,
        rows in prop::collection::vec(prop::array::uniform3(0u32..40), 1..30),
    ) {
        let vertices: Vec<DVec3> = (0..n).map(|i| DVec3::new(i as f64, (i * i) as f64, 1.0)).collect();
        let bound = u32::try_from(n).unwrap();
        let rows: Vec<[u32; 3]> = rows
            .into_iter()
            .map(|r| r.map(|i| i % bound))
            .collect();
        let faces = FaceArray::from_rows(&rows);
        let region = Region::from_faces("r", FaceKind::Tri3, &vertices, &faces).unwrap();

        let local = u32::try_from(region.vertices.len()).unwrap();
        prop_assert!(region.faces.indices().all(|i| i < local));
        prop_assert_eq!(region.faces.len(), rows.len());
        for (row, mapped) in rows.iter().zip(region.faces.rows()) {
            for (&src, &dst) in row.iter().zip(mapped) {
                prop_assert_eq!(region.source_indices[dst as usize], src);
            }
        }
    }
}
