//! Encoding and decoding of mesh documents to and from their JSON form.

use glam::DVec3;
use serde_json::{json, Map, Value};

use photomesh_core::{PhotomeshError, Result};

use super::face_array::{renumber_keys, FaceArray, FaceKey};
use super::legacy::rename_legacy_keys;
use super::{DataInfo, MeshDocument, ParamValue, Params};

const DATA_INFO: &str = "_DataInfo_";
const VERTICES: &str = "MeshVertex3";
const PARAMS: &str = "param";
const GROUPS: &str = "MeshGroup";

/// Encodes a document, converting face indices to 1-based.
pub fn encode(doc: &MeshDocument) -> Value {
    let mut root = Map::new();

    let mut info = Map::new();
    info.insert("JMeshVersion".into(), json!(doc.info.version));
    info.insert("Comment".into(), json!(doc.info.comment));
    if let Some(name) = &doc.info.object_name {
        info.insert("BlenderObjectName".into(), json!(name));
    }
    root.insert(DATA_INFO.into(), Value::Object(info));

    if !doc.vertices.is_empty() || !doc.faces.is_empty() || doc.groups.is_empty() {
        let rows: Vec<Value> = doc.vertices.iter().map(|v| json!([v.x, v.y, v.z])).collect();
        root.insert(VERTICES.into(), Value::Array(rows));
    }

    let keys: Vec<FaceKey> = doc.faces.iter().map(|(k, _)| *k).collect();
    for (key, (_, array)) in renumber_keys(&keys).into_iter().zip(&doc.faces) {
        let rows: Vec<Value> = array
            .rows()
            .map(|row| Value::Array(row.iter().map(|&i| json!(u64::from(i) + 1)).collect()))
            .collect();
        root.insert(key.wire_key(), Value::Array(rows));
    }

    if !doc.params.is_empty() {
        let params: Map<String, Value> = doc
            .params
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    ParamValue::Bool(b) => json!(b),
                    ParamValue::Number(n) => json!(n),
                    ParamValue::Text(s) => json!(s),
                };
                (k.to_string(), value)
            })
            .collect();
        root.insert(PARAMS.into(), Value::Object(params));
    }

    if !doc.groups.is_empty() {
        root.insert(
            GROUPS.into(),
            Value::Array(doc.groups.iter().map(encode).collect()),
        );
    }

    Value::Object(root)
}

/// Decodes a document, converting face indices to 0-based.
///
/// Legacy key names are renamed first. Face arrays of the same kind are renamed
/// in storage order: one array is unnumbered, several become `(1)..(N)`.
pub fn decode(value: Value) -> Result<MeshDocument> {
    decode_at(value, "")
}

fn decode_at(value: Value, path: &str) -> Result<MeshDocument> {
    let Value::Object(mut map) = value else {
        return Err(PhotomeshError::format(
            field_name(path, "<document>"),
            "expected an object",
        ));
    };
    rename_legacy_keys(&mut map);

    let mut doc = MeshDocument::new();
    let mut has_vertices = false;

    for (key, value) in map {
        match key.as_str() {
            DATA_INFO => doc.info = decode_info(&value, &field_name(path, DATA_INFO))?,
            VERTICES => {
                doc.vertices = decode_vertices(&value, &field_name(path, VERTICES))?;
                has_vertices = true;
            }
            PARAMS => doc.params = decode_params(&value, &field_name(path, PARAMS))?,
            GROUPS => {
                let members = match value {
                    Value::Array(members) => members,
                    single @ Value::Object(_) => vec![single],
                    _ => {
                        return Err(PhotomeshError::format(
                            field_name(path, GROUPS),
                            "expected an object or an array of objects",
                        ))
                    }
                };
                for (i, member) in members.into_iter().enumerate() {
                    let sub_path = field_name(path, &format!("{GROUPS}[{i}]"));
                    doc.groups.push(decode_at(member, &sub_path)?);
                }
            }
            _ => match FaceKey::parse_wire(&key) {
                Some(face_key) => {
                    let field = field_name(path, &key);
                    let mut array = decode_faces(&value, &field)?;
                    if let (true, Some(arity)) = (array.is_empty(), face_key.kind.arity()) {
                        array = FaceArray::Dense { arity, indices: Vec::new() };
                    }
                    array.check_kind(face_key.kind, &field)?;
                    doc.faces.push((face_key, array));
                }
                None => log::debug!("ignoring unknown document key '{}'", field_name(path, &key)),
            },
        }
    }

    if !has_vertices && (!doc.faces.is_empty() || doc.groups.is_empty()) {
        return Err(PhotomeshError::format(
            field_name(path, VERTICES),
            "required field is missing",
        ));
    }

    doc.order_by_wire_index();
    doc.renumber();
    for (key, array) in &doc.faces {
        array.validate(doc.vertices.len(), &field_name(path, &key.wire_key()))?;
    }
    Ok(doc)
}

fn field_name(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn decode_info(value: &Value, field: &str) -> Result<DataInfo> {
    let Value::Object(map) = value else {
        return Err(PhotomeshError::format(field, "expected an object"));
    };
    let mut info = DataInfo::default();
    if let Some(version) = map.get("JMeshVersion") {
        info.version = match version {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(PhotomeshError::format(
                    format!("{field}.JMeshVersion"),
                    "expected a string or a number",
                ))
            }
        };
    }
    if let Some(Value::String(comment)) = map.get("Comment") {
        info.comment.clone_from(comment);
    }
    if let Some(Value::String(name)) = map.get("BlenderObjectName") {
        info.object_name = Some(name.clone());
    }
    Ok(info)
}

fn decode_params(value: &Value, field: &str) -> Result<Params> {
    let Value::Object(map) = value else {
        return Err(PhotomeshError::format(field, "expected an object"));
    };
    let mut params = Params::new();
    for (key, v) in map {
        let param = match v {
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::String(s) => ParamValue::Text(s.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(n) => ParamValue::Number(n),
                None => {
                    return Err(PhotomeshError::format(format!("{field}.{key}"), "number out of range"))
                }
            },
            _ => {
                return Err(PhotomeshError::format(
                    format!("{field}.{key}"),
                    "parameters must be booleans, numbers or strings",
                ))
            }
        };
        params.insert(key.clone(), param);
    }
    Ok(params)
}

fn decode_vertices(value: &Value, field: &str) -> Result<Vec<DVec3>> {
    numeric_rows(value, field)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| match row.as_slice() {
            [x, y, z] => Ok(DVec3::new(*x, *y, *z)),
            _ => Err(PhotomeshError::format(
                format!("{field}[{i}]"),
                format!("expected 3 coordinates, found {}", row.len()),
            )),
        })
        .collect()
}

fn decode_faces(value: &Value, field: &str) -> Result<FaceArray> {
    let rows = numeric_rows(value, field)?;
    let polygons = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            row.into_iter()
                .map(|x| wire_index_to_internal(x, field, i))
                .collect::<Result<Vec<u32>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(FaceArray::from_polygons(polygons))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn wire_index_to_internal(x: f64, field: &str, row: usize) -> Result<u32> {
    if x.fract() != 0.0 || x < 0.0 || x > f64::from(u32::MAX) {
        return Err(PhotomeshError::format(
            format!("{field}[{row}]"),
            format!("'{x}' is not a valid vertex index"),
        ));
    }
    if x == 0.0 {
        return Err(PhotomeshError::validation(format!(
            "{field}[{row}]: index 0 is invalid in 1-based numbering"
        )));
    }
    Ok(x as u32 - 1)
}

/// Normalizes a numeric array to rows: nested lists, a single flat row, or a JData
/// annotated array.
fn numeric_rows(value: &Value, field: &str) -> Result<Vec<Vec<f64>>> {
    match value {
        Value::Array(items) if items.iter().all(Value::is_number) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(vec![numbers(items, field)?])
            }
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Array(cells) => numbers(cells, &format!("{field}[{i}]")),
                _ => Err(PhotomeshError::format(
                    format!("{field}[{i}]"),
                    "expected a row of numbers",
                )),
            })
            .collect(),
        Value::Object(map) if map.contains_key("_ArrayData_") => annotated_rows(map, field),
        _ => Err(PhotomeshError::format(field, "expected a numeric array")),
    }
}

fn numbers(items: &[Value], field: &str) -> Result<Vec<f64>> {
    items
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| PhotomeshError::format(field, format!("non-numeric entry {v}")))
        })
        .collect()
}

fn annotated_rows(map: &Map<String, Value>, field: &str) -> Result<Vec<Vec<f64>>> {
    if map.contains_key("_ArrayZipType_") || map.contains_key("_ArrayIsComplex_") {
        return Err(PhotomeshError::format(
            field,
            "compressed or complex annotated arrays are not supported",
        ));
    }
    let data = match map.get("_ArrayData_") {
        Some(Value::Array(items)) => numbers(items, &format!("{field}._ArrayData_"))?,
        _ => return Err(PhotomeshError::format(format!("{field}._ArrayData_"), "expected an array")),
    };
    let size: Vec<usize> = match map.get("_ArraySize_") {
        Some(Value::Array(dims)) => dims
            .iter()
            .map(|d| {
                d.as_u64()
                    .and_then(|d| usize::try_from(d).ok())
                    .ok_or_else(|| PhotomeshError::format(format!("{field}._ArraySize_"), "expected dimensions"))
            })
            .collect::<Result<_>>()?,
        Some(Value::Number(n)) => vec![1, n.as_u64().and_then(|d| usize::try_from(d).ok()).unwrap_or(0)],
        None => vec![1, data.len()],
        Some(_) => {
            return Err(PhotomeshError::format(format!("{field}._ArraySize_"), "expected dimensions"))
        }
    };
    let (rows, cols) = match size.as_slice() {
        [n] => (1, *n),
        [rows, cols] => (*rows, *cols),
        _ => {
            return Err(PhotomeshError::format(
                format!("{field}._ArraySize_"),
                "only 1-D and 2-D arrays are supported",
            ))
        }
    };
    if rows.checked_mul(cols) != Some(data.len()) {
        return Err(PhotomeshError::format(
            field,
            format!("size {rows}x{cols} does not match {} data values", data.len()),
        ));
    }
    if cols == 0 {
        return Ok(Vec::new());
    }
    let column_major = match map.get("_ArrayOrder_") {
        None => false,
        Some(Value::String(order)) if order.eq_ignore_ascii_case("r") => false,
        Some(Value::String(order)) if order.eq_ignore_ascii_case("c") => true,
        Some(other) => {
            return Err(PhotomeshError::format(
                format!("{field}._ArrayOrder_"),
                format!("expected \"r\" or \"c\", found {other}"),
            ))
        }
    };
    if column_major {
        return Ok((0..rows)
            .map(|r| (0..cols).map(|c| data[c * rows + r]).collect())
            .collect());
    }
    Ok(data.chunks_exact(cols).map(<[f64]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FaceKind;
    use proptest::prelude::*;

    #[test]
    fn test_encode_is_one_based() {
        let doc = MeshDocument::from_triangles(vec![DVec3::ZERO, DVec3::X, DVec3::Y], &[[0, 1, 2]]);
        let value = encode(&doc);
        assert_eq!(value["MeshTri3"], json!([[1, 2, 3]]));
        assert_eq!(value["_DataInfo_"]["JMeshVersion"], json!("0.5"));
        assert!(value.get("MeshGroup").is_none());
    }

    #[test]
    fn test_decode_is_zero_based() {
        let doc = decode(json!({
            "MeshVertex3": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
            "MeshTri3": [[1, 2, 3]]
        }))
        .unwrap();
        assert_eq!(doc.vertices.len(), 3);
        assert_eq!(doc.face(FaceKey::single(FaceKind::Tri3)).unwrap().to_polygons(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_decode_accepts_legacy_keys_and_integral_floats() {
        let doc = decode(json!({
            "MeshNode": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            "MeshSurf": [[1.0, 2.0, 3.0]]
        }))
        .unwrap();
        assert_eq!(doc.faces.len(), 1);
        assert_eq!(doc.faces[0].0, FaceKey::single(FaceKind::Tri3));
    }

    #[test]
    fn test_decode_flat_row_and_annotated_array() {
        let doc = decode(json!({
            "MeshVertex3": {
                "_ArrayType_": "double",
                "_ArraySize_": [3, 3],
                "_ArrayData_": [0, 0, 0, 1, 0, 0, 0, 1, 0]
            },
            "MeshTri3": [1, 2, 3]
        }))
        .unwrap();
        assert_eq!(doc.vertices[1], DVec3::X);
        assert_eq!(doc.face_count(), 1);
    }

    #[test]
    fn test_annotated_array_order() {
        let doc = decode(json!({
            "MeshVertex3": {
                "_ArrayType_": "double",
                "_ArraySize_": [3, 3],
                "_ArrayOrder_": "c",
                "_ArrayData_": [0, 1, 0, 0, 0, 2, 0, 0, 0]
            },
            "MeshTri3": [[1, 2, 3]]
        }))
        .unwrap();
        assert_eq!(doc.vertices, vec![DVec3::ZERO, DVec3::X, DVec3::new(0.0, 2.0, 0.0)]);

        let err = decode(json!({
            "MeshVertex3": {
                "_ArraySize_": [1, 3],
                "_ArrayOrder_": "z",
                "_ArrayData_": [0, 0, 0]
            }
        }))
        .unwrap_err();
        match err {
            PhotomeshError::Format { field, .. } => assert_eq!(field, "MeshVertex3._ArrayOrder_"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_decode_ragged_poly() {
        let doc = decode(json!({
            "MeshVertex3": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0], [0, 2, 0]],
            "MeshPoly": [[1, 2, 3, 4], [4, 3, 5]]
        }))
        .unwrap();
        assert!(matches!(doc.faces[0].1, FaceArray::Ragged(_)));
    }

    #[test]
    fn test_ragged_triangles_rejected() {
        let err = decode(json!({
            "MeshVertex3": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
            "MeshTri3": [[1, 2, 3, 4], [1, 2, 3]]
        }))
        .unwrap_err();
        assert!(matches!(err, PhotomeshError::Validation(_)));
    }

    #[test]
    fn test_missing_vertices_names_field() {
        let err = decode(json!({"MeshTri3": [[1, 2, 3]]})).unwrap_err();
        match err {
            PhotomeshError::Format { field, .. } => assert_eq!(field, "MeshVertex3"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_entry_names_field() {
        let err = decode(json!({
            "MeshVertex3": [[0, 0, 0]],
            "MeshTri3": [[1, "a", 1]]
        }))
        .unwrap_err();
        match err {
            PhotomeshError::Format { field, .. } => assert!(field.starts_with("MeshTri3")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_zero_index_is_validation_error() {
        let err = decode(json!({
            "MeshVertex3": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
            "MeshTri3": [[0, 1, 2]]
        }))
        .unwrap_err();
        assert!(matches!(err, PhotomeshError::Validation(_)));
    }

    #[test]
    fn test_bad_param_names_key() {
        let err = decode(json!({
            "MeshVertex3": [],
            "param": {"maxvol": 1, "nested": {"a": 1}}
        }))
        .unwrap_err();
        match err {
            PhotomeshError::Format { field, .. } => assert_eq!(field, "param.nested"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_same_kind_arrays_renumbered_in_wire_order() {
        let doc = decode(json!({
            "MeshVertex3": [[0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 1]],
            "MeshTri3(5)": [[1, 2, 3]],
            "MeshTri3(9)": [[1, 2, 4]]
        }))
        .unwrap();
        assert_eq!(doc.faces[0].0.to_string(), "tri3(1)");
        assert_eq!(doc.faces[1].0.to_string(), "tri3(2)");
        assert_eq!(doc.faces[0].1.to_polygons(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_out_of_order_arrays_follow_their_wire_number() {
        let doc = decode(json!({
            "MeshVertex3": [[0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 1]],
            "MeshTri3(2)": [[1, 2, 4]],
            "MeshTet4": [[1, 2, 3, 4]],
            "MeshTri3(1)": [[1, 2, 3]]
        }))
        .unwrap();
        let tri1 = doc.face(FaceKey::numbered(FaceKind::Tri3, 1)).unwrap();
        let tri2 = doc.face(FaceKey::numbered(FaceKind::Tri3, 2)).unwrap();
        assert_eq!(tri1.to_polygons(), vec![vec![0, 1, 2]]);
        assert_eq!(tri2.to_polygons(), vec![vec![0, 1, 3]]);
        // The tetrahedra keep their slot between the surfaces.
        assert_eq!(doc.faces[1].0, FaceKey::single(FaceKind::Tet4));
    }

    #[test]
    fn test_group_as_single_object() {
        let doc = decode(json!({
            "_DataInfo_": {"JMeshVersion": "0.5"},
            "MeshGroup": {
                "_DataInfo_": {"BlenderObjectName": "Cube"},
                "MeshVertex3": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
                "MeshTri3": [[1, 2, 3]]
            }
        }))
        .unwrap();
        assert!(doc.vertices.is_empty());
        assert_eq!(doc.groups.len(), 1);
        assert_eq!(doc.groups[0].info.object_name.as_deref(), Some("Cube"));
    }

    #[test]
    fn test_group_errors_carry_path() {
        let err = decode(json!({"MeshGroup": [{"MeshTri3": [[1, 2, 3]]}]})).unwrap_err();
        match err {
            PhotomeshError::Format { field, .. } => assert_eq!(field, "MeshGroup[0].MeshVertex3"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_groups_roundtrip() {
        let mut doc = MeshDocument::new().with_comment("surfaces");
        doc.groups.push(
            MeshDocument::from_triangles(vec![DVec3::ZERO, DVec3::X, DVec3::Y], &[[0, 1, 2]])
                .with_object_name("A"),
        );
        doc.params.insert("action", "repair");
        doc.params.insert("level", 1.0);
        assert_eq!(decode(encode(&doc)).unwrap(), doc);
    }

    fn finite() -> impl Strategy<Value = f64> {
        -1.0e6f64..1.0e6
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            verts in proptest::collection::vec((finite(), finite(), finite()), 1..20),
            tri_seed in proptest::collection::vec((any::<u32>(), any::<u32>(), any::<u32>()), 0..20),
            maxvol in finite(),
            repair in any::<bool>(),
            opts in "[a-z]{0,8}",
        ) {
            let n = u32::try_from(verts.len()).unwrap();
            let vertices: Vec<DVec3> = verts.iter().map(|&(x, y, z)| DVec3::new(x, y, z)).collect();
            let triangles: Vec<[u32; 3]> = tri_seed.iter().map(|&(a, b, c)| [a % n, b % n, c % n]).collect();
            let mut doc = MeshDocument::from_triangles(vertices, &triangles);
            doc.params.insert("maxvol", maxvol);
            doc.params.insert("dorepair", repair);
            doc.params.insert("tetgenopt", opts);

            let decoded = decode(encode(&doc)).unwrap();
            prop_assert_eq!(decoded, doc);
        }
    }
}
