//! The mesh exchange document.
//!
//! A [`MeshDocument`] holds a vertex set, named face/element arrays, a parameter
//! mapping and optional per-object sub-documents. Indices are 0-based in memory and
//! 1-based on the wire; [`codec`] performs the conversion.

pub mod codec;
pub mod face_array;
pub mod io;
pub mod legacy;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use photomesh_core::Result;

pub use codec::{decode, encode};
pub use face_array::{FaceArray, FaceKey, FaceKind};
pub use io::{load, save};
pub use legacy::rename_legacy_keys;

/// Current exchange format version.
pub const JMESH_VERSION: &str = "0.5";

/// A parameter value: the exchange format only carries flags, numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Returns the number, if this is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the flag, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Ordered parameter mapping. Insertion order is kept on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Document header (`_DataInfo_` on the wire).
#[derive(Debug, Clone, PartialEq)]
pub struct DataInfo {
    pub version: String,
    /// Free-text provenance.
    pub comment: String,
    /// Name of the scene object a sub-document came from.
    pub object_name: Option<String>,
}

impl Default for DataInfo {
    fn default() -> Self {
        Self {
            version: JMESH_VERSION.to_string(),
            comment: String::new(),
            object_name: None,
        }
    }
}

/// The exchange unit: vertices, named face arrays, parameters and sub-documents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshDocument {
    pub info: DataInfo,
    pub vertices: Vec<DVec3>,
    /// Face/element arrays in storage order.
    pub faces: Vec<(FaceKey, FaceArray)>,
    pub params: Params,
    /// Named per-object sub-documents (`MeshGroup`).
    pub groups: Vec<MeshDocument>,
}

impl MeshDocument {
    /// Creates an empty document with the current format version.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a document holding one triangle array.
    pub fn from_triangles(vertices: Vec<DVec3>, triangles: &[[u32; 3]]) -> Self {
        let mut doc = Self::new();
        doc.vertices = vertices;
        doc.push_faces(FaceKind::Tri3, FaceArray::from_rows(triangles));
        doc
    }

    /// Sets the provenance comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.info.comment = comment.into();
        self
    }

    /// Sets the originating object name.
    #[must_use]
    pub fn with_object_name(mut self, name: impl Into<String>) -> Self {
        self.info.object_name = Some(name.into());
        self
    }

    /// Appends a face array of `kind`, renaming all arrays of that kind so the
    /// naming convention holds (`tri3`, or `tri3(1)..tri3(N)`).
    pub fn push_faces(&mut self, kind: FaceKind, array: FaceArray) {
        self.faces.push((FaceKey::single(kind), array));
        self.renumber();
    }

    /// Reorders arrays of each kind by their wire number, keeping the slots each
    /// kind occupies. Unnumbered arrays come first; ties keep storage order.
    pub(crate) fn order_by_wire_index(&mut self) {
        for kind in FaceKind::ALL {
            let slots: Vec<usize> = (0..self.faces.len())
                .filter(|&i| self.faces[i].0.kind == kind)
                .collect();
            let mut ordered = slots.clone();
            ordered.sort_by_key(|&i| self.faces[i].0.index);
            if ordered == slots {
                continue;
            }
            let arrays: Vec<(FaceKey, FaceArray)> =
                ordered.iter().map(|&i| self.faces[i].clone()).collect();
            for (slot, entry) in slots.into_iter().zip(arrays) {
                self.faces[slot] = entry;
            }
        }
    }

    pub(crate) fn renumber(&mut self) {
        let keys: Vec<FaceKey> = self.faces.iter().map(|(k, _)| *k).collect();
        for ((key, _), renamed) in self.faces.iter_mut().zip(face_array::renumber_keys(&keys)) {
            *key = renamed;
        }
    }

    /// Looks up a face array by key.
    pub fn face(&self, key: FaceKey) -> Option<&FaceArray> {
        self.faces.iter().find(|(k, _)| *k == key).map(|(_, a)| a)
    }

    /// Face arrays of one kind, in storage order.
    pub fn faces_of(&self, kind: FaceKind) -> impl Iterator<Item = (&FaceKey, &FaceArray)> {
        self.faces
            .iter()
            .filter(move |(k, _)| k.kind == kind)
            .map(|(k, a)| (k, a))
    }

    /// Total number of face rows across every array.
    pub fn face_count(&self) -> usize {
        self.faces.iter().map(|(_, a)| a.len()).sum()
    }

    /// Checks every array's kind and index range, recursing into groups.
    pub fn validate(&self) -> Result<()> {
        for (key, array) in &self.faces {
            let field = key.to_string();
            array.check_kind(key.kind, &field)?;
            array.validate(self.vertices.len(), &field)?;
        }
        for group in &self.groups {
            group.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_faces_renames() {
        let mut doc = MeshDocument::new();
        doc.vertices = vec![DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z];
        doc.push_faces(FaceKind::Tri3, FaceArray::from_rows(&[[0, 1, 2]]));
        assert_eq!(doc.faces[0].0, FaceKey::single(FaceKind::Tri3));

        doc.push_faces(FaceKind::Tri3, FaceArray::from_rows(&[[0, 1, 3]]));
        assert_eq!(doc.faces[0].0, FaceKey::numbered(FaceKind::Tri3, 1));
        assert_eq!(doc.faces[1].0, FaceKey::numbered(FaceKind::Tri3, 2));
        assert_eq!(doc.face_count(), 2);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_params_replace_in_place() {
        let mut params = Params::new();
        params.insert("maxvol", 1.0);
        params.insert("dorepair", false);
        params.insert("maxvol", 2.0);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("maxvol").and_then(ParamValue::as_f64), Some(2.0));
        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["maxvol", "dorepair"]);
    }

    #[test]
    fn test_validate_catches_bad_index() {
        let doc = MeshDocument::from_triangles(vec![DVec3::ZERO, DVec3::X], &[[0, 1, 2]]);
        assert!(doc.validate().is_err());
    }
}
