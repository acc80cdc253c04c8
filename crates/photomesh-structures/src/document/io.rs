//! Loading and saving mesh documents.

use std::path::Path;

use photomesh_core::workdir::write_atomic;
use photomesh_core::{PhotomeshError, Result};

use super::{codec, MeshDocument};

/// Loads and decodes a document from `path`.
pub fn load(path: impl AsRef<Path>) -> Result<MeshDocument> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PhotomeshError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| PhotomeshError::format(path.display().to_string(), e.to_string()))?;
    let doc = codec::decode(value)?;
    log::debug!(
        "loaded {} ({} vertices, {} face arrays, {} groups)",
        path.display(),
        doc.vertices.len(),
        doc.faces.len(),
        doc.groups.len()
    );
    Ok(doc)
}

/// Encodes `doc` and writes it to `path`.
///
/// The file is replaced atomically, so a previous valid document stays in place
/// until the new one is complete.
pub fn save(doc: &MeshDocument, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = serde_json::to_vec_pretty(&codec::encode(doc))?;
    write_atomic(path, &bytes)?;
    log::debug!("saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blendermesh.jmsh");
        let mut doc = MeshDocument::from_triangles(
            vec![DVec3::new(0.1, 0.2, 0.3), DVec3::X, DVec3::Y],
            &[[0, 1, 2]],
        );
        doc.params.insert("keepratio", 0.5);
        save(&doc, &path).unwrap();
        assert_eq!(load(&path).unwrap(), doc);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("volumemesh.jmsh")).unwrap_err();
        assert!(matches!(err, PhotomeshError::NotFound(_)));
    }

    #[test]
    fn test_load_garbage_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regionmesh.jmsh");
        std::fs::write(&path, "MeshVertex3 = [1 2 3]").unwrap();
        assert!(matches!(load(&path).unwrap_err(), PhotomeshError::Format { .. }));
    }
}
