//! Fallback renames for documents written with the older key names.
//!
//! `MeshSurf` (and `MeshSurf(n)`) become `MeshTri3`, `MeshNode` becomes
//! `MeshVertex3`. A key is renamed only when its target is absent, so the pass is
//! idempotent. Key order is preserved.

use serde_json::{Map, Value};

const RENAMES: [(&str, &str); 2] = [("MeshSurf", "MeshTri3"), ("MeshNode", "MeshVertex3")];

fn modern_name(key: &str) -> Option<String> {
    RENAMES.iter().find_map(|(old, new)| {
        let rest = key.strip_prefix(old)?;
        (rest.is_empty() || rest.starts_with('(')).then(|| format!("{new}{rest}"))
    })
}

/// Renames legacy keys of `object` and of every `MeshGroup` member.
///
/// Returns the number of keys renamed.
pub fn rename_legacy_keys(object: &mut Map<String, Value>) -> usize {
    let needs_rename = object.keys().any(|k| {
        modern_name(k).is_some_and(|target| !object.contains_key(&target))
    });

    let mut renamed = 0;
    if needs_rename {
        let old = std::mem::take(object);
        let present: Vec<String> = old.keys().cloned().collect();
        for (key, value) in old {
            match modern_name(&key) {
                Some(target) if !present.contains(&target) => {
                    log::debug!("renaming legacy key '{key}' to '{target}'");
                    object.insert(target, value);
                    renamed += 1;
                }
                _ => {
                    object.insert(key, value);
                }
            }
        }
    }

    match object.get_mut("MeshGroup") {
        Some(Value::Array(members)) => {
            for member in members {
                if let Value::Object(map) = member {
                    renamed += rename_legacy_keys(map);
                }
            }
        }
        Some(Value::Object(map)) => renamed += rename_legacy_keys(map),
        _ => {}
    }
    renamed
}
