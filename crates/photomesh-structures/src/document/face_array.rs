//! Face and element arrays.
//!
//! Arrays are stored 0-based. A polygon soup whose rows all share one arity is kept
//! dense; mixed arities fall back to a ragged list of rows.

use std::fmt;

use photomesh_core::{PhotomeshError, Result};

/// Kind of face/element array, identified on the wire by its key stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaceKind {
    /// Triangles (`MeshTri3`).
    Tri3,
    /// Quadrilaterals (`MeshQuad4`).
    Quad4,
    /// Tetrahedra (`MeshTet4`).
    Tet4,
    /// General polygons, possibly of mixed arity (`MeshPoly`).
    Poly,
}

impl FaceKind {
    /// Every kind, in the order arrays are written.
    pub const ALL: [FaceKind; 4] = [Self::Tri3, Self::Quad4, Self::Tet4, Self::Poly];

    /// The wire key stem, e.g. `MeshTri3`.
    pub fn wire_stem(self) -> &'static str {
        match self {
            Self::Tri3 => "MeshTri3",
            Self::Quad4 => "MeshQuad4",
            Self::Tet4 => "MeshTet4",
            Self::Poly => "MeshPoly",
        }
    }

    /// The internal name, e.g. `tri3`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tri3 => "tri3",
            Self::Quad4 => "quad4",
            Self::Tet4 => "tet4",
            Self::Poly => "poly",
        }
    }

    /// The required arity, or `None` for general polygons.
    pub fn arity(self) -> Option<usize> {
        match self {
            Self::Tri3 => Some(3),
            Self::Quad4 | Self::Tet4 => Some(4),
            Self::Poly => None,
        }
    }

    fn from_stem(stem: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.wire_stem() == stem)
    }
}

/// Name of a face array: its kind plus an optional 1-based region number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceKey {
    pub kind: FaceKind,
    pub index: Option<usize>,
}

impl FaceKey {
    /// An unnumbered key (`tri3`).
    pub fn single(kind: FaceKind) -> Self {
        Self { kind, index: None }
    }

    /// A numbered key (`tri3(n)`), `n` being 1-based.
    pub fn numbered(kind: FaceKind, n: usize) -> Self {
        Self {
            kind,
            index: Some(n),
        }
    }

    /// The wire key, e.g. `MeshTri3(2)`.
    pub fn wire_key(&self) -> String {
        match self.index {
            Some(n) => format!("{}({n})", self.kind.wire_stem()),
            None => self.kind.wire_stem().to_string(),
        }
    }

    /// Parses a wire key such as `MeshTri3` or `MeshTri3(12)`.
    pub fn parse_wire(key: &str) -> Option<Self> {
        match key.split_once('(') {
            Some((stem, rest)) => {
                let n = rest.strip_suffix(')')?.parse::<usize>().ok()?;
                Some(Self::numbered(FaceKind::from_stem(stem)?, n))
            }
            None => Some(Self::single(FaceKind::from_stem(key)?)),
        }
    }
}

impl fmt::Display for FaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(n) => write!(f, "{}({n})", self.kind.name()),
            None => f.write_str(self.kind.name()),
        }
    }
}

/// Renames keys of each kind in storage order: a lone array is unnumbered,
/// N > 1 arrays become `(1)..(N)`.
pub fn renumber_keys(keys: &[FaceKey]) -> Vec<FaceKey> {
    let count_of = |kind: FaceKind| keys.iter().filter(|k| k.kind == kind).count();
    let mut seen = std::collections::HashMap::new();
    keys.iter()
        .map(|key| {
            if count_of(key.kind) == 1 {
                FaceKey::single(key.kind)
            } else {
                let n = seen.entry(key.kind).or_insert(0usize);
                *n += 1;
                FaceKey::numbered(key.kind, *n)
            }
        })
        .collect()
}

/// A face or element array with 0-based vertex indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceArray {
    /// Rows of uniform arity, stored row-major.
    Dense { arity: usize, indices: Vec<u32> },
    /// Rows of varying arity.
    Ragged(Vec<Vec<u32>>),
}

impl FaceArray {
    /// Builds a dense array from fixed-size rows.
    pub fn from_rows<const N: usize>(rows: &[[u32; N]]) -> Self {
        Self::Dense {
            arity: N,
            indices: rows.iter().flatten().copied().collect(),
        }
    }

    /// Builds an array from polygons, dense when every row has the same arity.
    pub fn from_polygons(polygons: Vec<Vec<u32>>) -> Self {
        let arity = polygons.first().map_or(0, Vec::len);
        if arity > 0 && polygons.iter().all(|p| p.len() == arity) {
            Self::Dense {
                arity,
                indices: polygons.into_iter().flatten().collect(),
            }
        } else if polygons.is_empty() {
            Self::Dense {
                arity: 0,
                indices: Vec::new(),
            }
        } else {
            Self::Ragged(polygons)
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Dense { arity, indices } => {
                if *arity == 0 {
                    0
                } else {
                    indices.len() / arity
                }
            }
            Self::Ragged(rows) => rows.len(),
        }
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The uniform arity, or `None` for ragged arrays.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::Dense { arity, .. } => Some(*arity),
            Self::Ragged(_) => None,
        }
    }

    /// Iterates over rows as slices.
    pub fn rows(&self) -> Box<dyn Iterator<Item = &[u32]> + '_> {
        match self {
            Self::Dense { arity, indices } => {
                if *arity == 0 {
                    Box::new(std::iter::empty())
                } else {
                    Box::new(indices.chunks_exact(*arity))
                }
            }
            Self::Ragged(rows) => Box::new(rows.iter().map(Vec::as_slice)),
        }
    }

    /// Iterates over every index in every row.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows().flat_map(|r| r.iter().copied())
    }

    /// Largest index referenced, if any.
    pub fn max_index(&self) -> Option<u32> {
        self.indices().max()
    }

    /// Rows as owned polygons.
    pub fn to_polygons(&self) -> Vec<Vec<u32>> {
        self.rows().map(<[u32]>::to_vec).collect()
    }

    /// Checks that every index lies in `[0, vertex_count)`.
    pub fn validate(&self, vertex_count: usize, field: &str) -> Result<()> {
        match self.max_index() {
            Some(max) if max as usize >= vertex_count => Err(PhotomeshError::validation(format!(
                "{field}: index {max} out of range for {vertex_count} vertices"
            ))),
            _ => Ok(()),
        }
    }

    /// Checks that the array fits `kind` (fixed-arity kinds require dense rows).
    pub fn check_kind(&self, kind: FaceKind, field: &str) -> Result<()> {
        match (kind.arity(), self) {
            (None, _) => Ok(()),
            (Some(_), _) if self.is_empty() => Ok(()),
            (Some(expected), Self::Dense { arity, .. }) if *arity == expected => Ok(()),
            (Some(expected), Self::Dense { arity, .. }) => Err(PhotomeshError::validation(format!(
                "{field}: expected {expected} indices per row, found {arity}"
            ))),
            (Some(expected), Self::Ragged(_)) => Err(PhotomeshError::validation(format!(
                "{field}: rows of mixed arity where {expected} indices per row are required"
            ))),
        }
    }

    /// Maps every index through `f`.
    pub fn map_indices(&self, mut f: impl FnMut(u32) -> u32) -> Self {
        match self {
            Self::Dense { arity, indices } => Self::Dense {
                arity: *arity,
                indices: indices.iter().map(|&i| f(i)).collect(),
            },
            Self::Ragged(rows) => {
                Self::Ragged(rows.iter().map(|r| r.iter().map(|&i| f(i)).collect()).collect())
            }
        }
    }
}
