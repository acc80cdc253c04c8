//! Structure implementations for photomesh.
//!
//! This crate provides the data that crosses the engine boundary and the scene
//! geometry the pipeline works on:
//! - Mesh exchange documents (JMesh encode/decode, legacy key renames)
//! - Region reconstruction from returned documents
//! - Label grids and their material ramps
//! - Vertex-weight fields
//! - Scene objects and the realize / merge / resolve / tessellate steps

// Geometry code intentionally uses casts for indices and coordinates
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod document;
pub mod label_grid;
pub mod region;
pub mod scene;
pub mod weights;

pub use document::{FaceArray, FaceKey, FaceKind, MeshDocument, ParamValue, Params};
pub use label_grid::{GridData, GridMode, LabelGridSet, NamedGrid, Volume};
pub use region::{Reconstruction, Region};
pub use scene::{
    ExactSolver, FastSolver, IntersectionSolver, ObjectData, PolyMesh, Primitive, ResolveError,
    SceneObject, WorkingObject,
};
pub use weights::WeightGroup;
