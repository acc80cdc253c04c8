//! Core abstractions for photomesh.
//!
//! This crate provides the fundamental types shared by the rest of the workspace:
//! - [`PhotomeshError`] taxonomy used by every stage of the exchange pipeline
//! - Configuration structs ([`Config`], [`MeshingParams`], ...) passed explicitly per run
//! - [`BoundingBox`] with `+inf`/`-inf` "empty" sentinels
//! - [`WorkDir`] for the per-session working directory and its artifacts

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Options structs legitimately have many boolean flags
#![allow(clippy::struct_excessive_bools)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod bounding_box;
pub mod error;
pub mod optics;
pub mod options;
pub mod workdir;

pub use bounding_box::BoundingBox;
pub use error::{PhotomeshError, Result};
pub use optics::OpticalProperties;
pub use options::{
    BackendKind, Config, EngineOptions, ImageType, MeshingParams, SimulationParams,
    SourceParams, SurfaceExtraction, VolumeMeshingParams,
};
pub use workdir::{Artifact, WorkDir};

// Re-export glam types for convenience
pub use glam::{DMat4, DVec3, Vec3};
