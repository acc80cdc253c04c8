//! Engine-backed workflows beyond the scene meshing pipeline.
//!
//! - [`volume`]: mesh a volumetric image, preview label grids
//! - [`surface`]: process or import object surfaces
//! - [`simulation`]: photon transport on a meshed domain

pub mod simulation;
pub mod surface;
pub mod volume;
