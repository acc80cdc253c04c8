//! Render handoff for photomesh.
//!
//! The renderer itself is out of scope; this crate prepares the data handed to it:
//! - [`ColorMap`] ramps built from hex colors with sRGB → linear decoding
//! - [`GridMaterial`] metadata describing how each label or density grid is shaded

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod color_maps;
pub mod materials;

pub use color_maps::{srgb_to_linear, ColorMap, ColorMapRegistry};
pub use materials::{ColorStop, GridMaterial};
