//! Calibrated multi-view camera geometry
//!
//! This crate holds the per-camera projection model every downstream
//! computation depends on: a structure-of-arrays camera table loaded once
//! from per-camera files, plus stateless geometric queries (projection,
//! pixel-size-at-point, visibility and bounds tests).

pub mod geometry;
pub mod input_params;
pub mod params;

pub use geometry::*;
pub use input_params::*;
pub use params::*;

pub use mvs_core::{Error, Result};

/// Integer pixel coordinate.
pub type Pixel = nalgebra::Point2<i32>;
