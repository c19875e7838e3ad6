//! Out-of-core space partitioning
//!
//! Reconstructions too large to hold in memory are split into a grid of
//! cells sized so the number of observed 3D tracks per cell stays under a
//! budget. The partitioner turns a global bounding volume plus per-cell
//! track counts into an ordered, possibly-overlapping set of sub-volumes
//! that can be reconstructed independently and merged later.

pub mod hexahedron;
pub mod reconstruction_plan;
pub mod voxels_grid;

pub use hexahedron::*;
pub use reconstruction_plan::*;
pub use voxels_grid::*;

pub use mvs_core::{Error, Result};

/// Integer coordinate of one cell in the global voxel grid.
pub type Voxel = nalgebra::Vector3<i32>;
