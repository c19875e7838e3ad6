//! Depth/similarity maps and the per-camera refinement pipeline
//!
//! For each reference camera the pipeline improves a coarse depth/similarity
//! map by evaluating candidate depths against neighboring target cameras
//! through an external plane-sweep primitive, then applies smoothing and
//! outlier-filtering passes. Lower similarity always means a stronger match.

pub mod depth_sim_map;
pub mod plane_sweep;
pub mod refine;

pub use depth_sim_map::*;
pub use plane_sweep::*;
pub use refine::*;

pub use mvs_core::{Error, Result};
