//! Interface to the external plane-sweep matching primitive
//!
//! The GPU kernel that builds cost volumes and scores patches is consumed as
//! an opaque collaborator: the pipeline hands it flat per-pixel buffers and
//! waits for each call to complete. A failed call is fatal for the current
//! chunk — partial depth data without a clear invalid marker is
//! indistinguishable from a low-confidence but valid estimate.

use mvs_core::Result;

/// Matching configuration shared by the refinement and smoothing passes.
#[derive(Debug, Clone, Copy)]
pub struct RefineParams {
    /// Number of candidate depths evaluated around the current estimate.
    pub ndepths_to_refine: i32,
    /// Match-window half-size in pixels.
    pub wsh: i32,
    /// Color-similarity gamma.
    pub gamma_c: f32,
    /// Spatial gamma.
    pub gamma_p: f32,
    /// Sub-pixel epipolar shift.
    pub epip_shift: f32,
    /// Whether depth steps are sized by the target or the reference camera's
    /// pixel size.
    pub use_tc_or_rc_pixel_size: bool,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            ndepths_to_refine: 31,
            wsh: 4,
            gamma_c: 15.5,
            gamma_p: 8.0,
            epip_shift: 0.0,
            use_tc_or_rc_pixel_size: false,
        }
    }
}

/// The plane-sweep depth-matching primitive.
///
/// All methods operate on flat row-major f32 buffers at the given `scale`.
/// Implementors own their device handle exclusively; one implementor per
/// concurrent worker.
pub trait PlaneSweeping {
    /// Refine a strip of an rc/tc depth/similarity pair in place.
    ///
    /// `depth_map` and `sim_map` cover the columns `[x_from, x_from + w_part)`
    /// of camera `rc`'s image at `scale`, full height, row stride `w_part`.
    /// On return they hold the refined estimates; a non-positive depth marks
    /// a pixel with no acceptable candidate.
    #[allow(clippy::too_many_arguments)]
    fn refine_rc_tc_depth_map(
        &mut self,
        params: &RefineParams,
        sim_map: &mut [f32],
        depth_map: &mut [f32],
        rc: usize,
        tc: usize,
        scale: u32,
        x_from: usize,
        w_part: usize,
    ) -> Result<()>;

    /// Spatially smooth a full step-1 depth buffer for camera `rc` in place.
    fn smooth_depth_map(
        &mut self,
        depth_map: &mut [f32],
        rc: usize,
        scale: u32,
        gamma_c: f32,
        gamma_p: f32,
        wsh: i32,
    ) -> Result<()>;

    /// Reject outlier depths in a full step-1 depth buffer in place; depths
    /// whose support cost exceeds `min_cost_thr` are invalidated.
    fn filter_depth_map(
        &mut self,
        depth_map: &mut [f32],
        rc: usize,
        scale: u32,
        gamma_c: f32,
        min_cost_thr: f32,
        wsh: i32,
    ) -> Result<()>;
}
