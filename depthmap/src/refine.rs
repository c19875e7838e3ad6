//! Strip-chunked rc/tc depth-map refinement
//!
//! The reference image is processed in four vertical strips so the transient
//! plane-sweep buffers stay bounded regardless of resolution. Strip results
//! are merged into the shared map under an only-improves rule, which makes
//! accumulation over target cameras commutative: any processing order yields
//! the same final map.

use crate::{DepthSim, DepthSimMap, PlaneSweeping, RefineParams};
use mvs_core::{Error, Result};
use mvs_multiview::MultiViewParams;
use nalgebra::{Point3, Vector3};
use std::time::Instant;

/// Fixed number of vertical strips per refinement call.
const N_STRIPS: usize = 4;

/// Default outlier-rejection cost threshold for the filter pass.
pub const DEFAULT_FILTER_MIN_COST_THR: f32 = 25.0;

/// Orthonormal frame aligned with the epipolar geometry of an rc/tc pair at
/// a 3D point: `n` looks back at the reference camera, `x` lies along the
/// baseline component orthogonal to `n`, `y` completes the frame.
#[derive(Debug, Clone, Copy)]
pub struct EpipolarFrame {
    pub n: Vector3<f64>,
    pub x: Vector3<f64>,
    pub y: Vector3<f64>,
}

/// Per-camera refinement pipeline over an external plane-sweep primitive.
pub struct RcTc<'a, P: PlaneSweeping> {
    mp: &'a MultiViewParams,
    cps: &'a mut P,
}

impl<'a, P: PlaneSweeping> RcTc<'a, P> {
    pub fn new(mp: &'a MultiViewParams, cps: &'a mut P) -> Self {
        Self { mp, cps }
    }

    /// Refine `map` against one target camera `tc`.
    ///
    /// The working resolution is the reference image's native resolution
    /// divided by the map's `scale`. Each strip delegates to the plane-sweep
    /// primitive, then merges back: a strip pixel overwrites its grid cell
    /// only when its depth is valid (> 0) and its similarity is strictly
    /// lower than the cell's current one. The last strip absorbs the
    /// remainder when the width is not divisible by four.
    pub fn refine_rc_tc_depth_sim_map(
        &mut self,
        map: &mut DepthSimMap,
        rc: usize,
        tc: usize,
        params: &RefineParams,
    ) -> Result<()> {
        let scale = map.scale as usize;
        let w = self.mp.mip.get_width(rc) as usize / scale;
        let h = self.mp.mip.get_height(rc) as usize / scale;
        if w == 0 || h == 0 {
            return Err(Error::ConfigError(format!(
                "camera {rc} image is zero-sized at scale {scale}"
            )));
        }
        if map.sw != w || map.sh != h {
            return Err(Error::InvalidInput(format!(
                "map is {}x{} but camera {rc} at scale {scale} is {w}x{h}",
                map.sw, map.sh
            )));
        }

        let step = map.step as usize;
        let w_part = w / N_STRIPS;
        let t0 = Instant::now();

        for p in 0..N_STRIPS {
            let x_from = p * w_part;
            let w_act = if p == N_STRIPS - 1 { w - x_from } else { w_part };
            if w_act == 0 {
                continue;
            }

            // strip buffers are scoped to this iteration
            let mut depth_map = map.get_depth_map_step1_x_part(x_from, w_act);
            let mut sim_map = map.get_sim_map_step1_x_part(x_from, w_act);

            self.cps.refine_rc_tc_depth_map(
                params,
                &mut sim_map,
                &mut depth_map,
                rc,
                tc,
                map.scale,
                x_from,
                w_act,
            )?;

            for yp in 0..h {
                let gy = yp / step;
                for xp in x_from..x_from + w_act {
                    let depth = depth_map[yp * w_act + (xp - x_from)];
                    let sim = sim_map[yp * w_act + (xp - x_from)];
                    let gx = xp / step;
                    if depth > 0.0 && sim < map.sim(gx, gy) {
                        map.set(gx, gy, DepthSim::new(depth, sim));
                    }
                }
            }
        }

        tracing::debug!(
            rc,
            tc,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "refined depth/sim map"
        );
        Ok(())
    }

    /// Smooth the map's depth channel via the external primitive, writing the
    /// result back at the map's `step` stride. Similarity is not consulted.
    pub fn smooth_depth_map(
        &mut self,
        map: &mut DepthSimMap,
        rc: usize,
        wsh: i32,
        gamma_c: f32,
        gamma_p: f32,
    ) -> Result<()> {
        let mut depth_map = map.get_depth_map_step1();
        self.cps
            .smooth_depth_map(&mut depth_map, rc, map.scale, gamma_c, gamma_p, wsh)?;
        map.apply_depth_step1(&depth_map)
    }

    /// Filter outlier depths with the fixed default cost threshold.
    pub fn filter_depth_map(
        &mut self,
        map: &mut DepthSimMap,
        rc: usize,
        wsh: i32,
        gamma_c: f32,
    ) -> Result<()> {
        self.filter_depth_map_with_threshold(map, rc, wsh, gamma_c, DEFAULT_FILTER_MIN_COST_THR)
    }

    /// Filter outlier depths with an explicit cost threshold.
    pub fn filter_depth_map_with_threshold(
        &mut self,
        map: &mut DepthSimMap,
        rc: usize,
        wsh: i32,
        gamma_c: f32,
        min_cost_thr: f32,
    ) -> Result<()> {
        let mut depth_map = map.get_depth_map_step1();
        self.cps
            .filter_depth_map(&mut depth_map, rc, map.scale, gamma_c, min_cost_thr, wsh)?;
        map.apply_depth_step1(&depth_map)
    }

    /// Epipolar frame for an rc/tc pair at a 3D point.
    ///
    /// # Errors
    /// Fails when the point coincides with the reference optical center or
    /// the cameras share one (zero baseline).
    pub fn compute_rot_cs_rc_tc_epip(
        &self,
        p: &Point3<f64>,
        rc: usize,
        tc: usize,
    ) -> Result<EpipolarFrame> {
        let n = (self.mp.c_arr[rc] - p)
            .try_normalize(1e-12)
            .ok_or_else(|| {
                Error::GeometryError("point coincides with reference optical center".into())
            })?;
        let baseline = (self.mp.c_arr[tc] - self.mp.c_arr[rc])
            .try_normalize(1e-12)
            .ok_or_else(|| Error::GeometryError("rc/tc pair has zero baseline".into()))?;
        let y = n.cross(&baseline).try_normalize(1e-12).ok_or_else(|| {
            Error::GeometryError("baseline is parallel to the viewing direction".into())
        })?;
        let x = y.cross(&n).normalize();
        Ok(EpipolarFrame { n, x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_widths_cover_image_with_remainder_in_last() {
        // mirror of the strip computation in refine_rc_tc_depth_sim_map
        let w = 10usize;
        let w_part = w / N_STRIPS;
        let mut widths = Vec::new();
        for p in 0..N_STRIPS {
            let x_from = p * w_part;
            widths.push(if p == N_STRIPS - 1 { w - x_from } else { w_part });
        }
        assert_eq!(widths, vec![2, 2, 2, 4]);
        assert_eq!(widths.iter().sum::<usize>(), w);
    }
}
