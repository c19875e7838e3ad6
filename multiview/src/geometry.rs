//! Stateless geometric queries over the camera table
//!
//! All queries are read-only and safe to share across concurrent workers.
//! Degenerate inputs (zero-length directions, rays parallel to the sampling
//! plane, points behind the camera) return documented sentinels — 0.0 for
//! sizes, `(-1, -1)` for pixels — never NaN.
//!
//! Pixel-size convention: the size a pixel of camera `cam` subtends at a 3D
//! point is measured along the actual query ray — project the point, shift
//! the pixel by `d` columns, back-project the shifted ray and intersect it
//! with the plane through the point orthogonal to the viewing direction.
//! Every pixel-size variant below uses this same convention.

use crate::{MultiViewParams, Pixel};
use nalgebra::{Matrix3x4, Point2, Point3, Vector3};

/// Sentinel pixel returned when a 3D point has no valid projection.
pub const NO_PIXEL: Point2<f64> = Point2::new(-1.0, -1.0);

const DEG_EPS: f64 = 1e-12;

/// Guarded normalization: `None` for (near-)zero-length vectors.
fn normalized(v: Vector3<f64>) -> Option<Vector3<f64>> {
    let n = v.norm();
    if n < DEG_EPS {
        None
    } else {
        Some(v / n)
    }
}

/// Intersect the ray `origin + t * dir` with the plane through `plane_point`
/// with normal `plane_normal`. `None` when the ray is parallel to the plane.
fn line_plane_intersect(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    plane_point: &Point3<f64>,
    plane_normal: &Vector3<f64>,
) -> Option<Point3<f64>> {
    let denom = plane_normal.dot(dir);
    if denom.abs() < DEG_EPS {
        return None;
    }
    let t = plane_normal.dot(&(plane_point - origin)) / denom;
    Some(origin + dir * t)
}

impl MultiViewParams {
    /// True iff the point's depth along `rc`'s viewing axis is positive.
    pub fn is_3d_point_in_front_of_cam(&self, x: &Point3<f64>, rc: usize) -> bool {
        let p = &self.cam_arr[rc];
        let z = p[(2, 0)] * x.x + p[(2, 1)] * x.y + p[(2, 2)] * x.z + p[(2, 3)];
        z > 0.0
    }

    /// Project a 3D point through an explicit projection matrix.
    ///
    /// Returns the [`NO_PIXEL`] sentinel when the homogeneous divisor is
    /// non-positive (point behind the camera or at infinity).
    pub fn get_pixel_for_3d_point_p(&self, x: &Point3<f64>, p: &Matrix3x4<f64>) -> Point2<f64> {
        let hx = p[(0, 0)] * x.x + p[(0, 1)] * x.y + p[(0, 2)] * x.z + p[(0, 3)];
        let hy = p[(1, 0)] * x.x + p[(1, 1)] * x.y + p[(1, 2)] * x.z + p[(1, 3)];
        let hz = p[(2, 0)] * x.x + p[(2, 1)] * x.y + p[(2, 2)] * x.z + p[(2, 3)];
        if hz <= 0.0 {
            return NO_PIXEL;
        }
        Point2::new(hx / hz, hy / hz)
    }

    /// Project a 3D point through camera `rc`'s projection matrix.
    pub fn get_pixel_for_3d_point(&self, x: &Point3<f64>, rc: usize) -> Point2<f64> {
        self.get_pixel_for_3d_point_p(x, &self.cam_arr[rc])
    }

    /// Integer-pixel variant; `(-1, -1)` when the projection fails.
    pub fn get_pixel_for_3d_point_rounded(&self, x: &Point3<f64>, rc: usize) -> Pixel {
        let pix = self.get_pixel_for_3d_point(x, rc);
        if pix == NO_PIXEL {
            return Pixel::new(-1, -1);
        }
        Pixel::new((pix.x + 0.5).floor() as i32, (pix.y + 0.5).floor() as i32)
    }

    /// Physical size, in world units, that one pixel of `cam` subtends at
    /// `x0`. Degenerate geometry returns 0.0.
    pub fn get_cam_pixel_size(&self, x0: &Point3<f64>, cam: usize) -> f64 {
        self.get_cam_pixel_size_offset(x0, cam, 1.0)
    }

    /// Pixel size at `x0` for a shift of `d` pixel columns.
    pub fn get_cam_pixel_size_offset(&self, x0: &Point3<f64>, cam: usize, d: f64) -> f64 {
        if d == 0.0 {
            return 0.0;
        }
        let pix = self.get_pixel_for_3d_point(x0, cam);
        if pix == NO_PIXEL {
            return 0.0;
        }
        let shifted = Vector3::new(pix.x + d, pix.y, 1.0);
        let ray = match normalized(self.icam_arr[cam] * shifted) {
            Some(r) => r,
            None => return 0.0,
        };
        let c = self.c_arr[cam];
        let view = match normalized(c - x0) {
            Some(n) => n,
            None => return 0.0,
        };
        match line_plane_intersect(&c, &ray, x0, &view) {
            Some(lpi) => (x0 - lpi).norm(),
            None => 0.0,
        }
    }

    /// Effective depth resolution along `rc`'s ray for a `d`-pixel shift in
    /// `tc`: the target-camera pixel size divided by the sine of the
    /// ray-to-ray triangulation angle. Falls back to the plain pixel size
    /// when the rays are (near-)parallel.
    pub fn get_cam_pixel_size_rc_tc(
        &self,
        p: &Point3<f64>,
        rc: usize,
        tc: usize,
        d: f64,
    ) -> f64 {
        if d == 0.0 {
            return 0.0;
        }
        let pix_size = self.get_cam_pixel_size_offset(p, tc, d);
        let rpix = self.get_pixel_for_3d_point(p, rc);
        if rpix == NO_PIXEL {
            return pix_size;
        }
        let refvect = match normalized(self.icam_arr[rc] * Vector3::new(rpix.x, rpix.y, 1.0)) {
            Some(v) => v,
            None => return pix_size,
        };
        let tarvect = match normalized(p - self.c_arr[tc]) {
            Some(v) => v,
            None => return pix_size,
        };
        let sin_angle = refvect.cross(&tarvect).norm();
        if sin_angle < 1e-6 {
            pix_size
        } else {
            pix_size / sin_angle
        }
    }

    /// Depth-sampling step for a plane sweep at the given `scale` and `step`:
    /// the more constraining of the reference pixel size and the rc/tc pair
    /// resolution, both taken at a `scale * step` pixel shift.
    pub fn get_cam_pixel_size_plane_sweep_alpha(
        &self,
        p: &Point3<f64>,
        rc: usize,
        tc: usize,
        scale: u32,
        step: u32,
    ) -> f64 {
        let d = (scale * step) as f64;
        let av_rc = self.get_cam_pixel_size_offset(p, rc, d);
        let av_rc_tc = self.get_cam_pixel_size_rc_tc(p, rc, tc, d);
        av_rc.max(av_rc_tc)
    }

    /// Multi-target variant: average of the pairwise sweep steps. Returns
    /// 0.0 for an empty target set.
    pub fn get_cam_pixel_size_plane_sweep_alpha_tcams(
        &self,
        p: &Point3<f64>,
        rc: usize,
        tcams: &[usize],
        scale: u32,
        step: u32,
    ) -> f64 {
        if tcams.is_empty() {
            return 0.0;
        }
        let sum: f64 = tcams
            .iter()
            .map(|&tc| self.get_cam_pixel_size_plane_sweep_alpha(p, rc, tc, scale, step))
            .sum();
        sum / tcams.len() as f64
    }

    /// Smallest (most constraining) pixel size over a candidate target set.
    /// Degenerate cameras (sentinel 0.0) are skipped; an empty or fully
    /// degenerate set returns 0.0.
    pub fn get_cams_min_pixel_size(&self, x0: &Point3<f64>, tcams: &[usize]) -> f64 {
        match self.get_cams_min_pixel_size_index(x0, tcams) {
            Some(tc) => self.get_cam_pixel_size(x0, tc),
            None => 0.0,
        }
    }

    /// Which target camera attains the smallest pixel size at `x0`.
    pub fn get_cams_min_pixel_size_index(
        &self,
        x0: &Point3<f64>,
        tcams: &[usize],
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for &tc in tcams {
            let size = self.get_cam_pixel_size(x0, tc);
            if size <= 0.0 {
                continue;
            }
            match best {
                Some((_, bs)) if bs <= size => {}
                _ => best = Some((tc, size)),
            }
        }
        best.map(|(tc, _)| tc)
    }

    /// Bounds check against camera `cam`'s resolution downscaled by `d`,
    /// with the configured border margin excluded.
    pub fn is_pixel_in_image_scaled(&self, pix: &Pixel, d: u32, cam: usize) -> bool {
        let w = (self.mip.get_width(cam) / d) as i32;
        let h = (self.mip.get_height(cam) / d) as i32;
        pix.x >= self.border
            && pix.x < w - self.border
            && pix.y >= self.border
            && pix.y < h - self.border
    }

    pub fn is_pixel_in_image(&self, pix: &Pixel, cam: usize) -> bool {
        self.is_pixel_in_image_scaled(pix, 1, cam)
    }

    /// Continuous-coordinate bounds check at full resolution.
    pub fn is_point_in_image(&self, pix: &Point2<f64>, cam: usize) -> bool {
        self.is_pixel_in_image(&Pixel::new(pix.x as i32, pix.y as i32), cam)
    }

    /// Bounds check against a rectangular sub-window `[lu, rd]` (inclusive)
    /// of camera `cam`'s image downscaled by `d`.
    pub fn is_pixel_in_cut_out(
        &self,
        pix: &Pixel,
        lu: &Pixel,
        rd: &Pixel,
        d: u32,
        cam: usize,
    ) -> bool {
        self.is_pixel_in_image_scaled(pix, d, cam)
            && pix.x >= lu.x
            && pix.x <= rd.x
            && pix.y >= lu.y
            && pix.y <= rd.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MultiViewInputParams;
    use nalgebra::Matrix3;

    fn lookat_camera(mp: &mut MultiViewParams, i: usize, center: Point3<f64>) {
        // camera at `center` looking at the origin, 500px focal
        let z = normalized(Point3::origin() - center).unwrap();
        let up = Vector3::new(0.0, 1.0, 0.0);
        let x = normalized(up.cross(&z)).unwrap();
        let y = z.cross(&x);
        let r = Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]);
        let k = Matrix3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0);
        let p = crate::compose_projection_matrix(&k, &r, &center);
        mp.set_camera(i, &p).unwrap();
    }

    fn three_cameras_on_circle() -> MultiViewParams {
        let mut mip = MultiViewInputParams::default();
        for _ in 0..3 {
            mip.push_image_params(mvs_core::ImageParams::new(640, 480));
        }
        let mut mp = MultiViewParams::new(3, mip, 0.5).unwrap();
        for i in 0..3 {
            let a = i as f64 * 2.0 * std::f64::consts::PI / 3.0;
            lookat_camera(&mut mp, i, Point3::new(4.0 * a.cos(), 0.0, 4.0 * a.sin()));
        }
        mp
    }

    #[test]
    fn origin_is_in_front_of_all_circle_cameras() {
        let mp = three_cameras_on_circle();
        for rc in 0..3 {
            assert!(mp.is_3d_point_in_front_of_cam(&Point3::origin(), rc));
        }
    }

    #[test]
    fn point_behind_camera_projects_to_sentinel() {
        let mp = three_cameras_on_circle();
        // behind camera 0 which sits at (4, 0, 0)
        let behind = Point3::new(8.0, 0.0, 0.0);
        assert!(!mp.is_3d_point_in_front_of_cam(&behind, 0));
        assert_eq!(mp.get_pixel_for_3d_point(&behind, 0), NO_PIXEL);
        assert_eq!(mp.get_pixel_for_3d_point_rounded(&behind, 0), Pixel::new(-1, -1));
    }

    #[test]
    fn pixel_size_at_origin_is_finite_positive() {
        let mp = three_cameras_on_circle();
        for cam in 0..3 {
            let s = mp.get_cam_pixel_size(&Point3::origin(), cam);
            assert!(s.is_finite() && s > 0.0, "cam {cam}: {s}");
            // 500px focal at distance 4 subtends ~4/500 world units per pixel
            assert!((s - 4.0 / 500.0).abs() < 1e-3, "cam {cam}: {s}");
        }
    }

    #[test]
    fn zero_offset_pixel_size_is_zero() {
        let mp = three_cameras_on_circle();
        assert_eq!(mp.get_cam_pixel_size_offset(&Point3::origin(), 0, 0.0), 0.0);
        assert_eq!(mp.get_cam_pixel_size_rc_tc(&Point3::origin(), 0, 1, 0.0), 0.0);
    }

    #[test]
    fn rc_tc_pixel_size_grows_with_shallow_angles() {
        let mp = three_cameras_on_circle();
        let p = Point3::origin();
        let pair = mp.get_cam_pixel_size_rc_tc(&p, 0, 1, 1.0);
        let plain = mp.get_cam_pixel_size(&p, 1);
        // dividing by sin of the triangulation angle can only enlarge
        assert!(pair >= plain - 1e-12);
    }

    #[test]
    fn min_pixel_size_picks_a_real_camera() {
        let mp = three_cameras_on_circle();
        let p = Point3::new(0.5, 0.0, 0.0);
        let idx = mp.get_cams_min_pixel_size_index(&p, &[1, 2]).unwrap();
        assert!(idx == 1 || idx == 2);
        let min = mp.get_cams_min_pixel_size(&p, &[1, 2]);
        assert!(min > 0.0);
        assert!(min <= mp.get_cam_pixel_size(&p, 1) + 1e-12);
        assert!(min <= mp.get_cam_pixel_size(&p, 2) + 1e-12);
    }

    #[test]
    fn bounds_checks_respect_border_and_downscale() {
        let mp = three_cameras_on_circle();
        assert!(mp.is_pixel_in_image(&Pixel::new(320, 240), 0));
        assert!(!mp.is_pixel_in_image(&Pixel::new(0, 240), 0));
        assert!(!mp.is_pixel_in_image(&Pixel::new(639, 240), 0));
        // downscale 2: width 320, border 2 → x must stay below 318
        assert!(mp.is_pixel_in_image_scaled(&Pixel::new(317, 120), 2, 0));
        assert!(!mp.is_pixel_in_image_scaled(&Pixel::new(318, 120), 2, 0));
    }

    #[test]
    fn cut_out_requires_window_and_image() {
        let mp = three_cameras_on_circle();
        let lu = Pixel::new(100, 100);
        let rd = Pixel::new(200, 200);
        assert!(mp.is_pixel_in_cut_out(&Pixel::new(150, 150), &lu, &rd, 1, 0));
        assert!(!mp.is_pixel_in_cut_out(&Pixel::new(99, 150), &lu, &rd, 1, 0));
        assert!(!mp.is_pixel_in_cut_out(&Pixel::new(201, 150), &lu, &rd, 1, 0));
    }
}
