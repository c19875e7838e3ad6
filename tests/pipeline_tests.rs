//! End-to-end exercise of the facade: calibrate cameras, refine one
//! reference depth map against its neighbors, partition the scene volume
//! and persist the plan.

use mvs::core::ImageParams;
use mvs::depthmap::{DepthSimMap, PlaneSweeping, RcTc, RefineParams};
use mvs::largescale::{
    load_voxels_array, save_voxels_array, Hexahedron, ReconstructionPlan, TrackCountOracle, Voxel,
    VoxelsGrid,
};
use mvs::multiview::{compose_projection_matrix, MultiViewInputParams, MultiViewParams};
use nalgebra::{Matrix3, Point3, Vector3};

struct ConstantSweeper;

impl PlaneSweeping for ConstantSweeper {
    fn refine_rc_tc_depth_map(
        &mut self,
        _params: &RefineParams,
        sim_map: &mut [f32],
        depth_map: &mut [f32],
        _rc: usize,
        tc: usize,
        _scale: u32,
        _x_from: usize,
        _w_part: usize,
    ) -> mvs::core::Result<()> {
        for (d, s) in depth_map.iter_mut().zip(sim_map.iter_mut()) {
            *d = 4.0;
            *s = 0.1 * (tc as f32 + 1.0);
        }
        Ok(())
    }

    fn smooth_depth_map(
        &mut self,
        _depth_map: &mut [f32],
        _rc: usize,
        _scale: u32,
        _gamma_c: f32,
        _gamma_p: f32,
        _wsh: i32,
    ) -> mvs::core::Result<()> {
        Ok(())
    }

    fn filter_depth_map(
        &mut self,
        _depth_map: &mut [f32],
        _rc: usize,
        _scale: u32,
        _gamma_c: f32,
        _min_cost_thr: f32,
        _wsh: i32,
    ) -> mvs::core::Result<()> {
        Ok(())
    }
}

struct Uniform(u64);

impl TrackCountOracle for Uniform {
    fn count_tracks_in(&self, _hexah: &Hexahedron) -> u64 {
        self.0
    }
}

#[test]
fn chunked_reconstruction_plan_feeds_per_camera_refinement() {
    mvs::init_thread_pool(None).unwrap();

    // three cameras on a circle looking at the origin
    let mut mip = MultiViewInputParams::default();
    for _ in 0..3 {
        mip.push_image_params(ImageParams::new(640, 480));
    }
    let mut mp = MultiViewParams::new(3, mip, 0.5).unwrap();
    let k = Matrix3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0);
    for i in 0..3 {
        let a = i as f64 * 2.0 * std::f64::consts::PI / 3.0;
        let center = Point3::new(4.0 * a.cos(), 0.0, 4.0 * a.sin());
        let z = (Point3::origin() - center).normalize();
        let x = Vector3::y().cross(&z).normalize();
        let y = z.cross(&x);
        let r = Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]);
        mp.set_camera(i, &compose_projection_matrix(&k, &r, &center))
            .unwrap();
    }

    // the scene volume is visible from every camera
    for cam in 0..3 {
        assert!(mp.is_3d_point_in_front_of_cam(&Point3::origin(), cam));
        assert!(mp.get_cam_pixel_size(&Point3::origin(), cam) > 0.0);
    }

    // partition: uniform density, budget of a quarter of the volume
    let space = Hexahedron::from_aabb(Point3::new(-2.0, -2.0, -2.0), Point3::new(2.0, 2.0, 2.0));
    let grid = VoxelsGrid::new(Voxel::new(4, 4, 4), space).unwrap();
    let plan = ReconstructionPlan::new(grid, &Uniform(100));
    let total: u64 = plan.n_voxels_tracks.iter().sum();
    let corners = plan.compute_reconstruction_plan_bin_search(total / 4);
    assert_eq!(corners.len() / 8, 4);

    let dir = tempfile::tempdir().unwrap();
    let plan_path = dir.path().join("voxelsArray.bin");
    save_voxels_array(&plan_path, &corners).unwrap();
    assert_eq!(load_voxels_array(&plan_path).unwrap(), corners);

    // per-camera refinement within one chunk
    let mut sweeper = ConstantSweeper;
    let mut rc_tc = RcTc::new(&mp, &mut sweeper);
    let mut map = DepthSimMap::new(0, 2, 2, 320, 240).unwrap();
    for tc in [1, 2] {
        rc_tc
            .refine_rc_tc_depth_sim_map(&mut map, 0, tc, &RefineParams::default())
            .unwrap();
    }
    // every cell got the better (tc = 1) similarity
    for ds in &map.dsm {
        assert_eq!(ds.depth, 4.0);
        assert!((ds.sim - 0.2).abs() < 1e-6);
    }

    rc_tc.smooth_depth_map(&mut map, 0, 4, 15.5, 8.0).unwrap();
    rc_tc.filter_depth_map(&mut map, 0, 4, 15.5).unwrap();
    map.save(dir.path(), "cam_").unwrap();
}
