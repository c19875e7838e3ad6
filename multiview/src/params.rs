//! The global camera table
//!
//! Cameras are modeled as one contiguous structure-of-arrays table indexed by
//! camera id: every per-camera vector is resized together and never reordered
//! independently, so a camera id is valid across all of them. The table is
//! populated once at load time and immutable afterwards.

use crate::MultiViewInputParams;
use mvs_core::{ArtifactKind, Error, Result};
use nalgebra::{Matrix3, Matrix3x4, Point3, Vector3};
use std::fs;
use std::path::Path;

/// Result of factoring a 3x4 projection matrix into its camera parameters.
#[derive(Debug, Clone, Copy)]
pub struct DecomposedProjection {
    /// Optical center.
    pub c: Point3<f64>,
    /// Rotation (world to camera).
    pub r: Matrix3<f64>,
    /// Inverse rotation.
    pub ir: Matrix3<f64>,
    /// Intrinsics, upper triangular, normalized so `k[(2,2)] == 1`.
    pub k: Matrix3<f64>,
    /// Inverse intrinsics.
    pub ik: Matrix3<f64>,
    /// Combined inverse camera matrix `iR * iK`, back-projects pixels to
    /// world-space ray directions.
    pub icam: Matrix3<f64>,
}

/// Structure-of-arrays table of calibrated cameras plus global matching
/// configuration.
#[derive(Debug, Clone)]
pub struct MultiViewParams {
    /// 3x4 projection matrices.
    pub cam_arr: Vec<Matrix3x4<f64>>,
    pub k_arr: Vec<Matrix3<f64>>,
    pub ik_arr: Vec<Matrix3<f64>>,
    pub r_arr: Vec<Matrix3<f64>>,
    pub ir_arr: Vec<Matrix3<f64>>,
    pub c_arr: Vec<Point3<f64>>,
    pub icam_arr: Vec<Matrix3<f64>>,
    /// Focal length and radial distortion coefficient pair `(f, k1, k2)`.
    pub foc_k1_k2_arr: Vec<Vector3<f64>>,

    pub mip: MultiViewInputParams,
    pub ncams: usize,
    /// Global similarity acceptance threshold.
    pub sim_thr: f32,
    /// Pixel margin excluded from bounds checks on every side.
    pub border: i32,
}

impl MultiViewParams {
    /// Create a table with `ncams` identity cameras; callers populate entries
    /// via [`set_camera`](Self::set_camera) or
    /// [`load_camera_file`](Self::load_camera_file).
    pub fn new(ncams: usize, mip: MultiViewInputParams, sim_thr: f32) -> Result<Self> {
        if ncams == 0 {
            return Err(Error::ConfigError("camera table cannot be empty".into()));
        }
        if mip.get_nb_cameras() != ncams {
            return Err(Error::ConfigError(format!(
                "camera count mismatch: {ncams} cameras but {} image entries",
                mip.get_nb_cameras()
            )));
        }
        let mut mp = Self {
            cam_arr: Vec::new(),
            k_arr: Vec::new(),
            ik_arr: Vec::new(),
            r_arr: Vec::new(),
            ir_arr: Vec::new(),
            c_arr: Vec::new(),
            icam_arr: Vec::new(),
            foc_k1_k2_arr: Vec::new(),
            mip,
            ncams: 0,
            sim_thr,
            border: 2,
        };
        mp.resize_cams(ncams);
        Ok(mp)
    }

    /// Resize every per-camera vector together; entries past the old length
    /// are identity placeholders.
    pub fn resize_cams(&mut self, ncams: usize) {
        self.ncams = ncams;
        self.cam_arr.resize(ncams, Matrix3x4::identity());
        self.k_arr.resize(ncams, Matrix3::identity());
        self.ik_arr.resize(ncams, Matrix3::identity());
        self.r_arr.resize(ncams, Matrix3::identity());
        self.ir_arr.resize(ncams, Matrix3::identity());
        self.c_arr.resize(ncams, Point3::origin());
        self.icam_arr.resize(ncams, Matrix3::identity());
        self.foc_k1_k2_arr.resize(ncams, Vector3::new(1.0, 0.0, 0.0));
    }

    /// Install a projection matrix for camera `i`, decomposing it into all
    /// derived per-camera quantities.
    pub fn set_camera(&mut self, i: usize, p: &Matrix3x4<f64>) -> Result<()> {
        let d = decompose_projection_matrix(p)?;
        self.cam_arr[i] = *p;
        self.k_arr[i] = d.k;
        self.ik_arr[i] = d.ik;
        self.r_arr[i] = d.r;
        self.ir_arr[i] = d.ir;
        self.c_arr[i] = d.c;
        self.icam_arr[i] = d.icam;
        self.foc_k1_k2_arr[i] = Vector3::new(d.k[(0, 0)], 0.0, 0.0);
        Ok(())
    }

    /// Load camera `i` from its projection-matrix file and optional
    /// distortion file.
    ///
    /// Both files are flat whitespace-separated numeric lists: twelve values
    /// row-major for the 3x4 projection, three values `(f, k1, k2)` for the
    /// distortion pair.
    pub fn load_camera_file(
        &mut self,
        i: usize,
        p_path: &Path,
        d_path: Option<&Path>,
    ) -> Result<()> {
        let values = read_numeric_file(p_path)?;
        if values.len() != 12 {
            return Err(Error::ConfigError(format!(
                "projection file '{}' has {} values, expected 12",
                p_path.display(),
                values.len()
            )));
        }
        let p = Matrix3x4::from_row_slice(&values);
        self.set_camera(i, &p)?;

        match d_path {
            Some(path) if path.exists() => {
                let dvals = read_numeric_file(path)?;
                if dvals.len() != 3 {
                    return Err(Error::ConfigError(format!(
                        "distortion file '{}' has {} values, expected 3",
                        path.display(),
                        dvals.len()
                    )));
                }
                self.foc_k1_k2_arr[i] = Vector3::new(dvals[0], dvals[1], dvals[2]);
            }
            Some(path) => {
                tracing::debug!(cam = i, path = %path.display(), "no distortion file, assuming undistorted");
            }
            None => {}
        }
        Ok(())
    }

    /// Load every camera from the prepared-scene folder, using the artifact
    /// registry for file names.
    pub fn load_cameras_from_files(&mut self) -> Result<()> {
        for i in 0..self.ncams {
            let p_path = self.mip.artifact_path(ArtifactKind::P, i, 1);
            let d_path = self.mip.artifact_path(ArtifactKind::RadialDistortion, i, 1);
            self.load_camera_file(i, &p_path, Some(&d_path))?;
        }
        Ok(())
    }
}

fn read_numeric_file(path: &Path) -> Result<Vec<f64>> {
    let text = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("failed to read camera file '{}': {e}", path.display()))
    })?;
    text.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>().map_err(|_| {
                Error::ConfigError(format!(
                    "camera file '{}' contains non-numeric token '{tok}'",
                    path.display()
                ))
            })
        })
        .collect()
}

/// Factor a 3x4 projection matrix into optical center, rotation and
/// intrinsics (plus their inverses and the combined inverse camera matrix).
///
/// Uses an RQ decomposition of the leading 3x3 block built on nalgebra's QR.
/// Signs are fixed so the intrinsic diagonal is positive, and `K` is
/// normalized by its `(2,2)` entry; the whole factorization reproduces `P`
/// up to scale. A singular leading block (near-orthographic projection)
/// returns a geometry error instead of garbage.
pub fn decompose_projection_matrix(p: &Matrix3x4<f64>) -> Result<DecomposedProjection> {
    let m: Matrix3<f64> = p.fixed_view::<3, 3>(0, 0).into_owned();
    let m_inv = m.try_inverse().ok_or_else(|| {
        Error::GeometryError("projection matrix has singular leading 3x3 block".into())
    })?;

    let p4: Vector3<f64> = p.column(3).into_owned();
    let c = Point3::from(-(m_inv * p4));

    // RQ via QR of the row/column-reversed transpose: with E the exchange
    // matrix, (E*M)^T = Q*Rq gives K = E*Rq^T*E (upper triangular) and
    // R = E*Q^T (orthogonal).
    let e = Matrix3::new(0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0);
    let qr = nalgebra::linalg::QR::new((e * m).transpose());
    let q = qr.q();
    let rq = qr.r();

    let mut k: Matrix3<f64> = e * rq.transpose() * e;
    let mut r: Matrix3<f64> = e * q.transpose();

    // Fix signs so the intrinsic diagonal is positive (negating a column of K
    // together with the matching row of R leaves the product unchanged).
    for j in 0..3 {
        if k[(j, j)] < 0.0 {
            for i in 0..3 {
                k[(i, j)] = -k[(i, j)];
                r[(j, i)] = -r[(j, i)];
            }
        }
    }

    // A reflection here means P itself had negative determinant; flipping
    // both factors keeps K*R equal to M and the normalization below restores
    // the positive diagonal (P is only defined up to scale).
    if r.determinant() < 0.0 {
        r = -r;
        k = -k;
    }

    let kzz = k[(2, 2)];
    if kzz.abs() < 1e-12 {
        return Err(Error::GeometryError(
            "projection matrix decomposition is degenerate (zero focal normalizer)".into(),
        ));
    }
    k /= kzz;

    let ik = k.try_inverse().ok_or_else(|| {
        Error::GeometryError("intrinsic matrix is not invertible".into())
    })?;
    let ir = r.transpose();
    let icam = ir * ik;

    Ok(DecomposedProjection { c, r, ir, k, ik, icam })
}

/// Compose a 3x4 projection matrix `K * R * [I | -C]`.
///
/// Inverse of [`decompose_projection_matrix`] up to scale.
pub fn compose_projection_matrix(
    k: &Matrix3<f64>,
    r: &Matrix3<f64>,
    c: &Point3<f64>,
) -> Matrix3x4<f64> {
    let kr = k * r;
    let t = -(kr * c.coords);
    let mut p = Matrix3x4::zeros();
    p.fixed_view_mut::<3, 3>(0, 0).copy_from(&kr);
    p.set_column(3, &t);
    p
}
