//! Depth/similarity map grid
//!
//! A `DepthSimMap` is owned by one reference camera for the duration of its
//! processing. It lives at a chosen `scale` (downsampling applied when
//! reading source images) and `step` (sampling stride within the scaled
//! image): the grid holds one entry per `step x step` block of the scaled
//! image. Extraction to and write-back from full-resolution-at-scale
//! ("step-1") buffers are the two halves of the pipeline's merge logic.

use mvs_core::{ArtifactKind, Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// One (depth, similarity) estimate at a grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSim {
    pub depth: f32,
    /// Matching cost; lower is better.
    pub sim: f32,
}

impl DepthSim {
    pub fn new(depth: f32, sim: f32) -> Self {
        Self { depth, sim }
    }

    /// The no-estimate state every map starts from.
    pub fn invalid() -> Self {
        Self {
            depth: 0.0,
            sim: f32::INFINITY,
        }
    }
}

/// 2D grid of [`DepthSim`] entries for one reference camera.
#[derive(Debug, Clone)]
pub struct DepthSimMap {
    /// Reference camera id.
    pub rc: usize,
    /// Image downsampling factor.
    pub scale: u32,
    /// Sampling stride within the scaled image.
    pub step: u32,
    /// Scaled image width (`native / scale`).
    pub sw: usize,
    /// Scaled image height.
    pub sh: usize,
    /// Grid width (`ceil(sw / step)`).
    pub w: usize,
    /// Grid height.
    pub h: usize,
    pub dsm: Vec<DepthSim>,
}

impl DepthSimMap {
    /// Create a map for a `sw x sh` scaled image, every cell initialized to
    /// the invalid `(0, +inf)` state.
    pub fn new(rc: usize, scale: u32, step: u32, sw: usize, sh: usize) -> Result<Self> {
        if scale == 0 || step == 0 {
            return Err(Error::ConfigError(format!(
                "depth map scale/step must be positive, got scale={scale} step={step}"
            )));
        }
        if sw == 0 || sh == 0 {
            return Err(Error::ConfigError(format!(
                "depth map for camera {rc} has zero-sized image ({sw}x{sh})"
            )));
        }
        let w = sw.div_ceil(step as usize);
        let h = sh.div_ceil(step as usize);
        Ok(Self {
            rc,
            scale,
            step,
            sw,
            sh,
            w,
            h,
            dsm: vec![DepthSim::invalid(); w * h],
        })
    }

    #[inline]
    fn cell_index(&self, gx: usize, gy: usize) -> usize {
        debug_assert!(gx < self.w && gy < self.h);
        gy * self.w + gx
    }

    #[inline]
    pub fn get(&self, gx: usize, gy: usize) -> DepthSim {
        self.dsm[self.cell_index(gx, gy)]
    }

    #[inline]
    pub fn set(&mut self, gx: usize, gy: usize, ds: DepthSim) {
        let i = self.cell_index(gx, gy);
        self.dsm[i] = ds;
    }

    #[inline]
    pub fn depth(&self, gx: usize, gy: usize) -> f32 {
        self.get(gx, gy).depth
    }

    #[inline]
    pub fn sim(&self, gx: usize, gy: usize) -> f32 {
        self.get(gx, gy).sim
    }

    /// Depth buffer at step-1 resolution (`sw x sh`), each pixel reading its
    /// grid cell.
    pub fn get_depth_map_step1(&self) -> Vec<f32> {
        self.get_depth_map_step1_x_part(0, self.sw)
    }

    pub fn get_sim_map_step1(&self) -> Vec<f32> {
        self.get_sim_map_step1_x_part(0, self.sw)
    }

    /// Step-1 depth buffer for the column strip `[x_from, x_from + w_part)`
    /// at full image height, laid out row-major with row stride `w_part`.
    pub fn get_depth_map_step1_x_part(&self, x_from: usize, w_part: usize) -> Vec<f32> {
        self.step1_x_part(x_from, w_part, |ds| ds.depth)
    }

    pub fn get_sim_map_step1_x_part(&self, x_from: usize, w_part: usize) -> Vec<f32> {
        self.step1_x_part(x_from, w_part, |ds| ds.sim)
    }

    fn step1_x_part(&self, x_from: usize, w_part: usize, f: impl Fn(DepthSim) -> f32) -> Vec<f32> {
        debug_assert!(x_from + w_part <= self.sw);
        let step = self.step as usize;
        let mut out = Vec::with_capacity(w_part * self.sh);
        for y in 0..self.sh {
            let gy = y / step;
            for x in x_from..x_from + w_part {
                out.push(f(self.get(x / step, gy)));
            }
        }
        out
    }

    /// Write a step-1 depth buffer back onto the grid at the map's `step`
    /// stride (the inverse of [`get_depth_map_step1`](Self::get_depth_map_step1)):
    /// each cell takes the depth at its top-left source pixel,
    /// unconditionally. Similarity is left untouched.
    pub fn apply_depth_step1(&mut self, depth_map: &[f32]) -> Result<()> {
        if depth_map.len() != self.sw * self.sh {
            return Err(Error::InvalidInput(format!(
                "step-1 depth buffer has {} entries, expected {}",
                depth_map.len(),
                self.sw * self.sh
            )));
        }
        let step = self.step as usize;
        for gy in 0..self.h {
            for gx in 0..self.w {
                let x = gx * step;
                let y = gy * step;
                let i = gy * self.w + gx;
                self.dsm[i].depth = depth_map[y * self.sw + x];
            }
        }
        Ok(())
    }

    /// Persist the depth and similarity rasters as flat little-endian f32
    /// files named through the artifact registry.
    pub fn save(&self, dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf)> {
        let depth_path = dir.join(ArtifactKind::DepthMap.file_name(prefix, self.rc, self.scale));
        let sim_path = dir.join(ArtifactKind::SimMap.file_name(prefix, self.rc, self.scale));
        write_f32_raster(&depth_path, self.dsm.iter().map(|ds| ds.depth))?;
        write_f32_raster(&sim_path, self.dsm.iter().map(|ds| ds.sim))?;
        Ok((depth_path, sim_path))
    }
}

fn write_f32_raster(path: &Path, values: impl Iterator<Item = f32>) -> Result<()> {
    let mut bytes = Vec::new();
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path, bytes)?;
    Ok(())
}
