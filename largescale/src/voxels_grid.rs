//! The global voxel grid
//!
//! A global bounding hexahedron subdivided into `dimensions` cells per axis.
//! Cell ids enumerate x-fastest, then y, then z; the mapping is stable so
//! plans derived from the same grid are deterministic.

use crate::{Hexahedron, Voxel};
use mvs_core::{Error, Result};
use nalgebra::Vector3;

#[derive(Debug, Clone)]
pub struct VoxelsGrid {
    /// Cells per axis.
    pub dimensions: Voxel,
    /// Global bounding volume.
    pub space: Hexahedron,
}

impl VoxelsGrid {
    pub fn new(dimensions: Voxel, space: Hexahedron) -> Result<Self> {
        if dimensions.x <= 0 || dimensions.y <= 0 || dimensions.z <= 0 {
            return Err(Error::ConfigError(format!(
                "voxel grid dimensions must be positive, got {dimensions:?}"
            )));
        }
        Ok(Self { dimensions, space })
    }

    pub fn n_voxels(&self) -> usize {
        (self.dimensions.x * self.dimensions.y * self.dimensions.z) as usize
    }

    pub fn is_valid_voxel(&self, v: &Voxel) -> bool {
        v.x >= 0
            && v.x < self.dimensions.x
            && v.y >= 0
            && v.y < self.dimensions.y
            && v.z >= 0
            && v.z < self.dimensions.z
    }

    /// Cell id for a voxel coordinate; x-fastest order.
    pub fn id_for_voxel(&self, v: &Voxel) -> usize {
        debug_assert!(self.is_valid_voxel(v));
        (v.x + v.y * self.dimensions.x + v.z * self.dimensions.x * self.dimensions.y) as usize
    }

    pub fn voxel_for_id(&self, id: usize) -> Voxel {
        let id = id as i32;
        let plane = self.dimensions.x * self.dimensions.y;
        Voxel::new(id % self.dimensions.x, (id / self.dimensions.x) % self.dimensions.y, id / plane)
    }

    /// Hexahedron of the inclusive voxel range `[lu, rd]`, carved out of the
    /// global volume by trilinear interpolation. Ranges tile the parent
    /// exactly: adjacent ranges share their boundary face.
    pub fn hexahedron_for_voxel_range(&self, lu: &Voxel, rd: &Voxel) -> Hexahedron {
        let dims = Vector3::new(
            self.dimensions.x as f64,
            self.dimensions.y as f64,
            self.dimensions.z as f64,
        );
        let lo = Vector3::new(lu.x as f64, lu.y as f64, lu.z as f64).component_div(&dims);
        let hi = Vector3::new((rd.x + 1) as f64, (rd.y + 1) as f64, (rd.z + 1) as f64)
            .component_div(&dims);
        self.space.sub_volume(lo, hi)
    }

    pub fn hexahedron_for_voxel(&self, v: &Voxel) -> Hexahedron {
        self.hexahedron_for_voxel_range(v, v)
    }

    /// Ids of all cells within a Chebyshev radius of `id`, the queried cell
    /// included. `ceil_or_floor` picks how the fractional distance is
    /// rounded to whole cells (true = ceil).
    pub fn get_neighbours_ids(&self, max_dist: f64, id: usize, ceil_or_floor: bool) -> Vec<usize> {
        let r = if ceil_or_floor {
            max_dist.ceil() as i32
        } else {
            max_dist.floor() as i32
        };
        let center = self.voxel_for_id(id);
        let mut out = Vec::new();
        for dz in -r..=r {
            for dy in -r..=r {
                for dx in -r..=r {
                    let v = Voxel::new(center.x + dx, center.y + dy, center.z + dz);
                    if self.is_valid_voxel(&v) {
                        out.push(self.id_for_voxel(&v));
                    }
                }
            }
        }
        out
    }

    /// Ids of all cells whose volume overlaps the given hexahedron.
    pub fn voxels_ids_intersecting_hexah(&self, hexah: &Hexahedron) -> Vec<usize> {
        let mut out = Vec::new();
        for id in 0..self.n_voxels() {
            let v = self.voxel_for_id(id);
            if self.hexahedron_for_voxel(&v).intersects(hexah) {
                out.push(id);
            }
        }
        out
    }

    /// Ids of all cells whose volume lies entirely inside the given
    /// hexahedron. Boundary-touching neighbors are excluded, unlike
    /// [`voxels_ids_intersecting_hexah`](Self::voxels_ids_intersecting_hexah).
    pub fn voxels_ids_inside_hexah(&self, hexah: &Hexahedron) -> Vec<usize> {
        let mut out = Vec::new();
        for id in 0..self.n_voxels() {
            let cell = self.hexahedron_for_voxel(&self.voxel_for_id(id));
            if cell.corners.iter().all(|c| hexah.contains(c)) {
                out.push(id);
            }
        }
        out
    }

    /// The cell's volume grown by `floor(dist)` whole cells in every
    /// direction (Chebyshev, at least one), clamped to the grid. The margin
    /// pulls in neighboring context near cell boundaries.
    pub fn get_hexahedron_for_id(&self, dist: f64, id: usize) -> Hexahedron {
        let r = (dist.floor() as i32).max(1);
        let v = self.voxel_for_id(id);
        let lu = Voxel::new((v.x - r).max(0), (v.y - r).max(0), (v.z - r).max(0));
        let rd = Voxel::new(
            (v.x + r).min(self.dimensions.x - 1),
            (v.y + r).min(self.dimensions.y - 1),
            (v.z + r).min(self.dimensions.z - 1),
        );
        self.hexahedron_for_voxel_range(&lu, &rd)
    }
}
