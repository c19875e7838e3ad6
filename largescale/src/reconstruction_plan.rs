//! Track-budgeted reconstruction plans
//!
//! Starting from per-cell track counts, the partitioner bisects the global
//! volume along its longest axis until every leaf fits the budget (or has
//! shrunk to a single cell), then derives an inflated, minimally-overlapping
//! plan so boundary regions keep enough cross-camera context. Plans are
//! deterministic: the same grid and counts always produce the same sequence.

use crate::{Hexahedron, Voxel, VoxelsGrid};
use mvs_core::{Error, Result};
use nalgebra::Point3;
use rayon::prelude::*;
use std::fs;
use std::path::Path;

/// Reports how many observation tracks fall inside an arbitrary sub-volume.
/// Counts may be exact or estimated but must be monotone: a volume never
/// holds fewer tracks than any volume it contains.
pub trait TrackCountOracle {
    fn count_tracks_in(&self, hexah: &Hexahedron) -> u64;
}

/// Priority key of one plan entry: a cell id with its inflate factor.
/// Orders descending by value, ties broken by lower id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortedId {
    pub id: usize,
    pub value: f64,
}

/// Outcome of one bisection attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxDivision {
    /// The box fits the budget; no split needed.
    WithinBudget,
    /// Two half-boxes that exactly tile the parent.
    Split((Voxel, Voxel), (Voxel, Voxel)),
    /// Over budget but already a single cell; accepted as-is.
    Unsplittable,
}

/// The space partitioner: a voxel grid with cached per-cell track counts.
#[derive(Debug, Clone)]
pub struct ReconstructionPlan {
    pub grid: VoxelsGrid,
    /// Track count per cell, indexed by cell id.
    pub n_voxels_tracks: Vec<u64>,
}

impl ReconstructionPlan {
    /// Build the partitioner by querying the oracle once per grid cell.
    pub fn new(grid: VoxelsGrid, oracle: &dyn TrackCountOracle) -> Self {
        let n_voxels_tracks = (0..grid.n_voxels())
            .map(|id| oracle.count_tracks_in(&grid.hexahedron_for_voxel(&grid.voxel_for_id(id))))
            .collect();
        Self { grid, n_voxels_tracks }
    }

    /// Build from precomputed per-cell counts.
    pub fn with_track_counts(grid: VoxelsGrid, counts: Vec<u64>) -> Result<Self> {
        if counts.len() != grid.n_voxels() {
            return Err(Error::InvalidInput(format!(
                "{} track counts for a grid of {} cells",
                counts.len(),
                grid.n_voxels()
            )));
        }
        Ok(Self { grid, n_voxels_tracks: counts })
    }

    /// Total tracks in the inclusive voxel range `[lu, rd]`.
    ///
    /// Monotone by construction: enlarging the range only adds non-negative
    /// cell counts.
    pub fn get_n_tracks(&self, lu: &Voxel, rd: &Voxel) -> u64 {
        let mut n = 0u64;
        for z in lu.z..=rd.z {
            for y in lu.y..=rd.y {
                for x in lu.x..=rd.x {
                    n += self.n_voxels_tracks[self.grid.id_for_voxel(&Voxel::new(x, y, z))];
                }
            }
        }
        n
    }

    /// Bisect `[lu, rd]` along its longest axis at the voxel midpoint.
    ///
    /// Axis ties resolve x before y before z so the traversal is stable. The
    /// two halves tile the parent with no gap or overlap.
    pub fn divide_box(&self, lu: &Voxel, rd: &Voxel, max_tracks: u64) -> BoxDivision {
        if self.get_n_tracks(lu, rd) <= max_tracks {
            return BoxDivision::WithinBudget;
        }
        let ext = rd - lu;
        if ext.x == 0 && ext.y == 0 && ext.z == 0 {
            return BoxDivision::Unsplittable;
        }
        let longest = if ext.x >= ext.y && ext.x >= ext.z {
            0
        } else if ext.y >= ext.z {
            1
        } else {
            2
        };
        let mut rd1 = *rd;
        let mut lu2 = *lu;
        match longest {
            0 => {
                let mid = lu.x + ext.x / 2;
                rd1.x = mid;
                lu2.x = mid + 1;
            }
            1 => {
                let mid = lu.y + ext.y / 2;
                rd1.y = mid;
                lu2.y = mid + 1;
            }
            _ => {
                let mid = lu.z + ext.z / 2;
                rd1.z = mid;
                lu2.z = mid + 1;
            }
        }
        BoxDivision::Split((*lu, rd1), (lu2, *rd))
    }

    /// Recursively bisect the global volume until every leaf fits
    /// `max_tracks` or has reached a single cell, returning the leaves'
    /// hexahedron corners (eight points per leaf) in a stable depth-first
    /// order.
    ///
    /// Budget violations (single cells still over budget) are reported as
    /// plan-quality warnings, not errors; the oversized leaf stays in the
    /// plan so the reconstruction completes.
    pub fn compute_reconstruction_plan_bin_search(&self, max_tracks: u64) -> Vec<Point3<f64>> {
        let mut corners = Vec::new();
        // explicit work-stack keeps traversal order testable and bounds
        // stack depth for pathological inputs
        let mut stack = vec![(
            Voxel::new(0, 0, 0),
            self.grid.dimensions - Voxel::new(1, 1, 1),
        )];
        while let Some((lu, rd)) = stack.pop() {
            match self.divide_box(&lu, &rd, max_tracks) {
                BoxDivision::Split(first, second) => {
                    // first half is processed next
                    stack.push(second);
                    stack.push(first);
                }
                BoxDivision::WithinBudget => {
                    self.emit_leaf(&mut corners, &lu, &rd);
                }
                BoxDivision::Unsplittable => {
                    tracing::warn!(
                        cell = ?lu,
                        tracks = self.get_n_tracks(&lu, &rd),
                        max_tracks,
                        "single cell exceeds track budget, keeping oversized leaf"
                    );
                    self.emit_leaf(&mut corners, &lu, &rd);
                }
            }
        }
        corners
    }

    fn emit_leaf(&self, corners: &mut Vec<Point3<f64>>, lu: &Voxel, rd: &Voxel) {
        corners.extend_from_slice(&self.grid.hexahedron_for_voxel_range(lu, rd).corners);
    }

    /// Tracks inside cell `id`'s volume grown by `dist` cells.
    pub fn get_pts_count(&self, dist: f64, id: usize) -> u64 {
        let hexah = self.grid.get_hexahedron_for_id(dist, id);
        self.grid
            .voxels_ids_inside_hexah(&hexah)
            .iter()
            .map(|&vid| self.n_voxels_tracks[vid])
            .sum()
    }

    /// Largest growth radius per cell (in whole cells) whose grown volume
    /// still fits `max_pts` tracks, bounded by the grid diameter. A cell over
    /// budget at factor 1.0 keeps factor 1.0 — the cell itself must be
    /// reconstructed regardless.
    pub fn compute_maxima_inflate_factors(&self, max_pts: u64) -> Vec<f64> {
        let dims = self.grid.dimensions;
        let max_factor = (dims.x.max(dims.y).max(dims.z) * 2) as f64;
        (0..self.grid.n_voxels())
            .into_par_iter()
            .map(|id| {
                let mut factor = 1.0;
                while factor + 1.0 <= max_factor
                    && self.get_pts_count(factor + 1.0, id) <= max_pts
                {
                    factor += 1.0;
                }
                factor
            })
            .collect()
    }

    /// Greedy minimal cover of the grid by inflated cells, ordered by
    /// priority.
    ///
    /// Repeatedly picks the uncovered cell with the largest inflate factor
    /// (ties: lower id), then marks every cell whose volume lies inside its
    /// grown hexahedron as covered, so each covered cell is genuinely
    /// contained in some plan entry. The result is ordered by descending
    /// factor, so downstream schedulers process the largest regions with
    /// defined precedence.
    pub fn compute_optimal_reconstruction_plan(&self, inflate_factors: &[f64]) -> Result<Vec<SortedId>> {
        if inflate_factors.len() != self.grid.n_voxels() {
            return Err(Error::InvalidInput(format!(
                "{} inflate factors for a grid of {} cells",
                inflate_factors.len(),
                self.grid.n_voxels()
            )));
        }
        let n = self.grid.n_voxels();
        let mut covered = vec![false; n];
        let mut plan = Vec::new();
        loop {
            let mut best: Option<(usize, f64)> = None;
            for id in 0..n {
                if covered[id] {
                    continue;
                }
                let value = inflate_factors[id];
                match best {
                    Some((_, bv)) if bv >= value => {}
                    _ => best = Some((id, value)),
                }
            }
            let Some((id, value)) = best else { break };
            plan.push(SortedId { id, value });
            let hexah = self.grid.get_hexahedron_for_id(value, id);
            for vid in self.grid.voxels_ids_inside_hexah(&hexah) {
                covered[vid] = true;
            }
        }
        Ok(plan)
    }
}

/// Persist an ordered corner sequence as the "voxels array" plan artifact:
/// a little-endian u64 point count followed by xyz f64 triples.
pub fn save_voxels_array(path: &Path, corners: &[Point3<f64>]) -> Result<()> {
    let mut bytes = Vec::with_capacity(8 + corners.len() * 24);
    bytes.extend_from_slice(&(corners.len() as u64).to_le_bytes());
    for c in corners {
        bytes.extend_from_slice(&c.x.to_le_bytes());
        bytes.extend_from_slice(&c.y.to_le_bytes());
        bytes.extend_from_slice(&c.z.to_le_bytes());
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Load a plan written by [`save_voxels_array`].
pub fn load_voxels_array(path: &Path) -> Result<Vec<Point3<f64>>> {
    let bytes = fs::read(path)?;
    if bytes.len() < 8 {
        return Err(Error::InvalidInput(format!(
            "plan file '{}' is truncated",
            path.display()
        )));
    }
    let count = u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as usize;
    if bytes.len() != 8 + count * 24 {
        return Err(Error::InvalidInput(format!(
            "plan file '{}' has {} bytes, expected {}",
            path.display(),
            bytes.len(),
            8 + count * 24
        )));
    }
    let mut corners = Vec::with_capacity(count);
    for i in 0..count {
        let at = |k: usize| {
            let off = 8 + i * 24 + k * 8;
            f64::from_le_bytes(bytes[off..off + 8].try_into().unwrap())
        };
        corners.push(Point3::new(at(0), at(1), at(2)));
    }
    Ok(corners)
}
