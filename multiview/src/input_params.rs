//! Project-level input parameters
//!
//! Tracks per-camera image resolutions and the directories/prefix used to
//! name on-disk artifacts. Image decoding itself is out of scope; only
//! header metadata is read.

use mvs_core::{probe_image_params, ArtifactKind, ImageParams, Result};
use std::path::{Path, PathBuf};

/// Per-project input configuration and the per-camera image table.
///
/// The `imps` vector is indexed by camera id in parallel with every
/// per-camera vector in [`crate::MultiViewParams`]; cameras are never
/// reordered after load.
#[derive(Debug, Clone, Default)]
pub struct MultiViewInputParams {
    /// Prepared dense-scene data folder (camera files, images).
    pub mv_dir: PathBuf,
    /// Depth-map estimation output folder.
    pub depth_map_folder: PathBuf,
    /// Filtered depth-map output folder.
    pub depth_map_filter_folder: PathBuf,
    /// Per-camera file-name prefix.
    pub prefix: String,

    /// Per-camera image metadata, indexed by camera id.
    pub imps: Vec<ImageParams>,
    /// Largest image width over all cameras, used to size shared buffers.
    pub max_image_width: u32,
    /// Largest image height over all cameras.
    pub max_image_height: u32,
}

impl MultiViewInputParams {
    pub fn new(
        mv_dir: impl Into<PathBuf>,
        depth_map_folder: impl Into<PathBuf>,
        depth_map_filter_folder: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            mv_dir: mv_dir.into(),
            depth_map_folder: depth_map_folder.into(),
            depth_map_filter_folder: depth_map_filter_folder.into(),
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    /// Register one camera image, reading its resolution from disk.
    ///
    /// Returns the probed metadata; the camera id of the new entry is
    /// `imps.len() - 1` afterwards.
    pub fn add_image_file(&mut self, path: &Path) -> Result<ImageParams> {
        let params = probe_image_params(path)?;
        self.push_image_params(params);
        Ok(params)
    }

    /// Register one camera with already-known resolution.
    pub fn push_image_params(&mut self, params: ImageParams) {
        self.max_image_width = self.max_image_width.max(params.width);
        self.max_image_height = self.max_image_height.max(params.height);
        self.imps.push(params);
    }

    /// Width of camera `rc`'s image. Out-of-range `rc` is a programming error.
    pub fn get_width(&self, rc: usize) -> u32 {
        self.imps[rc].width
    }

    pub fn get_height(&self, rc: usize) -> u32 {
        self.imps[rc].height
    }

    pub fn get_size(&self, rc: usize) -> usize {
        self.imps[rc].size
    }

    pub fn get_max_image_width(&self) -> u32 {
        self.max_image_width
    }

    pub fn get_max_image_height(&self) -> u32 {
        self.max_image_height
    }

    pub fn get_nb_cameras(&self) -> usize {
        self.imps.len()
    }

    pub fn get_nb_pixels_from_all_cameras(&self) -> usize {
        self.imps.iter().map(|p| p.size).sum()
    }

    /// Full path of a per-camera artifact inside the prepared-scene folder.
    pub fn artifact_path(&self, kind: ArtifactKind, cam_id: usize, scale: u32) -> PathBuf {
        self.mv_dir.join(kind.file_name(&self.prefix, cam_id, scale))
    }
}
