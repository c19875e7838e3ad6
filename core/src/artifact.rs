//! Registry of on-disk artifact kinds
//!
//! Every per-camera or per-chunk file written by the reconstruction pipeline
//! is named through this registry so producers and consumers (depth-map
//! estimation, space partitioning, external mesh joining) agree on names.

/// Named kinds of on-disk reconstruction artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// 3x4 projection matrix, flat numeric text.
    P,
    /// 3x3 intrinsic matrix.
    K,
    /// Inverse intrinsic matrix.
    IK,
    /// 3x3 rotation matrix.
    R,
    /// Inverse rotation matrix.
    IR,
    /// Optical center.
    C,
    /// Combined inverse camera matrix (iR * iK).
    ICam,
    /// Focal length and radial distortion coefficient pair.
    RadialDistortion,
    /// Per-pixel depth raster.
    DepthMap,
    /// Per-pixel similarity raster.
    SimMap,
    /// Per-pixel modality-count raster.
    NmodMap,
    /// Reconstructed mesh for one chunk.
    Mesh,
    /// Ordered reconstruction-plan box corners ("voxels array").
    VoxelsArray,
}

impl ArtifactKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ArtifactKind::P => "P",
            ArtifactKind::K => "K",
            ArtifactKind::IK => "iK",
            ArtifactKind::R => "R",
            ArtifactKind::IR => "iR",
            ArtifactKind::C => "C",
            ArtifactKind::ICam => "iCam",
            ArtifactKind::RadialDistortion => "D",
            ArtifactKind::DepthMap => "depthMap",
            ArtifactKind::SimMap => "simMap",
            ArtifactKind::NmodMap => "nmodMap",
            ArtifactKind::Mesh => "mesh",
            ArtifactKind::VoxelsArray => "voxelsArray",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::DepthMap
            | ArtifactKind::SimMap
            | ArtifactKind::NmodMap
            | ArtifactKind::VoxelsArray => "bin",
            ArtifactKind::Mesh => "ply",
            _ => "txt",
        }
    }

    /// True for kinds keyed by a camera index; false for per-chunk artifacts.
    pub fn is_per_camera(&self) -> bool {
        !matches!(self, ArtifactKind::Mesh | ArtifactKind::VoxelsArray)
    }

    /// File name for this artifact.
    ///
    /// Per-camera kinds embed the 1-based camera index zero-padded to five
    /// digits; raster kinds additionally embed the downsampling scale so maps
    /// computed at different scales never collide.
    pub fn file_name(&self, prefix: &str, cam_id: usize, scale: u32) -> String {
        let tag = self.tag();
        let ext = self.extension();
        if !self.is_per_camera() {
            return format!("{prefix}{tag}.{ext}");
        }
        match self {
            ArtifactKind::DepthMap | ArtifactKind::SimMap | ArtifactKind::NmodMap => {
                format!("{prefix}{:05}_{tag}_scale{scale}.{ext}", cam_id + 1)
            }
            _ => format!("{prefix}{:05}_{tag}.{ext}", cam_id + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_camera_names_are_stable() {
        assert_eq!(ArtifactKind::P.file_name("cam_", 0, 1), "cam_00001_P.txt");
        assert_eq!(
            ArtifactKind::DepthMap.file_name("cam_", 11, 2),
            "cam_00012_depthMap_scale2.bin"
        );
    }

    #[test]
    fn chunk_artifacts_ignore_camera_index() {
        assert_eq!(
            ArtifactKind::VoxelsArray.file_name("space_", 7, 1),
            "space_voxelsArray.bin"
        );
        assert!(!ArtifactKind::Mesh.is_per_camera());
    }
}
