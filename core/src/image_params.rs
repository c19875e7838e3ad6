//! Per-camera image metadata
//!
//! Width/height discovery is delegated to the `image` crate; only the header
//! is read, pixel data is never decoded here.

use crate::{Error, Result};
use std::path::Path;

/// Resolution metadata for one camera image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageParams {
    pub width: u32,
    pub height: u32,
    /// Pixel count (`width * height`), cached for buffer sizing.
    pub size: usize,
}

impl ImageParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            size: width as usize * height as usize,
        }
    }
}

/// Read width/height metadata from an image file on disk.
///
/// # Errors
/// Returns a configuration error when the file is missing, unreadable or has
/// zero-sized dimensions — geometry cannot proceed without valid resolutions.
pub fn probe_image_params(path: &Path) -> Result<ImageParams> {
    let (width, height) = image::image_dimensions(path).map_err(|e| {
        Error::ConfigError(format!(
            "failed to read image dimensions from '{}': {e}",
            path.display()
        ))
    })?;
    if width == 0 || height == 0 {
        return Err(Error::ConfigError(format!(
            "image '{}' has zero-sized dimensions ({width}x{height})",
            path.display()
        )));
    }
    Ok(ImageParams::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_params_caches_pixel_count() {
        let p = ImageParams::new(640, 480);
        assert_eq!(p.size, 640 * 480);
    }

    #[test]
    fn probe_missing_file_is_config_error() {
        let err = probe_image_params(Path::new("/nonexistent/cam000.png")).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn probe_reads_dimensions_from_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cam.png");
        image::RgbImage::new(6, 4).save(&path).unwrap();
        let p = probe_image_params(&path).unwrap();
        assert_eq!((p.width, p.height), (6, 4));
        assert_eq!(p.size, 24);
    }
}
