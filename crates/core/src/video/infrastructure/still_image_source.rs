use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::shared::dimensions::Dimensions;
use crate::shared::errors::CameraAccessError;
use crate::shared::frame::Frame;
use crate::video::domain::media_source::{CameraOpener, MediaSource};

/// Adapts a single image file to the [`MediaSource`] interface.
///
/// Behaves like a camera pointed at a photo: every sample returns the same
/// frame. Lets the loop and the extraction pipeline run without hardware.
pub struct StillImageSource {
    frame: Frame,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let img = image::open(path)?.to_rgb8();
        Ok(Self::from_frame(Frame::from_rgb_image(img, 0)))
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self { frame }
    }
}

impl MediaSource for StillImageSource {
    fn natural_size(&self) -> Option<Dimensions> {
        Some(self.frame.dimensions())
    }

    fn current_frame(&self) -> Result<Frame, Box<dyn std::error::Error>> {
        Ok(self.frame.clone())
    }
}

/// Opens an image file in place of a camera.
pub struct StillImageOpener {
    pub path: PathBuf,
}

impl CameraOpener for StillImageOpener {
    fn open(&self) -> Result<Arc<dyn MediaSource>, CameraAccessError> {
        let source = StillImageSource::open(&self.path).map_err(|e| {
            CameraAccessError::DeviceUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        Ok(Arc::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_image(dir: &Path) -> PathBuf {
        let path = dir.join("still.png");
        image::RgbImage::from_pixel(8, 6, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_open_reports_natural_size() {
        let dir = tempfile::tempdir().unwrap();
        let source = StillImageSource::open(&write_test_image(dir.path())).unwrap();
        assert_eq!(source.natural_size(), Some(Dimensions::new(8, 6)));
    }

    #[test]
    fn test_every_sample_is_the_same_frame() {
        let dir = tempfile::tempdir().unwrap();
        let source = StillImageSource::open(&write_test_image(dir.path())).unwrap();
        let a = source.current_frame().unwrap();
        let b = source.current_frame().unwrap();
        assert_eq!(a, b);
        assert_eq!(&a.data()[..3], &[10, 20, 30]);
    }

    #[test]
    fn test_opener_missing_file_is_camera_access_error() {
        let opener = StillImageOpener {
            path: PathBuf::from("/nonexistent/still.png"),
        };
        assert!(matches!(
            opener.open(),
            Err(CameraAccessError::DeviceUnavailable(_))
        ));
    }
}
