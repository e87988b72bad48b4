use std::time::Duration;

use super::dimensions::Dimensions;

pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const DEFAULT_MODEL_LOCATION: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0";

/// Cadence of the live detection loop.
pub const DEFAULT_DETECTION_INTERVAL: Duration = Duration::from_millis(100);

/// Rendered size of the video/overlay area.
pub const DEFAULT_DISPLAY_SIZE: Dimensions = Dimensions::new(720, 560);

/// Capture resolution asked of the camera; the device may pick another.
pub const DEFAULT_CAMERA_RESOLUTION: Dimensions = Dimensions::new(640, 480);

pub const ARTIFACT_PREFIX: &str = "extracted_face_";
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "png";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
