use crate::shared::bounding_box::BoundingBox;
use crate::shared::dimensions::Dimensions;

use super::face_landmarks::FaceLandmarks;

/// One face found by the capability provider.
///
/// `image_size` is the coordinate space `bbox` is expressed in: the natural
/// size of the frame the detector ran on, until the detection is rescaled.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f64,
    pub image_size: Dimensions,
}

impl Detection {
    pub fn new(bbox: BoundingBox, score: f64, image_size: Dimensions) -> Self {
        Self {
            bbox,
            score,
            image_size,
        }
    }

    /// Maps the box proportionally into `target` pixel space.
    pub fn rescale(&self, target: Dimensions) -> Detection {
        let (sx, sy) = self.image_size.scale_to(target);
        Detection {
            bbox: self.bbox.scale(sx, sy),
            score: self.score,
            image_size: target,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectionWithLandmarks {
    pub detection: Detection,
    pub landmarks: FaceLandmarks,
}

impl DetectionWithLandmarks {
    pub fn new(detection: Detection, landmarks: FaceLandmarks) -> Self {
        Self {
            detection,
            landmarks,
        }
    }

    pub fn rescale(&self, target: Dimensions) -> DetectionWithLandmarks {
        let (sx, sy) = self.detection.image_size.scale_to(target);
        DetectionWithLandmarks {
            detection: self.detection.rescale(target),
            landmarks: self.landmarks.scale(sx, sy),
        }
    }
}

/// Rescales a detection batch from its native space to the display size.
pub fn resize_results(
    batch: &[DetectionWithLandmarks],
    display: Dimensions,
) -> Vec<DetectionWithLandmarks> {
    batch.iter().map(|d| d.rescale(display)).collect()
}
