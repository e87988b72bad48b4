use std::sync::{Arc, Mutex};

use crate::shared::errors::InitError;
use crate::shared::frame::Frame;
use crate::shared::model_location::ModelLocation;

use super::detection::{Detection, DetectionWithLandmarks};
use super::detector_options::DetectorOptions;

/// Domain interface for the face detection/landmark capability.
///
/// The models behind it are opaque; callers only rely on the contract:
/// `initialize` before anything else, an empty vec when nothing is found,
/// and one landmark set per input detection.
pub trait FaceDetector: Send {
    /// Loads every model artifact the backend needs. A second call after a
    /// successful one is a no-op.
    fn initialize(&mut self, location: &ModelLocation) -> Result<(), InitError>;

    fn is_ready(&self) -> bool;

    fn detect(
        &mut self,
        frame: &Frame,
        options: &DetectorOptions,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;

    fn with_landmarks(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
    ) -> Result<Vec<DetectionWithLandmarks>, Box<dyn std::error::Error>>;
}

/// The provider as shared between the live loop and the extraction pipeline.
///
/// The mutex serialises calls so loop cycles and extraction passes never
/// overlap on the same model session.
pub type SharedFaceDetector = Arc<Mutex<Box<dyn FaceDetector>>>;

pub fn shared(detector: Box<dyn FaceDetector>) -> SharedFaceDetector {
    Arc::new(Mutex::new(detector))
}

/// Detect all faces in `frame` and attach their landmarks in one pass.
pub fn detect_all_faces_with_landmarks(
    detector: &mut dyn FaceDetector,
    frame: &Frame,
    options: &DetectorOptions,
) -> Result<Vec<DetectionWithLandmarks>, Box<dyn std::error::Error>> {
    let detections = detector.detect(frame, options)?;
    if detections.is_empty() {
        return Ok(Vec::new());
    }

    let with_landmarks = detector.with_landmarks(frame, &detections)?;
    if with_landmarks.len() != detections.len() {
        return Err(format!(
            "landmark pass returned {} results for {} detections",
            with_landmarks.len(),
            detections.len()
        )
        .into());
    }
    Ok(with_landmarks)
}

/// Locks the shared provider, recovering the guard if a previous holder panicked.
pub fn lock(detector: &SharedFaceDetector) -> std::sync::MutexGuard<'_, Box<dyn FaceDetector>> {
    detector.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
