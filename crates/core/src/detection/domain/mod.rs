pub mod detection;
pub mod detector_options;
pub mod face_detector;
pub mod face_landmarks;
