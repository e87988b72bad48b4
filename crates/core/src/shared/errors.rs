use std::path::PathBuf;

use thiserror::Error;

/// Model assets could not be made available to the capability provider.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("model artifact {name} not found in {location}")]
    MissingArtifact { name: String, location: String },
    #[error("failed to resolve model artifact {name}: {source}")]
    Resolve {
        name: String,
        #[source]
        source: crate::shared::model_resolver::ModelResolveError,
    },
    #[error("failed to load model {path}: {message}")]
    Load { path: PathBuf, message: String },
}

/// An operation was invoked before its collaborators were ready.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotReadyError {
    #[error("face models are not loaded yet")]
    ModelsNotLoaded,
    #[error("video source is not ready")]
    MediaNotReady,
    #[error("display size must be at least 1x1")]
    InvalidDisplaySize,
}

/// The camera could not be started. Never fatal to the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraAccessError {
    #[error("camera access was denied: {0}")]
    PermissionDenied(String),
    #[error("no usable camera: {0}")]
    DeviceUnavailable(String),
    #[error("camera stream failed: {0}")]
    Stream(String),
}

/// One extracted face could not be written to disk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to save {path}: {message}")]
pub struct PersistError {
    pub path: PathBuf,
    pub message: String,
}

/// One detection could not be turned into a face image.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("detection box {0:?} has no pixels inside the frame")]
    EmptyRegion(crate::shared::bounding_box::BoundingBox),
    #[error(transparent)]
    Persist(#[from] PersistError),
}
