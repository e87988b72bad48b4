use std::sync::Arc;

use crate::shared::dimensions::Dimensions;
use crate::shared::errors::CameraAccessError;
use crate::shared::frame::Frame;

/// A live frame source, conceptually a playing video element.
///
/// `current_frame` samples whatever the source shows right now; it does not
/// consume anything, so the loop and the extraction pipeline can both read it.
pub trait MediaSource: Send + Sync {
    /// Size of the frames the source produces, `None` until known.
    fn natural_size(&self) -> Option<Dimensions>;

    fn current_frame(&self) -> Result<Frame, Box<dyn std::error::Error>>;
}

/// Acquires a media source on demand (the camera permission prompt).
///
/// The returned source owns the underlying device; dropping the last
/// reference releases it.
pub trait CameraOpener {
    fn open(&self) -> Result<Arc<dyn MediaSource>, CameraAccessError>;
}
