use crate::detection::domain::detection::DetectionWithLandmarks;
use crate::shared::dimensions::Dimensions;

/// Draws detection batches onto an overlay surface laid over the video.
///
/// Detections arrive already rescaled to the surface size.
pub trait OverlayRenderer: Send {
    /// Matches the surface to the display size, discarding its contents.
    fn resize(&mut self, size: Dimensions);

    fn clear(&mut self);

    fn draw(&mut self, batch: &[DetectionWithLandmarks]);
}
