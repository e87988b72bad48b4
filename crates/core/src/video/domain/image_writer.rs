use std::path::Path;

use crate::shared::frame::Frame;

/// Writes a single frame to an image file.
///
/// `Sync` because one writer serves every crop of a batch concurrently.
pub trait ImageWriter: Send + Sync {
    /// Writes a frame to the given path; the format follows the extension.
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
