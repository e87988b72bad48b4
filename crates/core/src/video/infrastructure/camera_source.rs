//! Webcam capture on a dedicated thread.
//!
//! The camera handle never leaves its capture thread; the rest of the
//! application only sees the most recent decoded frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

use crate::shared::dimensions::Dimensions;
use crate::shared::errors::{CameraAccessError, NotReadyError};
use crate::shared::frame::Frame;
use crate::video::domain::media_source::{CameraOpener, MediaSource};

/// Back-off after a failed grab so a stalled device does not spin the thread.
const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Live camera feed that keeps the latest frame for sampling.
pub struct CameraSource {
    latest: Arc<Mutex<Option<Frame>>>,
    size: Dimensions,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CameraSource {
    /// Opens camera `device_index` and starts streaming.
    ///
    /// Returns only after the device either produced its stream format or
    /// failed, so permission and device errors surface here.
    pub fn open(device_index: u32, requested: Dimensions) -> Result<Self, CameraAccessError> {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let latest = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let latest = latest.clone();
            let stop = stop.clone();
            thread::spawn(move || capture_loop(device_index, requested, ready_tx, latest, stop))
        };

        match ready_rx.recv() {
            Ok(Ok(size)) => Ok(Self {
                latest,
                size,
                stop,
                worker: Some(worker),
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(CameraAccessError::Stream(
                    "capture thread exited before the stream started".into(),
                ))
            }
        }
    }
}

impl MediaSource for CameraSource {
    fn natural_size(&self) -> Option<Dimensions> {
        Some(self.size)
    }

    /// Fails with [`NotReadyError::MediaNotReady`] until the capture
    /// thread has published its first frame.
    fn current_frame(&self) -> Result<Frame, Box<dyn std::error::Error>> {
        let latest = self
            .latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        latest.clone().ok_or_else(|| NotReadyError::MediaNotReady.into())
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn capture_loop(
    device_index: u32,
    requested: Dimensions,
    ready_tx: crossbeam_channel::Sender<Result<Dimensions, CameraAccessError>>,
    latest: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
) {
    let mut camera = match open_camera(device_index, requested) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let resolution = camera.resolution();
    let size = Dimensions::new(resolution.width(), resolution.height());
    log::info!(
        "Camera {device_index} streaming at {size} @ {} fps",
        camera.frame_rate()
    );
    if ready_tx.send(Ok(size)).is_err() {
        return;
    }

    let mut index = 0usize;
    while !stop.load(Ordering::Relaxed) {
        match grab_frame(&mut camera, index) {
            Ok(frame) => {
                *latest.lock().unwrap_or_else(|p| p.into_inner()) = Some(frame);
                index += 1;
            }
            Err(e) => {
                log::warn!("Failed to capture camera frame: {e}");
                thread::sleep(RETRY_DELAY);
            }
        }
    }

    if let Err(e) = camera.stop_stream() {
        log::warn!("Failed to stop camera stream: {e}");
    }
    log::info!("Camera {device_index} released");
}

fn open_camera(device_index: u32, requested: Dimensions) -> Result<Camera, CameraAccessError> {
    let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
    let mut camera = Camera::new(CameraIndex::Index(device_index), format)
        .map_err(|e| classify(&e.to_string()))?;

    // Open stream first (required for some cameras before setting resolution)
    camera
        .open_stream()
        .map_err(|e| classify(&e.to_string()))?;

    if let Err(e) = camera.set_resolution(Resolution::new(requested.width, requested.height)) {
        log::warn!("Could not set camera resolution {requested}: {e}. Using camera default.");
    }
    Ok(camera)
}

fn grab_frame(camera: &mut Camera, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
    let decoded = camera.frame()?.decode_image::<RgbFormat>()?;
    let (width, height) = (decoded.width(), decoded.height());
    Ok(Frame::new(decoded.into_raw(), width, height, 3, index))
}

/// Maps a backend open failure onto the access-error taxonomy.
fn classify(message: &str) -> CameraAccessError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CameraAccessError::PermissionDenied(message.to_string())
    } else {
        CameraAccessError::DeviceUnavailable(message.to_string())
    }
}

/// Opens a physical camera for the session's `start-video` command.
pub struct DeviceCameraOpener {
    pub device_index: u32,
    pub requested: Dimensions,
}

impl CameraOpener for DeviceCameraOpener {
    fn open(&self) -> Result<Arc<dyn MediaSource>, CameraAccessError> {
        Ok(Arc::new(CameraSource::open(
            self.device_index,
            self.requested,
        )?))
    }
}
