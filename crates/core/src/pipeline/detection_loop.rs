//! Periodic detect-and-draw loop over a live media source.
//!
//! The loop owns a worker thread that wakes on a fixed tick, samples the
//! source, runs the provider and replaces the overlay with the new batch.
//! Cancellation is cooperative: the flag is checked under the renderer lock
//! before every render, so a detection still in flight when the handle is
//! cancelled is dropped instead of drawn.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};

use crate::detection::domain::detection::{resize_results, DetectionWithLandmarks};
use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::{
    detect_all_faces_with_landmarks, lock, SharedFaceDetector,
};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::shared::constants::{DEFAULT_DETECTION_INTERVAL, DEFAULT_DISPLAY_SIZE};
use crate::shared::dimensions::Dimensions;
use crate::shared::errors::NotReadyError;
use crate::video::domain::media_source::MediaSource;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionLoopConfig {
    pub interval: Duration,
    /// Size the overlay is rendered at; results are rescaled into it.
    pub display: Dimensions,
    pub options: DetectorOptions,
}

impl Default for DetectionLoopConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_DETECTION_INTERVAL,
            display: DEFAULT_DISPLAY_SIZE,
            options: DetectorOptions::default(),
        }
    }
}

type SharedRenderer = Arc<Mutex<Box<dyn OverlayRenderer>>>;

fn lock_renderer(renderer: &SharedRenderer) -> MutexGuard<'_, Box<dyn OverlayRenderer>> {
    renderer.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct DetectionLoop;

impl DetectionLoop {
    /// Checks preconditions, sizes the overlay and spawns the worker.
    pub fn start(
        config: DetectionLoopConfig,
        source: Arc<dyn MediaSource>,
        provider: SharedFaceDetector,
        mut renderer: Box<dyn OverlayRenderer>,
        logger: Box<dyn PipelineLogger>,
    ) -> Result<DetectionLoopHandle, NotReadyError> {
        if !lock(&provider).is_ready() {
            return Err(NotReadyError::ModelsNotLoaded);
        }
        match source.natural_size() {
            Some(size) if size.is_valid() => {}
            _ => return Err(NotReadyError::MediaNotReady),
        }
        if !config.display.is_valid() {
            return Err(NotReadyError::InvalidDisplaySize);
        }

        renderer.resize(config.display);

        let renderer: SharedRenderer = Arc::new(Mutex::new(renderer));
        let cancelled = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);

        let mut worker = LoopWorker {
            config,
            source,
            provider,
            renderer: renderer.clone(),
            cancelled: cancelled.clone(),
            logger,
        };
        let handle = thread::spawn(move || worker.run(stop_rx));

        Ok(DetectionLoopHandle {
            cancelled,
            renderer,
            stop_tx,
            worker: Some(handle),
        })
    }
}

/// Owning handle of a running loop. Dropping it stops and joins the worker.
pub struct DetectionLoopHandle {
    cancelled: Arc<AtomicBool>,
    renderer: SharedRenderer,
    stop_tx: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl DetectionLoopHandle {
    /// Requests the loop to stop without waiting for an in-flight detection.
    ///
    /// Once this returns the renderer receives no further `clear` or `draw`.
    pub fn cancel(&self) {
        let _guard = lock_renderer(&self.renderer);
        self.cancelled.store(true, Ordering::SeqCst);
        let _ = self.stop_tx.try_send(());
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }
}

impl Drop for DetectionLoopHandle {
    fn drop(&mut self) {
        self.cancel();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct LoopWorker {
    config: DetectionLoopConfig,
    source: Arc<dyn MediaSource>,
    provider: SharedFaceDetector,
    renderer: SharedRenderer,
    cancelled: Arc<AtomicBool>,
    logger: Box<dyn PipelineLogger>,
}

impl LoopWorker {
    fn run(&mut self, stop_rx: Receiver<()>) {
        let ticker = crossbeam_channel::tick(self.config.interval);
        self.logger.info(&format!(
            "Detection loop started ({}ms interval, display {})",
            self.config.interval.as_millis(),
            self.config.display
        ));

        let mut index = 0usize;
        loop {
            let stopped = select! {
                recv(stop_rx) -> _ => true,
                recv(ticker) -> _ => false,
            };
            if stopped || self.cancelled.load(Ordering::SeqCst) {
                break;
            }
            if !self.run_cycle(index) {
                break;
            }
            index += 1;
        }

        self.logger.info("Detection loop stopped");
        self.logger.summary();
    }

    /// One detect-and-draw pass. Returns `false` when the result was
    /// discarded because the loop was cancelled meanwhile.
    fn run_cycle(&mut self, index: usize) -> bool {
        let t0 = Instant::now();
        let batch = match self.detect() {
            Ok(batch) => batch,
            Err(e) => {
                log::debug!("Detection cycle {index} failed: {e}");
                Vec::new()
            }
        };
        self.logger
            .timing("detect", t0.elapsed().as_secs_f64() * 1000.0);

        let t1 = Instant::now();
        if !self.render(&batch) {
            self.logger.metric("discarded", 1.0);
            return false;
        }
        self.logger
            .timing("draw", t1.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("faces", batch.len() as f64);
        self.logger.cycle(index);
        true
    }

    fn detect(&self) -> Result<Vec<DetectionWithLandmarks>, Box<dyn std::error::Error>> {
        let frame = self.source.current_frame()?;
        let batch = {
            let mut provider = lock(&self.provider);
            detect_all_faces_with_landmarks(&mut **provider, &frame, &self.config.options)?
        };
        Ok(resize_results(&batch, self.config.display))
    }

    fn render(&self, batch: &[DetectionWithLandmarks]) -> bool {
        let mut renderer = lock_renderer(&self.renderer);
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        renderer.clear();
        if !batch.is_empty() {
            renderer.draw(batch);
        }
        true
    }
}
