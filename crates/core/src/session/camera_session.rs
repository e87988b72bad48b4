use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::detection::domain::face_detector::{lock, shared, FaceDetector, SharedFaceDetector};
use crate::pipeline::detection_loop::{DetectionLoop, DetectionLoopConfig, DetectionLoopHandle};
use crate::pipeline::extract_faces_use_case::{ExtractFacesUseCase, ExtractionOutcome};
use crate::pipeline::pipeline_logger::LogPipelineLogger;
use crate::rendering::infrastructure::image_overlay_renderer::{
    ImageOverlayRenderer, OverlaySurface,
};
use crate::shared::constants::{DEFAULT_ARTIFACT_EXTENSION, DEFAULT_MODEL_LOCATION};
use crate::shared::errors::{CameraAccessError, InitError, NotReadyError};
use crate::shared::model_location::ModelLocation;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::media_source::{CameraOpener, MediaSource};

use super::display_list::DisplayList;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartVideoError {
    #[error(transparent)]
    NotReady(#[from] NotReadyError),
    #[error(transparent)]
    Camera(#[from] CameraAccessError),
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub model_location: ModelLocation,
    pub detection: DetectionLoopConfig,
    pub output_dir: PathBuf,
    pub extension: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model_location: ModelLocation::parse(DEFAULT_MODEL_LOCATION),
            detection: DetectionLoopConfig::default(),
            output_dir: PathBuf::from("."),
            extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
        }
    }
}

/// State of one interactive page view.
///
/// Owns the provider, the live source and its detection loop, the overlay
/// and the list of extracted faces. Dropping the session stops the loop
/// before releasing the source.
pub struct Session {
    config: SessionConfig,
    provider: SharedFaceDetector,
    extractor: ExtractFacesUseCase,
    loading: bool,
    display_list: DisplayList,
    overlay: OverlaySurface,
    detection: Option<DetectionLoopHandle>,
    source: Option<Arc<dyn MediaSource>>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        provider: Box<dyn FaceDetector>,
        writer: Box<dyn ImageWriter>,
    ) -> Self {
        let provider = shared(provider);
        let extractor = ExtractFacesUseCase::new(provider.clone(), writer, config.output_dir.clone())
            .with_extension(&config.extension)
            .with_options(config.detection.options);
        let overlay = OverlaySurface::new(config.detection.display);

        Self {
            config,
            provider,
            extractor,
            loading: true,
            display_list: DisplayList::new(),
            overlay,
            detection: None,
            source: None,
        }
    }

    /// Loads the detection models. Until this succeeds the session stays
    /// in its loading state and refuses video and extraction.
    pub fn load_models(&mut self) -> Result<(), InitError> {
        lock(&self.provider).initialize(&self.config.model_location)?;
        self.loading = false;
        log::info!("Face models loaded from {}", self.config.model_location);
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Opens a source and starts the detection loop on it, replacing any
    /// previous one.
    ///
    /// A camera failure leaves the session without video; nothing else changes.
    pub fn start_video(&mut self, opener: &dyn CameraOpener) -> Result<(), StartVideoError> {
        if self.loading {
            return Err(NotReadyError::ModelsNotLoaded.into());
        }
        self.stop_video();

        let source = opener.open().map_err(|e| {
            log::warn!("Could not start video: {e}");
            e
        })?;

        let handle = DetectionLoop::start(
            self.config.detection,
            source.clone(),
            self.provider.clone(),
            Box::new(ImageOverlayRenderer::new(self.overlay.clone())),
            Box::new(LogPipelineLogger::default()),
        )?;

        self.detection = Some(handle);
        self.source = Some(source);
        Ok(())
    }

    /// Cancels and joins the loop, wipes its last drawing, then releases
    /// the source.
    pub fn stop_video(&mut self) {
        if let Some(handle) = self.detection.take() {
            drop(handle);
            self.overlay.clear();
            log::info!("Video stopped");
        }
        self.source = None;
    }

    /// Runs the extraction pipeline on the frame currently shown and
    /// appends every produced face to the display list.
    pub fn extract(&mut self) -> Result<ExtractionOutcome, Box<dyn std::error::Error>> {
        if self.loading {
            return Err(NotReadyError::ModelsNotLoaded.into());
        }
        let source = self.source.as_ref().ok_or(NotReadyError::MediaNotReady)?;
        let frame = source.current_frame()?;

        let outcome = self.extractor.execute(&frame)?;
        match &outcome {
            ExtractionOutcome::NoFaces => log::info!("No faces detected!"),
            ExtractionOutcome::Extracted(report) => {
                for failure in &report.failures {
                    log::warn!("{failure}");
                }
                self.display_list.extend(report.images.iter().cloned());
            }
        }
        Ok(outcome)
    }

    /// The current frame with the overlay drawn on top, at display size.
    pub fn annotated_frame(&self) -> Result<image::RgbImage, Box<dyn std::error::Error>> {
        let source = self.source.as_ref().ok_or(NotReadyError::MediaNotReady)?;
        let frame = source.current_frame()?;
        self.overlay
            .composite_over(&frame)
            .ok_or_else(|| "frame is not RGB".into())
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.display_list
    }

    pub fn overlay(&self) -> &OverlaySurface {
        &self.overlay
    }

    pub fn is_video_running(&self) -> bool {
        self.detection.is_some()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_video();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::{Detection, DetectionWithLandmarks};
    use crate::detection::domain::detector_options::DetectorOptions;
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::dimensions::Dimensions;
    use crate::shared::frame::Frame;
    use crate::video::infrastructure::still_image_source::StillImageSource;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeDetector {
        ready: bool,
        fail_init: bool,
        boxes: Arc<Mutex<Vec<BoundingBox>>>,
    }

    impl FaceDetector for FakeDetector {
        fn initialize(&mut self, location: &ModelLocation) -> Result<(), InitError> {
            if self.fail_init {
                return Err(InitError::MissingArtifact {
                    name: "face.onnx".into(),
                    location: location.to_string(),
                });
            }
            self.ready = true;
            Ok(())
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn detect(
            &mut self,
            frame: &Frame,
            _options: &DetectorOptions,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Ok(self
                .boxes
                .lock()
                .unwrap()
                .iter()
                .map(|b| Detection::new(*b, 0.9, frame.dimensions()))
                .collect())
        }

        fn with_landmarks(
            &mut self,
            _frame: &Frame,
            detections: &[Detection],
        ) -> Result<Vec<DetectionWithLandmarks>, Box<dyn std::error::Error>> {
            Ok(detections
                .iter()
                .map(|d| DetectionWithLandmarks::new(d.clone(), FaceLandmarks::default()))
                .collect())
        }
    }

    #[derive(Clone, Default)]
    struct CountingWriter {
        writes: Arc<AtomicUsize>,
    }

    impl ImageWriter for CountingWriter {
        fn write(&self, _path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeOpener {
        result: Result<(), CameraAccessError>,
        opened: AtomicUsize,
    }

    impl FakeOpener {
        fn ok() -> Self {
            Self {
                result: Ok(()),
                opened: AtomicUsize::new(0),
            }
        }

        fn failing(error: CameraAccessError) -> Self {
            Self {
                result: Err(error),
                opened: AtomicUsize::new(0),
            }
        }
    }

    impl CameraOpener for FakeOpener {
        fn open(&self) -> Result<Arc<dyn MediaSource>, CameraAccessError> {
            self.result.clone()?;
            self.opened.fetch_add(1, Ordering::SeqCst);
            let frame = Frame::new(vec![128u8; 64 * 48 * 3], 64, 48, 3, 0);
            Ok(Arc::new(StillImageSource::from_frame(frame)))
        }
    }

    /// A camera that has started streaming but not delivered a frame.
    struct WarmingUpSource;

    impl MediaSource for WarmingUpSource {
        fn natural_size(&self) -> Option<Dimensions> {
            Some(Dimensions::new(640, 480))
        }

        fn current_frame(&self) -> Result<Frame, Box<dyn std::error::Error>> {
            Err(NotReadyError::MediaNotReady.into())
        }
    }

    struct WarmingUpOpener;

    impl CameraOpener for WarmingUpOpener {
        fn open(&self) -> Result<Arc<dyn MediaSource>, CameraAccessError> {
            Ok(Arc::new(WarmingUpSource))
        }
    }

    struct Harness {
        session: Session,
        boxes: Arc<Mutex<Vec<BoundingBox>>>,
        writer: CountingWriter,
    }

    fn harness(fail_init: bool) -> Harness {
        let boxes = Arc::new(Mutex::new(vec![BoundingBox::new(4.0, 4.0, 16.0, 16.0)]));
        let writer = CountingWriter::default();
        let config = SessionConfig {
            model_location: ModelLocation::parse("/models"),
            detection: DetectionLoopConfig {
                interval: Duration::from_millis(5),
                display: Dimensions::new(72, 56),
                options: DetectorOptions::default(),
            },
            output_dir: PathBuf::from("/out"),
            extension: "png".into(),
        };
        let session = Session::new(
            config,
            Box::new(FakeDetector {
                ready: false,
                fail_init,
                boxes: boxes.clone(),
            }),
            Box::new(writer.clone()),
        );
        Harness {
            session,
            boxes,
            writer,
        }
    }

    fn not_ready<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a NotReadyError> {
        err.downcast_ref::<NotReadyError>()
    }

    #[test]
    fn test_new_session_is_loading() {
        let h = harness(false);
        assert!(h.session.is_loading());
        assert!(h.session.display_list().is_empty());
        assert!(!h.session.is_video_running());
    }

    #[test]
    fn test_load_models_clears_loading() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        assert!(!h.session.is_loading());
    }

    #[test]
    fn test_failed_load_keeps_loading() {
        let mut h = harness(true);
        let err = h.session.load_models().unwrap_err();
        assert!(matches!(err, InitError::MissingArtifact { .. }));
        assert!(h.session.is_loading());
    }

    #[test]
    fn test_extract_before_load_is_not_ready() {
        let mut h = harness(false);
        let err = h.session.extract().unwrap_err();
        assert_eq!(not_ready(&*err), Some(&NotReadyError::ModelsNotLoaded));
        assert_eq!(h.writer.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_start_video_before_load_is_not_ready() {
        let mut h = harness(false);
        let opener = FakeOpener::ok();
        assert_eq!(
            h.session.start_video(&opener),
            Err(StartVideoError::NotReady(NotReadyError::ModelsNotLoaded))
        );
        assert_eq!(opener.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_extract_without_video_is_not_ready() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        let err = h.session.extract().unwrap_err();
        assert_eq!(not_ready(&*err), Some(&NotReadyError::MediaNotReady));
    }

    #[test]
    fn test_permission_denied_starts_nothing() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        let opener = FakeOpener::failing(CameraAccessError::PermissionDenied("denied".into()));

        let result = h.session.start_video(&opener);

        assert!(matches!(
            result,
            Err(StartVideoError::Camera(CameraAccessError::PermissionDenied(_)))
        ));
        assert!(!h.session.is_video_running());
        assert!(h.session.display_list().is_empty());
    }

    #[test]
    fn test_extract_appends_to_display_list() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        h.session.start_video(&FakeOpener::ok()).unwrap();
        assert!(h.session.is_video_running());

        h.session.extract().unwrap();
        assert_eq!(h.session.display_list().len(), 1);

        h.boxes
            .lock()
            .unwrap()
            .push(BoundingBox::new(30.0, 20.0, 10.0, 10.0));
        h.session.extract().unwrap();

        let list = h.session.display_list();
        assert_eq!(list.len(), 3);
        assert_eq!(list.items()[0].image.dimensions(), Dimensions::new(16, 16));
        assert_eq!(h.writer.writes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_extract_with_no_faces_leaves_list_unchanged() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        h.session.start_video(&FakeOpener::ok()).unwrap();
        h.boxes.lock().unwrap().clear();

        let outcome = h.session.extract().unwrap();

        assert!(matches!(outcome, ExtractionOutcome::NoFaces));
        assert!(h.session.display_list().is_empty());
    }

    #[test]
    fn test_start_video_twice_replaces_source() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        let opener = FakeOpener::ok();
        h.session.start_video(&opener).unwrap();
        h.session.start_video(&opener).unwrap();

        assert_eq!(opener.opened.load(Ordering::SeqCst), 2);
        assert!(h.session.is_video_running());
    }

    #[test]
    fn test_stop_video_releases_source() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        h.session.start_video(&FakeOpener::ok()).unwrap();
        h.session.stop_video();

        assert!(!h.session.is_video_running());
        let err = h.session.extract().unwrap_err();
        assert_eq!(not_ready(&*err), Some(&NotReadyError::MediaNotReady));
    }

    #[test]
    fn test_annotated_frame_is_display_sized() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        h.session.start_video(&FakeOpener::ok()).unwrap();

        let img = h.session.annotated_frame().unwrap();
        assert_eq!(img.dimensions(), (72, 56));
    }

    #[test]
    fn test_extract_before_first_frame_is_not_ready() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        h.session.start_video(&WarmingUpOpener).unwrap();

        let err = h.session.extract().unwrap_err();

        assert_eq!(not_ready(&*err), Some(&NotReadyError::MediaNotReady));
        assert!(h.session.display_list().is_empty());
        assert_eq!(h.writer.writes.load(Ordering::SeqCst), 0);
    }

    fn wait_for_drawing(overlay: &OverlaySurface) {
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while overlay.snapshot().pixels().all(|p| p.0[3] == 0) {
            assert!(std::time::Instant::now() < deadline, "overlay never drawn");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn is_blank(overlay: &OverlaySurface) -> bool {
        overlay.snapshot().pixels().all(|p| p.0[3] == 0)
    }

    #[test]
    fn test_stop_video_clears_overlay() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        h.session.start_video(&FakeOpener::ok()).unwrap();
        wait_for_drawing(h.session.overlay());

        h.session.stop_video();

        assert!(is_blank(h.session.overlay()));
        std::thread::sleep(Duration::from_millis(20));
        assert!(is_blank(h.session.overlay()));
    }

    #[test]
    fn test_dropping_session_clears_overlay() {
        let mut h = harness(false);
        h.session.load_models().unwrap();
        h.session.start_video(&FakeOpener::ok()).unwrap();
        let overlay = h.session.overlay().clone();
        wait_for_drawing(&overlay);

        drop(h.session);

        assert!(is_blank(&overlay));
    }
}
