use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crate::detection::domain::detection::DetectionWithLandmarks;
use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::{
    detect_all_faces_with_landmarks, lock, SharedFaceDetector,
};
use crate::pipeline::artifact_namer::ArtifactNamer;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::DEFAULT_ARTIFACT_EXTENSION;
use crate::shared::errors::{ExtractError, NotReadyError, PersistError};
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// One face cropped out of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedImage {
    pub image: Frame,
    /// Source box in the frame's pixel space.
    pub bbox: BoundingBox,
    pub score: f64,
    pub file_name: String,
    /// Where the crop was saved; `None` when saving failed.
    pub persisted_path: Option<PathBuf>,
}

/// Results of one extraction batch, in detection order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub images: Vec<Arc<ExtractedImage>>,
    pub failures: Vec<ExtractError>,
}

#[derive(Debug)]
pub enum ExtractionOutcome {
    NoFaces,
    Extracted(BatchReport),
}

/// Per-item result before it is folded into the report.
type CropResult = Result<(ExtractedImage, Option<PersistError>), ExtractError>;

/// Detect → crop → save, once, for a single frame.
///
/// Crops run on scoped threads; each is named and written on its own so
/// one failed save does not affect the others.
pub struct ExtractFacesUseCase {
    provider: SharedFaceDetector,
    writer: Box<dyn ImageWriter>,
    namer: ArtifactNamer,
    output_dir: PathBuf,
    extension: String,
    options: DetectorOptions,
}

impl ExtractFacesUseCase {
    pub fn new(
        provider: SharedFaceDetector,
        writer: Box<dyn ImageWriter>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            provider,
            writer,
            namer: ArtifactNamer::new(),
            output_dir,
            extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
            options: DetectorOptions::default(),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn with_options(mut self, options: DetectorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_namer(mut self, namer: ArtifactNamer) -> Self {
        self.namer = namer;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn execute(&self, frame: &Frame) -> Result<ExtractionOutcome, Box<dyn std::error::Error>> {
        let faces = {
            let mut provider = lock(&self.provider);
            if !provider.is_ready() {
                return Err(NotReadyError::ModelsNotLoaded.into());
            }
            detect_all_faces_with_landmarks(&mut **provider, frame, &self.options)?
        };

        if faces.is_empty() {
            log::info!("No faces detected in frame {}", frame.index());
            return Ok(ExtractionOutcome::NoFaces);
        }

        // Names are taken up front so they follow detection order.
        let names: Vec<String> = faces
            .iter()
            .map(|_| self.namer.next_name(&self.extension))
            .collect();

        let results: Vec<CropResult> = thread::scope(|s| {
            let handles: Vec<_> = faces
                .iter()
                .zip(names)
                .map(|(face, name)| s.spawn(move || self.extract_one(frame, face, name)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        let mut report = BatchReport::default();
        for result in results {
            match result {
                Ok((image, None)) => report.images.push(Arc::new(image)),
                Ok((image, Some(persist))) => {
                    report.images.push(Arc::new(image));
                    report.failures.push(persist.into());
                }
                Err(e) => report.failures.push(e),
            }
        }

        log::info!(
            "Extracted {} face(s) from frame {} ({} failure(s))",
            report.images.len(),
            frame.index(),
            report.failures.len()
        );
        Ok(ExtractionOutcome::Extracted(report))
    }

    fn extract_one(
        &self,
        frame: &Frame,
        face: &DetectionWithLandmarks,
        file_name: String,
    ) -> CropResult {
        let bbox = &face.detection.bbox;
        let (x, y, w, h) = bbox
            .clip_to(frame.dimensions())
            .ok_or_else(|| ExtractError::EmptyRegion(*bbox))?;
        let image = frame.crop(x, y, w, h);

        let path = self.output_dir.join(&file_name);
        let (persisted_path, failure) = match self.writer.write(&path, &image) {
            Ok(()) => (Some(path), None),
            Err(e) => (
                None,
                Some(PersistError {
                    path,
                    message: e.to_string(),
                }),
            ),
        };

        Ok((
            ExtractedImage {
                image,
                bbox: *bbox,
                score: face.detection.score,
                file_name,
                persisted_path,
            },
            failure,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::Detection;
    use crate::detection::domain::face_detector::{shared, FaceDetector};
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::shared::dimensions::Dimensions;
    use crate::shared::errors::InitError;
    use crate::shared::model_location::ModelLocation;
    use std::sync::Mutex;

    struct StubDetector {
        ready: bool,
        boxes: Vec<BoundingBox>,
    }

    impl FaceDetector for StubDetector {
        fn initialize(&mut self, _location: &ModelLocation) -> Result<(), InitError> {
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
    struct RecordingWriter {
        written: Arc<Mutex<Vec<(PathBuf, Dimensions)>>>,
        fail_all: bool,
    }

    impl ImageWriter for RecordingWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_all {
                return Err("disk full".into());
            }
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.dimensions()));
            Ok(())
        }
    }

    fn frame() -> Frame {
        let (w, h) = (100u32, 80u32);
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Frame::new(data, w, h, 3, 7)
    }

    fn use_case(boxes: Vec<BoundingBox>, writer: RecordingWriter) -> ExtractFacesUseCase {
        ExtractFacesUseCase::new(
            shared(Box::new(StubDetector { ready: true, boxes })),
            Box::new(writer),
            PathBuf::from("/out"),
        )
        .with_namer(ArtifactNamer::with_clock(|| 1000))
    }

    fn report(outcome: ExtractionOutcome) -> BatchReport {
        match outcome {
            ExtractionOutcome::Extracted(report) => report,
            ExtractionOutcome::NoFaces => panic!("expected faces"),
        }
    }

    #[test]
    fn test_one_image_per_detection_in_order() {
        let writer = RecordingWriter::default();
        let boxes = vec![
            BoundingBox::new(10.0, 10.0, 20.0, 30.0),
            BoundingBox::new(50.0, 20.0, 40.0, 40.0),
            BoundingBox::new(0.0, 0.0, 5.0, 5.0),
        ];
        let report = report(use_case(boxes.clone(), writer.clone()).execute(&frame()).unwrap());

        assert_eq!(report.images.len(), 3);
        assert!(report.failures.is_empty());
        for (image, bbox) in report.images.iter().zip(&boxes) {
            assert_eq!(&image.bbox, bbox);
            assert_eq!(image.image.index(), 7);
        }
        assert_eq!(report.images[0].image.dimensions(), Dimensions::new(20, 30));
        assert_eq!(report.images[1].image.data()[..3], [50, 20, 0]);
        assert_eq!(writer.written.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_names_follow_detection_order() {
        let boxes = vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(20.0, 0.0, 10.0, 10.0),
        ];
        let report = report(
            use_case(boxes, RecordingWriter::default())
                .execute(&frame())
                .unwrap(),
        );

        assert_eq!(report.images[0].file_name, "extracted_face_1000.png");
        assert_eq!(report.images[1].file_name, "extracted_face_1001.png");
        assert_eq!(
            report.images[1].persisted_path.as_deref(),
            Some(Path::new("/out/extracted_face_1001.png"))
        );
    }

    #[test]
    fn test_no_detections_is_no_faces() {
        let outcome = use_case(vec![], RecordingWriter::default())
            .execute(&frame())
            .unwrap();
        assert!(matches!(outcome, ExtractionOutcome::NoFaces));
    }

    #[test]
    fn test_failed_save_still_yields_image() {
        let writer = RecordingWriter {
            fail_all: true,
            ..Default::default()
        };
        let boxes = vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(20.0, 20.0, 10.0, 10.0),
        ];
        let report = report(use_case(boxes, writer).execute(&frame()).unwrap());

        assert_eq!(report.images.len(), 2);
        assert!(report.images.iter().all(|i| i.persisted_path.is_none()));
        assert_eq!(report.failures.len(), 2);
        match &report.failures[0] {
            ExtractError::Persist(e) => {
                assert_eq!(e.path, PathBuf::from("/out/extracted_face_1000.png"));
                assert!(e.message.contains("disk full"));
            }
            other => panic!("unexpected failure {other:?}"),
        }
    }

    #[test]
    fn test_box_outside_frame_is_empty_region() {
        let boxes = vec![
            BoundingBox::new(500.0, 500.0, 10.0, 10.0),
            BoundingBox::new(10.0, 10.0, 10.0, 10.0),
        ];
        let report = report(
            use_case(boxes, RecordingWriter::default())
                .execute(&frame())
                .unwrap(),
        );

        assert_eq!(report.images.len(), 1);
        assert!(matches!(
            report.failures.as_slice(),
            [ExtractError::EmptyRegion(_)]
        ));
    }

    #[test]
    fn test_box_is_clamped_to_frame() {
        let boxes = vec![BoundingBox::new(-10.0, 70.0, 30.0, 30.0)];
        let report = report(
            use_case(boxes, RecordingWriter::default())
                .execute(&frame())
                .unwrap(),
        );
        assert_eq!(report.images[0].image.dimensions(), Dimensions::new(20, 10));
    }

    #[test]
    fn test_not_ready_provider_is_refused() {
        let uc = ExtractFacesUseCase::new(
            shared(Box::new(StubDetector {
                ready: false,
                boxes: vec![],
            })),
            Box::new(RecordingWriter::default()),
            PathBuf::from("/out"),
        );
        let err = uc.execute(&frame()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<NotReadyError>(),
            Some(&NotReadyError::ModelsNotLoaded)
        );
    }

    #[test]
    fn test_extension_is_normalised() {
        let uc = use_case(
            vec![BoundingBox::new(0.0, 0.0, 4.0, 4.0)],
            RecordingWriter::default(),
        )
        .with_extension(".jpg");
        let report = report(uc.execute(&frame()).unwrap());
        assert!(report.images[0].file_name.ends_with(".jpg"));
    }
}
