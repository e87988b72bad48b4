//! YOLO face-pose detector using ONNX Runtime via `ort`.
//!
//! One inference yields boxes, scores and five keypoints per face, so the
//! landmark pass reuses the keypoints of the most recent inference on the
//! same frame instead of running a second model.

use crate::detection::domain::detection::{Detection, DetectionWithLandmarks};
use crate::detection::domain::detector_options::{DetectorOptions, DEFAULT_INPUT_SIZE};
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::FACE_MODEL_NAME;
use crate::shared::errors::InitError;
use crate::shared::frame::Frame;
use crate::shared::model_location::ModelLocation;
use crate::shared::model_resolver;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of keypoints per detection (5 landmarks × 3 values each: x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum IoU for a caller-supplied detection to reuse cached keypoints.
const LANDMARK_MATCH_IOU: f64 = 0.5;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: Option<ort::session::Session>,
    /// Model input side read from the model; `None` when the model is dynamic.
    model_input_size: Option<u32>,
    /// Raw output of the last inference, keyed by frame index.
    last_inference: Option<(usize, Vec<RawDetection>)>,
}

impl OnnxYoloDetector {
    pub fn new() -> Self {
        Self {
            session: None,
            model_input_size: None,
            last_inference: None,
        }
    }

    fn infer(
        &mut self,
        frame: &Frame,
        confidence: f64,
        input_size: u32,
    ) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        let input_size = self.model_input_size.unwrap_or(input_size);
        let session = self
            .session
            .as_mut()
            .ok_or("face model is not initialized")?;

        // 1. Preprocess: letterbox + normalize → NCHW float32
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, input_size);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();

        // YOLO output is [1, features, detections] (transposed) or
        // [1, detections, features].
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        // 3. Parse detections
        let mut raw_dets = Vec::new();
        for i in 0..num_dets {
            let row: Vec<f32> = if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };
            if let Some(det) = parse_row(&row, confidence, scale, pad_x, pad_y) {
                raw_dets.push(det);
            }
        }

        // 4. NMS
        Ok(nms(&mut raw_dets, NMS_IOU_THRESH))
    }
}

impl Default for OnnxYoloDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn initialize(&mut self, location: &ModelLocation) -> Result<(), InitError> {
        if self.session.is_some() {
            return Ok(());
        }

        let model_path =
            model_resolver::resolve(location, FACE_MODEL_NAME).map_err(|e| match e {
                model_resolver::ModelResolveError::NotFound { .. } => InitError::MissingArtifact {
                    name: FACE_MODEL_NAME.to_string(),
                    location: location.to_string(),
                },
                other => InitError::Resolve {
                    name: FACE_MODEL_NAME.to_string(),
                    source: other,
                },
            })?;

        let load_err = |message: String| InitError::Load {
            path: model_path.clone(),
            message,
        };
        let session = ort::session::Session::builder()
            .map_err(|e| load_err(e.to_string()))?
            .with_execution_providers(platform_accelerators())
            .map_err(|e| load_err(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e| load_err(e.to_string()))?;

        // Try to read input size from model metadata (NCHW: [1, 3, H, W])
        self.model_input_size = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                if shape.len() >= 4 && shape[2] > 0 {
                    return Some(shape[2] as u32);
                }
            }
            None
        });
        self.session = Some(session);

        log::info!("Loaded face model from {}", model_path.display());
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    fn detect(
        &mut self,
        frame: &Frame,
        options: &DetectorOptions,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let raw = self.infer(frame, options.min_confidence, options.input_size)?;
        let size = frame.dimensions();
        let detections = raw
            .iter()
            .map(|d| Detection::new(d.bbox(), d.confidence, size))
            .collect();
        self.last_inference = Some((frame.index(), raw));
        Ok(detections)
    }

    fn with_landmarks(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
    ) -> Result<Vec<DetectionWithLandmarks>, Box<dyn std::error::Error>> {
        let mut cached = match self.last_inference.take() {
            Some((index, raw)) if index == frame.index() => raw,
            _ => Vec::new(),
        };
        if detections
            .iter()
            .any(|d| best_match(&cached, &d.bbox).is_none())
        {
            let min_score = detections.iter().map(|d| d.score).fold(1.0, f64::min);
            cached = self.infer(frame, min_score, DEFAULT_INPUT_SIZE)?;
        }

        let result = detections
            .iter()
            .map(|d| {
                let landmarks = best_match(&cached, &d.bbox)
                    .map(|raw| FaceLandmarks::new(raw.keypoints.to_vec()))
                    .unwrap_or_default();
                DetectionWithLandmarks::new(d.clone(), landmarks)
            })
            .collect();

        self.last_inference = Some((frame.index(), cached));
        Ok(result)
    }
}

fn best_match<'a>(candidates: &'a [RawDetection], bbox: &BoundingBox) -> Option<&'a RawDetection> {
    candidates
        .iter()
        .map(|c| (c, c.bbox().iou(bbox)))
        .filter(|(_, iou)| *iou >= LANDMARK_MATCH_IOU)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(c, _)| c)
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padded with 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    keypoints: [(f64, f64); 5],
}

impl RawDetection {
    fn bbox(&self) -> BoundingBox {
        BoundingBox::from_corners(self.x1, self.y1, self.x2, self.y2)
    }
}

/// Decodes one output row `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`
/// from letterbox space back to frame space.
fn parse_row(row: &[f32], confidence: f64, scale: f64, pad_x: u32, pad_y: u32) -> Option<RawDetection> {
    if row.len() < 5 + NUM_KEYPOINT_VALUES {
        return None;
    }
    let conf = row[4] as f64;
    if conf < confidence {
        return None;
    }

    let unpad_x = |v: f64| (v - pad_x as f64) / scale;
    let unpad_y = |v: f64| (v - pad_y as f64) / scale;

    let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
    let mut keypoints = [(0.0f64, 0.0f64); 5];
    for (k, point) in keypoints.iter_mut().enumerate() {
        *point = (
            unpad_x(row[5 + k * 3] as f64),
            unpad_y(row[5 + k * 3 + 1] as f64),
        );
    }

    Some(RawDetection {
        x1: unpad_x(cx - w / 2.0),
        y1: unpad_y(cy - h / 2.0),
        x2: unpad_x(cx + w / 2.0),
        y2: unpad_y(cy + h / 2.0),
        confidence: conf,
        keypoints,
    })
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        let bbox = det.bbox();
        if keep.iter().all(|k| k.bbox().iou(&bbox) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

/// CoreML on macOS, DirectML on Windows; ort falls back to CPU when the
/// accelerator cannot be registered.
fn platform_accelerators() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    let providers = vec![ort::execution_providers::CoreMLExecutionProvider::default().build()];
    #[cfg(target_os = "windows")]
    let providers = vec![ort::execution_providers::DirectMLExecutionProvider::default().build()];
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let providers = Vec::new();
    providers
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
