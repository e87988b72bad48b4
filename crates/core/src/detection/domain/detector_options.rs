/// Default minimum face score.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Default detector input resolution (square side, pixels).
pub const DEFAULT_INPUT_SIZE: u32 = 416;

/// Per-call tuning passed to the capability provider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorOptions {
    /// Detections scoring below this are dropped.
    pub min_confidence: f64,
    /// Square input side the backend resizes frames to; backends whose
    /// model has a fixed input size may ignore it.
    pub input_size: u32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            input_size: DEFAULT_INPUT_SIZE,
        }
    }
}

impl DetectorOptions {
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}
