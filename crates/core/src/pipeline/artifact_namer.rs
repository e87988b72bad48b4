use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::shared::constants::ARTIFACT_PREFIX;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Hands out `extracted_face_<millis>.<ext>` file names.
///
/// The millisecond stamp is bumped past the previous one when the clock has
/// not advanced, so names are unique and strictly increasing even when
/// several crops of one batch are named in the same millisecond.
pub struct ArtifactNamer {
    last: Mutex<u64>,
    clock: fn() -> u64,
}

impl ArtifactNamer {
    pub fn new() -> Self {
        Self::with_clock(now_millis)
    }

    pub fn with_clock(clock: fn() -> u64) -> Self {
        Self {
            last: Mutex::new(0),
            clock,
        }
    }

    pub fn next_name(&self, extension: &str) -> String {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        let now = (self.clock)();
        let stamp = if now > *last { now } else { *last + 1 };
        *last = stamp;
        format!("{ARTIFACT_PREFIX}{stamp}.{extension}")
    }
}

impl Default for ArtifactNamer {
    fn default() -> Self {
        Self::new()
    }
}
