use serde::{Deserialize, Serialize};

/// COCO class index for "person".
pub const PERSON_CLASS_ID: u32 = 0;

/// One object reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32) -> Self {
        Self {
            class_id,
            confidence,
        }
    }

    /// Whether this detection counts as a person at the given threshold (inclusive).
    pub fn is_person(&self, threshold: f32) -> bool {
        self.class_id == PERSON_CLASS_ID && self.confidence >= threshold
    }
}

/// Count the person detections meeting `threshold`.
pub fn count_people(detections: &[Detection], threshold: f32) -> u32 {
    detections.iter().filter(|d| d.is_person(threshold)).count() as u32
}
