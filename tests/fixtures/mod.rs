//! Detection fixtures shared by the integration tests

use people_counter_worker::models::detection::Detection;

/// A detector response together with the count expected at a threshold.
#[derive(Debug, Clone)]
pub struct CountFixture {
    pub description: &'static str,
    pub threshold: f32,
    pub detections: &'static [(u32, f32)],
    pub expected_count: u32,
}

impl CountFixture {
    pub fn detections(&self) -> Vec<Detection> {
        self.detections
            .iter()
            .map(|&(class_id, confidence)| Detection::new(class_id, confidence))
            .collect()
    }
}

pub const COUNT_FIXTURES: &[CountFixture] = &[
    CountFixture {
        description: "classroom with a low-confidence person and a car",
        threshold: 0.3,
        detections: &[(0, 0.9), (0, 0.2), (0, 0.5), (2, 0.95)],
        expected_count: 2,
    },
    CountFixture {
        description: "single person exactly at the threshold",
        threshold: 0.5,
        detections: &[(0, 0.5)],
        expected_count: 1,
    },
    CountFixture {
        description: "empty auditorium",
        threshold: 0.3,
        detections: &[],
        expected_count: 0,
    },
    CountFixture {
        description: "chairs and a laptop only",
        threshold: 0.3,
        detections: &[(56, 0.88), (63, 0.71)],
        expected_count: 0,
    },
];
