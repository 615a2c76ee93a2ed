use garde::Validate;
use std::path::{Path, PathBuf};
use std::time::Instant;
use strum::IntoStaticStr;

use crate::models::detection::count_people;
use crate::models::job::CountJob;
use crate::models::result::PeopleCountResult;
use crate::services::detector::{Detector, DetectorError};
use crate::services::queue::{JobQueue, QueueError};

/// What became of a single job.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Published(PeopleCountResult),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Missing or empty `camera_id` / `image_path`
    InvalidJob(String),
    /// The snapshot file does not exist
    ImageNotFound(PathBuf),
}

/// Turns a job into at most one published result.
pub struct JobProcessor<D> {
    detector: D,
    confidence_threshold: f32,
    results_key: String,
}

impl<D: Detector> JobProcessor<D> {
    pub fn new(detector: D, confidence_threshold: f32, results_key: impl Into<String>) -> Self {
        Self {
            detector,
            confidence_threshold,
            results_key: results_key.into(),
        }
    }

    pub fn results_key(&self) -> &str {
        &self.results_key
    }

    /// Validate, detect, count and publish. Discards (invalid job, missing
    /// snapshot) are returned as `Outcome::Skipped`; everything else that goes
    /// wrong is an error for the caller to handle.
    pub async fn process<Q>(&self, queue: &mut Q, job: CountJob) -> Result<Outcome, ProcessError>
    where
        Q: JobQueue + ?Sized,
    {
        if let Err(report) = job.validate() {
            tracing::warn!(job = ?job, error = %report, "Invalid job data, skipping");
            return Ok(skipped(SkipReason::InvalidJob(report.to_string())));
        }
        let (Some(camera_id), Some(image_path)) = (job.camera_id, job.image_path) else {
            return Ok(skipped(SkipReason::InvalidJob("missing field".to_string())));
        };

        let path = Path::new(&image_path);
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::warn!(
                camera_id = %camera_id,
                image_path = %image_path,
                "Snapshot not found, skipping"
            );
            return Ok(skipped(SkipReason::ImageNotFound(path.to_path_buf())));
        }

        let start = Instant::now();
        let detections = self.detector.detect(path).await?;
        let elapsed = start.elapsed();
        metrics::histogram!("people_counter_detection_seconds").record(elapsed.as_secs_f64());

        let people_count = count_people(&detections, self.confidence_threshold);
        let result = PeopleCountResult::new(camera_id, people_count, &image_path);
        let payload = serde_json::to_string(&result)?;

        queue.enqueue(&self.results_key, payload).await?;

        metrics::counter!("people_counter_jobs_total", "outcome" => "published").increment(1);
        // camera ids are caller-controlled, so they stay out of metric labels
        metrics::histogram!("people_counter_people_count").record(people_count as f64);

        tracing::info!(
            camera_id = %result.camera_id,
            people_count,
            detections = detections.len(),
            detection_ms = elapsed.as_millis() as u64,
            snapshot = %result.snapshot_path,
            "People count published"
        );

        Ok(Outcome::Published(result))
    }
}

fn skipped(reason: SkipReason) -> Outcome {
    let label: &'static str = (&reason).into();
    metrics::counter!("people_counter_jobs_total", "outcome" => label).increment(1);
    Outcome::Skipped(reason)
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Detection failed: {0}")]
    Detector(#[from] DetectorError),

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to publish result: {0}")]
    Publish(#[from] QueueError),
}
