use serde::Deserialize;
use std::time::Duration;

use crate::services::consumer::RetryPolicy;

const JOBS_SUFFIX: &str = "yolo:jobs";
const RESULTS_SUFFIX: &str = "yolo:results";

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Redis host holding the job and result lists
    #[serde(default = "default_queue_host")]
    pub queue_host: String,

    #[serde(default = "default_queue_port")]
    pub queue_port: u16,

    /// Redis logical database
    #[serde(default)]
    pub queue_db: u8,

    #[serde(default)]
    pub queue_password: Option<String>,

    /// Prefix shared with the web application's Redis keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Minimum detector confidence (inclusive) for a person to be counted
    #[serde(default = "default_detection_confidence")]
    pub detection_confidence: f32,

    #[serde(default = "default_dequeue_timeout_secs")]
    pub dequeue_timeout_secs: u64,

    /// Pause after the queue becomes unreachable
    #[serde(default = "default_connectivity_backoff_secs")]
    pub connectivity_backoff_secs: u64,

    /// Pause after any other failure while processing a job
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,

    /// Inference endpoint serving the YOLO model
    #[serde(default = "default_detector_url")]
    pub detector_url: String,

    #[serde(default = "default_detector_model")]
    pub detector_model: String,

    #[serde(default = "default_detector_timeout_secs")]
    pub detector_timeout_secs: u64,

    /// Health and metrics listener (e.g., "0.0.0.0:8000")
    #[serde(default = "default_http_bind_addr")]
    pub http_bind_addr: String,
}

fn default_queue_host() -> String {
    "localhost".to_string()
}

fn default_queue_port() -> u16 {
    6379
}

fn default_key_prefix() -> String {
    "univision-database-".to_string()
}

fn default_detection_confidence() -> f32 {
    0.3
}

fn default_dequeue_timeout_secs() -> u64 {
    10
}

fn default_connectivity_backoff_secs() -> u64 {
    5
}

fn default_error_backoff_ms() -> u64 {
    1000
}

fn default_detector_url() -> String {
    "http://localhost:8001/detect".to_string()
}

fn default_detector_model() -> String {
    "yolov8n".to_string()
}

fn default_detector_timeout_secs() -> u64 {
    30
}

fn default_http_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from an explicit set of variables instead of the process environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(ConfigError::Invalid(format!(
                "DETECTION_CONFIDENCE must be within [0, 1], got {}",
                self.detection_confidence
            )));
        }
        if self.dequeue_timeout_secs == 0 {
            // BRPOP treats 0 as "block forever"
            return Err(ConfigError::Invalid(
                "DEQUEUE_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn redis_url(&self) -> String {
        match &self.queue_password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.queue_host, self.queue_port, self.queue_db
            ),
            None => format!(
                "redis://{}:{}/{}",
                self.queue_host, self.queue_port, self.queue_db
            ),
        }
    }

    pub fn jobs_key(&self) -> String {
        format!("{}{}", self.key_prefix, JOBS_SUFFIX)
    }

    pub fn results_key(&self) -> String {
        format!("{}{}", self.key_prefix, RESULTS_SUFFIX)
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_secs(self.dequeue_timeout_secs)
    }

    pub fn detector_timeout(&self) -> Duration {
        Duration::from_secs(self.detector_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            connectivity_backoff: Duration::from_secs(self.connectivity_backoff_secs),
            error_backoff: Duration::from_millis(self.error_backoff_ms),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
