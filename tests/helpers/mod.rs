//! Test doubles for driving the consumer loop without Redis or a model server

#![allow(dead_code)]

use async_trait::async_trait;
use people_counter_worker::models::detection::Detection;
use people_counter_worker::services::detector::{Detector, DetectorError};
use people_counter_worker::services::queue::{JobQueue, QueueError};
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake queue should do on the next dequeue.
pub enum Scripted {
    Payload(String),
    Timeout,
    Disconnected,
}

/// In-memory queue that replays a script and records everything published.
#[derive(Default)]
pub struct ScriptedQueue {
    script: VecDeque<Scripted>,
    pub published: Vec<(String, String)>,
    pub dequeue_calls: usize,
}

impl ScriptedQueue {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Parsed payloads published on `channel`.
    pub fn results_on(&self, channel: &str) -> Vec<serde_json::Value> {
        self.published
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, p)| serde_json::from_str(p).expect("published payload is JSON"))
            .collect()
    }
}

pub fn disconnected() -> QueueError {
    QueueError::from(redis::RedisError::from(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    )))
}

#[async_trait]
impl JobQueue for ScriptedQueue {
    async fn dequeue(&mut self, _timeout: Duration) -> Result<Option<String>, QueueError> {
        self.dequeue_calls += 1;
        match self.script.pop_front() {
            Some(Scripted::Payload(payload)) => Ok(Some(payload)),
            Some(Scripted::Timeout) | None => Ok(None),
            Some(Scripted::Disconnected) => Err(disconnected()),
        }
    }

    async fn enqueue(&mut self, channel: &str, payload: String) -> Result<(), QueueError> {
        self.published.push((channel.to_string(), payload));
        Ok(())
    }
}

/// Detector returning a fixed set of detections and remembering what it saw.
pub struct StubDetector {
    detections: Vec<Detection>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl StubDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            calls: Arc::default(),
        }
    }

    /// Handle on the paths seen so far; stays valid after the detector is moved.
    pub fn calls(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Detector for StubDetector {
    async fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectorError> {
        self.calls.lock().unwrap().push(image_path.to_path_buf());
        Ok(self.detections.clone())
    }
}

/// Write a tiny JPEG-looking file into `dir` and return its path.
pub fn write_snapshot(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).unwrap();
    path
}

/// In-memory sink for the worker's JSON log output.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    /// JSON subscriber writing into this sink, formatted like the worker binary's.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .json()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || sink.clone())
            .finish()
    }

    /// Every event recorded so far, one parsed JSON object per line.
    pub fn events(&self) -> Vec<serde_json::Value> {
        let raw = self.0.lock().unwrap();
        String::from_utf8_lossy(&raw)
            .lines()
            .map(|line| serde_json::from_str(line).expect("log line is JSON"))
            .collect()
    }

    pub fn at_level(&self, level: &str) -> Vec<serde_json::Value> {
        self.events()
            .into_iter()
            .filter(|event| event["level"] == level)
            .collect()
    }
}

pub fn job_payload(camera_id: serde_json::Value, image_path: &Path) -> String {
    serde_json::json!({
        "camera_id": camera_id,
        "image_path": image_path.to_str().unwrap(),
    })
    .to_string()
}
