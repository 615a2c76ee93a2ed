use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::services::queue::RedisJobQueue;

/// State shared by the health and metrics handlers.
///
/// The health-check queue is a separate client from the one the consumer loop owns.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<RedisJobQueue>,
    pub metrics: Arc<PrometheusHandle>,
}

impl AppState {
    pub fn new(queue: RedisJobQueue, metrics: PrometheusHandle) -> Self {
        Self {
            queue: Arc::new(queue),
            metrics: Arc::new(metrics),
        }
    }
}
