use metrics_exporter_prometheus::PrometheusBuilder;
use people_counter_worker::{
    app_state::AppState,
    config::WorkerConfig,
    routes,
    services::{
        consumer::ConsumerLoop, detector::HttpDetector, processor::JobProcessor,
        queue::RedisJobQueue,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting people counter worker");

    // Load configuration
    let config = WorkerConfig::from_env().expect("Failed to load configuration");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    metrics::describe_counter!(
        "people_counter_jobs_total",
        "Jobs handled, labelled by outcome (published, invalid_job, image_not_found)"
    );
    metrics::describe_counter!(
        "people_counter_failures_total",
        "Recovered failures in the consumer loop, labelled by kind"
    );
    metrics::describe_histogram!(
        "people_counter_detection_seconds",
        "Time spent in the person detector per job"
    );
    metrics::describe_histogram!(
        "people_counter_people_count",
        "People counted per published result"
    );
    metrics::describe_gauge!(
        "people_counter_queue_depth",
        "Pending jobs observed by the readiness check"
    );

    // Health and metrics endpoints
    let health_queue = RedisJobQueue::new(&config.redis_url(), config.jobs_key())
        .expect("Failed to initialize Redis health client");
    let app = routes::router(AppState::new(health_queue, prometheus_handle));

    let listener = tokio::net::TcpListener::bind(&config.http_bind_addr)
        .await
        .expect("Failed to bind health listener");
    tracing::info!("Health endpoint listening on {}", config.http_bind_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Health server stopped");
        }
    });

    // Initialize services
    tracing::info!(
        host = %config.queue_host,
        port = config.queue_port,
        prefix = %config.key_prefix,
        "Initializing Redis job queue"
    );
    let queue = RedisJobQueue::new(&config.redis_url(), config.jobs_key())
        .expect("Failed to initialize job queue");

    tracing::info!(
        url = %config.detector_url,
        model = %config.detector_model,
        "Initializing detector client"
    );
    let detector = HttpDetector::new(
        config.detector_url.clone(),
        config.detector_model.clone(),
        config.detector_timeout(),
    )
    .expect("Failed to initialize detector client");

    let processor = JobProcessor::new(detector, config.detection_confidence, config.results_key());

    tracing::info!(
        jobs_key = %config.jobs_key(),
        confidence = config.detection_confidence,
        "Worker ready, waiting for jobs"
    );

    ConsumerLoop::new(
        queue,
        processor,
        config.retry_policy(),
        config.dequeue_timeout(),
    )
    .run()
    .await;
}
