use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

/// Work queue the consumer pulls jobs from and publishes results to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send {
    /// Block up to `timeout` for the next raw job payload.
    /// Returns `Ok(None)` when the timeout elapses with nothing queued.
    async fn dequeue(&mut self, timeout: Duration) -> Result<Option<String>, QueueError>;

    /// Append a serialized payload to `channel`.
    async fn enqueue(&mut self, channel: &str, payload: String) -> Result<(), QueueError>;
}

/// Redis list-backed queue (`BRPOP` in, `LPUSH` out).
pub struct RedisJobQueue {
    client: redis::Client,
    jobs_key: String,
    conn: Option<MultiplexedConnection>,
}

impl RedisJobQueue {
    pub fn new(redis_url: &str, jobs_key: impl Into<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            jobs_key: jobs_key.into(),
            conn: None,
        })
    }

    pub fn jobs_key(&self) -> &str {
        &self.jobs_key
    }

    async fn connection(&mut self) -> Result<&mut MultiplexedConnection, QueueError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                let conn = self.client.get_multiplexed_async_connection().await?;
                tracing::info!(jobs_key = %self.jobs_key, "Connected to Redis");
                conn
            }
        };
        Ok(self.conn.insert(conn))
    }

    async fn try_dequeue(&mut self, timeout: Duration) -> Result<Option<String>, QueueError> {
        let key = self.jobs_key.clone();
        let conn = self.connection().await?;
        let popped: Option<(String, String)> = conn.brpop(&key, timeout.as_secs_f64()).await?;
        Ok(popped.map(|(_, payload)| payload))
    }

    async fn try_enqueue(&mut self, channel: &str, payload: String) -> Result<(), QueueError> {
        let conn = self.connection().await?;
        conn.lpush::<_, _, ()>(channel, payload).await?;
        Ok(())
    }

    /// Forget the cached connection after a connectivity failure so the next
    /// call reconnects.
    fn observe<T>(&mut self, result: Result<T, QueueError>) -> Result<T, QueueError> {
        if let Err(e) = &result {
            if e.is_connectivity() {
                self.conn = None;
            }
        }
        result
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Number of jobs currently waiting.
    pub async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let depth: u64 = conn.llen(&self.jobs_key).await?;
        Ok(depth)
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn dequeue(&mut self, timeout: Duration) -> Result<Option<String>, QueueError> {
        let result = self.try_dequeue(timeout).await;
        self.observe(result)
    }

    async fn enqueue(&mut self, channel: &str, payload: String) -> Result<(), QueueError> {
        let result = self.try_enqueue(channel, payload).await;
        self.observe(result)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis unreachable: {0}")]
    Connection(#[source] redis::RedisError),

    #[error("Redis error: {0}")]
    Redis(#[source] redis::RedisError),
}

impl QueueError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, QueueError::Connection(_))
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_io_error()
            || err.is_timeout()
        {
            QueueError::Connection(err)
        } else {
            QueueError::Redis(err)
        }
    }
}
