use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::{Job, JobKind, TaskQueueError};

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const PENDING_QUEUE_KEY: &str = "task_queue:pending";

pub fn job_key(job_id: Uuid) -> String {
    format!("task_job:{}", job_id)
}

/// Fire-and-forget hand-off to the background worker. Enqueueing never
/// waits for the job to run.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, kind: JobKind, payload: Value) -> Result<Job, TaskQueueError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, TaskQueueError>;
}

pub struct RedisJobQueue {
    pool: Pool,
}

impl RedisJobQueue {
    pub async fn new(config: &AppConfig) -> Result<Self, TaskQueueError> {
        let redis_url = config
            .redis_url
            .clone()
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| TaskQueueError::PoolError(format!("Pool creation error: {}", e)))?;

        let queue = Self { pool };

        // Test connection
        let mut conn = queue.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis job queue initialized");

        Ok(queue)
    }

    async fn get_connection(&self) -> Result<Connection, TaskQueueError> {
        self.pool
            .get()
            .await
            .map_err(|e| TaskQueueError::PoolError(e.to_string()))
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, kind: JobKind, payload: Value) -> Result<Job, TaskQueueError> {
        kind.validate_payload(&payload)?;

        let job = Job::new(kind, payload);
        let mut conn = self.get_connection().await?;

        let key = job_key(job.job_id);
        let data = serde_json::to_string(&job)?;
        let status = serde_json::to_string(&job.status)?;
        let created_at = job.created_at.to_rfc3339();

        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("data", data.as_str()),
                    ("status", status.as_str()),
                    ("created_at", created_at.as_str()),
                ],
            )
            .await?;
        // Set expiration (7 days)
        let _: () = conn.expire(&key, 604800).await?;
        let _: () = conn.lpush(PENDING_QUEUE_KEY, job.job_id.to_string()).await?;

        info!("Enqueued {:?} job {}", job.kind, job.job_id);
        Ok(job)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, TaskQueueError> {
        let mut conn = self.get_connection().await?;
        let data: Option<String> = conn.hget(job_key(job_id), "data").await?;

        debug!("Job {} lookup: {}", job_id, if data.is_some() { "hit" } else { "miss" });
        data.map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(TaskQueueError::from)
    }
}

/// Process-local queue for the memory backend and tests. Nothing drains it.
#[derive(Default)]
pub struct InMemoryJobQueue {
    jobs: RwLock<HashMap<Uuid, Job>>,
    pending: RwLock<VecDeque<Uuid>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids waiting for a worker, oldest first.
    pub async fn pending(&self) -> Vec<Uuid> {
        self.pending.read().await.iter().copied().collect()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, kind: JobKind, payload: Value) -> Result<Job, TaskQueueError> {
        kind.validate_payload(&payload)?;

        let job = Job::new(kind, payload);
        self.jobs.write().await.insert(job.job_id, job.clone());
        self.pending.write().await.push_back(job.job_id);

        info!("Enqueued {:?} job {} (in-memory)", job.kind, job.job_id);
        Ok(job)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, TaskQueueError> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }
}
