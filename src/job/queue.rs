//! Queue transport contract and an in-process implementation.
//!
//! Everything crossing the queue boundary is a serializable primitive: the
//! job name, the entity type name, the entity id and a JSON payload.

use crate::core::EntityId;
use crate::job::naming::JobName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Snapshot of entity data handed to a job.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Arguments of one job execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub job: JobName,
    pub queue: String,
    pub entity_type: String,
    pub entity_id: EntityId,
    #[serde(default)]
    pub payload: Payload,
}

impl JobRequest {
    /// Encode for a transport that stores jobs as text.
    pub fn to_json(&self) -> Result<String, QueueError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a request previously produced by [`JobRequest::to_json`].
    pub fn from_json(json: &str) -> Result<Self, QueueError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Errors reported by a queue transport.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue '{queue}' rejected job {job}: {reason}")]
    Rejected {
        queue: String,
        job: JobName,
        reason: String,
    },

    #[error("Delay {0:?} is out of range")]
    InvalidDelay(Duration),

    #[error("Job request serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fire-and-forget job transport.
///
/// Delivery, persistence and timers are the transport's business; callers
/// only hand jobs over.
pub trait JobQueue: Send + Sync {
    /// Schedule a job to run as soon as a worker is free.
    fn enqueue(&self, request: JobRequest) -> Result<(), QueueError>;

    /// Schedule a job to run once `delay` has passed.
    fn enqueue_after(&self, delay: Duration, request: JobRequest) -> Result<(), QueueError>;
}

/// A job held by [`MemoryQueue`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: Uuid,
    pub request: JobRequest,
    pub enqueued_at: DateTime<Utc>,
    pub run_at: DateTime<Utc>,
    pub delay: Option<Duration>,
}

/// In-process queue that records scheduled jobs in order.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    jobs: Mutex<Vec<ScheduledJob>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every scheduled job, oldest first.
    pub fn jobs(&self) -> Vec<ScheduledJob> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return the jobs due at `now`, keeping scheduling order.
    pub fn take_due(&self, now: DateTime<Utc>) -> Vec<ScheduledJob> {
        let mut jobs = self.lock();
        let (due, pending): (Vec<_>, Vec<_>) = jobs.drain(..).partition(|job| job.run_at <= now);
        *jobs = pending;
        due
    }

    fn schedule(&self, request: JobRequest, delay: Option<Duration>) -> Result<(), QueueError> {
        let enqueued_at = Utc::now();
        let offset = match delay {
            Some(delay) => {
                chrono::Duration::from_std(delay).map_err(|_| QueueError::InvalidDelay(delay))?
            }
            None => chrono::Duration::zero(),
        };
        let run_at = enqueued_at
            .checked_add_signed(offset)
            .ok_or(QueueError::InvalidDelay(delay.unwrap_or_default()))?;

        self.lock().push(ScheduledJob {
            id: Uuid::new_v4(),
            request,
            enqueued_at,
            run_at,
            delay,
        });
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScheduledJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobQueue for MemoryQueue {
    fn enqueue(&self, request: JobRequest) -> Result<(), QueueError> {
        self.schedule(request, None)
    }

    fn enqueue_after(&self, delay: Duration, request: JobRequest) -> Result<(), QueueError> {
        self.schedule(request, Some(delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(id: i64) -> JobRequest {
        let mut payload = Payload::new();
        payload.insert("n".to_string(), json!(1));
        JobRequest {
            job: JobName::new("TestJob"),
            queue: "default".to_string(),
            entity_type: "Model".to_string(),
            entity_id: EntityId::Int(id),
            payload,
        }
    }

    #[test]
    fn enqueue_records_job_due_now() {
        let queue = MemoryQueue::new();

        queue.enqueue(request(43)).unwrap();

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].request, request(43));
        assert_eq!(jobs[0].delay, None);
        assert_eq!(jobs[0].run_at, jobs[0].enqueued_at);
    }

    #[test]
    fn enqueue_after_offsets_run_time() {
        let queue = MemoryQueue::new();

        queue
            .enqueue_after(Duration::from_secs(60), request(43))
            .unwrap();

        let job = &queue.jobs()[0];
        assert_eq!(job.delay, Some(Duration::from_secs(60)));
        assert_eq!(job.run_at - job.enqueued_at, chrono::Duration::seconds(60));
    }

    #[test]
    fn take_due_leaves_delayed_jobs() {
        let queue = MemoryQueue::new();
        queue.enqueue(request(1)).unwrap();
        queue
            .enqueue_after(Duration::from_secs(3600), request(2))
            .unwrap();
        queue.enqueue(request(3)).unwrap();

        let due = queue.take_due(Utc::now());

        let ids: Vec<_> = due.iter().map(|j| j.request.entity_id.clone()).collect();
        assert_eq!(ids, vec![EntityId::Int(1), EntityId::Int(3)]);
        assert_eq!(queue.len(), 1);

        let later = queue.take_due(Utc::now() + chrono::Duration::hours(2));
        assert_eq!(later.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn out_of_range_delay_is_rejected() {
        let queue = MemoryQueue::new();

        let result = queue.enqueue_after(Duration::MAX, request(1));

        assert!(matches!(result, Err(QueueError::InvalidDelay(_))));
        assert!(queue.is_empty());
    }

    #[test]
    fn request_crosses_boundary_as_json() {
        let json = request(43).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["job"], "TestJob");
        assert_eq!(value["entity_type"], "Model");
        assert_eq!(value["entity_id"], 43);
        assert_eq!(value["payload"], json!({"n": 1}));
        assert_eq!(JobRequest::from_json(&json).unwrap(), request(43));
    }

    #[test]
    fn missing_payload_defaults_to_empty() {
        let parsed = JobRequest::from_json(
            r#"{"job":"TestJob","queue":"default","entity_type":"Model","entity_id":"a1"}"#,
        )
        .unwrap();

        assert!(parsed.payload.is_empty());
        assert_eq!(parsed.entity_id, EntityId::from("a1"));
    }
}
