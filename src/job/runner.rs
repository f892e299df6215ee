//! Job-side contract: run domain logic, then record its result as an event.

use crate::core::{Entity, EntityId, State};
use crate::job::naming::{result_method_name, JobName, JobResult};
use crate::job::queue::{JobRequest, Payload, QueueError};
use crate::machine::{MachineError, StateMachine};
use crate::BoxError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, error, info};

/// Domain logic of a background job.
pub trait Job<E: Entity>: Send + Sync {
    /// Identifier the job's result events are derived from.
    fn name(&self) -> JobName;

    /// Do the work and map the outcome to a result label.
    ///
    /// Returning `Err` signals the `error` result and is re-raised to the
    /// queue runtime afterwards.
    fn perform_with_result(&self, entity: &mut E, payload: &Payload) -> Result<JobResult, BoxError>;
}

/// Errors raised by an [`EntityStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Lookup of {entity_type} {id} failed: {reason}")]
    LookupFailed {
        entity_type: &'static str,
        id: EntityId,
        reason: String,
    },

    #[error("Saving {entity_type} {id} failed: {reason}")]
    SaveFailed {
        entity_type: &'static str,
        id: EntityId,
        reason: String,
    },
}

/// Resolves entities by id and persists their new state.
pub trait EntityStore<E: Entity>: Send + Sync {
    /// `Ok(None)` means the entity no longer exists.
    fn find(&self, id: &EntityId) -> Result<Option<E>, StoreError>;

    fn save(&self, entity: E) -> Result<(), StoreError>;
}

/// In-process entity store keyed by id.
#[derive(Debug)]
pub struct MemoryStore<E> {
    entities: Mutex<HashMap<EntityId, E>>,
}

impl<E: Entity + Clone> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            entities: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, entity: E) {
        self.lock().insert(entity.id(), entity);
    }

    pub fn get(&self, id: &EntityId) -> Option<E> {
        self.lock().get(id).cloned()
    }

    pub fn remove(&self, id: &EntityId) -> Option<E> {
        self.lock().remove(id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EntityId, E>> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Entity + Clone> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity + Clone> EntityStore<E> for MemoryStore<E> {
    fn find(&self, id: &EntityId) -> Result<Option<E>, StoreError> {
        Ok(self.get(id))
    }

    fn save(&self, entity: E) -> Result<(), StoreError> {
        self.insert(entity);
        Ok(())
    }
}

/// Errors surfaced to the queue runtime by [`JobRunner::perform`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Job {job} cannot run request for job {requested}")]
    JobMismatch { job: JobName, requested: JobName },

    #[error("Job {job} expects {expected} entities, got {found}")]
    EntityTypeMismatch {
        job: JobName,
        expected: &'static str,
        found: String,
    },

    #[error("Job {job} failed for {entity}: {source}")]
    Failed {
        job: JobName,
        entity: String,
        #[source]
        source: BoxError,
    },

    #[error("Result event failed: {0}")]
    Event(#[from] MachineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// What a successful [`JobRunner::perform`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum Performed {
    /// Domain logic ran and its result event was applied.
    Completed(JobResult),

    /// The entity was gone; nothing ran.
    Skipped,
}

/// Runs one job implementation against requests delivered by the queue.
pub struct JobRunner<E: Entity, J, St> {
    job: J,
    machine: Arc<StateMachine<E>>,
    store: St,
}

impl<E, J, St> JobRunner<E, J, St>
where
    E: Entity,
    J: Job<E>,
    St: EntityStore<E>,
{
    pub fn new(job: J, machine: Arc<StateMachine<E>>, store: St) -> Self {
        Self {
            job,
            machine,
            store,
        }
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Execute the job for the requested entity and record its result.
    ///
    /// Exactly one result event is invoked per call, after domain logic
    /// finished or failed. A domain failure is signalled as `error` and then
    /// returned as [`RunError::Failed`], so the queue's own retry policy
    /// still applies.
    pub fn perform(&self, request: &JobRequest) -> Result<Performed, RunError> {
        let job = self.job.name();
        if request.job != job {
            return Err(RunError::JobMismatch {
                job,
                requested: request.job.clone(),
            });
        }
        if request.entity_type != E::TYPE_NAME {
            return Err(RunError::EntityTypeMismatch {
                job,
                expected: E::TYPE_NAME,
                found: request.entity_type.clone(),
            });
        }

        let record_name = format!("{} {}", E::TYPE_NAME, request.entity_id);
        info!(job = %job, entity = %record_name, "perform");

        let Some(mut entity) = self.store.find(&request.entity_id)? else {
            info!(job = %job, entity = %record_name, "entity not found, skipping job");
            return Ok(Performed::Skipped);
        };

        let (result, failure) = match self.job.perform_with_result(&mut entity, &request.payload) {
            Ok(result) => (result, None),
            Err(source) => {
                if !entity.is_valid() {
                    entity.restore_attributes();
                }
                (JobResult::error(), Some(source))
            }
        };

        info!(job = %job, result = %result, entity = %record_name, "result");
        let recorded = self
            .machine
            .invoke(&mut entity, &result_method_name(&job, &result))
            .map_err(RunError::from)
            .and_then(|_| {
                let state = entity.state();
                debug!(
                    job = %job,
                    entity = %record_name,
                    state = state.name(),
                    is_final = state.is_final(),
                    is_error = state.is_error(),
                    "result recorded"
                );
                self.store.save(entity).map_err(RunError::from)
            });

        match (failure, recorded) {
            (None, Ok(())) => Ok(Performed::Completed(result)),
            (None, Err(err)) => Err(err),
            (Some(source), recorded) => {
                if let Err(err) = recorded {
                    error!(
                        job = %job,
                        entity = %record_name,
                        error = %err,
                        "recording error result failed"
                    );
                }
                Err(RunError::Failed {
                    job,
                    entity: record_name,
                    source,
                })
            }
        }
    }

    /// Decode a JSON request from the transport and perform it.
    pub fn perform_json(&self, json: &str) -> Result<Performed, RunError> {
        let request = JobRequest::from_json(json)?;
        self.perform(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::State;
    use crate::machine::Transition;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Running,
        Done,
        Failed,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Running => "running",
                Self::Done => "done",
                Self::Failed => "failed",
            }
        }
    }

    #[derive(Clone, Debug)]
    struct Model {
        id: i64,
        state: TestState,
        title: String,
        saved_title: String,
    }

    impl Model {
        fn new(id: i64) -> Self {
            Self {
                id,
                state: TestState::Running,
                title: "ok".to_string(),
                saved_title: "ok".to_string(),
            }
        }
    }

    impl Entity for Model {
        type State = TestState;
        const TYPE_NAME: &'static str = "Model";

        fn id(&self) -> EntityId {
            EntityId::Int(self.id)
        }

        fn state(&self) -> &TestState {
            &self.state
        }

        fn set_state(&mut self, state: TestState) {
            self.state = state;
        }

        fn is_valid(&self) -> bool {
            !self.title.is_empty()
        }

        fn restore_attributes(&mut self) {
            self.title = self.saved_title.clone();
        }
    }

    enum Behavior {
        Succeed(&'static str),
        Fail,
        BlankTitleThenFail,
    }

    struct TestJob {
        behavior: Behavior,
        calls: AtomicUsize,
        seen: Mutex<Vec<Payload>>,
    }

    impl TestJob {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Job<Model> for TestJob {
        fn name(&self) -> JobName {
            JobName::new("TestJob")
        }

        fn perform_with_result(
            &self,
            model: &mut Model,
            payload: &Payload,
        ) -> Result<JobResult, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(payload.clone());
            match self.behavior {
                Behavior::Succeed(label) => Ok(JobResult::new(label)),
                Behavior::Fail => Err("boom".into()),
                Behavior::BlankTitleThenFail => {
                    model.title.clear();
                    Err("invalid".into())
                }
            }
        }
    }

    fn machine() -> Arc<StateMachine<Model>> {
        let mut machine = StateMachine::new();
        machine.event("test_job_ok", [Transition::from_any(TestState::Done)]);
        machine.event("test_job_error", [Transition::from_any(TestState::Failed)]);
        Arc::new(machine)
    }

    fn runner(behavior: Behavior) -> JobRunner<Model, TestJob, MemoryStore<Model>> {
        let store = MemoryStore::new();
        store.insert(Model::new(3));
        JobRunner::new(TestJob::new(behavior), machine(), store)
    }

    fn request(payload: serde_json::Value) -> JobRequest {
        JobRequest {
            job: JobName::new("TestJob"),
            queue: "default".to_string(),
            entity_type: "Model".to_string(),
            entity_id: EntityId::Int(3),
            payload: payload.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn passes_payload_to_domain_logic() {
        let runner = runner(Behavior::Succeed("ok"));

        runner.perform(&request(json!({"n": 1}))).unwrap();

        let seen = runner.job.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["n"], json!(1));
    }

    #[test]
    fn invokes_result_event_and_saves_entity() {
        let runner = runner(Behavior::Succeed("ok"));

        let performed = runner.perform(&request(json!({}))).unwrap();

        assert_eq!(performed, Performed::Completed(JobResult::ok()));
        let saved = runner.store().get(&EntityId::Int(3)).unwrap();
        assert_eq!(saved.state, TestState::Done);
    }

    #[test]
    fn failure_signals_error_event_then_propagates() {
        let runner = runner(Behavior::Fail);

        let result = runner.perform(&request(json!({})));

        match result {
            Err(RunError::Failed { job, entity, source }) => {
                assert_eq!(job, JobName::new("TestJob"));
                assert_eq!(entity, "Model 3");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("Expected Failed, got {other:?}"),
        }
        let saved = runner.store().get(&EntityId::Int(3)).unwrap();
        assert_eq!(saved.state, TestState::Failed);
    }

    #[test]
    fn failure_restores_invalid_attributes() {
        let runner = runner(Behavior::BlankTitleThenFail);

        assert!(runner.perform(&request(json!({}))).is_err());

        let saved = runner.store().get(&EntityId::Int(3)).unwrap();
        assert_eq!(saved.title, "ok");
        assert_eq!(saved.state, TestState::Failed);
    }

    #[test]
    fn missing_entity_is_skipped_without_running() {
        let runner = runner(Behavior::Succeed("ok"));
        runner.store().remove(&EntityId::Int(3));

        let performed = runner.perform(&request(json!({}))).unwrap();

        assert_eq!(performed, Performed::Skipped);
        assert_eq!(runner.job.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn undeclared_result_fails_like_domain_error() {
        let runner = runner(Behavior::Succeed("partial"));

        let result = runner.perform(&request(json!({})));

        assert!(matches!(
            result,
            Err(RunError::Event(MachineError::UnknownEvent { ref event })) if event == "test_job_partial"
        ));
        let saved = runner.store().get(&EntityId::Int(3)).unwrap();
        assert_eq!(saved.state, TestState::Running);
    }

    #[test]
    fn domain_failure_wins_over_event_failure() {
        let store = MemoryStore::new();
        store.insert(Model::new(3));
        let mut machine = StateMachine::new();
        machine.event("test_job_ok", [Transition::from_any(TestState::Done)]);
        let runner = JobRunner::new(TestJob::new(Behavior::Fail), Arc::new(machine), store);

        let result = runner.perform(&request(json!({})));

        assert!(matches!(result, Err(RunError::Failed { .. })));
    }

    #[test]
    fn rejects_requests_for_other_jobs_or_types() {
        let runner = runner(Behavior::Succeed("ok"));

        let mut other_job = request(json!({}));
        other_job.job = JobName::new("OtherJob");
        assert!(matches!(
            runner.perform(&other_job),
            Err(RunError::JobMismatch { .. })
        ));

        let mut other_type = request(json!({}));
        other_type.entity_type = "Invoice".to_string();
        assert!(matches!(
            runner.perform(&other_type),
            Err(RunError::EntityTypeMismatch { .. })
        ));
        assert_eq!(runner.job.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn performs_json_requests() {
        let runner = runner(Behavior::Succeed("ok"));
        let json = request(json!({"n": 2})).to_json().unwrap();

        let performed = runner.perform_json(&json).unwrap();

        assert_eq!(performed, Performed::Completed(JobResult::ok()));
        assert!(matches!(
            runner.perform_json("not json"),
            Err(RunError::Queue(QueueError::Serialization(_)))
        ));
    }
}
