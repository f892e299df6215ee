//! Job bindings: which state entry enqueues a job, and what each of its
//! results does to the entity.

use crate::builder::config::BindingConfig;
use crate::builder::error::{BindError, OptionConflict};
use crate::builder::options::{ResultOptions, ResultRule, RetryIfState};
use crate::core::{Entity, State};
use crate::job::{
    result_event_name, result_method_name, JobName, JobQueue, JobRequest, JobResult, Payload,
    QueueError,
};
use crate::machine::{StateMachine, Transition};
use std::sync::Arc;
use std::time::Duration;
use stillwater::validation::Validation;
use tracing::debug;

/// Builds the payload snapshot sent with each job. Must be pure: it runs
/// at enqueue time and again for every delayed retry.
pub type PayloadFn<E> = Arc<dyn Fn(&E) -> Payload + Send + Sync>;

/// Immutable link between a job and one entity type's state machine.
pub struct JobBinding<E: Entity> {
    job: JobName,
    config: BindingConfig,
    queue: Arc<dyn JobQueue>,
    enter_states: Vec<E::State>,
    payload: PayloadFn<E>,
    rules: Vec<ResultRule<E>>,
}

impl<E: Entity> JobBinding<E> {
    pub fn job(&self) -> &JobName {
        &self.job
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// The remembered on_enter state (the last one declared).
    pub fn on_enter(&self) -> Option<&E::State> {
        self.enter_states.last()
    }

    pub fn rules(&self) -> &[ResultRule<E>] {
        &self.rules
    }

    /// Distinct result event names, in declaration order.
    pub fn result_events(&self) -> Vec<String> {
        let mut events: Vec<String> = Vec::new();
        for rule in &self.rules {
            let event = result_event_name(&self.job, rule.result());
            if !events.contains(&event) {
                events.push(event);
            }
        }
        events
    }

    /// Job arguments for `entity`, with a freshly computed payload.
    pub fn request_for(&self, entity: &E) -> JobRequest {
        JobRequest {
            job: self.job.clone(),
            queue: self.config.queue.clone(),
            entity_type: E::TYPE_NAME.to_string(),
            entity_id: entity.id(),
            payload: (self.payload)(entity),
        }
    }

    /// Hand the job for `entity` to the queue.
    pub fn enqueue(&self, entity: &E) -> Result<(), QueueError> {
        let request = self.request_for(entity);
        debug!(
            job = %self.job,
            queue = %request.queue,
            entity_id = %request.entity_id,
            "enqueue"
        );
        self.queue.enqueue(request)
    }

    /// Hand the job for `entity` to the queue, to run after `delay`.
    pub fn enqueue_after(&self, delay: Duration, entity: &E) -> Result<(), QueueError> {
        let request = self.request_for(entity);
        debug!(
            job = %self.job,
            queue = %request.queue,
            entity_id = %request.entity_id,
            delay_secs = delay.as_secs_f64(),
            "enqueue after delay"
        );
        self.queue.enqueue_after(delay, request)
    }

    /// Install the binding's callbacks, events and helpers on `machine`.
    ///
    /// Every on_enter state gets a callback that enqueues the job. Each
    /// transition rule adds to its result event, with the retry transition
    /// ahead of the general one. Each retry-after rule becomes a helper
    /// under the result's bang name.
    pub fn register(self: &Arc<Self>, machine: &mut StateMachine<E>) {
        for state in &self.enter_states {
            let binding = Arc::clone(self);
            machine.after_transition_to(state.clone(), move |entity: &E| {
                Ok(binding.enqueue(entity)?)
            });
        }

        for rule in &self.rules {
            match rule {
                ResultRule::Transition {
                    result,
                    state,
                    guard,
                    retry_if_state,
                } => {
                    let event = result_event_name(&self.job, result);
                    let mut transitions = Vec::with_capacity(2);
                    if let Some(retry) = retry_if_state {
                        transitions.push(Transition::new(retry.from.clone(), retry.back_to.clone()));
                    }
                    transitions.push(Transition::from_any(state.clone()).guarded(guard.clone()));
                    debug!(event = %event, to = state.name(), "result transition registered");
                    machine.event(event, transitions);
                }
                ResultRule::RetryAfter { result, delay } => {
                    let binding = Arc::clone(self);
                    let delay = *delay;
                    let method = result_method_name(&self.job, result);
                    debug!(method = %method, delay_secs = delay.as_secs_f64(), "retry helper registered");
                    machine.helper(method, move |entity: &mut E| {
                        Ok(binding.enqueue_after(delay, entity)?)
                    });
                }
            }
        }
    }
}

/// Declares a [`JobBinding`] step by step.
///
/// ```rust
/// use statejob::builder::{JobBindingBuilder, ResultOptions};
/// use statejob::core::{Entity, EntityId, State};
/// use statejob::job::{MemoryQueue, Payload};
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Phase { Idle, Running, Done }
///
/// impl State for Phase {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "idle",
///             Self::Running => "running",
///             Self::Done => "done",
///         }
///     }
/// }
///
/// struct Import { id: i64, state: Phase }
///
/// impl Entity for Import {
///     type State = Phase;
///     const TYPE_NAME: &'static str = "Import";
///     fn id(&self) -> EntityId { EntityId::Int(self.id) }
///     fn state(&self) -> &Phase { &self.state }
///     fn set_state(&mut self, state: Phase) { self.state = state; }
/// }
///
/// let binding = JobBindingBuilder::<Import>::new("ImportJob", Arc::new(MemoryQueue::new()))
///     .on_enter(Phase::Running)?
///     .payload(|_| Payload::new())
///     .result_to("ok", Phase::Done)?
///     .result("busy", ResultOptions::new().retry_after(Duration::from_secs(30)))?
///     .build();
///
/// assert_eq!(binding.result_events(), vec!["import_job_ok", "import_job_busy"]);
/// # Ok::<(), statejob::builder::BindError>(())
/// ```
pub struct JobBindingBuilder<E: Entity> {
    job: JobName,
    config: BindingConfig,
    queue: Arc<dyn JobQueue>,
    enter_states: Vec<E::State>,
    payload: PayloadFn<E>,
    rules: Vec<ResultRule<E>>,
    retry_declared: bool,
}

impl<E: Entity> JobBindingBuilder<E> {
    /// Start a binding with an empty payload and no rules.
    pub fn new(job: impl Into<JobName>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            job: job.into(),
            config: BindingConfig::default(),
            queue,
            enter_states: Vec::new(),
            payload: Arc::new(|_: &E| Payload::new()),
            rules: Vec::new(),
            retry_declared: false,
        }
    }

    pub fn config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    /// Route this job's requests to a named queue.
    pub fn queue_name(mut self, queue: impl Into<String>) -> Self {
        self.config.queue = queue.into();
        self
    }

    /// Enqueue the job whenever the entity enters `state`.
    ///
    /// Must appear above any result using `retry_if_state`; those rules
    /// return to the state remembered here.
    pub fn on_enter(mut self, state: E::State) -> Result<Self, BindError> {
        if self.retry_declared {
            return Err(BindError::OnEnterAfterRetry {
                job: self.job,
                state: state.name().to_string(),
            });
        }
        self.enter_states.push(state);
        Ok(self)
    }

    /// Replace the empty default payload.
    pub fn payload<F>(mut self, payload: F) -> Self
    where
        F: Fn(&E) -> Payload + Send + Sync + 'static,
    {
        self.payload = Arc::new(payload);
        self
    }

    /// Declare what `result` does.
    pub fn result(
        mut self,
        result: impl Into<JobResult>,
        options: ResultOptions<E>,
    ) -> Result<Self, BindError> {
        let result = result.into();

        if let Validation::Failure(conflicts) = options.validate() {
            return Err(BindError::ConflictingOptions {
                job: self.job,
                result,
                conflicts: conflicts.iter().cloned().collect(),
            });
        }

        let retry_if_state = match options.retry_if_state {
            Some(from) => match self.enter_states.last() {
                Some(back_to) => Some(RetryIfState {
                    from,
                    back_to: back_to.clone(),
                }),
                None => {
                    return Err(BindError::RetryBeforeOnEnter {
                        job: self.job,
                        result,
                    })
                }
            },
            None => None,
        };

        let rule = match (options.state, options.retry_after) {
            (Some(state), _) => ResultRule::Transition {
                result,
                state,
                guard: options.guard,
                retry_if_state,
            },
            (None, Some(delay)) => ResultRule::RetryAfter { result, delay },
            (None, None) => {
                return Err(BindError::ConflictingOptions {
                    job: self.job,
                    result,
                    conflicts: vec![OptionConflict::MissingTarget],
                })
            }
        };

        // A retry-after helper shadows the result's event, so it cannot
        // share its label with any other rule.
        let shares_label = self.rules.iter().any(|existing| {
            existing.result() == rule.result()
                && (matches!(existing, ResultRule::RetryAfter { .. })
                    || matches!(rule, ResultRule::RetryAfter { .. }))
        });
        if shares_label {
            return Err(BindError::RetryAfterNotExclusive {
                job: self.job,
                result: rule.result().clone(),
            });
        }

        if matches!(
            rule,
            ResultRule::Transition {
                retry_if_state: Some(_),
                ..
            }
        ) {
            self.retry_declared = true;
        }
        self.rules.push(rule);
        Ok(self)
    }

    /// Shorthand for `result(result, ResultOptions::new().state(state))`.
    pub fn result_to(self, result: impl Into<JobResult>, state: E::State) -> Result<Self, BindError> {
        self.result(result, ResultOptions::new().state(state))
    }

    /// Mapping form `{result => state}`. Exactly one entry is accepted;
    /// anything else is ambiguous.
    pub fn result_map<R, I>(self, mapping: I) -> Result<Self, BindError>
    where
        R: Into<JobResult>,
        I: IntoIterator<Item = (R, E::State)>,
    {
        let mut entries: Vec<(R, E::State)> = mapping.into_iter().collect();
        if entries.len() != 1 {
            return Err(BindError::InvalidResultMapping {
                job: self.job,
                entries: entries.len(),
            });
        }

        let (result, state) = entries.remove(0);
        self.result_to(result, state)
    }

    pub fn build(self) -> JobBinding<E> {
        JobBinding {
            job: self.job,
            config: self.config,
            queue: self.queue,
            enter_states: self.enter_states,
            payload: self.payload,
            rules: self.rules,
        }
    }
}

/// Declare a job binding and install it on `machine`.
///
/// `define` receives a fresh builder and returns it with the binding's
/// on_enter state, payload and results declared. Configuration errors
/// surface here, before any job runs.
pub fn bind<E, F>(
    machine: &mut StateMachine<E>,
    job: impl Into<JobName>,
    queue: Arc<dyn JobQueue>,
    define: F,
) -> Result<Arc<JobBinding<E>>, BindError>
where
    E: Entity,
    F: FnOnce(JobBindingBuilder<E>) -> Result<JobBindingBuilder<E>, BindError>,
{
    let binding = Arc::new(define(JobBindingBuilder::new(job, queue))?.build());
    binding.register(machine);
    Ok(binding)
}
