//! # Instance Pool
//!
//! The pool owns a roster of worker records and drives their lifecycle:
//!
//! ```text
//! UNREGISTERED --prepare--> STOPPED --start--> RUNNING --stop--> STOPPED
//! ```
//!
//! `reset` with a changed configuration drives a running worker back to
//! `STOPPED` before the new configuration is applied; the caller starts it
//! again when ready. Records are never deregistered.
//!
//! The pool itself is not concurrent: every method takes `&mut self` and
//! runs on the calling task. Workers, once started, are independent units
//! of execution reached only through their own channel pair, so any number
//! of them run in parallel underneath a single controlling task.

mod process;
mod thread;
mod unit;

pub use process::SubprocessSpawner;
pub use thread::ThreadSpawner;
pub use unit::{StopOutcome, WorkerSpawner, WorkerUnit};

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::ModelFactory;
use crate::config::InstanceConfig;
use crate::error::{AdmissionError, PoolError};

const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Opaque, immutable identifier of one worker record.
///
/// Callers may bring their own ids to `prepare`; otherwise a fresh UUID is
/// generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(String);

impl WorkerId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for WorkerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Outcome of one generation request.
///
/// A timed-out request is a normal, non-fatal result, distinct from any
/// response a model could produce, including a literal JSON `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// The worker answered within the window.
    Completed(Value),
    /// No response arrived within the configured window. Covers both a
    /// slow generation and a worker that already died; the two are not
    /// distinguishable at this call site.
    TimedOut,
}

impl Generation {
    /// The response, if one arrived.
    pub fn into_response(self) -> Option<Value> {
        match self {
            Generation::Completed(value) => Some(value),
            Generation::TimedOut => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, Generation::TimedOut)
    }
}

/// Tuning knobs for a pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// How long `generate` waits for a response before reporting
    /// [`Generation::TimedOut`]. `None` waits indefinitely: acceptable in
    /// tests, risky in production, where a dead worker then blocks the
    /// caller forever.
    pub generation_timeout: Option<Duration>,
    /// How long `stop` waits for an execution unit to exit before giving
    /// up on it (detaching a thread, killing a subprocess).
    pub join_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            generation_timeout: None,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }
}

impl PoolOptions {
    /// Sets the generation window, consuming and returning the options.
    pub fn with_generation_timeout(mut self, window: Duration) -> Self {
        self.generation_timeout = Some(window);
        self
    }
}

/// Decides whether a worker may be spawned for a configuration.
///
/// Checked by [`LlmPool::start`] before any execution unit exists. The
/// natural home for hardware admission control (free memory, device
/// availability, a cap on simultaneously loaded models). The default pool
/// carries no policy and admits everything.
pub trait AdmissionPolicy: Send + Sync {
    fn admit(&self, config: &InstanceConfig) -> Result<(), AdmissionError>;
}

struct WorkerRecord {
    config: InstanceConfig,
    running: bool,
    unit: Option<Box<dyn WorkerUnit>>,
}

/// A pool of language model workers.
///
/// Owns zero or more worker records, each wrapping one (potential) model
/// instance, and shields callers from whether workers run on threads or in
/// subprocesses; the execution strategy is fixed at construction via a
/// [`WorkerSpawner`].
///
/// All methods take `&mut self`: the pool expects a single controlling
/// task. Worker-internal failures never propagate out of these methods;
/// they surface as a timed-out `generate`, or as an abnormal exit logged
/// when the worker is stopped.
pub struct LlmPool {
    spawner: Box<dyn WorkerSpawner>,
    options: PoolOptions,
    admission: Option<Box<dyn AdmissionPolicy>>,
    workers: HashMap<WorkerId, WorkerRecord>,
}

impl LlmPool {
    /// Creates a pool with an explicit execution strategy.
    pub fn new(spawner: impl WorkerSpawner + 'static, options: PoolOptions) -> Self {
        Self {
            spawner: Box::new(spawner),
            options,
            admission: None,
            workers: HashMap::new(),
        }
    }

    /// Creates a thread-backed pool using the built-in model factory.
    pub fn threaded(options: PoolOptions) -> Self {
        Self::new(ThreadSpawner::new(), options)
    }

    /// Creates a thread-backed pool with a caller-supplied model factory.
    pub fn threaded_with_factory(factory: Arc<ModelFactory>, options: PoolOptions) -> Self {
        Self::new(ThreadSpawner::with_factory(factory), options)
    }

    /// Creates a subprocess-backed pool running `program` as the worker
    /// binary.
    pub fn subprocess(program: impl Into<PathBuf>, options: PoolOptions) -> Self {
        Self::new(SubprocessSpawner::new(program), options)
    }

    /// Installs an admission policy, consuming and returning the pool.
    pub fn with_admission_policy(mut self, policy: impl AdmissionPolicy + 'static) -> Self {
        self.admission = Some(Box::new(policy));
        self
    }

    /// Registers a worker for `config` and returns its id.
    ///
    /// With no `id`, a fresh one is generated. If `id` is already
    /// registered, this is exactly a [`reset`](Self::reset) to `config`:
    /// preparing the same id twice with two configurations converges to
    /// the same state as preparing once and resetting. Other workers are
    /// never affected.
    pub async fn prepare(
        &mut self,
        config: InstanceConfig,
        id: Option<WorkerId>,
    ) -> Result<WorkerId, PoolError> {
        let id = id.unwrap_or_else(WorkerId::generate);
        if self.workers.contains_key(&id) {
            self.reset(&id, config).await?;
            return Ok(id);
        }
        self.workers.insert(
            id.clone(),
            WorkerRecord {
                config,
                running: false,
                unit: None,
            },
        );
        debug!(worker = %id, "worker registered");
        Ok(id)
    }

    /// Replaces a worker's configuration.
    ///
    /// A configuration deeply equal to the stored one is a no-op: a
    /// running worker keeps running. A changed configuration first stops
    /// the worker if it is running, then swaps the stored configuration;
    /// the worker is guaranteed not-running afterwards and must be
    /// started again.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownWorker`] if `id` was never prepared.
    pub async fn reset(&mut self, id: &WorkerId, config: InstanceConfig) -> Result<(), PoolError> {
        let (running, unchanged) = match self.workers.get(id) {
            Some(record) => (record.running, record.config == config),
            None => return Err(PoolError::UnknownWorker(id.clone())),
        };
        if unchanged {
            return Ok(());
        }
        if running {
            self.stop(id).await?;
        }
        if let Some(record) = self.workers.get_mut(id) {
            record.config = config;
            debug!(worker = %id, "configuration replaced");
        }
        Ok(())
    }

    /// Starts a worker: fresh stop signal, fresh channels, fresh execution
    /// unit. No-op if already running.
    ///
    /// Returns as soon as the unit is spawned. Model construction happens
    /// inside the unit and may take arbitrarily long; until the model is
    /// up, submitted prompts queue on the input channel.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownWorker`] for an unprepared id,
    /// [`PoolError::Admission`] if the admission policy refuses, and
    /// [`PoolError::Spawn`] if the execution unit cannot be created.
    pub async fn start(&mut self, id: &WorkerId) -> Result<(), PoolError> {
        let config = match self.workers.get(id) {
            Some(record) if record.running => return Ok(()),
            Some(record) => record.config.clone(),
            None => return Err(PoolError::UnknownWorker(id.clone())),
        };
        if let Some(policy) = &self.admission {
            policy.admit(&config)?;
        }
        let unit = self.spawner.spawn(id, &config).await?;
        if let Some(record) = self.workers.get_mut(id) {
            record.unit = Some(unit);
            record.running = true;
        }
        debug!(worker = %id, "worker started");
        Ok(())
    }

    /// Stops a worker. No-op if not running.
    ///
    /// Sets the stop signal and joins the execution unit for at most the
    /// configured join timeout; a subprocess that did not exit cleanly by
    /// then is killed. The worker is reported not-running afterwards no
    /// matter how termination went; the outcome is logged, not returned.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownWorker`] if `id` was never prepared.
    pub async fn stop(&mut self, id: &WorkerId) -> Result<(), PoolError> {
        let join_timeout = self.options.join_timeout;
        let record = self
            .workers
            .get_mut(id)
            .ok_or_else(|| PoolError::UnknownWorker(id.clone()))?;
        if !record.running {
            return Ok(());
        }
        record.running = false;
        if let Some(unit) = record.unit.take() {
            let outcome = unit.stop(join_timeout).await;
            log_stop_outcome(id, outcome);
        }
        Ok(())
    }

    /// Stops every running worker, concurrently. Safe on an empty pool.
    pub async fn stop_all(&mut self) {
        let join_timeout = self.options.join_timeout;
        let mut stopping = Vec::new();
        for (id, record) in self.workers.iter_mut() {
            if !record.running {
                continue;
            }
            record.running = false;
            if let Some(unit) = record.unit.take() {
                let id = id.clone();
                stopping.push(async move { (id, unit.stop(join_timeout).await) });
            }
        }
        for (id, outcome) in future::join_all(stopping).await {
            log_stop_outcome(&id, outcome);
        }
    }

    /// Whether the worker's execution unit is alive and accepting prompts.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownWorker`] for an unprepared id. An unknown
    /// worker is not "not running", it is a caller bug.
    pub fn is_running(&self, id: &WorkerId) -> Result<bool, PoolError> {
        self.workers
            .get(id)
            .map(|record| record.running)
            .ok_or_else(|| PoolError::UnknownWorker(id.clone()))
    }

    /// Sends `prompt` to a running worker and awaits its response.
    ///
    /// Blocks the calling task until the worker answers or the configured
    /// generation window elapses, whichever comes first. Each worker
    /// serves prompts strictly in arrival order, so sequential calls on
    /// one worker receive responses in submission order. The pool is
    /// single-flight per worker: overlapping `generate` calls against the
    /// same worker are unsupported.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownWorker`] for an unprepared id,
    /// [`PoolError::NotRunning`] if the worker was not started. A slow or
    /// dead worker is *not* an error: it yields [`Generation::TimedOut`].
    pub async fn generate(
        &mut self,
        id: &WorkerId,
        prompt: &str,
    ) -> Result<Generation, PoolError> {
        let generation_timeout = self.options.generation_timeout;
        let record = self
            .workers
            .get_mut(id)
            .ok_or_else(|| PoolError::UnknownWorker(id.clone()))?;
        let Some(unit) = record.unit.as_mut() else {
            return Err(PoolError::NotRunning(id.clone()));
        };

        unit.submit(prompt);
        let response = match generation_timeout {
            Some(window) => match tokio::time::timeout(window, unit.next_response()).await {
                Ok(response) => response,
                Err(_) => return Ok(Generation::TimedOut),
            },
            None => unit.next_response().await,
        };
        match response {
            Some(value) => Ok(Generation::Completed(value)),
            None => {
                warn!(worker = %id, "output channel closed before a response arrived");
                Ok(Generation::TimedOut)
            }
        }
    }

    /// The stored configuration of a worker.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownWorker`] for an unprepared id.
    pub fn configuration(&self, id: &WorkerId) -> Result<&InstanceConfig, PoolError> {
        self.workers
            .get(id)
            .map(|record| &record.config)
            .ok_or_else(|| PoolError::UnknownWorker(id.clone()))
    }

    /// Ids of every registered worker, in no particular order.
    pub fn worker_ids(&self) -> impl Iterator<Item = &WorkerId> {
        self.workers.keys()
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

fn log_stop_outcome(id: &WorkerId, outcome: StopOutcome) {
    match outcome {
        StopOutcome::Clean => debug!(worker = %id, "worker stopped"),
        StopOutcome::Abnormal(code) => {
            warn!(worker = %id, exit_code = ?code, "worker exited abnormally")
        }
        StopOutcome::Killed => warn!(worker = %id, "worker killed after join timeout"),
        StopOutcome::Detached => {
            warn!(worker = %id, "worker thread still busy after join timeout, detached")
        }
    }
}
