use thiserror::Error;

use crate::pool::WorkerId;

/// Errors surfaced by [`LlmPool`](crate::LlmPool) operations.
///
/// Lookup failures propagate immediately; the pool never translates an
/// unknown worker id into a sentinel value. Failures *inside* a worker are
/// isolated to that worker's execution unit and never appear here: they
/// show up as a timed-out generation, or as an abnormal exit observed when
/// the worker is stopped.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The id has never been registered with `prepare`.
    #[error("unknown worker `{0}`")]
    UnknownWorker(WorkerId),
    /// The operation requires a started worker.
    #[error("worker `{0}` is not running")]
    NotRunning(WorkerId),
    /// Spawning the worker's execution unit failed.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// The admission policy refused to start the worker.
    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

/// Errors constructing a model instance or its execution unit.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The configuration names a backend this build was compiled without.
    #[error("backend `{0}` support is not compiled in")]
    BackendDisabled(&'static str),
    /// The configuration cannot be used to construct the requested backend.
    #[error("invalid instance configuration: {0}")]
    InvalidConfig(String),
    /// Backend-specific construction failure.
    #[error("model construction failed: {0}")]
    Construction(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors produced by a model's generate capability.
///
/// These never cross a pool boundary: the worker body treats any of them
/// as fatal to its execution unit.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Lookup backend: the prompt has no scripted response.
    #[error("no scripted response for prompt `{0}`")]
    MissingResponse(String),
    /// The backend failed to produce a response.
    #[error("backend request failed: {0}")]
    Backend(String),
}

/// Refusal returned by an [`AdmissionPolicy`](crate::pool::AdmissionPolicy).
#[derive(Debug, Error)]
#[error("admission rejected: {reason}")]
pub struct AdmissionError {
    /// Human-readable reason for the refusal.
    pub reason: String,
}

impl AdmissionError {
    /// Creates a refusal with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
