use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::InstanceConfig;
use crate::error::SpawnError;

use super::WorkerId;

/// How one worker run ended, as observed at stop time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The unit exited within the join window.
    Clean,
    /// The subprocess exited with a non-zero status (or none at all).
    Abnormal(Option<i32>),
    /// The subprocess outlived the join window and was forcibly terminated.
    Killed,
    /// The thread outlived the join window and was left to finish on its
    /// own; its channels are already gone, so it can no longer be reached.
    Detached,
}

/// One live execution unit: a running worker body plus the channel pair
/// and stop signal belonging to this run.
///
/// Both execution strategies satisfy this contract, which is all the pool
/// ever sees of a worker. A unit is single-run: stopping consumes it, and
/// restarting a worker builds a fresh one with fresh channels.
#[async_trait]
pub trait WorkerUnit: Send {
    /// Queues a prompt on the worker's input channel.
    ///
    /// Never fails: if the channel is already closed (the worker body
    /// died), the prompt is dropped with a warning and the caller's
    /// generation request simply never completes, the same symptom a
    /// hung model produces.
    fn submit(&mut self, prompt: &str);

    /// Awaits the next response on the worker's output channel.
    ///
    /// `None` means the channel closed without one.
    async fn next_response(&mut self) -> Option<Value>;

    /// Sets the stop signal and joins the unit, waiting at most
    /// `join_timeout`.
    async fn stop(self: Box<Self>, join_timeout: Duration) -> StopOutcome;
}

/// Strategy for bringing worker bodies to life.
///
/// Chosen once at pool construction; every worker the pool starts goes
/// through the same spawner.
#[async_trait]
pub trait WorkerSpawner: Send + Sync {
    /// Spawns an execution unit for `config`.
    ///
    /// Must return promptly: model construction happens inside the spawned
    /// unit, not here, so a slow-loading model never blocks the pool.
    async fn spawn(
        &self,
        id: &WorkerId,
        config: &InstanceConfig,
    ) -> Result<Box<dyn WorkerUnit>, SpawnError>;
}
