use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

use crate::backend::{self, ModelFactory};
use crate::communication::KillSwitch;
use crate::error::SpawnError;
use crate::worker::run_threaded_worker;
use crate::InstanceConfig;

use super::unit::{StopOutcome, WorkerSpawner, WorkerUnit};
use super::WorkerId;

/// How often a stopping pool re-checks whether a worker thread has exited.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Spawns worker bodies on dedicated OS threads.
///
/// The lightweight strategy: no process isolation, shared address space,
/// suitable for I/O-bound backends such as server-client models. A worker
/// body failure takes down only its own thread, but leaves no exit status
/// behind, so the pool cannot tell an abnormal thread death from a clean
/// one.
///
/// The model factory is injectable, which is the seam tests use to swap in
/// scripted models.
pub struct ThreadSpawner {
    factory: Arc<ModelFactory>,
}

impl ThreadSpawner {
    /// Uses the built-in tag-dispatched factory.
    pub fn new() -> Self {
        Self::with_factory(Arc::new(backend::spawn_language_model))
    }

    /// Uses a caller-supplied factory.
    pub fn with_factory(factory: Arc<ModelFactory>) -> Self {
        Self { factory }
    }
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerSpawner for ThreadSpawner {
    async fn spawn(
        &self,
        id: &WorkerId,
        config: &InstanceConfig,
    ) -> Result<Box<dyn WorkerUnit>, SpawnError> {
        let switch = KillSwitch::new();
        let (input_tx, input_rx) = std::sync::mpsc::channel();
        let (output_tx, output_rx) = tokio::sync::mpsc::unbounded_channel();

        let body_switch = switch.clone();
        let body_config = config.clone();
        let factory = Arc::clone(&self.factory);
        let handle = std::thread::Builder::new()
            .name(format!("konro-worker-{id}"))
            .spawn(move || {
                run_threaded_worker(body_switch, body_config, factory, input_rx, output_tx)
            })?;

        Ok(Box::new(ThreadWorker {
            switch,
            input: input_tx,
            output: output_rx,
            handle,
        }))
    }
}

struct ThreadWorker {
    switch: KillSwitch,
    input: Sender<String>,
    output: UnboundedReceiver<Value>,
    handle: JoinHandle<()>,
}

#[async_trait]
impl WorkerUnit for ThreadWorker {
    fn submit(&mut self, prompt: &str) {
        if self.input.send(prompt.to_string()).is_err() {
            warn!("worker input channel closed, prompt dropped");
        }
    }

    async fn next_response(&mut self) -> Option<Value> {
        self.output.recv().await
    }

    async fn stop(self: Box<Self>, join_timeout: Duration) -> StopOutcome {
        let ThreadWorker {
            switch,
            input,
            output,
            handle,
        } = *self;
        switch.set();
        // Closing the channels lets a worker blocked on its input receive
        // observe the shutdown immediately instead of on the next poll tick.
        drop(input);
        drop(output);

        let deadline = tokio::time::Instant::now() + join_timeout;
        while !handle.is_finished() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(JOIN_POLL_INTERVAL).await;
        }
        if !handle.is_finished() {
            // Mid-generation and unkillable; the thread finishes on its own
            // and finds its channels gone.
            return StopOutcome::Detached;
        }
        if handle.join().is_err() {
            warn!("worker thread panicked; reporting a clean stop regardless");
        }
        StopOutcome::Clean
    }
}
