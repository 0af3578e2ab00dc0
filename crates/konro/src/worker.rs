//! Worker bodies: the loops that actually host a model instance.
//!
//! Both variants follow the same shape (construct the model once through a
//! factory, then pull prompts, generate, and push responses until stopped)
//! and differ only in their transport. The thread body talks over in-process
//! channels and a [`KillSwitch`]; the stdio body talks over line-delimited
//! JSON on stdin/stdout and reports its fate through the process exit
//! status.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use crate::backend::{self, ModelFactory};
use crate::communication::{KillSwitch, WorkerFrame};
use crate::config::InstanceConfig;

/// How often an idle thread worker wakes to check its kill switch. Bounds
/// the observable stop latency.
pub(crate) const SWITCH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Body of a thread-backed worker.
///
/// Constructs the model via `factory`, then serves prompts from `input`
/// in arrival order, pushing each response onto `output`. Returns when the
/// switch is set, when the input channel disconnects, or when the factory
/// or a generation fails. A failure ends the thread with nothing but a log
/// line; threads have no exit status, so the owning pool will report this
/// worker as cleanly stopped once it is told to stop. That asymmetry with
/// subprocess workers is accepted, not hidden.
pub(crate) fn run_threaded_worker(
    switch: KillSwitch,
    config: InstanceConfig,
    factory: Arc<ModelFactory>,
    input: Receiver<String>,
    output: UnboundedSender<Value>,
) {
    let mut model = match factory(&config) {
        Ok(model) => model,
        Err(e) => {
            error!(error = %e, "model construction failed, worker thread exiting");
            return;
        }
    };
    debug!(model_path = %config.model_path, "model constructed");

    loop {
        if switch.is_set() {
            break;
        }
        match input.recv_timeout(SWITCH_POLL_INTERVAL) {
            Ok(prompt) => match model.generate(&prompt) {
                Ok(response) => {
                    if output.send(response).is_err() {
                        // Receiver gone: the pool tore this worker down.
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "generation failed, worker thread exiting");
                    break;
                }
            },
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!(model_path = %config.model_path, "worker thread stopped");
}

/// Body of a subprocess worker, run inside the `konro-worker` binary.
///
/// Returns the process exit status: `0` after a clean shutdown (a
/// [`WorkerFrame::Shutdown`] frame or end of input), `1` if model
/// construction, generation, or the frame protocol failed. The status is
/// how the owning pool distinguishes an abnormal death at stop time.
pub fn run_stdio_worker(config: &InstanceConfig) -> i32 {
    match stdio_worker_loop(config) {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "worker failed");
            1
        }
    }
}

fn stdio_worker_loop(config: &InstanceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut model = backend::spawn_language_model(config)?;
    debug!(model_path = %config.model_path, "model constructed");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: WorkerFrame = serde_json::from_str(&line)?;
        match frame {
            WorkerFrame::Prompt { prompt } => {
                let response = model.generate(&prompt)?;
                serde_json::to_writer(&mut stdout, &response)?;
                stdout.write_all(b"\n")?;
                stdout.flush()?;
            }
            WorkerFrame::Shutdown => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendKind;
    use std::sync::mpsc;
    use std::time::Instant;

    fn lookup_config() -> InstanceConfig {
        InstanceConfig::new(BackendKind::Lookup, "table")
            .with_param("prompt_a", "response_a")
            .with_param("prompt_b", "response_b")
    }

    fn default_factory() -> Arc<ModelFactory> {
        Arc::new(backend::spawn_language_model)
    }

    #[test]
    fn serves_prompts_in_order_until_switched_off() {
        let switch = KillSwitch::new();
        let (input_tx, input_rx) = mpsc::channel();
        let (output_tx, mut output_rx) = tokio::sync::mpsc::unbounded_channel();

        let body_switch = switch.clone();
        let handle = std::thread::spawn(move || {
            run_threaded_worker(
                body_switch,
                lookup_config(),
                default_factory(),
                input_rx,
                output_tx,
            )
        });

        input_tx.send("prompt_a".to_string()).unwrap();
        input_tx.send("prompt_b".to_string()).unwrap();
        assert_eq!(
            output_rx.blocking_recv().unwrap(),
            Value::String("response_a".into())
        );
        assert_eq!(
            output_rx.blocking_recv().unwrap(),
            Value::String("response_b".into())
        );

        switch.set();
        handle.join().unwrap();
    }

    #[test]
    fn switch_stops_an_idle_worker_within_the_poll_interval() {
        let switch = KillSwitch::new();
        let (_input_tx, input_rx) = mpsc::channel::<String>();
        let (output_tx, _output_rx) = tokio::sync::mpsc::unbounded_channel();

        let body_switch = switch.clone();
        let handle = std::thread::spawn(move || {
            run_threaded_worker(
                body_switch,
                lookup_config(),
                default_factory(),
                input_rx,
                output_tx,
            )
        });

        // Let the worker settle into its receive loop before signaling.
        std::thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        switch.set();
        handle.join().unwrap();
        assert!(started.elapsed() < SWITCH_POLL_INTERVAL + Duration::from_millis(200));
    }

    #[test]
    fn input_disconnect_ends_the_worker() {
        let switch = KillSwitch::new();
        let (input_tx, input_rx) = mpsc::channel::<String>();
        let (output_tx, _output_rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = std::thread::spawn(move || {
            run_threaded_worker(
                switch,
                lookup_config(),
                default_factory(),
                input_rx,
                output_tx,
            )
        });

        drop(input_tx);
        handle.join().unwrap();
    }

    #[test]
    fn factory_failure_ends_the_worker_thread() {
        let switch = KillSwitch::new();
        let (_input_tx, input_rx) = mpsc::channel::<String>();
        let (output_tx, _output_rx) = tokio::sync::mpsc::unbounded_channel();
        let failing: Arc<ModelFactory> = Arc::new(|_config: &InstanceConfig| {
            Err(crate::error::SpawnError::Construction("no device".into()))
        });

        let handle = std::thread::spawn(move || {
            run_threaded_worker(switch, lookup_config(), failing, input_rx, output_tx)
        });
        handle.join().unwrap();
    }
}
