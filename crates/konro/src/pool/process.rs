use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::warn;

use crate::InstanceConfig;
use crate::communication::WorkerFrame;
use crate::error::SpawnError;

use super::WorkerId;
use super::unit::{StopOutcome, WorkerSpawner, WorkerUnit};

/// Spawns worker bodies as subprocesses running a worker binary.
///
/// The isolating strategy: a crashing or leaking model takes its whole
/// process with it and leaves an exit status behind, so an abnormal death
/// is observable when the worker is stopped. Models are constructed inside
/// the child by the built-in factory from the configuration serialized onto
/// the command line; there is no factory injection across a process
/// boundary.
///
/// `program` is the worker executable, normally the `konro-worker` binary
/// shipped with this crate.
pub struct SubprocessSpawner {
    program: PathBuf,
}

impl SubprocessSpawner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl WorkerSpawner for SubprocessSpawner {
    async fn spawn(
        &self,
        id: &WorkerId,
        config: &InstanceConfig,
    ) -> Result<Box<dyn WorkerUnit>, SpawnError> {
        let payload = serde_json::to_string(config)
            .map_err(|e| SpawnError::InvalidConfig(e.to_string()))?;
        let mut child = Command::new(&self.program)
            .arg("--config")
            .arg(payload)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SpawnError::Construction("worker stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SpawnError::Construction("worker stdout unavailable".into()))?;

        let (input_tx, mut input_rx) = unbounded_channel::<WorkerFrame>();
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(frame) = input_rx.recv().await {
                let mut line = match serde_json::to_vec(&frame) {
                    Ok(line) => line,
                    Err(_) => break,
                };
                line.push(b'\n');
                if stdin.write_all(&line).await.is_err() || stdin.flush().await.is_err() {
                    break;
                }
            }
            // Dropping stdin closes the pipe; the child reads EOF and shuts
            // down even if no shutdown frame made it through.
        });

        let worker = id.clone();
        let (output_tx, output_rx) = unbounded_channel::<Value>();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<Value>(&line) {
                    Ok(value) => {
                        if output_tx.send(value).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(worker = %worker, error = %e, "discarding malformed response line");
                    }
                }
            }
        });

        Ok(Box::new(ProcessWorker {
            input: input_tx,
            output: output_rx,
            child,
        }))
    }
}

struct ProcessWorker {
    input: UnboundedSender<WorkerFrame>,
    output: UnboundedReceiver<Value>,
    child: Child,
}

#[async_trait]
impl WorkerUnit for ProcessWorker {
    fn submit(&mut self, prompt: &str) {
        let frame = WorkerFrame::Prompt {
            prompt: prompt.to_string(),
        };
        if self.input.send(frame).is_err() {
            warn!("worker input channel closed, prompt dropped");
        }
    }

    async fn next_response(&mut self) -> Option<Value> {
        self.output.recv().await
    }

    async fn stop(self: Box<Self>, join_timeout: Duration) -> StopOutcome {
        let ProcessWorker {
            input,
            output,
            mut child,
        } = *self;
        let _ = input.send(WorkerFrame::Shutdown);
        drop(input);
        drop(output);

        match tokio::time::timeout(join_timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => StopOutcome::Clean,
            Ok(Ok(status)) => StopOutcome::Abnormal(status.code()),
            Ok(Err(e)) => {
                warn!(error = %e, "waiting on worker process failed, killing it");
                let _ = child.kill().await;
                StopOutcome::Killed
            }
            Err(_) => {
                let _ = child.kill().await;
                StopOutcome::Killed
            }
        }
    }
}
