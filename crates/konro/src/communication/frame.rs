use serde::{Deserialize, Serialize};

/// One frame on a subprocess worker's stdin, encoded as a single JSON line.
///
/// The reverse direction carries no framing: each response is one bare JSON
/// value per stdout line. Closing stdin is equivalent to [`Shutdown`]: the
/// worker treats end-of-input as a stop request, which also covers the case
/// of the owning process dying without a goodbye.
///
/// [`Shutdown`]: WorkerFrame::Shutdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerFrame {
    /// A generation request.
    Prompt {
        /// The prompt to hand to the model.
        prompt: String,
    },
    /// Cooperative stop request; the worker exits cleanly.
    Shutdown,
}
