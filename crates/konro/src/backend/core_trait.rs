use serde_json::Value;

use crate::error::GenerationError;

/// The capability a worker expects from a loaded model instance.
///
/// Implementations are free to block for as long as a generation takes:
/// the call always runs on the worker's own execution unit, and the pool's
/// generation timeout is applied at the requesting side, not here.
///
/// Responses are opaque [`Value`]s so they survive the subprocess wire
/// format unchanged and the pool never needs to interpret them.
pub trait LanguageModel: Send {
    /// Produces the model's response for one prompt.
    ///
    /// An error is fatal to the worker hosting this model: the worker body
    /// does not retry, and the unit dies (thread) or exits non-zero
    /// (subprocess).
    fn generate(&mut self, prompt: &str) -> Result<Value, GenerationError>;
}
