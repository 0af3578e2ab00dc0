//! # Model Backends
//!
//! This module provides the capability interface a worker expects from a
//! loaded model, plus the factory that turns an [`InstanceConfig`] into a
//! concrete backend.
//!
//! ## Feature Flags
//!
//! - `ollama`: Enables the [`OllamaModel`](ollama::OllamaModel) backend
//!
//! ## Usage
//!
//! Pool users normally never construct a backend themselves: the worker
//! body calls [`spawn_language_model`] (or an injected [`ModelFactory`])
//! with the worker's configuration when the worker starts. The factory
//! dispatches on [`BackendKind`](crate::BackendKind), so a configuration
//! naming a backend this build does not carry fails at construction time
//! with a [`SpawnError`], never as a silently unusable instance.

mod core_trait;
mod echo;
mod lookup;

#[cfg_attr(docsrs, doc(cfg(feature = "ollama")))]
#[cfg(feature = "ollama")]
/// Ollama model backend.
///
/// This module is only available when the `ollama` feature flag is enabled.
/// It serves generation requests through a local Ollama server, bridging
/// the synchronous [`LanguageModel`] contract onto the async client with a
/// private current-thread runtime.
pub mod ollama;

pub use core_trait::*;
pub use echo::EchoModel;
pub use lookup::LookupModel;

use crate::error::SpawnError;
use crate::{BackendKind, InstanceConfig};

/// Signature of a model factory.
///
/// The thread execution strategy accepts any factory with this shape, which
/// is how tests substitute scripted models for real ones. Subprocess
/// workers always construct through [`spawn_language_model`] inside the
/// child, since a closure cannot cross the process boundary.
pub type ModelFactory =
    dyn Fn(&InstanceConfig) -> Result<Box<dyn LanguageModel>, SpawnError> + Send + Sync;

/// Constructs the backend named by `config.backend`.
///
/// This is the default [`ModelFactory`]. Construction may be arbitrarily
/// slow for real backends (model loading); callers run it inside the
/// worker's own execution unit, never on the pool's thread.
pub fn spawn_language_model(
    config: &InstanceConfig,
) -> Result<Box<dyn LanguageModel>, SpawnError> {
    match config.backend {
        BackendKind::Lookup => Ok(Box::new(LookupModel::from_config(config))),
        BackendKind::Echo => Ok(Box::new(EchoModel::new())),
        #[cfg(feature = "ollama")]
        BackendKind::Ollama => Ok(Box::new(ollama::OllamaModel::from_config(config)?)),
        #[cfg(not(feature = "ollama"))]
        BackendKind::Ollama => Err(SpawnError::BackendDisabled("ollama")),
    }
}
