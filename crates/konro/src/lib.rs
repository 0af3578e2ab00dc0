//! # Konro
//!
//! A **kon**trolled **ro**ster of language model workers: lifecycle
//! management and request routing for pooled, locally hosted model
//! instances.
//!
//! ## Overview
//!
//! Loading a local language model is slow and memory-hungry, so the loaded
//! instance has to be kept alive across requests and torn down on purpose,
//! not by accident. This library wraps each instance in a *worker* (an
//! independent unit of execution owning exactly one model) and multiplexes
//! generation requests to workers through dedicated channel pairs.
//!
//! Key components include:
//!
//! - A pool ([`LlmPool`]) owning worker records and their lifecycle
//!   transitions (`prepare`, `start`, `stop`, `stop_all`, `reset`)
//! - A synchronous request/response [`LlmPool::generate`] operation with an
//!   optional timeout window
//! - Two interchangeable execution strategies: OS threads for lightweight
//!   deployments and subprocesses for real isolation
//! - A capability interface ([`backend::LanguageModel`]) with a closed set
//!   of backends selected by an enumerated configuration tag
//!
//! ## Architecture
//!
//! The pool never touches a model directly. Each started worker runs a
//! *worker body* that constructs the model once through a factory and then
//! serves prompts from its input channel until a cooperative stop signal is
//! observed. The pool communicates with a worker exclusively through the
//! channel pair and the stop signal, so threads and subprocesses satisfy
//! one [`pool::WorkerUnit`] contract and are chosen at pool construction.
//!
//! Workers process prompts strictly one at a time in arrival order.
//! Responses on one worker therefore come back in submission order, but the
//! pool is single-flight per worker: issue the next `generate` only after
//! the previous one returned.
//!
//! ## Features
//!
//! - **ollama** - Enables the Ollama-backed model backend
//!
//! ## Example
//!
//! ```no_run
//! use konro::{BackendKind, InstanceConfig, LlmPool, PoolOptions};
//!
//! # async fn example() -> Result<(), konro::PoolError> {
//! let mut pool = LlmPool::threaded(PoolOptions::default());
//! let config = InstanceConfig::new(BackendKind::Echo, "demo");
//! let id = pool.prepare(config, None).await?;
//! pool.start(&id).await?;
//! let outcome = pool.generate(&id, "hello").await?;
//! println!("{:?}", outcome.into_response());
//! pool.stop(&id).await?;
//! # Ok(())
//! # }
//! ```

mod communication;
mod config;
mod error;

pub mod backend;
pub mod pool;
pub mod worker;

pub use communication::WorkerFrame;
pub use config::{BackendKind, InstanceConfig};
pub use error::{AdmissionError, GenerationError, PoolError, SpawnError};
pub use pool::{Generation, LlmPool, PoolOptions, StopOutcome, WorkerId};
