//! Primitives shared between the pool and its worker bodies.
//!
//! A worker sees nothing of the pool beyond three things: its (read-only)
//! configuration, an input/output channel pair, and a cooperative stop
//! signal. This module holds the stop signal and the wire frames used when
//! the channel pair crosses a process boundary.

mod frame;
mod switch;

pub use frame::WorkerFrame;
pub(crate) use switch::KillSwitch;
