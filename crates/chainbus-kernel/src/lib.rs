//! Cooperative module scheduler.
//!
//! Firmware is a set of [`Module`]s stepped from one main loop. A module is
//! initialised until it reports ready and polled once ready, each at its own
//! period. Dependencies between modules are declared explicitly and checked
//! for cycles when they are added.

pub mod config;
pub mod error;
mod graph;
pub mod module;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use error::{KernelError, Result};
pub use module::{Module, ModuleId};
pub use scheduler::{ModuleStatus, Scheduler};
