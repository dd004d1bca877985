//! Main scheduling loop
//!
//! Drains the ThreadPool's outbound channel, wakes ready `OperationWorker`s
//! via the `OperationRegistry`, enforces the overall run timeout, and
//! records per-authority exceptions. See spec.md §4.F.

mod config;
mod core;
mod exit;

pub use config::SchedulerConfig;
pub use core::{current_authority, Scheduler};
pub use exit::{ProcessExit, RealProcessExit};

pub(crate) use core::set_current_authority;
