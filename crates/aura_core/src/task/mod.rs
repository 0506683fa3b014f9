//! Worker task pool.
//!
//! - [`TaskPool`]: fixed-size worker group over a shared FIFO queue
//! - [`TaskHandle`]: future-like result of one queued job

mod handle;
mod pool;

pub use handle::{wait_all, TaskHandle};
pub use pool::{TaskPool, TaskPoolConfig, TaskPoolStats};
