//! Future-like result handle for pool jobs.

use crate::error::{TaskError, TaskResult};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// Handle returned by [`super::TaskPool::enqueue`].
///
/// The job's return value travels back over a one-shot channel. Dropping
/// the handle detaches the job; it still runs.
#[must_use = "dropping a TaskHandle detaches the job"]
pub struct TaskHandle<T> {
    receiver: Receiver<TaskResult<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(receiver: Receiver<TaskResult<T>>) -> Self {
        Self { receiver }
    }

    /// Blocks until the job has run and returns its value.
    ///
    /// # Errors
    ///
    /// [`TaskError::Panicked`] if the job panicked, [`TaskError::Disconnected`]
    /// if the job was dropped unexecuted.
    pub fn wait(self) -> TaskResult<T> {
        self.receiver.recv().map_err(|_| TaskError::Disconnected)?
    }

    /// Waits at most `timeout`. `Ok(None)` means the job has not finished.
    ///
    /// A returned value is taken out of the handle; a later wait reports
    /// [`TaskError::Disconnected`].
    ///
    /// # Errors
    ///
    /// Same as [`TaskHandle::wait`].
    pub fn wait_timeout(&self, timeout: Duration) -> TaskResult<Option<T>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => result.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TaskError::Disconnected),
        }
    }

    /// Returns true once the result is waiting to be collected.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.receiver.is_empty()
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Waits on every handle in submission order and collects the values.
///
/// All handles are waited on even if an earlier one failed, so no job is
/// left running against state the caller is about to drop.
///
/// # Errors
///
/// The first error encountered, in handle order.
pub fn wait_all<T, I>(handles: I) -> TaskResult<Vec<T>>
where
    I: IntoIterator<Item = TaskHandle<T>>,
{
    let mut values = Vec::new();
    let mut first_error = None;
    for handle in handles {
        match handle.wait() {
            Ok(value) => values.push(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(values),
    }
}
