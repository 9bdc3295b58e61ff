//! CPU/GPU synchronization
//!
//! One monotonically increasing 64-bit counter plus a GPU-signal / CPU-wait
//! primitive. This is the only synchronization point of the core: there is no
//! per-resource fencing.

use crate::backend::{GpuFence, GpuQueue};
use crate::error::{Error, Result};
use crate::{gfx_err, gfx_trace};

const SOURCE: &str = "solgfx::Fence";

/// Monotonic fence counter bound to one GPU fence
pub struct FenceSynchronizer {
    fence: Box<dyn GpuFence>,
    /// Last value handed to the GPU. Only ever incremented by the CPU.
    current_value: u64,
}

impl FenceSynchronizer {
    /// Wrap a freshly created fence whose completed value is `initial_value`
    pub fn new(fence: Box<dyn GpuFence>, initial_value: u64) -> Self {
        Self { fence, current_value: initial_value }
    }

    /// Last value requested with [`signal`](Self::signal)
    pub fn current_value(&self) -> u64 {
        self.current_value
    }

    /// Last value the GPU has reached
    pub fn completed_value(&self) -> Result<u64> {
        let completed = self
            .fence
            .completed_value()
            .map_err(|e| Error::CommandSubmission(format!("Failed to read fence value: {}", e.detail())))?;
        if completed > self.current_value {
            return Err(gfx_err!(
                SOURCE,
                Error::CommandSubmission(format!(
                    "GPU reports fence value {} beyond the last requested value {}",
                    completed, self.current_value
                ))
            ));
        }
        Ok(completed)
    }

    /// Whether the GPU has finished everything signaled so far
    pub fn is_idle(&self) -> Result<bool> {
        Ok(self.completed_value()? >= self.current_value)
    }

    /// Increment the counter and enqueue a GPU signal at the new value
    pub fn signal(&mut self, queue: &mut dyn GpuQueue) -> Result<u64> {
        let value = self.current_value + 1;
        queue.signal(self.fence.as_ref(), value).map_err(|e| {
            Error::CommandSubmission(format!("Failed to signal fence {}: {}", value, e.detail()))
        })?;
        self.current_value = value;
        gfx_trace!(SOURCE, "Signaled fence value {}", value);
        Ok(value)
    }

    /// Block until the GPU has completed at least `value`
    ///
    /// Returns immediately when that is already the case. The wait itself is
    /// an OS-level wait with no timeout.
    pub fn wait_until_complete(&self, value: u64) -> Result<()> {
        if value > self.current_value {
            return Err(gfx_err!(
                SOURCE,
                Error::CommandSubmission(format!(
                    "Waiting for fence value {} that was never signaled (current {})",
                    value, self.current_value
                ))
            ));
        }
        if self.completed_value()? >= value {
            return Ok(());
        }
        gfx_trace!(SOURCE, "Waiting for fence value {}", value);
        self.fence.wait(value).map_err(|e| {
            Error::CommandSubmission(format!("Fence wait for {} failed: {}", value, e.detail()))
        })
    }

    /// Signal, then wait for that signal
    ///
    /// Guarantees no previously submitted GPU work is still in flight.
    pub fn flush(&mut self, queue: &mut dyn GpuQueue) -> Result<u64> {
        let value = self.signal(queue)?;
        self.wait_until_complete(value)?;
        Ok(value)
    }
}

#[cfg(test)]
#[path = "fence_tests.rs"]
mod tests;
