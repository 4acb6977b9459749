use log::trace;

use crate::{Error, Result};

/// A GPU fence plus the queue that signals it and the OS event used to wait on it.
pub trait Timeline {
    /// Asks the queue to write `value` into the fence once all previously
    /// submitted work is done.
    fn signal(&self, value: u64) -> Result<()>;

    /// The last value the GPU wrote. `u64::MAX` once the device is removed.
    fn completed_value(&self) -> u64;

    /// Blocks the calling thread, with no timeout, until the fence reaches `value`.
    fn wait_for_completion(&self, value: u64) -> Result<()>;

    /// Why the device went away, if the backend can tell.
    fn removal_reason(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[must_use]
pub struct FenceValue {
    v: u64,
}

impl FenceValue {
    /// No outstanding work.
    pub const NONE: Self = Self { v: 0 };

    pub fn get(self) -> u64 {
        self.v
    }

    pub fn is_none(self) -> bool {
        self.v == 0
    }
}

/// Single monotonic counter shared by every frame slot.
pub struct FenceSynchronizer<T> {
    timeline: T,
    last_signaled: FenceValue,
}

impl<T: Timeline> FenceSynchronizer<T> {
    pub fn new(timeline: T) -> Self {
        Self {
            timeline,
            last_signaled: FenceValue::NONE,
        }
    }

    pub fn last_signaled(&self) -> FenceValue {
        self.last_signaled
    }

    pub fn timeline(&self) -> &T {
        &self.timeline
    }

    /// Signals `last_signaled + 1` on the queue and returns it.
    ///
    /// The counter only advances when the queue accepted the signal, so the
    /// sequence of returned values has no gaps.
    pub fn signal_next(&mut self) -> Result<FenceValue> {
        let next = FenceValue {
            v: self.last_signaled.v + 1,
        };
        self.timeline.signal(next.v)?;
        self.last_signaled = next;
        trace!("signaled fence value {}", next.v);
        Ok(next)
    }

    /// Non-blocking completion check.
    pub fn is_complete(&self, value: FenceValue) -> Result<bool> {
        Ok(self.completed()? >= value.v)
    }

    /// Blocks until the GPU reached `value`. Returns immediately for
    /// [`FenceValue::NONE`] or an already completed value.
    pub fn wait_for_value(&self, value: FenceValue) -> Result<()> {
        if value.is_none() || self.is_complete(value)? {
            return Ok(());
        }

        trace!(
            "waiting for fence value {} (last signaled {})",
            value.v,
            self.last_signaled.v
        );
        self.timeline.wait_for_completion(value.v)?;

        // a removed device also wakes the event up
        if self.is_complete(value)? {
            Ok(())
        } else {
            Err(Error::WaitFailed(format!(
                "woke up before the fence reached {}",
                value.v
            )))
        }
    }

    fn completed(&self) -> Result<u64> {
        let completed = self.timeline.completed_value();
        if completed == u64::MAX {
            return Err(Error::DeviceRemoved {
                reason: self
                    .timeline
                    .removal_reason()
                    .unwrap_or_else(|| "the fence reported the removal value".into()),
            });
        }
        Ok(completed)
    }
}

#[cfg(test)]
impl FenceValue {
    pub(crate) fn from_raw(v: u64) -> Self {
        Self { v }
    }
}
