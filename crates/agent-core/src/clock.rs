//! Virtual clock.
//!
//! Time only moves forward, and only when the engine ticks. Readers (memory
//! stores stamping records, the event queue computing fire times) share the
//! clock through an `Arc` and see every advance immediately.

use std::sync::atomic::{AtomicU64, Ordering};

use agent_model::SimTime;

use crate::error::{SimError, SimResult};

/// Monotonic virtual time with a wall-to-virtual scale factor
#[derive(Debug)]
pub struct Clock {
    current_ms: AtomicU64,
    /// f64 bits of the scale factor
    scale_bits: AtomicU64,
}

impl Clock {
    /// Create a clock at `start` running at real-time scale (1.0)
    pub fn new(start: SimTime) -> Self {
        Self {
            current_ms: AtomicU64::new(start.as_millis()),
            scale_bits: AtomicU64::new(1.0f64.to_bits()),
        }
    }

    /// Create a clock with an explicit scale
    pub fn with_scale(start: SimTime, scale: f64) -> SimResult<Self> {
        let clock = Self::new(start);
        clock.set_scale(scale)?;
        Ok(clock)
    }

    pub fn now(&self) -> SimTime {
        SimTime(self.current_ms.load(Ordering::Acquire))
    }

    pub fn scale(&self) -> f64 {
        f64::from_bits(self.scale_bits.load(Ordering::Acquire))
    }

    /// Set how many virtual milliseconds pass per wall millisecond
    pub fn set_scale(&self, scale: f64) -> SimResult<()> {
        if scale <= 0.0 || !scale.is_finite() {
            return Err(SimError::InvalidArgument(format!(
                "clock scale must be positive and finite, got {}",
                scale
            )));
        }
        self.scale_bits.store(scale.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Advance by `wall_delta_ms × scale`, rounded to whole milliseconds.
    /// Returns the new time.
    pub fn advance(&self, wall_delta_ms: u64) -> SimTime {
        let scaled = (wall_delta_ms as f64 * self.scale()).round();
        let step = if scaled >= u64::MAX as f64 {
            u64::MAX
        } else {
            scaled as u64
        };
        let previous = self
            .current_ms
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |ms| {
                Some(ms.saturating_add(step))
            })
            .unwrap_or_else(|ms| ms);
        SimTime(previous.saturating_add(step))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(SimTime::ZERO)
    }
}
