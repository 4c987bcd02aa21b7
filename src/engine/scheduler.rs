//! Frame-paced scheduler.
//!
//! The host (a browser's animation-frame loop, or the CLI's virtual clock)
//! calls in once per frame with its current time. The scheduler decides
//! whether that frame becomes a simulation tick:
//!
//! - frames arriving sooner than the configured interval after the last
//!   accepted tick are skipped
//! - while paused every frame is skipped, and resuming restarts the
//!   interval from the resume instant, so the paused span is never
//!   integrated
//! - after disposal nothing is accepted and the host registration has
//!   been released
//!
//! Everything runs on one thread; a frame never overlaps another.

use tracing::{debug, info};

use crate::error::Result;

/// A host-side registration that keeps frames coming.
pub trait FrameHandle {
    /// Stop the host from delivering further frames.
    fn cancel(&mut self) -> Result<()>;
}

/// Throttle, pause and teardown state for a frame-driven simulation.
pub struct FrameScheduler {
    /// Host time of the last accepted tick (ms)
    last_accepted_ms: Option<f64>,
    paused: bool,
    disposed: bool,
    handle: Option<Box<dyn FrameHandle>>,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("last_accepted_ms", &self.last_accepted_ms)
            .field("paused", &self.paused)
            .field("disposed", &self.disposed)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

impl FrameScheduler {
    /// Create a running scheduler with no host registration.
    pub fn new() -> Self {
        Self {
            last_accepted_ms: None,
            paused: false,
            disposed: false,
            handle: None,
        }
    }

    /// Hold the host registration so disposal can release it. A previous
    /// registration is released first.
    pub fn attach(&mut self, handle: Box<dyn FrameHandle>) {
        self.release();
        if self.disposed {
            // Too late: hand it straight back to the host
            let mut handle = handle;
            if let Err(e) = handle.cancel() {
                debug!(error = %e, "frame registration release failed");
            }
            return;
        }
        self.handle = Some(handle);
    }

    /// Offer a frame at host time `now_ms`.
    ///
    /// Returns the elapsed milliseconds to integrate when the frame is
    /// accepted as a tick. The first tick integrates one nominal interval.
    pub fn poll(&mut self, now_ms: f64, interval_ms: f64) -> Option<f64> {
        if self.disposed || self.paused || !now_ms.is_finite() {
            return None;
        }

        let elapsed = match self.last_accepted_ms {
            None => interval_ms,
            Some(last) => {
                let elapsed = now_ms - last;
                if elapsed < interval_ms {
                    return None;
                }
                elapsed
            }
        };

        self.last_accepted_ms = Some(now_ms);
        Some(elapsed)
    }

    /// Stop accepting ticks. Frames keep arriving but are skipped.
    pub fn pause(&mut self) {
        if !self.paused && !self.disposed {
            info!("simulation paused");
        }
        self.paused = true;
    }

    /// Resume at host time `now_ms`; the next tick is due one interval later.
    pub fn resume(&mut self, now_ms: f64) {
        if self.disposed {
            return;
        }
        if self.paused {
            info!("simulation resumed");
            self.last_accepted_ms = if now_ms.is_finite() { Some(now_ms) } else { None };
        }
        self.paused = false;
    }

    /// Forget the last accepted tick, so the next frame is accepted.
    pub fn restart(&mut self) {
        self.last_accepted_ms = None;
    }

    pub fn is_running(&self) -> bool {
        !self.paused && !self.disposed
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release the host registration and refuse all further ticks.
    /// Release failures are logged and otherwise ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.release();
        self.disposed = true;
        info!("simulation disposed");
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.cancel() {
                debug!(error = %e, "frame registration release failed");
            }
        }
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}
