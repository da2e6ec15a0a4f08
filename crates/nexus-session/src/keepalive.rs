//! Client-initiated keepalive scheduling.
//!
//! The backend probes idle connections with `keepalive` frames and the
//! session answers `pong` inline. This timer covers the other direction:
//! when the client has been quiet for the configured interval, the driver
//! sends a `ping` so half-dead connections are noticed from our side too.

use std::time::{Duration, Instant};

/// Tracks outbound activity and reports when a `ping` is due.
#[derive(Debug)]
pub struct KeepaliveTimer {
    interval: Duration,
    last_activity: Instant,
}

impl KeepaliveTimer {
    /// Create a timer with the given quiet interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_activity: Instant::now(),
        }
    }

    /// Record outbound traffic, pushing the next ping back.
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Whether the quiet interval has elapsed. Consuming the answer resets
    /// the timer, so one elapsed interval yields exactly one ping.
    pub fn poll(&mut self) -> bool {
        if self.last_activity.elapsed() >= self.interval {
            self.last_activity = Instant::now();
            true
        } else {
            false
        }
    }

    /// The configured quiet interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
