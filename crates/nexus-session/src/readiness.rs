//! One-shot readiness gate.
//!
//! Components that depend on a capability becoming available (a rendering
//! surface finishing initialization, a configuration load completing) await
//! the gate instead of polling. The providing side signals exactly once;
//! late waiters observe the signaled state immediately.

use tokio::sync::watch;

/// The signaling half of a readiness gate.
#[derive(Debug)]
pub struct Readiness {
    tx: watch::Sender<bool>,
}

/// The waiting half. Cheap to clone; every clone observes the same signal.
#[derive(Debug, Clone)]
pub struct ReadinessWaiter {
    rx: watch::Receiver<bool>,
}

impl Readiness {
    /// Create a gate and its waiter.
    pub fn new() -> (Readiness, ReadinessWaiter) {
        let (tx, rx) = watch::channel(false);
        (Readiness { tx }, ReadinessWaiter { rx })
    }

    /// Mark the capability ready. Further calls have no effect.
    pub fn signal(&self) {
        let _ = self.tx.send(true);
    }
}

impl ReadinessWaiter {
    /// Whether the gate has been signaled.
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the gate is signaled. Returns immediately if it already
    /// was. Also returns if the signaling half was dropped unsignaled, so a
    /// torn-down provider cannot wedge its dependents.
    pub async fn ready(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_releases_waiter() {
        let (gate, mut waiter) = Readiness::new();
        assert!(!waiter.is_ready());

        gate.signal();
        waiter.ready().await;
        assert!(waiter.is_ready());
    }

    #[tokio::test]
    async fn late_waiter_returns_immediately() {
        let (gate, waiter) = Readiness::new();
        gate.signal();

        let mut late = waiter.clone();
        late.ready().await;
        assert!(late.is_ready());
    }

    #[tokio::test]
    async fn dropped_gate_does_not_wedge() {
        let (gate, mut waiter) = Readiness::new();
        drop(gate);
        // Must complete rather than hang.
        waiter.ready().await;
        assert!(!waiter.is_ready());
    }

    #[tokio::test]
    async fn double_signal_is_harmless() {
        let (gate, mut waiter) = Readiness::new();
        gate.signal();
        gate.signal();
        waiter.ready().await;
    }
}
