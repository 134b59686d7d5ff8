use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Single-slot gate: at most one collection cycle body runs at a time.
#[derive(Debug, Clone)]
pub struct CycleGate {
    slot: Arc<Semaphore>,
}

/// Held for the whole cycle; releases the slot on drop.
#[derive(Debug)]
pub struct CyclePermit {
    _permit: OwnedSemaphorePermit,
}

impl CycleGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Waits at most `wait` for the slot. Gives up early on cancellation.
    pub async fn try_enter(&self, wait: Duration, cancel: &CancellationToken) -> Option<CyclePermit> {
        if let Ok(permit) = self.slot.clone().try_acquire_owned() {
            return Some(CyclePermit { _permit: permit });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            acquired = tokio::time::timeout(wait, self.slot.clone().acquire_owned()) => {
                match acquired {
                    Ok(Ok(permit)) => Some(CyclePermit { _permit: permit }),
                    Ok(Err(_closed)) => None,
                    Err(_elapsed) => None,
                }
            }
        }
    }
}

impl Default for CycleGate {
    fn default() -> Self {
        Self::new()
    }
}
