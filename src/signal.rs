//! Single-publish result notification for a protocol run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::aggregator::Outcome;
use crate::types::Error;

enum Slot {
    Empty,
    Ready(Outcome),
    Taken,
    /// Every publisher went away without deciding.
    Abandoned,
}

struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
    publishers: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Write side, owned by the run.
pub struct OutcomePublisher {
    shared: Arc<Shared>,
}

/// Read side, handed to whoever started the run. Consumed on read.
pub struct OutcomeReceiver {
    shared: Arc<Shared>,
}

pub fn outcome_channel() -> (OutcomePublisher, OutcomeReceiver) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Empty),
        ready: Condvar::new(),
        publishers: AtomicUsize::new(1),
    });
    (
        OutcomePublisher {
            shared: shared.clone(),
        },
        OutcomeReceiver { shared },
    )
}

impl OutcomePublisher {
    /// Publishes the outcome. A second publish is rejected and leaves the first intact.
    pub fn publish(&self, outcome: Outcome) -> Result<(), Error> {
        let mut slot = self.shared.lock();
        if !matches!(*slot, Slot::Empty) {
            return Err(Error::OutcomePublished);
        }
        *slot = Slot::Ready(outcome);
        self.shared.ready.notify_all();
        Ok(())
    }

    pub fn is_published(&self) -> bool {
        !matches!(*self.shared.lock(), Slot::Empty)
    }
}

impl Clone for OutcomePublisher {
    fn clone(&self) -> Self {
        self.shared.publishers.fetch_add(1, Ordering::SeqCst);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl Drop for OutcomePublisher {
    fn drop(&mut self) {
        if self.shared.publishers.fetch_sub(1, Ordering::SeqCst) != 1 {
            return;
        }
        let mut slot = self.shared.lock();
        if matches!(*slot, Slot::Empty) {
            *slot = Slot::Abandoned;
        }
        self.shared.ready.notify_all();
    }
}

impl OutcomeReceiver {
    /// Blocks until the outcome is published, or fails with
    /// [`Error::OutcomeAbandoned`] once no publisher is left.
    pub fn wait(self) -> Result<Outcome, Error> {
        let mut slot = self.shared.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Taken) {
                Slot::Ready(outcome) => return Ok(outcome),
                Slot::Empty => *slot = Slot::Empty,
                other => {
                    *slot = other;
                    return Err(Error::OutcomeAbandoned);
                }
            }
            slot = self
                .shared
                .ready
                .wait(slot)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Waits at most `timeout`; gives the receiver back if nothing was
    /// published. An abandoned run returns at once.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Outcome, OutcomeReceiver> {
        let taken = {
            let slot = self.shared.lock();
            let (mut slot, _) = self
                .shared
                .ready
                .wait_timeout_while(slot, timeout, |s| matches!(s, Slot::Empty))
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match std::mem::replace(&mut *slot, Slot::Taken) {
                Slot::Ready(outcome) => Some(outcome),
                other => {
                    *slot = other;
                    None
                }
            }
        };
        taken.ok_or(self)
    }

    pub fn try_take(&mut self) -> Option<Outcome> {
        let mut slot = self.shared.lock();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(outcome) => Some(outcome),
            other => {
                *slot = other;
                None
            }
        }
    }
}
