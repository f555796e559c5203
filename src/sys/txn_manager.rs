//! Single-writer admission.

use crate::{KvError, KvResult, WriterAdmission};
use parking_lot::{Condvar, Mutex};
use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    thread::{self, ThreadId},
    time::Duration,
};
use tracing::warn;

/// How long a blocked writer waits before re-checking the gate and logging.
const STALL_INTERVAL: Duration = Duration::from_millis(250);

/// The write transaction holding the gate.
#[derive(Debug, Clone, Copy)]
struct Holder {
    ticket: u64,
    /// Thread that last operated on the transaction.
    thread: ThreadId,
}

/// Exclusive token held by the active top-level write transaction.
#[derive(Debug, Default)]
pub(crate) struct WriterGate {
    owner: Mutex<Option<Holder>>,
    released: Condvar,
    tickets: AtomicU64,
}

impl WriterGate {
    /// Acquires the gate, returning the ticket that identifies the new
    /// holder.
    ///
    /// The holder belongs to the thread that last operated on it. That
    /// thread gets [`KvError::Busy`] under either policy, as waiting would
    /// never finish. Waiting writers give up with [`KvError::EnvClosed`]
    /// when the environment closes.
    pub(crate) fn acquire(&self, policy: WriterAdmission, closed: &AtomicBool) -> KvResult<u64> {
        let me = thread::current().id();
        let mut owner = self.owner.lock();
        let mut warned = false;
        loop {
            if closed.load(Ordering::Acquire) {
                return Err(KvError::EnvClosed);
            }
            match *owner {
                None => {
                    let ticket = self.tickets.fetch_add(1, Ordering::Relaxed) + 1;
                    *owner = Some(Holder { ticket, thread: me });
                    return Ok(ticket);
                }
                Some(holder) if holder.thread == me => return Err(KvError::Busy),
                Some(_) if policy == WriterAdmission::Fail => return Err(KvError::Busy),
                Some(_) => {
                    let timed_out = self.released.wait_for(&mut owner, STALL_INTERVAL).timed_out();
                    if timed_out && !warned {
                        warned = true;
                        warn!(target: "kvdb", "Process stalled, awaiting read-write transaction lock.");
                    }
                }
            }
        }
    }

    /// Records that the calling thread now operates the holder of `ticket`.
    pub(crate) fn enter(&self, ticket: u64) {
        let me = thread::current().id();
        let mut owner = self.owner.lock();
        if let Some(holder) = owner.as_mut()
            && holder.ticket == ticket
        {
            holder.thread = me;
        }
    }

    /// Releases the gate held under `ticket` and wakes one waiting writer.
    pub(crate) fn release(&self, ticket: u64) {
        let mut owner = self.owner.lock();
        if owner.is_some_and(|holder| holder.ticket == ticket) {
            *owner = None;
            self.released.notify_one();
        }
    }

    /// Wakes every waiting writer so they can observe a closed environment.
    pub(crate) fn wake_all(&self) {
        let _guard = self.owner.lock();
        self.released.notify_all();
    }

    #[cfg(test)]
    fn is_held(&self) -> bool {
        self.owner.lock().is_some()
    }
}
