//! Timer bookkeeping for one sink session.
//!
//! Timers live in the application (see [`Delegate::create_timer`]); the
//! sink only tracks ids. Two pieces:
//!
//! - [`Timers`] — every id created during one sequencer lifetime. A firing
//!   id that this registry never issued belongs to a previous session and
//!   is ignored. Reset replaces the registry, which is what invalidates
//!   timers armed before it.
//! - [`KeepAliveTimer`] — the single keep-alive slot shared by the
//!   session-establishment and streaming phases. The first arms it when
//!   the SETUP reply arrives, the second re-arms it on every M16.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::peer::Delegate;

/// Registry of timers created through the delegate for one session.
pub struct Timers {
    delegate: Arc<dyn Delegate>,
    issued: HashSet<u32>,
    armed: HashSet<u32>,
}

impl Timers {
    pub fn new(delegate: Arc<dyn Delegate>) -> Self {
        Self {
            delegate,
            issued: HashSet::new(),
            armed: HashSet::new(),
        }
    }

    /// Create a one-shot timer and return its id.
    pub fn arm(&mut self, seconds: u32) -> u32 {
        let id = self.delegate.create_timer(seconds);
        self.issued.insert(id);
        self.armed.insert(id);
        tracing::trace!(timer_id = id, seconds, "timer armed");
        id
    }

    /// Cancel a timer. Ids that already fired or were released are skipped.
    pub fn release(&mut self, id: u32) {
        if self.armed.remove(&id) {
            self.delegate.release_timer(id);
            tracing::trace!(timer_id = id, "timer released");
        }
    }

    /// Record that `id` fired. Returns whether this registry issued it.
    pub fn fired(&mut self, id: u32) -> bool {
        self.armed.remove(&id);
        self.issued.contains(&id)
    }

    /// Release every armed timer (session reset).
    pub fn release_all(&mut self) {
        for id in self.armed.drain() {
            self.delegate.release_timer(id);
        }
    }

    pub fn armed(&self) -> usize {
        self.armed.len()
    }
}

#[derive(Debug, Default)]
struct KeepAliveSlot {
    timer: Option<u32>,
    seconds: u32,
}

/// Keep-alive slot shared by two phases of the same session.
#[derive(Debug, Clone, Default)]
pub struct KeepAliveTimer {
    slot: Arc<Mutex<KeepAliveSlot>>,
}

impl KeepAliveTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)arm the keep-alive for `seconds`, releasing the previous timer.
    /// The period is remembered for [`rearm`](Self::rearm).
    pub fn arm(&self, timers: &mut Timers, seconds: u32) -> u32 {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.timer.take() {
            timers.release(previous);
        }
        let id = timers.arm(seconds);
        slot.timer = Some(id);
        slot.seconds = seconds;
        tracing::debug!(timer_id = id, seconds, "keep-alive armed");
        id
    }

    /// Arm again with the last period used. `None` if never armed.
    pub fn rearm(&self, timers: &mut Timers) -> Option<u32> {
        let seconds = self.slot.lock().seconds;
        (seconds > 0).then(|| self.arm(timers, seconds))
    }

    /// Whether `id` is the currently armed keep-alive timer.
    pub fn is(&self, id: u32) -> bool {
        self.slot.lock().timer == Some(id)
    }

    pub fn current(&self) -> Option<u32> {
        self.slot.lock().timer
    }
}
