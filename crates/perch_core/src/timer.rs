//! Single-slot handles for timeouts and frame requests
//!
//! A slot owns at most one pending host handle. Arming a timer slot clears the
//! previous timeout before scheduling the next one, so a widget can never have
//! two overlapping delayed transitions. Frame slots coalesce instead: while a
//! frame is pending, further requests reuse it.

use crate::host::{FrameId, HostTimers, TimerId};

/// Holder for at most one pending timeout
#[derive(Debug, Default)]
pub struct TimerSlot {
    pending: Option<TimerId>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timeout, replacing any pending one
    pub fn arm<H: HostTimers + ?Sized>(&mut self, host: &mut H, delay_ms: u64) -> TimerId {
        if let Some(previous) = self.pending.take() {
            host.clear_timeout(previous);
        }
        let id = host.set_timeout(delay_ms);
        self.pending = Some(id);
        id
    }

    /// Cancel the pending timeout, returning whether one existed
    pub fn cancel<H: HostTimers + ?Sized>(&mut self, host: &mut H) -> bool {
        match self.pending.take() {
            Some(id) => {
                host.clear_timeout(id);
                true
            }
            None => false,
        }
    }

    /// Consume a fired timer if it is the one this slot is waiting for
    ///
    /// Stale ids (already cancelled or replaced) return `false`.
    pub fn take_fired(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Whether a timeout is pending
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending timeout handle
    pub fn pending(&self) -> Option<TimerId> {
        self.pending
    }
}

/// Holder for at most one pending frame request
#[derive(Debug, Default)]
pub struct FrameSlot {
    pending: Option<FrameId>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a frame unless one is already pending
    pub fn request<H: HostTimers + ?Sized>(&mut self, host: &mut H) -> FrameId {
        match self.pending {
            Some(id) => id,
            None => {
                let id = host.request_frame();
                self.pending = Some(id);
                id
            }
        }
    }

    /// Cancel the pending frame request
    pub fn cancel<H: HostTimers + ?Sized>(&mut self, host: &mut H) -> bool {
        match self.pending.take() {
            Some(id) => {
                host.cancel_frame(id);
                true
            }
            None => false,
        }
    }

    /// Consume a ready frame if it is the one this slot is waiting for
    pub fn take_ready(&mut self, id: FrameId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Whether a frame is pending
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
