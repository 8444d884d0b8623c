//! Reposition scheduling
//!
//! `RepositionScheduler` decides *when* an overlay's placement is recomputed:
//!
//! - immediately when it opens, so the first rendered frame is already correct
//! - on every window resize
//! - on every scroll anywhere in the page (a capturing subscription, so nested
//!   scroll containers are observed too)
//!
//! With fading enabled, a resize or scroll hides the overlay, waits for the
//! next frame, recomputes, and shows it again. Large jumps then appear as a
//! quick fade instead of a visible snap.
//!
//! While closed the scheduler holds no subscriptions and no pending frame.
//!
//! # Lifecycle
//!
//! ```text
//! Inactive --OPEN--> Shown --INVALIDATE--> Settling --FRAME--> Shown
//!                      |                      |
//!                      +--------CLOSE---------+--> Inactive
//! ```

use perch_core::{
    lock_host, ElementId, FrameSlot, HostEvent, ListenerKind, ListenerOptions, ListenerScope,
    SharedHost, Size, StateTransitions,
};

use crate::placement::{compute_placement, Placement, PlacementRequest, PlacementResult};

/// Event codes for the reposition state machine
pub mod reposition_events {
    /// Overlay opened (Inactive -> Shown)
    pub const OPEN: u32 = 30001;
    /// Overlay closed (any -> Inactive)
    pub const CLOSE: u32 = 30002;
    /// Geometry may have changed (Shown -> Settling)
    pub const INVALIDATE: u32 = 30003;
    /// Deferred recompute ran (Settling -> Shown)
    pub const FRAME: u32 = 30004;
}

/// Scheduler phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RepositionState {
    /// Closed: no listeners, no position
    #[default]
    Inactive,
    /// Open and visible at the last computed position
    Shown,
    /// Open but hidden until the next frame recomputes the position
    Settling,
}

impl StateTransitions for RepositionState {
    fn on_event(&self, event: u32) -> Option<Self> {
        use reposition_events::*;
        use RepositionState::*;

        match (self, event) {
            (Inactive, OPEN) => Some(Shown),
            (Shown, INVALIDATE) => Some(Settling),
            (Settling, FRAME) => Some(Shown),
            (Shown, CLOSE) | (Settling, CLOSE) => Some(Inactive),
            _ => None,
        }
    }
}

/// What a host event did to the overlay
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RepositionOutcome {
    /// Not relevant to this scheduler
    Ignored,
    /// Overlay hidden while waiting for the next frame
    Hidden,
    /// Position recomputed (and overlay visible)
    Moved(PlacementResult),
}

/// Listeners held while open
const REPOSITION_LISTENERS: [(ListenerKind, ListenerOptions); 2] = [
    (ListenerKind::Resize, ListenerOptions { capture: false }),
    (ListenerKind::Scroll, ListenerOptions { capture: true }),
];

/// Keeps an overlay's placement current while it is open
pub struct RepositionScheduler {
    host: SharedHost,
    anchor: ElementId,
    /// Request template; anchor and viewport are filled in on every recompute
    request: PlacementRequest,
    fade: bool,
    state: RepositionState,
    listeners: Option<ListenerScope>,
    frame: FrameSlot,
    result: Option<PlacementResult>,
}

impl RepositionScheduler {
    /// Create a scheduler for an anchor element
    ///
    /// `request` supplies the overlay size, preference, margins and fit; its
    /// anchor and viewport are replaced with live host measurements.
    pub fn new(host: &SharedHost, anchor: ElementId, request: PlacementRequest) -> Self {
        Self {
            host: host.clone(),
            anchor,
            request,
            fade: true,
            state: RepositionState::Inactive,
            listeners: None,
            frame: FrameSlot::new(),
            result: None,
        }
    }

    /// Enable or disable the hide/recompute/show cycle
    pub fn with_fade(mut self, fade: bool) -> Self {
        self.fade = fade;
        self
    }

    /// Start tracking: subscribe and compute synchronously
    pub fn open(&mut self) -> PlacementResult {
        if let Some(result) = self.result.filter(|_| self.is_open()) {
            return result;
        }

        self.listeners = Some(ListenerScope::acquire(&self.host, &REPOSITION_LISTENERS));
        self.state.transition(reposition_events::OPEN);
        let result = self.recompute();

        tracing::debug!(
            "RepositionScheduler::open - placed {} at ({}, {})",
            result.placement,
            result.left,
            result.top
        );
        result
    }

    /// Stop tracking: release every listener and any pending frame
    pub fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        {
            let mut host = lock_host(&self.host);
            self.frame.cancel(&mut *host);
        }
        // Dropped outside the host lock; the scope locks it to unsubscribe.
        self.listeners = None;
        self.state.transition(reposition_events::CLOSE);
        self.result = None;
        tracing::debug!("RepositionScheduler::close - listeners released");
    }

    /// Route a host event
    pub fn handle_event(&mut self, event: &HostEvent) -> RepositionOutcome {
        if !self.is_open() {
            return RepositionOutcome::Ignored;
        }

        match event {
            HostEvent::FrameReady(id) => {
                if !self.frame.take_ready(*id) {
                    return RepositionOutcome::Ignored;
                }
                let result = self.recompute();
                self.state.transition(reposition_events::FRAME);
                RepositionOutcome::Moved(result)
            }
            HostEvent::Resize { .. } | HostEvent::Scroll { .. } => {
                let observed = self
                    .listeners
                    .as_ref()
                    .map(|scope| scope.observes(event))
                    .unwrap_or(false);
                if !observed {
                    return RepositionOutcome::Ignored;
                }

                if self.fade {
                    self.state.transition(reposition_events::INVALIDATE);
                    let mut host = lock_host(&self.host);
                    self.frame.request(&mut *host);
                    RepositionOutcome::Hidden
                } else {
                    RepositionOutcome::Moved(self.recompute())
                }
            }
            HostEvent::PointerDown { .. } | HostEvent::TimerFired(_) => RepositionOutcome::Ignored,
        }
    }

    /// Record the measured overlay size, recomputing if open
    pub fn set_overlay_size(&mut self, size: Size) -> Option<PlacementResult> {
        self.request.overlay = size;
        self.refresh()
    }

    /// Change the preferred side, recomputing if open
    pub fn set_preferred(&mut self, preferred: Placement) -> Option<PlacementResult> {
        self.request.preferred = preferred;
        self.refresh()
    }

    fn refresh(&mut self) -> Option<PlacementResult> {
        if self.is_open() {
            Some(self.recompute())
        } else {
            None
        }
    }

    /// Measure the anchor and viewport and run the placement engine
    fn recompute(&mut self) -> PlacementResult {
        let (anchor, viewport) = {
            let host = lock_host(&self.host);
            (host.measure(self.anchor), host.viewport())
        };
        if anchor.is_none() {
            tracing::trace!("RepositionScheduler - anchor {:?} not measurable", self.anchor);
        }

        let request = PlacementRequest {
            anchor,
            viewport,
            ..self.request
        };
        let result = compute_placement(&request);
        self.result = Some(result);
        result
    }

    /// Last computed placement (None while closed)
    pub fn result(&self) -> Option<PlacementResult> {
        self.result
    }

    /// Current overlay size used for placement
    pub fn overlay_size(&self) -> Size {
        self.request.overlay
    }

    /// Anchor element being tracked
    pub fn anchor(&self) -> ElementId {
        self.anchor
    }

    /// Whether the overlay is open
    pub fn is_open(&self) -> bool {
        self.state != RepositionState::Inactive
    }

    /// Whether the overlay should currently be drawn
    pub fn is_visible(&self) -> bool {
        self.state == RepositionState::Shown
    }

    /// Current phase
    pub fn state(&self) -> RepositionState {
        self.state
    }
}

impl Drop for RepositionScheduler {
    fn drop(&mut self) {
        if self.frame.is_pending() {
            let mut host = lock_host(&self.host);
            self.frame.cancel(&mut *host);
        }
    }
}

impl std::fmt::Debug for RepositionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositionScheduler")
            .field("anchor", &self.anchor)
            .field("state", &self.state)
            .field("fade", &self.fade)
            .field("result", &self.result)
            .finish()
    }
}
