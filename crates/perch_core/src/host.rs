//! Host platform capabilities
//!
//! Widgets never talk to a window system directly. Everything they need from
//! the platform is expressed through three small traits:
//!
//! - [`HostGeometry`]: measure elements, read the viewport, test containment, move focus
//! - [`HostEvents`]: subscribe to pointer-down, resize and scroll notifications
//! - [`HostTimers`]: cancellable timeouts and next-frame callbacks
//!
//! The host hands out opaque handles and later delivers [`HostEvent`](crate::HostEvent)s
//! that reference them. Widgets dispatch those events themselves, so no host
//! callback ever re-enters widget state.

use std::sync::{Arc, Mutex, MutexGuard};

use slotmap::new_key_type;

use crate::events::{ListenerKind, ListenerOptions};
use crate::geometry::{AnchorRect, Viewport};

new_key_type! {
    /// Handle to a host element (anchor, container, overlay body)
    pub struct ElementId;
    /// Handle to an event subscription
    pub struct ListenerId;
    /// Handle to a pending timeout
    pub struct TimerId;
    /// Handle to a pending next-frame callback
    pub struct FrameId;
}

impl ElementId {
    /// Convert to raw u64 for storage
    pub fn to_raw(&self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }

    /// Reconstruct from raw u64
    pub fn from_raw(raw: u64) -> Self {
        slotmap::KeyData::from_ffi(raw).into()
    }
}

/// Geometry and focus queries
pub trait HostGeometry {
    /// Bounding box of an element in viewport coordinates
    ///
    /// Returns `None` when the element is not mounted or not yet measurable.
    fn measure(&self, element: ElementId) -> Option<AnchorRect>;

    /// Current viewport size and page scroll offset
    fn viewport(&self) -> Viewport;

    /// Whether `target` is `ancestor` or one of its descendants
    fn contains(&self, ancestor: ElementId, target: ElementId) -> bool;

    /// Move keyboard focus to an element
    fn focus(&mut self, element: ElementId);
}

/// Event subscription primitives
pub trait HostEvents {
    /// Start delivering events of `kind` to the caller
    fn subscribe(&mut self, kind: ListenerKind, options: ListenerOptions) -> ListenerId;

    /// Stop delivering events for a subscription
    fn unsubscribe(&mut self, id: ListenerId);
}

/// Delayed-callback primitives
pub trait HostTimers {
    /// Schedule a [`HostEvent::TimerFired`](crate::HostEvent::TimerFired) after `delay_ms`
    fn set_timeout(&mut self, delay_ms: u64) -> TimerId;

    /// Cancel a pending timeout (no-op if it already fired)
    fn clear_timeout(&mut self, id: TimerId);

    /// Schedule a [`HostEvent::FrameReady`](crate::HostEvent::FrameReady) at the next rendering opportunity
    fn request_frame(&mut self) -> FrameId;

    /// Cancel a pending frame request
    fn cancel_frame(&mut self, id: FrameId);
}

/// Everything a widget needs from the platform
pub trait Host: HostGeometry + HostEvents + HostTimers {}

impl<T: HostGeometry + HostEvents + HostTimers + ?Sized> Host for T {}

/// Shared handle to the host, held by every widget instance
pub type SharedHost = Arc<Mutex<dyn Host + Send>>;

/// Lock the shared host
///
/// Widgets run on a single cooperative thread, so a poisoned lock only means a
/// previous handler panicked; the host state itself is still usable.
pub fn lock_host(host: &SharedHost) -> MutexGuard<'_, dyn Host + Send + 'static> {
    host.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
