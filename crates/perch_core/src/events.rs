//! Host events delivered to widgets

use crate::geometry::Point;
use crate::host::{ElementId, FrameId, TimerId};

/// Categories of host notifications a widget can subscribe to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Pointer pressed anywhere in the document
    PointerDown,
    /// Window resized
    Resize,
    /// Window or element scrolled
    Scroll,
}

/// Subscription options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
    /// Observe the event during the capturing phase
    ///
    /// Scroll events do not bubble, so only a capturing subscription sees
    /// scrolling of nested containers.
    pub capture: bool,
}

impl ListenerOptions {
    /// Capturing-phase subscription
    pub fn capture() -> Self {
        Self { capture: true }
    }

    /// Bubbling-phase subscription
    pub fn bubble() -> Self {
        Self { capture: false }
    }
}

/// A discrete event delivered by the host
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// Pointer pressed
    PointerDown {
        /// Position in viewport coordinates
        position: Point,
        /// Element under the pointer, if any
        target: Option<ElementId>,
    },
    /// Window resized
    Resize {
        /// New viewport width
        width: f32,
        /// New viewport height
        height: f32,
    },
    /// Something scrolled
    Scroll {
        /// Scrolled element, `None` for the window itself
        source: Option<ElementId>,
    },
    /// A timeout scheduled with `set_timeout` elapsed
    TimerFired(TimerId),
    /// A frame requested with `request_frame` is ready
    FrameReady(FrameId),
}

impl HostEvent {
    /// The subscription category this event belongs to
    ///
    /// Timer and frame events are addressed by handle and need no subscription.
    pub fn listener_kind(&self) -> Option<ListenerKind> {
        match self {
            HostEvent::PointerDown { .. } => Some(ListenerKind::PointerDown),
            HostEvent::Resize { .. } => Some(ListenerKind::Resize),
            HostEvent::Scroll { .. } => Some(ListenerKind::Scroll),
            HostEvent::TimerFired(_) | HostEvent::FrameReady(_) => None,
        }
    }

    /// Whether a subscription with `options` observes this event
    ///
    /// Element scrolls are only visible to capturing listeners; window scrolls
    /// and every other kind reach both phases.
    pub fn observed_with(&self, options: ListenerOptions) -> bool {
        match self {
            HostEvent::Scroll { source: Some(_) } => options.capture,
            _ => true,
        }
    }
}
