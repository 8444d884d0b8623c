//! Popper - floating content anchored to a trigger element
//!
//! The popper is controlled: the consumer decides when it is open with
//! [`Popper::set_open`] and is told about dismissal through `on_close`. While
//! open it owns one overlay layer, keeps it positioned through a
//! [`RepositionScheduler`] and watches pointer-downs so a press anywhere
//! outside the trigger and the popper content can ask the consumer to close.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use perch_core::headless::HeadlessHost;
//! use perch_core::{AnchorRect, SharedHost, Size, Viewport};
//! use perch_layout::prelude::*;
//!
//! let host = Arc::new(Mutex::new(HeadlessHost::new(Viewport::new(800.0, 600.0))));
//! let trigger = host
//!     .lock()
//!     .unwrap()
//!     .insert_element(AnchorRect::from_xywh(100.0, 100.0, 80.0, 24.0), None);
//! let shared: SharedHost = host.clone();
//!
//! let mut popper = Popper::new(&shared, &overlay_manager(), trigger)
//!     .placement(Placement::Bottom)
//!     .on_close(|| println!("dismissed"));
//! popper.set_content(None, Size::new(160.0, 90.0));
//! popper.set_open(true);
//!
//! assert_eq!(popper.result().unwrap().top, 132.0);
//! ```

use std::sync::Arc;

use perch_core::{
    lock_host, ElementId, HostEvent, ListenerKind, ListenerOptions, ListenerScope, PerchConfig,
    SharedHost, Size, Viewport,
};

use crate::placement::{Placement, PlacementRequest, PlacementResult};
use crate::reposition::{RepositionOutcome, RepositionScheduler};
use crate::widgets::overlay::{OverlayHandle, OverlayKind, OverlayManager, OverlayManagerExt};

/// Callback invoked when the popper asks to be closed
pub type OnCloseCallback = Arc<dyn Fn() + Send + Sync>;

/// Anchored floating overlay
pub struct Popper {
    host: SharedHost,
    overlays: OverlayManager,
    target: ElementId,
    /// Element the host rendered the content into, once mounted
    content: Option<ElementId>,
    preferred: Placement,
    on_close: Option<OnCloseCallback>,
    scheduler: RepositionScheduler,
    layer: Option<OverlayHandle>,
    dismiss: Option<ListenerScope>,
}

impl Popper {
    /// Create a closed popper for a trigger element with default settings
    pub fn new(host: &SharedHost, overlays: &OverlayManager, target: ElementId) -> Self {
        let request = PlacementRequest::popper(None, Size::default(), Viewport::default());
        Self {
            host: host.clone(),
            overlays: overlays.clone(),
            target,
            content: None,
            preferred: Placement::Auto,
            on_close: None,
            scheduler: RepositionScheduler::new(host, target, request),
            layer: None,
            dismiss: None,
        }
    }

    /// Apply margin, gap and fade settings
    ///
    /// An open popper is remounted on the new scheduler.
    pub fn with_config(mut self, config: &PerchConfig) -> Self {
        let was_open = self.is_open();
        if was_open {
            self.close();
        }
        let overlay = self.scheduler.overlay_size();
        let request = PlacementRequest::popper(None, overlay, Viewport::default())
            .with_config(config)
            .preferred(self.preferred);
        self.scheduler = RepositionScheduler::new(&self.host, self.target, request)
            .with_fade(config.reposition.fade);
        if was_open {
            self.open();
        }
        self
    }

    /// Preferred side
    pub fn placement(mut self, placement: Placement) -> Self {
        self.set_placement(placement);
        self
    }

    /// Called on a pointer-down outside the trigger and the content while open
    pub fn on_close<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(callback));
        self
    }

    /// Change the preferred side, repositioning if open
    pub fn set_placement(&mut self, placement: Placement) {
        self.preferred = placement;
        if let Some(result) = self.scheduler.set_preferred(placement) {
            self.publish(result);
        }
    }

    /// Record the rendered content element and its measured size
    pub fn set_content(&mut self, element: Option<ElementId>, size: Size) {
        self.content = element;
        if let Some(layer) = self.layer {
            self.overlays.set_size(layer, size);
        }
        if let Some(result) = self.scheduler.set_overlay_size(size) {
            self.publish(result);
        }
    }

    /// Controlled open state
    pub fn set_open(&mut self, open: bool) {
        match (open, self.is_open()) {
            (true, false) => self.open(),
            (false, true) => self.close(),
            _ => {}
        }
    }

    fn open(&mut self) {
        let layer = self.overlays.add(OverlayKind::Popper, self.target);
        self.overlays.set_size(layer, self.scheduler.overlay_size());
        self.layer = Some(layer);

        let result = self.scheduler.open();
        self.publish(result);

        self.dismiss = Some(ListenerScope::acquire(
            &self.host,
            &[(ListenerKind::PointerDown, ListenerOptions::bubble())],
        ));
        tracing::debug!("Popper::open - target {:?}, layer {:?}", self.target, layer);
    }

    fn close(&mut self) {
        self.dismiss = None;
        self.scheduler.close();
        if let Some(layer) = self.layer.take() {
            self.overlays.remove(layer);
        }
        tracing::debug!("Popper::close - target {:?}", self.target);
    }

    fn publish(&self, result: PlacementResult) {
        if let Some(layer) = self.layer {
            self.overlays.set_placement(layer, result);
            // A size change mid-fade must not reveal the stale position.
            self.overlays.set_visible(layer, self.scheduler.is_visible());
        }
    }

    /// Route a host event; returns true if the popper reacted to it
    pub fn handle_event(&mut self, event: &HostEvent) -> bool {
        if !self.is_open() {
            return false;
        }

        if let HostEvent::PointerDown { target, .. } = event {
            let observed = self
                .dismiss
                .as_ref()
                .map(|scope| scope.observes(event))
                .unwrap_or(false);
            if !observed || !self.is_outside(*target) {
                return false;
            }
            tracing::debug!("Popper - outside pointer-down, requesting close");
            if let Some(callback) = self.on_close.clone() {
                callback();
            }
            return true;
        }

        match self.scheduler.handle_event(event) {
            RepositionOutcome::Ignored => false,
            RepositionOutcome::Hidden => {
                if let Some(layer) = self.layer {
                    self.overlays.set_visible(layer, false);
                }
                true
            }
            RepositionOutcome::Moved(result) => {
                self.publish(result);
                true
            }
        }
    }

    /// Whether a pointer-down target lies outside the trigger and the content
    fn is_outside(&self, target: Option<ElementId>) -> bool {
        let Some(target) = target else {
            return true;
        };
        let host = lock_host(&self.host);
        let inside = host.contains(self.target, target)
            || self
                .content
                .map(|content| host.contains(content, target))
                .unwrap_or(false);
        !inside
    }

    /// Whether the popper is open
    pub fn is_open(&self) -> bool {
        self.scheduler.is_open()
    }

    /// Whether the popper is currently drawn (false during a fade)
    pub fn is_visible(&self) -> bool {
        self.scheduler.is_visible()
    }

    /// Last computed placement (None while closed)
    pub fn result(&self) -> Option<PlacementResult> {
        self.scheduler.result()
    }

    /// Overlay layer while open
    pub fn layer(&self) -> Option<OverlayHandle> {
        self.layer
    }

    /// Trigger element
    pub fn target(&self) -> ElementId {
        self.target
    }
}

impl Drop for Popper {
    fn drop(&mut self) {
        if let Some(layer) = self.layer.take() {
            self.overlays.remove(layer);
        }
    }
}

impl std::fmt::Debug for Popper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Popper")
            .field("target", &self.target)
            .field("content", &self.content)
            .field("preferred", &self.preferred)
            .field("layer", &self.layer)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
