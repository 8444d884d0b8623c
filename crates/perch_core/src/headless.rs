//! In-memory host with a virtual clock
//!
//! `HeadlessHost` implements every host capability without a window system.
//! Elements are plain rectangles in a parent tree, timers run on a manual
//! clock, and the host keeps counters for subscriptions so tests can check
//! that widgets release everything they acquire.
//!
//! Methods that simulate user or platform activity (`pointer_down`, `resize`,
//! `scroll_window`, `advance`, `flush_frames`) return the [`HostEvent`]s the
//! caller should deliver to its widgets.

use slotmap::SlotMap;

use crate::events::{HostEvent, ListenerKind, ListenerOptions};
use crate::geometry::{AnchorRect, Point, Viewport};
use crate::host::{ElementId, FrameId, HostEvents, HostGeometry, HostTimers, ListenerId, TimerId};

/// A node in the headless element tree
#[derive(Clone, Debug)]
struct ElementNode {
    /// Bounding box in viewport coordinates (`None` = not measurable yet)
    rect: Option<AnchorRect>,
    parent: Option<ElementId>,
}

/// A pending timeout
#[derive(Clone, Copy, Debug)]
struct PendingTimer {
    deadline_ms: u64,
    /// Scheduling order, used to break deadline ties
    seq: u64,
}

/// Host implementation backed by plain data structures
#[derive(Debug)]
pub struct HeadlessHost {
    viewport: Viewport,
    elements: SlotMap<ElementId, ElementNode>,
    listeners: SlotMap<ListenerId, (ListenerKind, ListenerOptions)>,
    timers: SlotMap<TimerId, PendingTimer>,
    frames: SlotMap<FrameId, ()>,
    frame_queue: Vec<FrameId>,
    focused: Option<ElementId>,
    now_ms: u64,
    next_seq: u64,
    subscribe_count: usize,
    unsubscribe_count: usize,
}

impl HeadlessHost {
    /// Create a host with the given viewport
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            elements: SlotMap::with_key(),
            listeners: SlotMap::with_key(),
            timers: SlotMap::with_key(),
            frames: SlotMap::with_key(),
            frame_queue: Vec::new(),
            focused: None,
            now_ms: 0,
            next_seq: 0,
            subscribe_count: 0,
            unsubscribe_count: 0,
        }
    }

    // =========================================================================
    // Element tree
    // =========================================================================

    /// Add a measurable element
    pub fn insert_element(&mut self, rect: AnchorRect, parent: Option<ElementId>) -> ElementId {
        self.elements.insert(ElementNode {
            rect: Some(rect),
            parent,
        })
    }

    /// Add an element that has no geometry yet (e.g. not laid out)
    pub fn insert_unmeasured(&mut self, parent: Option<ElementId>) -> ElementId {
        self.elements.insert(ElementNode { rect: None, parent })
    }

    /// Replace an element's rectangle
    pub fn set_rect(&mut self, element: ElementId, rect: AnchorRect) {
        if let Some(node) = self.elements.get_mut(element) {
            node.rect = Some(rect);
        }
    }

    /// Remove an element (children keep a dangling parent and stop matching `contains`)
    pub fn remove_element(&mut self, element: ElementId) {
        self.elements.remove(element);
        if self.focused == Some(element) {
            self.focused = None;
        }
    }

    /// Currently focused element
    pub fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    // =========================================================================
    // Simulated platform activity
    // =========================================================================

    /// Resize the viewport
    pub fn resize(&mut self, width: f32, height: f32) -> HostEvent {
        self.viewport.width = width;
        self.viewport.height = height;
        HostEvent::Resize { width, height }
    }

    /// Scroll the page; every element moves the opposite way in viewport coordinates
    pub fn scroll_window(&mut self, dx: f32, dy: f32) -> HostEvent {
        self.viewport.scroll_x += dx;
        self.viewport.scroll_y += dy;
        for node in self.elements.values_mut() {
            if let Some(rect) = node.rect.as_mut() {
                *rect = rect.translate(-dx, -dy);
            }
        }
        HostEvent::Scroll { source: None }
    }

    /// Scroll the contents of one element; its descendants move, it does not
    pub fn scroll_element(&mut self, element: ElementId, dx: f32, dy: f32) -> HostEvent {
        let descendants: Vec<ElementId> = self
            .elements
            .keys()
            .filter(|&id| id != element && self.contains(element, id))
            .collect();
        for id in descendants {
            if let Some(rect) = self.elements[id].rect.as_mut() {
                *rect = rect.translate(-dx, -dy);
            }
        }
        HostEvent::Scroll {
            source: Some(element),
        }
    }

    /// Press the pointer at a position, targeting the deepest element under it
    pub fn pointer_down(&mut self, x: f32, y: f32) -> HostEvent {
        let position = Point::new(x, y);
        HostEvent::PointerDown {
            position,
            target: self.hit_test(position),
        }
    }

    /// Press the pointer on a specific element (at its center)
    pub fn pointer_down_on(&mut self, element: ElementId) -> HostEvent {
        let position = self
            .measure(element)
            .map(|r| Point::new(r.center_x(), r.center_y()))
            .unwrap_or_default();
        HostEvent::PointerDown {
            position,
            target: Some(element),
        }
    }

    /// Deepest element containing a point
    pub fn hit_test(&self, point: Point) -> Option<ElementId> {
        self.elements
            .iter()
            .filter(|(_, node)| node.rect.map(|r| r.contains(point)).unwrap_or(false))
            .map(|(id, _)| (self.depth(id), id))
            .max()
            .map(|(_, id)| id)
    }

    fn depth(&self, element: ElementId) -> usize {
        let mut depth = 0;
        let mut current = self.elements.get(element).and_then(|n| n.parent);
        while let Some(id) = current {
            depth += 1;
            current = self.elements.get(id).and_then(|n| n.parent);
        }
        depth
    }

    // =========================================================================
    // Virtual clock
    // =========================================================================

    /// Current virtual time
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Advance the clock, returning fired timers in deadline order
    pub fn advance(&mut self, ms: u64) -> Vec<HostEvent> {
        self.now_ms += ms;
        let now = self.now_ms;

        let mut due: Vec<(u64, u64, TimerId)> = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline_ms <= now)
            .map(|(id, t)| (t.deadline_ms, t.seq, id))
            .collect();
        due.sort();

        due.into_iter()
            .map(|(_, _, id)| {
                self.timers.remove(id);
                HostEvent::TimerFired(id)
            })
            .collect()
    }

    /// Deliver every pending frame request in request order
    pub fn flush_frames(&mut self) -> Vec<HostEvent> {
        let queue = std::mem::take(&mut self.frame_queue);
        queue
            .into_iter()
            .filter(|&id| self.frames.remove(id).is_some())
            .map(HostEvent::FrameReady)
            .collect()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Whether any live subscription observes `event`
    ///
    /// Timer and frame events are always deliverable.
    pub fn is_observed(&self, event: &HostEvent) -> bool {
        match event.listener_kind() {
            None => true,
            Some(kind) => self
                .listeners
                .values()
                .any(|&(k, options)| k == kind && event.observed_with(options)),
        }
    }

    /// Number of live subscriptions
    pub fn active_listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of live subscriptions of one kind
    pub fn active_listeners(&self, kind: ListenerKind) -> usize {
        self.listeners.values().filter(|(k, _)| *k == kind).count()
    }

    /// Total subscribe calls
    pub fn subscribe_count(&self) -> usize {
        self.subscribe_count
    }

    /// Total unsubscribe calls that matched a live subscription
    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribe_count
    }

    /// Number of scheduled, not yet fired timeouts
    pub fn pending_timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Number of pending frame requests
    pub fn pending_frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl HostGeometry for HeadlessHost {
    fn measure(&self, element: ElementId) -> Option<AnchorRect> {
        self.elements.get(element).and_then(|n| n.rect)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn contains(&self, ancestor: ElementId, target: ElementId) -> bool {
        let mut current = Some(target);
        while let Some(id) = current {
            if id == ancestor {
                return self.elements.contains_key(id);
            }
            current = self.elements.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn focus(&mut self, element: ElementId) {
        if self.elements.contains_key(element) {
            self.focused = Some(element);
        }
    }
}

impl HostEvents for HeadlessHost {
    fn subscribe(&mut self, kind: ListenerKind, options: ListenerOptions) -> ListenerId {
        self.subscribe_count += 1;
        self.listeners.insert((kind, options))
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        if self.listeners.remove(id).is_some() {
            self.unsubscribe_count += 1;
        } else {
            tracing::warn!("HeadlessHost::unsubscribe - unknown listener {:?}", id);
        }
    }
}

impl HostTimers for HeadlessHost {
    fn set_timeout(&mut self, delay_ms: u64) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.insert(PendingTimer {
            deadline_ms: self.now_ms + delay_ms,
            seq,
        })
    }

    fn clear_timeout(&mut self, id: TimerId) {
        self.timers.remove(id);
    }

    fn request_frame(&mut self) -> FrameId {
        let id = self.frames.insert(());
        self.frame_queue.push(id);
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.frames.remove(id);
        self.frame_queue.retain(|&f| f != id);
    }
}
