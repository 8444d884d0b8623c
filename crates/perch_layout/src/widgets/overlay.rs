//! Overlay surface
//!
//! Anchored overlays (poppers and combobox menus) render outside the normal
//! layout tree so ancestors with clipping or their own stacking context
//! cannot hide them. The host renders one absolutely positioned layer per
//! entry in the [`OverlayManager`], in z-priority order.
//!
//! Each open overlay owns exactly one layer. Layers are independent: any
//! number of poppers and menus can be open at the same time.
//!
//! # Example
//!
//! ```rust
//! use perch_core::ElementId;
//! use perch_layout::prelude::*;
//!
//! let overlays = overlay_manager();
//! let handle = overlays.add(OverlayKind::Menu, ElementId::from_raw(1));
//! overlays.set_placement(
//!     handle,
//!     PlacementResult { top: 40.0, left: 10.0, ..Default::default() },
//! );
//! assert!(overlays.layer(handle).is_some());
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use perch_core::{ElementId, Point, Size};

use crate::placement::PlacementResult;

// =============================================================================
// OverlayKind
// =============================================================================

/// What an overlay layer contains
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum OverlayKind {
    /// Floating content anchored to a trigger
    #[default]
    Popper,
    /// Combobox option list
    Menu,
}

impl OverlayKind {
    /// Default stacking priority for this kind
    pub fn z_priority(&self) -> i32 {
        match self {
            OverlayKind::Popper => 100,
            OverlayKind::Menu => 110,
        }
    }
}

// =============================================================================
// OverlayHandle
// =============================================================================

/// Handle to one overlay layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OverlayHandle(u64);

impl OverlayHandle {
    fn new(id: u64) -> Self {
        Self(id)
    }

    /// Reconstruct a handle from a raw ID
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID
    pub fn id(&self) -> u64 {
        self.0
    }
}

// =============================================================================
// OverlayLayer
// =============================================================================

/// One absolutely positioned layer
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayLayer {
    pub handle: OverlayHandle,
    pub kind: OverlayKind,
    /// Element the layer is anchored to
    pub anchor: ElementId,
    /// Last computed position (None until first placement)
    pub placement: Option<PlacementResult>,
    /// Width and height the host should give the layer
    pub size: Size,
    /// Hidden layers stay mounted but are not drawn (fade cycle)
    pub visible: bool,
    pub z_priority: i32,
}

impl OverlayLayer {
    /// Whether the host should draw this layer
    pub fn is_drawn(&self) -> bool {
        self.visible && self.placement.is_some()
    }

    /// Whether a page-coordinate point lies within the drawn layer
    pub fn contains(&self, point: Point) -> bool {
        let Some(placement) = self.placement.filter(|_| self.visible) else {
            return false;
        };
        let height = placement
            .max_height
            .map(|cap| self.size.height.min(cap))
            .unwrap_or(self.size.height);
        point.x >= placement.left
            && point.x <= placement.left + self.size.width
            && point.y >= placement.top
            && point.y <= placement.top + height
    }
}

// =============================================================================
// OverlayManagerInner
// =============================================================================

/// Inner state of the overlay manager
pub struct OverlayManagerInner {
    /// Layers in insertion order
    layers: IndexMap<OverlayHandle, OverlayLayer>,
    next_id: AtomicU64,
    /// Set whenever a layer is added, removed, moved or shown/hidden
    dirty: AtomicBool,
}

impl Default for OverlayManagerInner {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayManagerInner {
    /// Create an empty surface
    pub fn new() -> Self {
        Self {
            layers: IndexMap::new(),
            next_id: AtomicU64::new(1),
            dirty: AtomicBool::new(false),
        }
    }

    /// Check and clear the dirty flag
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    /// Check the dirty flag without clearing it
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Mount a new, not yet positioned layer
    pub fn add(&mut self, kind: OverlayKind, anchor: ElementId) -> OverlayHandle {
        let handle = OverlayHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst));

        self.layers.insert(
            handle,
            OverlayLayer {
                handle,
                kind,
                anchor,
                placement: None,
                size: Size::default(),
                visible: true,
                z_priority: kind.z_priority(),
            },
        );
        self.mark_dirty();

        tracing::debug!(
            "OverlayManager::add - {:?} layer {:?}, now have {} layers",
            kind,
            handle,
            self.layers.len()
        );
        handle
    }

    /// Record a computed position
    pub fn set_placement(&mut self, handle: OverlayHandle, placement: PlacementResult) {
        if let Some(layer) = self.layers.get_mut(&handle) {
            if layer.placement != Some(placement) {
                layer.placement = Some(placement);
                self.mark_dirty();
            }
        }
    }

    /// Record the layer's size
    pub fn set_size(&mut self, handle: OverlayHandle, size: Size) {
        if let Some(layer) = self.layers.get_mut(&handle) {
            if layer.size != size {
                layer.size = size;
                self.mark_dirty();
            }
        }
    }

    /// Show or hide a mounted layer
    pub fn set_visible(&mut self, handle: OverlayHandle, visible: bool) {
        if let Some(layer) = self.layers.get_mut(&handle) {
            if layer.visible != visible {
                layer.visible = visible;
                self.mark_dirty();
            }
        }
    }

    /// Unmount a layer
    pub fn remove(&mut self, handle: OverlayHandle) -> Option<OverlayLayer> {
        let removed = self.layers.shift_remove(&handle);
        if removed.is_some() {
            self.mark_dirty();
            tracing::debug!(
                "OverlayManager::remove - layer {:?}, {} layers left",
                handle,
                self.layers.len()
            );
        }
        removed
    }

    /// Look up a layer
    pub fn get(&self, handle: OverlayHandle) -> Option<&OverlayLayer> {
        self.layers.get(&handle)
    }

    /// Layers sorted by z-priority (insertion order breaks ties)
    pub fn layers_sorted(&self) -> Vec<&OverlayLayer> {
        let mut layers: Vec<_> = self.layers.values().collect();
        layers.sort_by_key(|layer| layer.z_priority);
        layers
    }

    /// Topmost drawn layer containing a page-coordinate point
    pub fn hit_test(&self, point: Point) -> Option<OverlayHandle> {
        self.layers_sorted()
            .into_iter()
            .rev()
            .find(|layer| layer.contains(point))
            .map(|layer| layer.handle)
    }

    /// Whether any layer is drawn
    pub fn has_visible_overlays(&self) -> bool {
        self.layers.values().any(OverlayLayer::is_drawn)
    }

    /// Number of mounted layers
    pub fn overlay_count(&self) -> usize {
        self.layers.len()
    }
}

impl std::fmt::Debug for OverlayManagerInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayManagerInner")
            .field("layers", &self.layers.len())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

// =============================================================================
// OverlayManager
// =============================================================================

/// Thread-safe overlay manager
pub type OverlayManager = Arc<Mutex<OverlayManagerInner>>;

/// Create a new overlay manager
pub fn overlay_manager() -> OverlayManager {
    Arc::new(Mutex::new(OverlayManagerInner::new()))
}

fn lock(manager: &OverlayManager) -> MutexGuard<'_, OverlayManagerInner> {
    manager.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Convenience methods on the shared handle
pub trait OverlayManagerExt {
    /// Mount a new layer
    fn add(&self, kind: OverlayKind, anchor: ElementId) -> OverlayHandle;
    /// Record a computed position
    fn set_placement(&self, handle: OverlayHandle, placement: PlacementResult);
    /// Record the layer's size
    fn set_size(&self, handle: OverlayHandle, size: Size);
    /// Show or hide a layer
    fn set_visible(&self, handle: OverlayHandle, visible: bool);
    /// Unmount a layer
    fn remove(&self, handle: OverlayHandle);
    /// Snapshot of one layer
    fn layer(&self, handle: OverlayHandle) -> Option<OverlayLayer>;
    /// Whether a layer is mounted and drawn
    fn is_visible(&self, handle: OverlayHandle) -> bool;
    /// Topmost drawn layer at a page-coordinate point
    fn hit_test(&self, point: Point) -> Option<OverlayHandle>;
    /// Number of mounted layers
    fn overlay_count(&self) -> usize;
    /// Check and clear the dirty flag
    fn take_dirty(&self) -> bool;
}

impl OverlayManagerExt for OverlayManager {
    fn add(&self, kind: OverlayKind, anchor: ElementId) -> OverlayHandle {
        lock(self).add(kind, anchor)
    }

    fn set_placement(&self, handle: OverlayHandle, placement: PlacementResult) {
        lock(self).set_placement(handle, placement);
    }

    fn set_size(&self, handle: OverlayHandle, size: Size) {
        lock(self).set_size(handle, size);
    }

    fn set_visible(&self, handle: OverlayHandle, visible: bool) {
        lock(self).set_visible(handle, visible);
    }

    fn remove(&self, handle: OverlayHandle) {
        lock(self).remove(handle);
    }

    fn layer(&self, handle: OverlayHandle) -> Option<OverlayLayer> {
        lock(self).get(handle).cloned()
    }

    fn is_visible(&self, handle: OverlayHandle) -> bool {
        lock(self)
            .get(handle)
            .map(OverlayLayer::is_drawn)
            .unwrap_or(false)
    }

    fn hit_test(&self, point: Point) -> Option<OverlayHandle> {
        lock(self).hit_test(point)
    }

    fn overlay_count(&self) -> usize {
        lock(self).overlay_count()
    }

    fn take_dirty(&self) -> bool {
        lock(self).take_dirty()
    }
}
