//! Overlay widgets
//!
//! - [`Popper`] - floating content anchored to a trigger element
//! - [`OverlayManager`] - shared surface the host renders overlay layers from

pub mod overlay;
pub mod popper;

pub use overlay::{
    overlay_manager, OverlayHandle, OverlayKind, OverlayLayer, OverlayManager, OverlayManagerExt,
    OverlayManagerInner,
};
pub use popper::{OnCloseCallback, Popper};
