//! Perch Layout
//!
//! Viewport-aware placement for anchored overlays.
//!
//! - [`compute_placement`] is a pure function from anchor, overlay size and
//!   viewport to a clamped position and the side actually used
//! - [`RepositionScheduler`] keeps a placement current while an overlay is
//!   open, recomputing on resize and on scroll anywhere in the page
//! - [`widgets`] holds the shared overlay surface and the [`Popper`] widget
//!
//! # Example
//!
//! ```rust
//! use perch_core::{AnchorRect, Size, Viewport};
//! use perch_layout::prelude::*;
//!
//! // A 300px tall popper under an anchor near the bottom of the screen
//! let anchor = AnchorRect::from_xywh(400.0, 750.0, 100.0, 30.0);
//! let request = PlacementRequest::popper(
//!     Some(anchor),
//!     Size::new(200.0, 300.0),
//!     Viewport::new(1200.0, 800.0),
//! );
//!
//! let result = compute_placement(&request);
//! assert_eq!(result.placement, Side::Top);
//! ```

pub mod placement;
pub mod reposition;
pub mod widgets;

pub use placement::{
    compute_placement, MenuSizing, OverlayFit, ParsePlacementError, Placement, PlacementRequest,
    PlacementResult, Side,
};
pub use reposition::{RepositionOutcome, RepositionScheduler, RepositionState};
pub use widgets::{
    overlay_manager, OverlayHandle, OverlayKind, OverlayLayer, OverlayManager, OverlayManagerExt,
    Popper,
};

pub mod prelude {
    pub use crate::placement::{
        compute_placement, MenuSizing, OverlayFit, Placement, PlacementRequest, PlacementResult,
        Side,
    };
    pub use crate::reposition::{RepositionOutcome, RepositionScheduler};
    pub use crate::widgets::overlay::{
        overlay_manager, OverlayHandle, OverlayKind, OverlayLayer, OverlayManager,
        OverlayManagerExt,
    };
    pub use crate::widgets::popper::Popper;
}
