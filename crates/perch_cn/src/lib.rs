//! # Perch Components (perch_cn)
//!
//! Headless interactive components built on `perch_layout` primitives.
//!
//! - **Primitives**: `perch_core` provides geometry, host capabilities and timers
//! - **Layout**: `perch_layout` places overlays and keeps them in place
//! - **Components**: `perch_cn` owns interaction state and produces view snapshots
//!
//! ## Components
//!
//! - **Combobox** - searchable single-select dropdown with a filtered menu

pub mod components;

pub use components::*;

/// Convenience module for accessing components with `cn::` prefix
pub mod cn {
    pub use crate::components::combobox::combobox;
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cn;
    pub use crate::components::combobox::{
        combobox, ChangeEvent, ComboboxBuilder, ComboboxController, ComboboxElements,
        ComboboxOption, ComboboxPhase, ComboboxView, TrailingControl,
    };
}
