//! Interactive components built on perch_layout overlays
//!
//! Each component follows a consistent pattern:
//! - Builder function (e.g., `combobox()`)
//! - Controller that owns the interaction state machine
//! - Serializable view snapshot for the renderer

pub mod combobox;

pub use combobox::{
    combobox, filtered_options, ChangeCallback, ChangeEvent, ComboboxBuilder, ComboboxController,
    ComboboxElements, ComboboxOption, ComboboxPhase, ComboboxProps, ComboboxState, ComboboxView,
    MenuItemView, MenuView, NotifyCallback, TrailingControl, NO_OPTION_VALUE,
};
