//! Perch Core
//!
//! Foundational primitives shared by the Perch overlay widgets:
//!
//! - **Geometry**: read-only snapshots of anchors, overlays and the viewport
//! - **Host capabilities**: the traits a host platform implements so widgets can
//!   measure elements, subscribe to events and schedule timers
//! - **State machines**: the `StateTransitions` trait used by widget phases
//! - **Scoped resources**: listener scopes and single-slot timers that release
//!   their host resources on every exit path
//! - **Configuration**: TOML-backed tuning knobs for placement and timing
//!
//! # Example
//!
//! ```rust
//! use perch_core::headless::HeadlessHost;
//! use perch_core::{AnchorRect, HostGeometry, Viewport};
//!
//! let mut host = HeadlessHost::new(Viewport::new(1024.0, 768.0));
//! let button = host.insert_element(AnchorRect::from_xywh(100.0, 40.0, 120.0, 32.0), None);
//!
//! let rect = host.measure(button).unwrap();
//! assert_eq!(rect.bottom, 72.0);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod geometry;
pub mod headless;
pub mod host;
pub mod listener;
pub mod timer;

pub use config::{
    ComboboxSettings, MenuSettings, PerchConfig, PlacementSettings, RepositionSettings,
};
pub use error::{ConfigError, Result};
pub use events::{HostEvent, ListenerKind, ListenerOptions};
pub use fsm::StateTransitions;
pub use geometry::{AnchorRect, Point, Size, Viewport};
pub use host::{
    lock_host, ElementId, FrameId, Host, HostEvents, HostGeometry, HostTimers, ListenerId,
    SharedHost, TimerId,
};
pub use listener::ListenerScope;
pub use timer::{FrameSlot, TimerSlot};
