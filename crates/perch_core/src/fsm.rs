//! Finite state machines for widget phases
//!
//! Widget phases are small `Copy` enums that map numeric event codes to the
//! next phase. Keeping the transition table in one `match` makes the legal
//! moves auditable and lets guards live in the widget that owns the phase.
//!
//! ```rust
//! use perch_core::StateTransitions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
//! enum Disclosure {
//!     #[default]
//!     Collapsed,
//!     Expanded,
//! }
//!
//! const TOGGLE: u32 = 1;
//!
//! impl StateTransitions for Disclosure {
//!     fn on_event(&self, event: u32) -> Option<Self> {
//!         match (self, event) {
//!             (Disclosure::Collapsed, TOGGLE) => Some(Disclosure::Expanded),
//!             (Disclosure::Expanded, TOGGLE) => Some(Disclosure::Collapsed),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let mut state = Disclosure::default();
//! assert!(state.transition(TOGGLE));
//! assert_eq!(state, Disclosure::Expanded);
//! ```

use std::hash::Hash;

/// Trait for state types that handle event transitions
pub trait StateTransitions:
    Clone + Copy + PartialEq + Eq + Hash + Send + Sync + std::fmt::Debug + 'static
{
    /// Handle an event and return the new state, or None if no transition
    fn on_event(&self, event: u32) -> Option<Self>;

    /// Apply an event in place, returning whether the state changed
    fn transition(&mut self, event: u32) -> bool {
        match self.on_event(event) {
            Some(next) => {
                tracing::trace!("{:?} --{}--> {:?}", self, event, next);
                *self = next;
                true
            }
            None => false,
        }
    }
}
