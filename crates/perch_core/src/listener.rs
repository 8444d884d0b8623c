//! Scoped event subscriptions
//!
//! A [`ListenerScope`] subscribes a fixed set of listeners when it is created
//! and unsubscribes every one of them exactly once when it is dropped. Widgets
//! keep the scope in an `Option` for as long as they are open; closing,
//! teardown and unwinding all release the subscriptions through `Drop`.
//!
//! The scope locks the host on drop, so it must not be dropped while the
//! caller still holds a host guard.

use smallvec::SmallVec;

use crate::events::{HostEvent, ListenerKind, ListenerOptions};
use crate::host::{lock_host, ListenerId, SharedHost};

/// A single active subscription
#[derive(Clone, Copy, Debug)]
struct Subscription {
    id: ListenerId,
    kind: ListenerKind,
    options: ListenerOptions,
}

/// Set of subscriptions released together
pub struct ListenerScope {
    host: SharedHost,
    subscriptions: SmallVec<[Subscription; 4]>,
}

impl ListenerScope {
    /// Subscribe every `(kind, options)` pair
    pub fn acquire(host: &SharedHost, specs: &[(ListenerKind, ListenerOptions)]) -> Self {
        let mut subscriptions = SmallVec::new();
        {
            let mut guard = lock_host(host);
            for &(kind, options) in specs {
                let id = guard.subscribe(kind, options);
                subscriptions.push(Subscription { id, kind, options });
            }
        }

        tracing::debug!("ListenerScope::acquire - {} listeners", subscriptions.len());

        Self {
            host: host.clone(),
            subscriptions,
        }
    }

    /// Whether any subscription in this scope observes `event`
    pub fn observes(&self, event: &HostEvent) -> bool {
        let Some(kind) = event.listener_kind() else {
            return false;
        };
        self.subscriptions
            .iter()
            .any(|s| s.kind == kind && event.observed_with(s.options))
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the scope holds no subscriptions
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release every subscription now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ListenerScope {
    fn drop(&mut self) {
        if self.subscriptions.is_empty() {
            return;
        }
        let mut guard = lock_host(&self.host);
        for sub in self.subscriptions.drain(..) {
            guard.unsubscribe(sub.id);
        }
        tracing::debug!("ListenerScope::drop - listeners released");
    }
}

impl std::fmt::Debug for ListenerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerScope")
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}
