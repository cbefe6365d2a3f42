#![forbid(unsafe_code)]

//! Reactive state store with per-property subscriptions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐ dispatch(action) ┌──────────────────────────┐
//! │  Widget  │ ───────────────▶ │          Store           │
//! └──────────┘                  │  reduce(old, action)     │
//!      ▲                        │  swap Arc<StoryState>    │
//!      │   listener(&value)     │  diff per subscribed key │
//!      └─────────────────────── │  notify in reg. order    │
//!                               └──────────────────────────┘
//! ```
//!
//! # Design Invariants
//!
//! 1. **No in-place mutation**: every dispatch swaps in a fresh snapshot.
//! 2. **Selective notification**: a listener for `P` runs only when `P`
//!    changed under its [`Comparator`](crate::state::Comparator).
//! 3. **Registration order**: listeners of one property run in the order
//!    they were subscribed.
//! 4. **Re-entrancy**: no lock is held while listeners run, so a listener may
//!    dispatch, subscribe, or unsubscribe.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unknown property name | Typo on the string surface | `tracing::error!`, `None` |
//! | Poisoned lock | Panic on another thread mid-swap | Inner value recovered |
//! | Listener panics | Bug in a widget | Propagates to the dispatcher |

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::action::Action;
use crate::reducer::reduce;
use crate::state::{EmbedMode, StateProperty, StateValue, StoryState};

/// Callback invoked with the new value of a property.
pub type Listener = Arc<dyn Fn(&StateValue) + Send + Sync>;

/// Handle returned by [`Store::subscribe`]; pass it to [`Store::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    property: StateProperty,
    id: u64,
}

impl Subscription {
    #[must_use]
    pub const fn property(&self) -> StateProperty {
        self.property
    }
}

struct Registered {
    id: u64,
    listener: Listener,
}

/// Single source of truth for cross-widget state.
pub struct Store {
    state: RwLock<Arc<StoryState>>,
    listeners: Mutex<HashMap<StateProperty, Vec<Registered>>>,
    next_id: AtomicU64,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoryState::default())
    }
}

impl Store {
    /// Create a store seeded with `initial`.
    #[must_use]
    pub fn new(initial: StoryState) -> Self {
        Self {
            state: RwLock::new(Arc::new(initial)),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a store with defaults overlaid by the preset for `mode`.
    #[must_use]
    pub fn with_embed_mode(mode: EmbedMode) -> Self {
        tracing::debug!(embed_mode = ?mode, "initializing story store");
        Self::new(StoryState::with_embed_mode(mode))
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<StoryState> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Current value of one property.
    #[must_use]
    pub fn get(&self, property: StateProperty) -> StateValue {
        self.state().get(property)
    }

    /// Look up a property by its string name.
    ///
    /// Unknown names are a developer error: logged, `None` returned.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<StateValue> {
        match name.parse::<StateProperty>() {
            Ok(property) => Some(self.get(property)),
            Err(err) => {
                tracing::error!(error = %err, "state lookup by name failed");
                None
            }
        }
    }

    /// Register `listener` for changes of `property`.
    ///
    /// With `call_to_initialize` the listener runs once, synchronously, with
    /// the current value before this returns.
    pub fn subscribe<F>(
        &self,
        property: StateProperty,
        listener: F,
        call_to_initialize: bool,
    ) -> Subscription
    where
        F: Fn(&StateValue) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener = Arc::new(listener);
        self.lock_listeners()
            .entry(property)
            .or_default()
            .push(Registered {
                id,
                listener: Arc::clone(&listener),
            });
        if call_to_initialize {
            listener(&self.get(property));
        }
        Subscription { property, id }
    }

    /// Remove a listener. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut listeners = self.lock_listeners();
        let Some(list) = listeners.get_mut(&subscription.property) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id != subscription.id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(&subscription.property);
        }
        removed
    }

    /// Number of live subscriptions across all properties.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.lock_listeners().values().map(Vec::len).sum()
    }

    /// Apply `action` and notify subscribers of every property it changed.
    pub fn dispatch(&self, action: Action) {
        let (old, new) = {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let old = Arc::clone(&guard);
            let new = Arc::new(reduce(&old, &action));
            *guard = Arc::clone(&new);
            (old, new)
        };
        tracing::trace!(action = %action, "dispatched");

        // Collect while locked, call after releasing.
        let pending: Vec<(StateValue, Vec<Listener>)> = {
            let listeners = self.lock_listeners();
            StateProperty::ALL
                .iter()
                .filter_map(|property| {
                    let registered = listeners.get(property)?;
                    let before = old.get(*property);
                    let after = new.get(*property);
                    if before.same_under(&after, property.comparator()) {
                        return None;
                    }
                    let callbacks = registered
                        .iter()
                        .map(|r| Arc::clone(&r.listener))
                        .collect();
                    Some((after, callbacks))
                })
                .collect()
        };

        for (value, callbacks) in pending {
            for callback in callbacks {
                callback(&value);
            }
        }
    }

    fn lock_listeners(&self) -> MutexGuard<'_, HashMap<StateProperty, Vec<Registered>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UiType;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&StateValue) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move |_: &StateValue| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn unrelated_property_is_not_notified() {
        let store = Store::default();
        let (muted_calls, listener) = counter();
        store.subscribe(StateProperty::MutedState, listener, false);
        store.dispatch(Action::TogglePaused(true));
        assert_eq!(muted_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unchanged_value_is_not_notified() {
        let store = Store::default();
        let (calls, listener) = counter();
        store.subscribe(StateProperty::MutedState, listener, false);
        // Default muted_state is true.
        store.dispatch(Action::ToggleMuted(true));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        store.dispatch(Action::ToggleMuted(false));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn call_to_initialize_fires_once_synchronously() {
        let store = Store::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(
            StateProperty::UiState,
            move |v| sink.lock().unwrap().push(v.clone()),
            true,
        );
        assert_eq!(*seen.lock().unwrap(), vec![StateValue::Ui(UiType::Mobile)]);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let store = Store::default();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            store.subscribe(
                StateProperty::PausedState,
                move |_| order.lock().unwrap().push(tag),
                false,
            );
        }
        store.dispatch(Action::TogglePaused(true));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::default();
        let (calls, listener) = counter();
        let sub = store.subscribe(StateProperty::PausedState, listener, false);
        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        store.dispatch(Action::TogglePaused(true));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.subscription_count(), 0);
    }

    #[test]
    fn listener_may_dispatch_reentrantly() {
        let store = Arc::new(Store::default());
        let weak = Arc::downgrade(&store);
        store.subscribe(
            StateProperty::ShareMenuState,
            move |v| {
                if v.as_bool() == Some(false) {
                    if let Some(store) = weak.upgrade() {
                        store.dispatch(Action::ToggleSystemUiIsVisible(false));
                    }
                }
            },
            false,
        );
        store.dispatch(Action::ToggleShareMenu(true));
        store.dispatch(Action::ToggleShareMenu(false));
        assert!(!store.state().system_ui_is_visible_state);
    }

    #[test]
    fn identical_list_contents_still_notify_page_ids() {
        let store = Store::default();
        let (calls, listener) = counter();
        store.subscribe(StateProperty::PageIds, listener, false);
        store.dispatch(Action::SetPageIds(vec!["p0".into()]));
        store.dispatch(Action::SetPageIds(vec!["p0".into()]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn identical_navigation_path_does_not_notify() {
        let store = Store::default();
        let (calls, listener) = counter();
        store.subscribe(StateProperty::NavigationPath, listener, false);
        store.dispatch(Action::SetNavigationPath(vec!["p0".into()]));
        store.dispatch(Action::SetNavigationPath(vec!["p0".into()]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_by_name_handles_unknown_keys() {
        let store = Store::default();
        assert_eq!(
            store.get_by_name("muted_state"),
            Some(StateValue::Bool(true))
        );
        assert_eq!(store.get_by_name("volume"), None);
    }
}
