//! Tracked value of one item.
//!
//! A `ValueTracker` evaluates a selector for one item, keeps the result and
//! owns the watch subscription of that item. Dropping the tracker releases
//! the subscription.

use crate::selector::{DirtyFn, ValueSelector};
use ripple_core::Subscription;

/// Current derived value of one item plus its watch subscription.
pub struct ValueTracker<T, V> {
    selector: ValueSelector<T, V>,
    value: V,
    watch: Option<Subscription>,
}

impl<T, V> ValueTracker<T, V> {
    /// Returns the last evaluated value.
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<T, V: Clone> ValueTracker<T, V> {
    /// Evaluates `selector` for `item` and starts watching it.
    ///
    /// The value is captured before the watch is installed, so a
    /// notification raised from within the watch setup is not lost: it
    /// simply triggers a `refresh` that finds the newer value.
    pub fn attach(selector: ValueSelector<T, V>, item: &T, dirty: DirtyFn) -> Self {
        let value = selector.evaluate(item);
        let watch = selector.watch(item, dirty);
        Self {
            selector,
            value,
            watch,
        }
    }

    /// Evaluates `selector` for `item` without watching it.
    pub fn detached(selector: ValueSelector<T, V>, item: &T) -> Self {
        let value = selector.evaluate(item);
        Self {
            selector,
            value,
            watch: None,
        }
    }

    /// Re-evaluates the value for `item`.
    ///
    /// Returns `Some((old, new))` only when the comparer reports a change.
    pub fn refresh(&mut self, item: &T) -> Option<(V, V)> {
        let new = self.selector.evaluate(item);
        if self.selector.same(&self.value, &new) {
            return None;
        }
        let old = core::mem::replace(&mut self.value, new.clone());
        Some((old, new))
    }

    /// Switches the tracker to a new item (positional replacement).
    ///
    /// The old watch is released before the new one is installed. Returns
    /// `Some((old, new))` if the value differs between the two items.
    pub fn rebind(&mut self, item: &T, dirty: DirtyFn) -> Option<(V, V)> {
        self.watch = None;
        let changed = self.refresh(item);
        self.watch = self.selector.watch(item, dirty);
        changed
    }

    /// Returns true while a watch subscription is held.
    #[inline]
    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    /// Releases the watch subscription now.
    pub fn release(&mut self) {
        self.watch = None;
    }
}
