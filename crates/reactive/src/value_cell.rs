//! Push-based observable value.
//!
//! A `ValueCell` holds one value and notifies listeners with the old and
//! new value whenever `set` actually changes it. It is the building block
//! for per-item value streams: an item can expose a `ValueCell` per
//! reactive property and operators track it through
//! [`ValueSelector::stream`](crate::ValueSelector::stream).

use crate::comparer::{default_comparer, EqualityComparer};
use alloc::rc::Rc;
use core::cell::RefCell;
use ripple_core::subscription::notify_handlers;
use ripple_core::{Result, Subscription, SubscriptionManager};

/// An old/new pair describing one value transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueChange<V> {
    pub old: V,
    pub new: V,
}

struct CellInner<V> {
    value: V,
    comparer: EqualityComparer<V>,
    listeners: SubscriptionManager<ValueChange<V>>,
}

/// A shared value that notifies listeners when it changes.
///
/// Cloning the handle shares the same value.
pub struct ValueCell<V> {
    inner: Rc<RefCell<CellInner<V>>>,
}

impl<V> Clone for ValueCell<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Clone + PartialEq + 'static> ValueCell<V> {
    /// Creates a cell compared with `PartialEq`.
    pub fn new(value: V) -> Self {
        Self::with_comparer(value, default_comparer())
    }
}

impl<V: Clone + 'static> ValueCell<V> {
    /// Creates a cell that uses `comparer` to decide whether a `set`
    /// changes anything.
    pub fn with_comparer(value: V, comparer: EqualityComparer<V>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CellInner {
                value,
                comparer,
                listeners: SubscriptionManager::new(),
            })),
        }
    }

    /// Returns the current value.
    pub fn get(&self) -> V {
        self.inner.borrow().value.clone()
    }

    /// Stores `value`.
    ///
    /// Returns `Ok(false)` without notifying anybody when the comparer
    /// considers the value unchanged.
    pub fn set(&self, value: V) -> Result<bool> {
        let (change, handlers) = {
            let mut inner = self.inner.borrow_mut();
            if (inner.comparer)(&inner.value, &value) {
                return Ok(false);
            }
            let old = core::mem::replace(&mut inner.value, value.clone());
            (ValueChange { old, new: value }, inner.listeners.handlers())
        };
        notify_handlers(&handlers, &change)?;
        Ok(true)
    }

    /// Registers a listener for value transitions.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&ValueChange<V>) -> Result<()> + 'static,
    {
        let id = self.inner.borrow_mut().listeners.subscribe(f);
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(id, move |id| {
            if let Some(inner) = weak.upgrade() {
                if let Ok(mut inner) = inner.try_borrow_mut() {
                    inner.listeners.unsubscribe(id);
                }
            }
        })
    }

    /// Returns the number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl<V: Clone + core::fmt::Debug + 'static> core::fmt::Debug for ValueCell<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("ValueCell").field(&self.inner.borrow().value).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn test_value_cell_set_notifies() {
        let cell = ValueCell::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = cell.subscribe(move |c| {
            sink.borrow_mut().push(c.clone());
            Ok(())
        });

        assert!(cell.set(2).unwrap());
        assert!(!cell.set(2).unwrap());
        assert_eq!(cell.get(), 2);
        assert_eq!(*seen.borrow(), vec![ValueChange { old: 1, new: 2 }]);
    }

    #[test]
    fn test_value_cell_custom_comparer() {
        // Equal when both values have the same parity.
        let cell = ValueCell::with_comparer(1, Rc::new(|a: &i32, b: &i32| a % 2 == b % 2));
        assert!(!cell.set(3).unwrap());
        assert_eq!(cell.get(), 1);
        assert!(cell.set(4).unwrap());
    }

    #[test]
    fn test_value_cell_unsubscribe() {
        let cell = ValueCell::new(0);
        let sub = cell.subscribe(|_| Ok(()));
        assert_eq!(cell.listener_count(), 1);
        drop(sub);
        assert_eq!(cell.listener_count(), 0);
    }
}
