//! Mutable observable list.
//!
//! `ObservableList` is the source collection users edit directly and also
//! the output buffer of every derived view. Each mutation validates its
//! indices, applies itself fully, releases the internal borrow and only then
//! notifies subscribers, so handlers may read the list while being notified.

use crate::change::Change;
use crate::collection::ObservableCollection;
use crate::error::{Error, Result};
use crate::subscription::{notify_handlers, Handler, Subscription, SubscriptionManager};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use tracing::warn;

struct ListInner<T> {
    items: Vec<T>,
    subscriptions: SubscriptionManager<Change<T>>,
}

/// A shared, mutable list that emits a [`Change`] for every edit.
///
/// Cloning the handle shares the same underlying list.
pub struct ObservableList<T> {
    inner: Rc<RefCell<ListInner<T>>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ObservableList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates a list holding `items`.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ListInner {
                items,
                subscriptions: SubscriptionManager::new(),
            })),
        }
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    /// Returns true if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Returns a clone of the item at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.borrow().items.get(index).cloned()
    }

    /// Returns a copy of the current content.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.borrow().items.clone()
    }

    /// Runs `f` over the current items without copying them.
    ///
    /// `f` must not mutate this list.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.borrow().items)
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.borrow().subscriptions.len()
    }

    /// Returns a read-only handle onto this list.
    pub fn view(&self) -> ReadOnlyList<T> {
        ReadOnlyList { list: self.clone() }
    }

    /// Appends `item`.
    pub fn push(&self, item: T) -> Result<()> {
        let index = self.len();
        self.apply(Change::insert(index, item))
    }

    /// Appends every item, one Insert per item.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) -> Result<()> {
        for item in items {
            self.push(item)?;
        }
        Ok(())
    }

    /// Inserts `item` at `index`.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        self.apply(Change::insert(index, item))
    }

    /// Removes and returns the item at `index`.
    pub fn remove(&self, index: usize) -> Result<T> {
        let item = self
            .get(index)
            .ok_or_else(|| Error::index_out_of_range(index, self.len()))?;
        self.apply(Change::remove(index, item.clone()))?;
        Ok(item)
    }

    /// Replaces the item at `index`, returning the previous one.
    pub fn replace(&self, index: usize, item: T) -> Result<T> {
        let old = self
            .get(index)
            .ok_or_else(|| Error::index_out_of_range(index, self.len()))?;
        self.apply(Change::replace(index, old.clone(), item))?;
        Ok(old)
    }

    /// Moves the item at `from` so that it ends up at `to`.
    ///
    /// Moving an item onto its own position is a no-op and emits nothing.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        let len = self.len();
        Error::check_index(from, len)?;
        Error::check_index(to, len)?;
        if from == to {
            return Ok(());
        }
        let item = self.inner.borrow().items[from].clone();
        self.apply(Change::moved(from, to, item))
    }

    /// Replaces the whole content with `items`.
    pub fn reset(&self, items: Vec<T>) -> Result<()> {
        self.apply(Change::reset(items))
    }

    /// Removes every item with a single Reset.
    pub fn clear(&self) -> Result<()> {
        self.reset(Vec::new())
    }

    /// Applies `change` and notifies subscribers.
    ///
    /// The change is validated against the current length first; an invalid
    /// change leaves the list untouched and notifies nobody.
    pub fn apply(&self, change: Change<T>) -> Result<()> {
        let handlers = {
            let mut inner = self.inner.borrow_mut();
            change.apply_to(&mut inner.items)?;
            inner.subscriptions.handlers()
        };
        notify_handlers(&handlers, &change)
    }
}

impl<T: PartialEq + Clone + 'static> ObservableList<T> {
    /// Returns the position of the first item equal to `item`.
    pub fn position(&self, item: &T) -> Option<usize> {
        self.inner.borrow().items.iter().position(|x| x == item)
    }

    /// Removes the first item equal to `item`.
    ///
    /// Returns `Ok(false)` if no such item exists; that is not an error.
    pub fn remove_item(&self, item: &T) -> Result<bool> {
        match self.position(item) {
            Some(index) => {
                self.remove(index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<T: Clone + 'static> ObservableCollection<T> for ObservableList<T> {
    fn len(&self) -> usize {
        ObservableList::len(self)
    }

    fn get(&self, index: usize) -> Option<T> {
        ObservableList::get(self, index)
    }

    fn snapshot(&self) -> Vec<T> {
        ObservableList::snapshot(self)
    }

    fn subscribe(&self, handler: Handler<Change<T>>) -> Subscription {
        let id = self.inner.borrow_mut().subscriptions.subscribe_handler(handler);
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(id, move |id| {
            if let Some(inner) = weak.upgrade() {
                match inner.try_borrow_mut() {
                    Ok(mut inner) => {
                        inner.subscriptions.unsubscribe(id);
                    }
                    Err(_) => warn!(subscription = id, "list busy, subscription not detached"),
                }
            }
        })
    }
}

impl<T: Clone + core::fmt::Debug + 'static> core::fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.inner.borrow().items.iter()).finish()
    }
}

/// Read-only live handle onto an [`ObservableList`].
///
/// Derived views hand this out so consumers can read and subscribe but
/// never edit a view's content behind its back. Reads always observe the
/// state between two edits.
pub struct ReadOnlyList<T> {
    list: ObservableList<T>,
}

impl<T> Clone for ReadOnlyList<T> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
        }
    }
}

impl<T: Clone + 'static> ReadOnlyList<T> {
    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns true if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns a clone of the item at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.list.get(index)
    }

    /// Returns a copy of the current content.
    pub fn snapshot(&self) -> Vec<T> {
        self.list.snapshot()
    }

    /// Runs `f` over the current items without copying them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.list.with_items(f)
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.list.subscription_count()
    }
}

impl<T: Clone + 'static> ObservableCollection<T> for ReadOnlyList<T> {
    fn len(&self) -> usize {
        self.list.len()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.list.get(index)
    }

    fn snapshot(&self) -> Vec<T> {
        self.list.snapshot()
    }

    fn subscribe(&self, handler: Handler<Change<T>>) -> Subscription {
        self.list.subscribe(handler)
    }
}

impl<T: Clone + core::fmt::Debug + 'static> core::fmt::Debug for ReadOnlyList<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.list, f)
    }
}
