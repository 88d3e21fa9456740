//! The source contract shared by every mutable list and derived view.

use crate::change::Change;
use crate::error::Result;
use crate::subscription::{handler, Handler, Subscription};
use alloc::rc::Rc;
use alloc::vec::Vec;

/// An ordered, indexable collection that announces its structural edits.
///
/// Both sources and derived views implement this trait, so any derived
/// view can be the source of another operator.
pub trait ObservableCollection<T> {
    /// Returns the number of items.
    fn len(&self) -> usize;

    /// Returns true if the collection holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a clone of the item at `index`.
    fn get(&self, index: usize) -> Option<T>;

    /// Returns a copy of the current content.
    fn snapshot(&self) -> Vec<T>;

    /// Registers a handler for every subsequent edit.
    fn subscribe(&self, handler: Handler<Change<T>>) -> Subscription;

    /// Registers a closure for every subsequent edit.
    fn observe<F>(&self, f: F) -> Subscription
    where
        Self: Sized,
        F: Fn(&Change<T>) -> Result<()> + 'static,
    {
        self.subscribe(handler(f))
    }
}

impl<T, C> ObservableCollection<T> for Rc<C>
where
    C: ObservableCollection<T> + ?Sized,
{
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Option<T> {
        (**self).get(index)
    }

    fn snapshot(&self) -> Vec<T> {
        (**self).snapshot()
    }

    fn subscribe(&self, handler: Handler<Change<T>>) -> Subscription {
        (**self).subscribe(handler)
    }
}
