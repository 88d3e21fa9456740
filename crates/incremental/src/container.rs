//! Per-item bookkeeping shared by the operators.
//!
//! Every operator that derives a value from its items (a predicate, a
//! projection, a sort or group key) wraps each source item in an
//! `ItemContainer`. The container remembers the item's current source index
//! and owns a [`ValueTracker`], so the operator can react when the derived
//! value of that single item changes.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use ripple_core::{Error, Result};
use ripple_reactive::{DirtyFn, ValueSelector, ValueTracker};

/// Callback an operator installs to learn that the tracked value of one
/// container moved from `old` to `new`.
pub type ValueChangedFn<T, V> = Rc<dyn Fn(&Rc<ItemContainer<T, V>>, V, V) -> Result<()>>;

/// One tracked item: the item itself, its source index and its derived value.
pub struct ItemContainer<T, V> {
    item: RefCell<T>,
    index: Cell<usize>,
    tracker: RefCell<ValueTracker<T, V>>,
}

impl<T: 'static, V: Clone + 'static> ItemContainer<T, V> {
    /// Wraps `item` found at source position `index`.
    pub fn new(
        item: T,
        index: usize,
        selector: &ValueSelector<T, V>,
        on_change: &ValueChangedFn<T, V>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak| {
            let dirty = Self::dirty_fn(weak.clone(), on_change.clone());
            let tracker = ValueTracker::attach(selector.clone(), &item, dirty);
            Self {
                item: RefCell::new(item),
                index: Cell::new(index),
                tracker: RefCell::new(tracker),
            }
        })
    }

    fn dirty_fn(weak: Weak<Self>, on_change: ValueChangedFn<T, V>) -> DirtyFn {
        Rc::new(move || {
            let Some(container) = weak.upgrade() else {
                return Ok(());
            };
            let changed = {
                let item = container.item.borrow();
                container.tracker.borrow_mut().refresh(&item)
            };
            match changed {
                Some((old, new)) => on_change(&container, old, new),
                None => Ok(()),
            }
        })
    }

    /// Swaps in a new item at the same position.
    ///
    /// The watch moves to the new item. Returns the previous item and, if the
    /// derived value differs between the two, `(old, new)` values.
    pub fn replace_item(
        self: &Rc<Self>,
        item: T,
        on_change: &ValueChangedFn<T, V>,
    ) -> (T, Option<(V, V)>) {
        let dirty = Self::dirty_fn(Rc::downgrade(self), on_change.clone());
        let old = self.item.replace(item);
        let item = self.item.borrow();
        let changed = self.tracker.borrow_mut().rebind(&item, dirty);
        (old, changed)
    }
}

impl<T, V> ItemContainer<T, V> {
    /// Current source index.
    #[inline]
    pub fn index(&self) -> usize {
        self.index.get()
    }

    #[inline]
    pub(crate) fn set_index(&self, index: usize) {
        self.index.set(index);
    }

    /// Runs `f` against the tracked value without cloning it.
    #[inline]
    pub fn with_value<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(self.tracker.borrow().value())
    }
}

impl<T: Clone, V: Clone> ItemContainer<T, V> {
    /// Returns a clone of the item.
    #[inline]
    pub fn item(&self) -> T {
        self.item.borrow().clone()
    }

    /// Returns a clone of the tracked value.
    #[inline]
    pub fn value(&self) -> V {
        self.tracker.borrow().value().clone()
    }
}

/// Containers in source order, kept renumbered on every structural edit.
pub struct ContainerList<T, V> {
    items: Vec<Rc<ItemContainer<T, V>>>,
}

impl<T: 'static, V: Clone + 'static> ContainerList<T, V> {
    /// Wraps every item of a source snapshot.
    pub fn build(
        items: Vec<T>,
        selector: &ValueSelector<T, V>,
        on_change: &ValueChangedFn<T, V>,
    ) -> Self {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| ItemContainer::new(item, index, selector, on_change))
            .collect();
        Self { items }
    }
}

impl<T, V> ContainerList<T, V> {
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns the container at `index`.
    pub fn get(&self, index: usize) -> Result<&Rc<ItemContainer<T, V>>> {
        self.items
            .get(index)
            .ok_or_else(|| Error::index_out_of_range(index, self.items.len()))
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Rc<ItemContainer<T, V>>> {
        self.items.iter()
    }

    /// Returns true if `container` is the one currently stored at its index.
    pub fn holds(&self, container: &Rc<ItemContainer<T, V>>) -> bool {
        self.items
            .get(container.index())
            .is_some_and(|c| Rc::ptr_eq(c, container))
    }

    pub fn insert(&mut self, index: usize, container: Rc<ItemContainer<T, V>>) -> Result<()> {
        Error::check_insert_index(index, self.items.len())?;
        self.items.insert(index, container);
        self.renumber(index, self.items.len());
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Rc<ItemContainer<T, V>>> {
        Error::check_index(index, self.items.len())?;
        let removed = self.items.remove(index);
        self.renumber(index, self.items.len());
        Ok(removed)
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        Error::check_index(from, self.items.len())?;
        Error::check_index(to, self.items.len())?;
        if from != to {
            let moved = self.items.remove(from);
            self.items.insert(to, moved);
            self.renumber(from.min(to), from.max(to) + 1);
        }
        Ok(())
    }

    /// Replaces every container, returning the previous ones.
    pub fn reset(&mut self, items: Self) -> Vec<Rc<ItemContainer<T, V>>> {
        core::mem::replace(&mut self.items, items.items)
    }

    fn renumber(&self, start: usize, end: usize) {
        for (offset, container) in self.items[start..end].iter().enumerate() {
            container.set_index(start + offset);
        }
    }
}
