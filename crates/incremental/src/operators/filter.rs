//! Incremental filter.

use super::{drive, ViewState};
use crate::container::{ContainerList, ItemContainer, ValueChangedFn};
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use ripple_core::{
    handler, Change, Error, ObservableCollection, ObservableList, ReadOnlyList, Result, Subscription,
};
use ripple_reactive::ValueSelector;
use tracing::debug;

struct FilterState<T> {
    containers: ContainerList<T, bool>,
    selector: ValueSelector<T, bool>,
    on_change: ValueChangedFn<T, bool>,
    output: ObservableList<T>,
}

impl<T: Clone + 'static> ViewState for FilterState<T> {
    type Item = T;

    fn output(&self) -> &ObservableList<T> {
        &self.output
    }
}

impl<T: Clone + 'static> FilterState<T> {
    /// Number of included items before source position `index`.
    fn local_index(&self, index: usize) -> usize {
        self.containers
            .iter()
            .take(index)
            .filter(|c| c.with_value(|included| *included))
            .count()
    }

    fn included_items(&self) -> Vec<T> {
        self.containers
            .iter()
            .filter(|c| c.with_value(|included| *included))
            .map(|c| c.item())
            .collect()
    }

    fn on_source_change(&mut self, change: &Change<T>) -> Result<Vec<Change<T>>> {
        let mut out = Vec::new();
        match change {
            Change::Insert { index, item } => {
                Error::check_insert_index(*index, self.containers.len())?;
                let container = ItemContainer::new(item.clone(), *index, &self.selector, &self.on_change);
                let included = container.value();
                self.containers.insert(*index, container)?;
                if included {
                    out.push(Change::insert(self.local_index(*index), item.clone()));
                }
            }
            Change::Remove { index, .. } => {
                self.containers.get(*index)?;
                let local = self.local_index(*index);
                let container = self.containers.remove(*index)?;
                if container.value() {
                    out.push(Change::remove(local, container.item()));
                }
            }
            Change::Replace { index, new, .. } => {
                let container = self.containers.get(*index)?.clone();
                let local = self.local_index(*index);
                let was_included = container.value();
                let (old, _) = container.replace_item(new.clone(), &self.on_change);
                match (was_included, container.value()) {
                    (true, true) => out.push(Change::replace(local, old, new.clone())),
                    (true, false) => out.push(Change::remove(local, old)),
                    (false, true) => out.push(Change::insert(local, new.clone())),
                    (false, false) => {}
                }
            }
            Change::Move { from, to, .. } => {
                Error::check_index(*to, self.containers.len())?;
                let container = self.containers.get(*from)?.clone();
                if container.value() {
                    let old_local = self.local_index(*from);
                    self.containers.move_item(*from, *to)?;
                    let new_local = self.local_index(*to);
                    if old_local != new_local {
                        out.push(Change::moved(old_local, new_local, container.item()));
                    }
                } else {
                    self.containers.move_item(*from, *to)?;
                }
            }
            Change::Reset { items } => {
                let fresh = ContainerList::build(items.clone(), &self.selector, &self.on_change);
                drop(self.containers.reset(fresh));
                out.push(Change::reset(self.included_items()));
            }
        }
        Ok(out)
    }

    fn on_value_changed(&mut self, container: &Rc<ItemContainer<T, bool>>, old: bool, new: bool) -> Vec<Change<T>> {
        if !self.containers.holds(container) {
            return Vec::new();
        }
        let local = self.local_index(container.index());
        match (old, new) {
            (false, true) => alloc::vec![Change::insert(local, container.item())],
            (true, false) => alloc::vec![Change::remove(local, container.item())],
            _ => Vec::new(),
        }
    }
}

/// The items of a source satisfying a predicate, in source order.
///
/// With a tracked selector an item entering or leaving the predicate is
/// reported as a single insert or remove at its filtered position.
pub struct FilteredView<T> {
    state: Rc<RefCell<FilterState<T>>>,
    output: ObservableList<T>,
    _subscription: Subscription,
}

impl<T: Clone + 'static> FilteredView<T> {
    /// Creates a view over `source` containing the items `selector` accepts.
    pub fn new<S>(source: &S, selector: ValueSelector<T, bool>) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        let items = source.snapshot();
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<FilterState<T>>>| {
            let on_change = value_changed(weak.clone());
            let containers = ContainerList::build(items, &selector, &on_change);
            let mut state = FilterState {
                containers,
                selector,
                on_change,
                output: ObservableList::new(),
            };
            state.output = ObservableList::from_vec(state.included_items());
            RefCell::new(state)
        });
        let output = state.borrow().output.clone();

        let weak = Rc::downgrade(&state);
        let subscription = source.subscribe(handler(move |change: &Change<T>| {
            drive(&weak, "filter", |state| state.on_source_change(change))
        }));
        debug!(source_len = source.len(), visible = output.len(), "filtered view attached");

        Self {
            state,
            output,
            _subscription: subscription,
        }
    }

    /// Returns the filtered items as a read-only collection.
    pub fn view(&self) -> ReadOnlyList<T> {
        self.output.view()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.output.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.output.snapshot()
    }

    /// Number of source items currently tracked.
    pub fn source_len(&self) -> usize {
        self.state.borrow().containers.len()
    }

    /// Detaches from the source and releases every item watch.
    pub fn dispose(self) {
        debug!("filtered view disposed");
    }
}

collection_view!(FilteredView<T>);

fn value_changed<T: Clone + 'static>(weak: Weak<RefCell<FilterState<T>>>) -> ValueChangedFn<T, bool> {
    Rc::new(move |container: &Rc<ItemContainer<T, bool>>, old: bool, new: bool| {
        drive(&weak, "filter", |state| Ok(state.on_value_changed(container, old, new)))
    })
}
