//! Incremental sort.
//!
//! The view keeps its containers in a vector ordered by `(key, source
//! index)`, so ties keep source order and every position can be found by
//! binary search.

use super::{drive, ViewState};
use crate::container::{ContainerList, ItemContainer, ValueChangedFn};
use crate::ordering::KeyOrdering;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::cmp::Ordering;
use ripple_core::{
    handler, Change, Error, ObservableCollection, ObservableList, ReadOnlyList, Result, Subscription,
};
use ripple_reactive::ValueSelector;
use tracing::{debug, warn};

type Slot<T, K> = Rc<ItemContainer<T, K>>;

struct SortState<T, K> {
    containers: ContainerList<T, K>,
    sorted: Vec<Slot<T, K>>,
    ordering: KeyOrdering<K>,
    selector: ValueSelector<T, K>,
    on_change: ValueChangedFn<T, K>,
    output: ObservableList<T>,
}

impl<T: Clone + 'static, K: Clone + 'static> ViewState for SortState<T, K> {
    type Item = T;

    fn output(&self) -> &ObservableList<T> {
        &self.output
    }
}

impl<T: Clone + 'static, K: Clone + 'static> SortState<T, K> {
    fn compare_to(&self, slot: &Slot<T, K>, key: &K, index: usize) -> Ordering {
        slot.with_value(|k| self.ordering.compare(k, key))
            .then(slot.index().cmp(&index))
    }

    fn insertion_point(&self, key: &K, index: usize) -> usize {
        self.sorted
            .partition_point(|slot| self.compare_to(slot, key, index) == Ordering::Less)
    }

    /// Sorted position of `container`, assuming it is ordered under `key`.
    fn position_of(&self, container: &Slot<T, K>, key: &K) -> Result<usize> {
        let guess = self.insertion_point(key, container.index());
        if self.sorted.get(guess).is_some_and(|slot| Rc::ptr_eq(slot, container)) {
            return Ok(guess);
        }
        self.sorted
            .iter()
            .position(|slot| Rc::ptr_eq(slot, container))
            .ok_or_else(|| {
                warn!(index = container.index(), "sorted view lost track of an item");
                Error::invalid_argument("item is not tracked by the sorted view")
            })
    }

    fn rebuild_sorted(&mut self) {
        let mut sorted: Vec<Slot<T, K>> = self.containers.iter().cloned().collect();
        let ordering = &self.ordering;
        sorted.sort_by(|a, b| {
            a.with_value(|ka| b.with_value(|kb| ordering.compare(ka, kb)))
                .then(a.index().cmp(&b.index()))
        });
        self.sorted = sorted;
    }

    fn sorted_items(&self) -> Vec<T> {
        self.sorted.iter().map(|slot| slot.item()).collect()
    }

    fn on_source_change(&mut self, change: &Change<T>) -> Result<Vec<Change<T>>> {
        let mut out = Vec::new();
        match change {
            Change::Insert { index, item } => {
                Error::check_insert_index(*index, self.containers.len())?;
                let container = ItemContainer::new(item.clone(), *index, &self.selector, &self.on_change);
                self.containers.insert(*index, container.clone())?;
                let pos = container.with_value(|key| self.insertion_point(key, *index));
                self.sorted.insert(pos, container);
                out.push(Change::insert(pos, item.clone()));
            }
            Change::Remove { index, .. } => {
                let container = self.containers.get(*index)?.clone();
                let pos = self.position_of(&container, &container.value())?;
                self.sorted.remove(pos);
                self.containers.remove(*index)?;
                out.push(Change::remove(pos, container.item()));
            }
            Change::Replace { index, new, .. } => {
                let container = self.containers.get(*index)?.clone();
                let before = self.position_of(&container, &container.value())?;
                let (old, changed) = container.replace_item(new.clone(), &self.on_change);
                if changed.is_none() {
                    out.push(Change::replace(before, old, new.clone()));
                } else {
                    self.sorted.remove(before);
                    let after = container.with_value(|key| self.insertion_point(key, *index));
                    self.sorted.insert(after, container);
                    if before == after {
                        out.push(Change::replace(before, old, new.clone()));
                    } else {
                        out.push(Change::remove(before, old));
                        out.push(Change::insert(after, new.clone()));
                    }
                }
            }
            Change::Move { from, to, .. } => {
                Error::check_index(*to, self.containers.len())?;
                let container = self.containers.get(*from)?.clone();
                let before = self.position_of(&container, &container.value())?;
                self.sorted.remove(before);
                self.containers.move_item(*from, *to)?;
                let after = container.with_value(|key| self.insertion_point(key, *to));
                self.sorted.insert(after, container.clone());
                if before != after {
                    out.push(Change::moved(before, after, container.item()));
                }
            }
            Change::Reset { items } => {
                let fresh = ContainerList::build(items.clone(), &self.selector, &self.on_change);
                drop(self.containers.reset(fresh));
                self.rebuild_sorted();
                out.push(Change::reset(self.sorted_items()));
            }
        }
        Ok(out)
    }

    fn on_key_changed(&mut self, container: &Slot<T, K>, old: K) -> Result<Vec<Change<T>>> {
        if !self.containers.holds(container) {
            return Ok(Vec::new());
        }
        let before = self.position_of(container, &old)?;
        self.sorted.remove(before);
        let after = container.with_value(|key| self.insertion_point(key, container.index()));
        self.sorted.insert(after, container.clone());
        if before == after {
            return Ok(Vec::new());
        }
        Ok(alloc::vec![Change::moved(before, after, container.item())])
    }
}

/// The items of a source ordered by a key.
///
/// Items with equal keys keep their relative source order. A tracked key
/// that changes moves the item with a single `Move`, or emits nothing when
/// its position stays the same.
pub struct SortedView<T, K> {
    state: Rc<RefCell<SortState<T, K>>>,
    output: ObservableList<T>,
    _subscription: Subscription,
}

impl<T: Clone + 'static, K: Clone + Ord + 'static> SortedView<T, K> {
    /// Sorts `source` ascending by an untracked key.
    pub fn by_key<S, F>(source: &S, key: F) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
        F: Fn(&T) -> K + 'static,
    {
        Self::new(source, ValueSelector::plain(key), KeyOrdering::ascending())
    }
}

impl<T: Clone + 'static, K: Clone + 'static> SortedView<T, K> {
    /// Sorts `source` by the key `selector` derives, compared with `ordering`.
    pub fn new<S>(source: &S, selector: ValueSelector<T, K>, ordering: KeyOrdering<K>) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        let items = source.snapshot();
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<SortState<T, K>>>| {
            let on_change = value_changed(weak.clone());
            let containers = ContainerList::build(items, &selector, &on_change);
            let mut state = SortState {
                containers,
                sorted: Vec::new(),
                ordering,
                selector,
                on_change,
                output: ObservableList::new(),
            };
            state.rebuild_sorted();
            state.output = ObservableList::from_vec(state.sorted_items());
            RefCell::new(state)
        });
        let output = state.borrow().output.clone();

        let weak = Rc::downgrade(&state);
        let subscription = source.subscribe(handler(move |change: &Change<T>| {
            drive(&weak, "sort", |state| state.on_source_change(change))
        }));
        debug!(len = output.len(), "sorted view attached");

        Self {
            state,
            output,
            _subscription: subscription,
        }
    }

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

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<K> {
        self.state.borrow().sorted.iter().map(|slot| slot.value()).collect()
    }

    pub fn dispose(self) {
        debug!("sorted view disposed");
    }
}

collection_view!(SortedView<T, K>);

fn value_changed<T: Clone + 'static, K: Clone + 'static>(
    weak: Weak<RefCell<SortState<T, K>>>,
) -> ValueChangedFn<T, K> {
    Rc::new(move |container: &Slot<T, K>, old: K, _new: K| {
        drive(&weak, "sort", |state| state.on_key_changed(container, old))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::Direction;
    use alloc::vec;
    use ripple_core::ChangeLog;
    use ripple_reactive::ValueCell;

    #[test]
    fn test_sort_initial_is_stable() {
        let list = ObservableList::from_vec(vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')]);
        let view = SortedView::by_key(&list, |p: &(i32, char)| p.0);
        assert_eq!(view.snapshot(), vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
        assert_eq!(view.keys(), vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_sort_insert_remove() {
        let list = ObservableList::from_vec(vec![5, 1, 3]);
        let view = SortedView::by_key(&list, |x: &i32| *x);
        let log = ChangeLog::attach(&view.view());

        list.push(2).unwrap();
        list.remove(0).unwrap();

        assert_eq!(view.snapshot(), vec![1, 2, 3]);
        assert_eq!(log.changes(), vec![Change::insert(1, 2), Change::remove(3, 5)]);
    }

    #[test]
    fn test_sort_replace_in_place_and_reposition() {
        let list = ObservableList::from_vec(vec![(1, 'a'), (3, 'b'), (5, 'c')]);
        let view = SortedView::by_key(&list, |p: &(i32, char)| p.0);
        let log = ChangeLog::attach(&view.view());

        list.replace(1, (3, 'x')).unwrap();
        list.replace(0, (9, 'a')).unwrap();

        assert_eq!(view.snapshot(), vec![(3, 'x'), (5, 'c'), (9, 'a')]);
        assert_eq!(
            log.changes(),
            vec![
                Change::replace(1, (3, 'b'), (3, 'x')),
                Change::remove(0, (1, 'a')),
                Change::insert(2, (9, 'a')),
            ]
        );
    }

    #[test]
    fn test_sort_source_move_between_ties() {
        let list = ObservableList::from_vec(vec![(1, 'a'), (1, 'b'), (0, 'c')]);
        let view = SortedView::by_key(&list, |p: &(i32, char)| p.0);
        let log = ChangeLog::attach(&view.view());
        assert_eq!(view.snapshot(), vec![(0, 'c'), (1, 'a'), (1, 'b')]);

        list.move_item(0, 2).unwrap();
        assert_eq!(view.snapshot(), vec![(0, 'c'), (1, 'b'), (1, 'a')]);
        list.move_item(0, 1).unwrap();
        assert_eq!(view.snapshot(), vec![(0, 'c'), (1, 'b'), (1, 'a')]);
        assert_eq!(log.changes(), vec![Change::moved(1, 2, (1, 'a'))]);
    }

    #[test]
    fn test_sort_tracked_key_moves_once() {
        let cells: Vec<ValueCell<i32>> = [10, 20, 30].into_iter().map(ValueCell::new).collect();
        let list = ObservableList::from_vec(cells.clone());
        let view = SortedView::new(
            &list,
            ValueSelector::stream(|c: &ValueCell<i32>| c.clone()),
            KeyOrdering::by(|k: &i32| *k, Direction::Descending),
        );
        let log = ChangeLog::attach(&view.view());
        assert_eq!(view.keys(), vec![30, 20, 10]);

        cells[0].set(40).unwrap();
        assert_eq!(view.keys(), vec![40, 30, 20]);
        cells[0].set(35).unwrap();
        assert_eq!(log.kinds(), vec![ripple_core::ChangeKind::Move]);
        assert_eq!(log.mirror().len(), 3);
    }

    #[test]
    fn test_sort_reset() {
        let list = ObservableList::from_vec(vec![3, 1]);
        let view = SortedView::by_key(&list, |x: &i32| -x);
        list.reset(vec![4, 6, 5]).unwrap();
        assert_eq!(view.snapshot(), vec![6, 5, 4]);
    }
}
