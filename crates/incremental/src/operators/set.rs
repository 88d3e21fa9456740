//! Incremental set algebra.
//!
//! A `SetView` keeps, per key, how many items of the original side(s) and
//! of the subtracted side currently carry that key. An item is visible when
//! its counts satisfy the rule of the view; only threshold crossings produce
//! output edits. Visible representatives are kept in the order they became
//! visible.

use super::{drive, ViewState};
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::hash::Hash;
use hashbrown::HashMap;
use ripple_core::{
    handler, Change, Error, ObservableCollection, ObservableList, ReadOnlyList, Result, Subscription,
};
use tracing::debug;

/// Which set operation a `SetView` maintains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SetRule {
    /// One representative per key of a single source.
    Distinct,
    /// One representative per key present in either source.
    Union,
    /// Keys of the first source absent from the second.
    Except,
    /// Keys present in both sources.
    Intersect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Original,
    Subtracted,
}

impl SetRule {
    fn side_of(self, input: usize) -> Side {
        match (self, input) {
            (SetRule::Except | SetRule::Intersect, 1) => Side::Subtracted,
            _ => Side::Original,
        }
    }

    fn admits(self, original: usize, subtracted: usize) -> bool {
        match self {
            SetRule::Distinct | SetRule::Union => original > 0,
            SetRule::Except => original > 0 && subtracted == 0,
            SetRule::Intersect => original > 0 && subtracted > 0,
        }
    }
}

struct Entry<T> {
    representative: T,
    /// Slot that supplied `representative`, if it came from an original side.
    source: Option<u64>,
    original: usize,
    subtracted: usize,
}

/// One item of an input with its key and a stable identity.
struct Slot<T, K> {
    id: u64,
    key: K,
    item: T,
}

type KeyFn<T, K> = Rc<dyn Fn(&T) -> K>;

struct SetState<T, K> {
    rule: SetRule,
    key_of: KeyFn<T, K>,
    /// Items equal by key are equal as items, so a representative never
    /// needs to be swapped for another carrier.
    identity: bool,
    entries: HashMap<K, Entry<T>>,
    /// Slots of every input, in input order.
    inputs: Vec<Vec<Slot<T, K>>>,
    /// Visible keys, in output order.
    visible: Vec<K>,
    next_slot: u64,
    output: ObservableList<T>,
}

impl<T: Clone + 'static, K: Clone + Eq + Hash + 'static> ViewState for SetState<T, K> {
    type Item = T;

    fn output(&self) -> &ObservableList<T> {
        &self.output
    }
}

impl<T: Clone + 'static, K: Clone + Eq + Hash + 'static> SetState<T, K> {
    fn is_visible(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| self.rule.admits(e.original, e.subtracted))
    }

    fn slot(&mut self, item: &T) -> Slot<T, K> {
        let id = self.next_slot;
        self.next_slot += 1;
        Slot {
            id,
            key: (self.key_of)(item),
            item: item.clone(),
        }
    }

    /// Counts one incoming item of `side`.
    fn add(&mut self, side: Side, key: K, item: &T, id: u64, out: &mut Vec<Change<T>>) {
        let was_visible = self.is_visible(&key);
        let entry = self.entries.entry(key.clone()).or_insert_with(|| Entry {
            representative: item.clone(),
            source: None,
            original: 0,
            subtracted: 0,
        });
        match side {
            Side::Original => {
                if entry.original == 0 {
                    entry.representative = item.clone();
                    entry.source = Some(id);
                }
                entry.original += 1;
            }
            Side::Subtracted => entry.subtracted += 1,
        }
        let representative = entry.representative.clone();
        self.publish(key, was_visible, representative, out);
    }

    /// Uncounts one outgoing item of `side`. If it supplied the
    /// representative and the key survives on an original side, another
    /// carrier takes over.
    fn retract(&mut self, side: Side, key: K, id: u64, out: &mut Vec<Change<T>>) {
        let was_visible = self.is_visible(&key);
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };
        match side {
            Side::Original => entry.original = entry.original.saturating_sub(1),
            Side::Subtracted => entry.subtracted = entry.subtracted.saturating_sub(1),
        }
        let orphaned = side == Side::Original && entry.original > 0 && entry.source == Some(id);
        let representative = entry.representative.clone();
        if entry.original == 0 && entry.subtracted == 0 {
            self.entries.remove(&key);
        }
        if orphaned && !self.identity {
            if let Some((source, item)) = self.first_carrier(&key) {
                self.rebind(&key, source, item, out);
            }
        }
        self.publish(key, was_visible, representative, out);
    }

    /// First original-side slot carrying `key`.
    fn first_carrier(&self, key: &K) -> Option<(u64, T)> {
        self.inputs
            .iter()
            .enumerate()
            .filter(|(input, _)| self.rule.side_of(*input) == Side::Original)
            .flat_map(|(_, slots)| slots.iter())
            .find(|slot| slot.key == *key)
            .map(|slot| (slot.id, slot.item.clone()))
    }

    /// Makes `item` the representative of `key`, publishing a `Replace`
    /// while the key is visible.
    fn rebind(&mut self, key: &K, source: u64, item: T, out: &mut Vec<Change<T>>) {
        let visible = self.is_visible(key);
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.source = Some(source);
        let old = core::mem::replace(&mut entry.representative, item.clone());
        if visible {
            if let Some(pos) = self.visible.iter().position(|k| k == key) {
                out.push(Change::replace(pos, old, item));
            }
        }
    }

    /// Reports a visibility change of `key` as an edit of the output.
    fn publish(&mut self, key: K, was_visible: bool, representative: T, out: &mut Vec<Change<T>>) {
        let now_visible = self.is_visible(&key);
        if !was_visible && now_visible {
            self.visible.push(key);
            out.push(Change::insert(self.visible.len() - 1, representative));
        } else if was_visible && !now_visible {
            if let Some(pos) = self.visible.iter().position(|k| *k == key) {
                self.visible.remove(pos);
                out.push(Change::remove(pos, representative));
            }
        }
    }

    fn on_input_change(&mut self, input: usize, change: &Change<T>) -> Result<Vec<Change<T>>> {
        let side = self.rule.side_of(input);
        let mut out = Vec::new();
        match change {
            Change::Insert { index, item } => {
                Error::check_insert_index(*index, self.inputs[input].len())?;
                let slot = self.slot(item);
                let (key, id) = (slot.key.clone(), slot.id);
                self.inputs[input].insert(*index, slot);
                self.add(side, key, item, id, &mut out);
            }
            Change::Remove { index, .. } => {
                Error::check_index(*index, self.inputs[input].len())?;
                let slot = self.inputs[input].remove(*index);
                self.retract(side, slot.key, slot.id, &mut out);
            }
            Change::Replace { index, new, .. } => {
                Error::check_index(*index, self.inputs[input].len())?;
                let slot = self.slot(new);
                let (key, id) = (slot.key.clone(), slot.id);
                let old = core::mem::replace(&mut self.inputs[input][*index], slot);
                if old.key != key {
                    self.retract(side, old.key, old.id, &mut out);
                    self.add(side, key, new, id, &mut out);
                } else if self.entries.get(&key).is_some_and(|e| e.source == Some(old.id)) {
                    if self.identity {
                        if let Some(entry) = self.entries.get_mut(&key) {
                            entry.source = Some(id);
                        }
                    } else {
                        self.rebind(&key, id, new.clone(), &mut out);
                    }
                }
            }
            Change::Move { from, to, .. } => {
                let slots = &mut self.inputs[input];
                Error::check_index(*from, slots.len())?;
                Error::check_index(*to, slots.len())?;
                let slot = slots.remove(*from);
                slots.insert(*to, slot);
            }
            Change::Reset { items } => {
                let had_visible = !self.visible.is_empty();
                let old = core::mem::take(&mut self.inputs[input]);
                for slot in old {
                    self.retract(side, slot.key, slot.id, &mut out);
                }
                for item in items {
                    let slot = self.slot(item);
                    let (key, id) = (slot.key.clone(), slot.id);
                    self.inputs[input].push(slot);
                    self.add(side, key, item, id, &mut out);
                }
                if had_visible && self.visible.is_empty() {
                    out.clear();
                    out.push(Change::reset(Vec::new()));
                }
            }
        }
        Ok(out)
    }

    fn representatives(&self) -> Vec<T> {
        self.visible
            .iter()
            .filter_map(|key| self.entries.get(key))
            .map(|entry| entry.representative.clone())
            .collect()
    }
}

/// Distinct, union, except or intersect of one or two sources, by key.
///
/// The representative of a key is an item of an original side that
/// currently carries it. When the item supplying it is removed or replaced
/// while the key stays present, the first remaining carrier takes over and
/// the swap is published as a `Replace`.
pub struct SetView<T, K> {
    state: Rc<RefCell<SetState<T, K>>>,
    output: ObservableList<T>,
    _subscriptions: Vec<Subscription>,
}

impl<T: Clone + Eq + Hash + 'static> SetView<T, T> {
    /// Distinct items of `source`.
    pub fn distinct<S>(source: &S) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        Self::identity(Self::distinct_by(source, T::clone))
    }

    /// Items present in `first` or `second`.
    pub fn union<A, B>(first: &A, second: &B) -> Self
    where
        A: ObservableCollection<T> + ?Sized,
        B: ObservableCollection<T> + ?Sized,
    {
        Self::identity(Self::union_by(first, second, T::clone))
    }

    /// Items of `first` absent from `second`.
    pub fn except<A, B>(first: &A, second: &B) -> Self
    where
        A: ObservableCollection<T> + ?Sized,
        B: ObservableCollection<T> + ?Sized,
    {
        Self::identity(Self::except_by(first, second, T::clone))
    }

    /// Items of `first` also present in `second`.
    pub fn intersect<A, B>(first: &A, second: &B) -> Self
    where
        A: ObservableCollection<T> + ?Sized,
        B: ObservableCollection<T> + ?Sized,
    {
        Self::identity(Self::intersect_by(first, second, T::clone))
    }

    fn identity(self) -> Self {
        self.state.borrow_mut().identity = true;
        self
    }
}

impl<T: Clone + 'static, K: Clone + Eq + Hash + 'static> SetView<T, K> {
    pub fn distinct_by<S, F>(source: &S, key_of: F) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
        F: Fn(&T) -> K + 'static,
    {
        Self::build(SetRule::Distinct, Rc::new(key_of), &[source.snapshot()], |weak| {
            alloc::vec![subscribe_input(source, weak, 0)]
        })
    }

    pub fn union_by<A, B, F>(first: &A, second: &B, key_of: F) -> Self
    where
        A: ObservableCollection<T> + ?Sized,
        B: ObservableCollection<T> + ?Sized,
        F: Fn(&T) -> K + 'static,
    {
        Self::binary(SetRule::Union, first, second, Rc::new(key_of))
    }

    pub fn except_by<A, B, F>(first: &A, second: &B, key_of: F) -> Self
    where
        A: ObservableCollection<T> + ?Sized,
        B: ObservableCollection<T> + ?Sized,
        F: Fn(&T) -> K + 'static,
    {
        Self::binary(SetRule::Except, first, second, Rc::new(key_of))
    }

    pub fn intersect_by<A, B, F>(first: &A, second: &B, key_of: F) -> Self
    where
        A: ObservableCollection<T> + ?Sized,
        B: ObservableCollection<T> + ?Sized,
        F: Fn(&T) -> K + 'static,
    {
        Self::binary(SetRule::Intersect, first, second, Rc::new(key_of))
    }

    fn binary<A, B>(rule: SetRule, first: &A, second: &B, key_of: KeyFn<T, K>) -> Self
    where
        A: ObservableCollection<T> + ?Sized,
        B: ObservableCollection<T> + ?Sized,
    {
        let snapshots = [first.snapshot(), second.snapshot()];
        Self::build(rule, key_of, &snapshots, |weak| {
            alloc::vec![
                subscribe_input(first, weak.clone(), 0),
                subscribe_input(second, weak, 1),
            ]
        })
    }

    fn build<F>(rule: SetRule, key_of: KeyFn<T, K>, snapshots: &[Vec<T>], subscribe: F) -> Self
    where
        F: FnOnce(Weak<RefCell<SetState<T, K>>>) -> Vec<Subscription>,
    {
        let mut state = SetState {
            rule,
            key_of,
            identity: false,
            entries: HashMap::new(),
            inputs: (0..snapshots.len()).map(|_| Vec::new()).collect(),
            visible: Vec::new(),
            next_slot: 0,
            output: ObservableList::new(),
        };
        let mut discarded = Vec::new();
        for (input, items) in snapshots.iter().enumerate() {
            let side = rule.side_of(input);
            for item in items {
                let slot = state.slot(item);
                let (key, id) = (slot.key.clone(), slot.id);
                state.inputs[input].push(slot);
                state.add(side, key, item, id, &mut discarded);
            }
        }
        state.output = ObservableList::from_vec(state.representatives());
        let output = state.output.clone();
        let state = Rc::new(RefCell::new(state));
        let subscriptions = subscribe(Rc::downgrade(&state));
        debug!(rule = ?rule, len = output.len(), "set view attached");

        Self {
            state,
            output,
            _subscriptions: subscriptions,
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

    pub fn rule(&self) -> SetRule {
        self.state.borrow().rule
    }

    /// Returns true if `key` is currently part of the result.
    pub fn contains_key(&self, key: &K) -> bool {
        self.state.borrow().is_visible(key)
    }

    pub fn dispose(self) {
        debug!("set view disposed");
    }
}

collection_view!(SetView<T, K>);

fn subscribe_input<T, K, S>(source: &S, weak: Weak<RefCell<SetState<T, K>>>, input: usize) -> Subscription
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + 'static,
    S: ObservableCollection<T> + ?Sized,
{
    source.subscribe(handler(move |change: &Change<T>| {
        drive(&weak, "set", |state| state.on_input_change(input, change))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use ripple_core::ChangeLog;

    #[test]
    fn test_distinct_counts_duplicates() {
        let list = ObservableList::from_vec(vec![1, 2, 1, 3, 2]);
        let view = SetView::distinct(&list);
        let log = ChangeLog::attach(&view.view());
        assert_eq!(view.snapshot(), vec![1, 2, 3]);

        list.remove(0).unwrap();
        assert!(log.is_empty());
        list.remove(1).unwrap();
        assert_eq!(view.snapshot(), vec![2, 3]);
        list.push(1).unwrap();
        assert_eq!(view.snapshot(), vec![2, 3, 1]);
        assert_eq!(log.changes(), vec![Change::remove(0, 1), Change::insert(2, 1)]);
    }

    #[test]
    fn test_union_and_intersect() {
        let a = ObservableList::from_vec(vec![1, 2]);
        let b = ObservableList::from_vec(vec![2, 3]);
        let union = SetView::union(&a, &b);
        let both = SetView::intersect(&a, &b);
        assert_eq!(union.snapshot(), vec![1, 2, 3]);
        assert_eq!(both.snapshot(), vec![2]);

        b.push(1).unwrap();
        assert_eq!(union.snapshot(), vec![1, 2, 3]);
        assert_eq!(both.snapshot(), vec![2, 1]);

        a.remove(1).unwrap();
        assert_eq!(union.snapshot(), vec![1, 2, 3]);
        assert_eq!(both.snapshot(), vec![1]);
        assert!(union.contains_key(&2));
        assert!(!both.contains_key(&2));
    }

    #[test]
    fn test_except_by_key() {
        let a = ObservableList::from_vec(vec![(1, 'a'), (2, 'b'), (3, 'c')]);
        let b = ObservableList::from_vec(vec![(2, 'z')]);
        let view = SetView::except_by(&a, &b, |p: &(i32, char)| p.0);
        assert_eq!(view.snapshot(), vec![(1, 'a'), (3, 'c')]);

        b.replace(0, (3, 'y')).unwrap();
        assert_eq!(view.snapshot(), vec![(1, 'a'), (2, 'b')]);

        b.clear().unwrap();
        assert_eq!(view.snapshot(), vec![(1, 'a'), (2, 'b'), (3, 'c')]);
    }

    #[test]
    fn test_distinct_by_hands_over_removed_representative() {
        let list = ObservableList::from_vec(vec![(1, 'a'), (2, 'x'), (1, 'b')]);
        let view = SetView::distinct_by(&list, |p: &(i32, char)| p.0);
        let log = ChangeLog::attach(&view.view());
        assert_eq!(view.snapshot(), vec![(1, 'a'), (2, 'x')]);

        list.remove(0).unwrap();
        assert_eq!(view.snapshot(), vec![(1, 'b'), (2, 'x')]);
        assert_eq!(log.changes(), vec![Change::replace(0, (1, 'a'), (1, 'b'))]);

        // Removing a non-representative duplicate stays silent.
        list.push((2, 'y')).unwrap();
        list.remove(2).unwrap();
        assert_eq!(log.len(), 1);

        list.remove(0).unwrap();
        assert_eq!(view.snapshot(), vec![(1, 'b')]);
        assert_eq!(log.mirror(), view.snapshot());
    }

    #[test]
    fn test_except_by_replace_refreshes_representative() {
        let a = ObservableList::from_vec(vec![(1, 'a'), (2, 'b')]);
        let b = ObservableList::from_vec(vec![(3, 'z')]);
        let view = SetView::except_by(&a, &b, |p: &(i32, char)| p.0);
        let log = ChangeLog::attach(&view.view());

        a.replace(0, (1, 'q')).unwrap();
        assert_eq!(view.snapshot(), vec![(1, 'q'), (2, 'b')]);
        assert_eq!(log.changes(), vec![Change::replace(0, (1, 'a'), (1, 'q'))]);

        // A replacement on the subtracted side never supplies a representative.
        b.replace(0, (3, 'y')).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.mirror(), view.snapshot());
    }

    #[test]
    fn test_union_by_representative_moves_across_inputs() {
        let a = ObservableList::from_vec(vec![(1, 'a')]);
        let b = ObservableList::from_vec(vec![(1, 'b'), (2, 'c')]);
        let view = SetView::union_by(&a, &b, |p: &(i32, char)| p.0);
        assert_eq!(view.snapshot(), vec![(1, 'a'), (2, 'c')]);

        a.clear().unwrap();
        assert_eq!(view.snapshot(), vec![(1, 'b'), (2, 'c')]);
    }

    #[test]
    fn test_set_moves_are_silent() {
        let list = ObservableList::from_vec(vec![1, 2, 3]);
        let view = SetView::distinct(&list);
        let log = ChangeLog::attach(&view.view());
        list.move_item(0, 2).unwrap();
        assert!(log.is_empty());
        assert_eq!(view.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn test_set_reset_to_empty_emits_single_reset() {
        let list = ObservableList::from_vec(vec![1, 2, 3]);
        let view = SetView::distinct(&list);
        let log = ChangeLog::attach(&view.view());
        list.clear().unwrap();
        assert_eq!(log.changes(), vec![Change::reset(vec![])]);
        assert!(view.is_empty());

        list.reset(vec![4, 4, 5]).unwrap();
        assert_eq!(view.snapshot(), vec![4, 5]);
        assert_eq!(log.len(), 3);
    }
}
