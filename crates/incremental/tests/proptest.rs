//! Property-based tests for ripple-incremental using proptest.
//!
//! Every view is driven with random edit sequences and compared against the
//! same query recomputed from scratch over the source. Each view's emitted
//! edits are replayed through a `ChangeLog` to check they reproduce it.

use proptest::prelude::*;
use ripple_core::{ChangeLog, ObservableList};
use ripple_incremental::{
    CompositeOptions, CompositeSource, CountResult, FilteredView, GroupedSource, GroupingOptions,
    KeyOrdering, RangedView, SetView, SortedView, TransformedView,
};
use ripple_reactive::{NotifyPropertyChanged, PropertyNotifier, ValueSelector};
use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;

#[derive(Debug, Clone)]
enum Op {
    Insert(usize, i32),
    Remove(usize),
    Replace(usize, i32),
    Move(usize, usize),
    Reset(Vec<i32>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), 0i32..24).prop_map(|(i, v)| Op::Insert(i, v)),
        3 => any::<usize>().prop_map(Op::Remove),
        2 => (any::<usize>(), 0i32..24).prop_map(|(i, v)| Op::Replace(i, v)),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Move(a, b)),
        1 => prop::collection::vec(0i32..24, 0..10).prop_map(Op::Reset),
    ]
}

fn items_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(0i32..24, 0..16)
}

/// Applies `op` to `list`, wrapping indices into range. Edits that need an
/// item are skipped on an empty list.
fn apply(list: &ObservableList<i32>, op: &Op) {
    let len = list.len();
    match op {
        Op::Insert(i, v) => list.insert(i % (len + 1), *v).unwrap(),
        Op::Remove(i) if len > 0 => {
            list.remove(i % len).unwrap();
        }
        Op::Replace(i, v) if len > 0 => {
            list.replace(i % len, *v).unwrap();
        }
        Op::Move(a, b) if len > 0 => list.move_item(a % len, b % len).unwrap(),
        Op::Reset(items) => list.reset(items.clone()).unwrap(),
        _ => {}
    }
}

fn as_set(items: &[i32]) -> BTreeSet<i32> {
    items.iter().copied().collect()
}

fn has_duplicates(items: &[i32]) -> bool {
    as_set(items).len() != items.len()
}

/// Whole-member edits of a composite, mixed with edits inside members.
#[derive(Debug, Clone)]
enum MemberOp {
    Edit(usize, Op),
    Add(usize, Vec<i32>),
    Drop(usize),
    Shift(usize, usize),
}

fn member_op_strategy() -> impl Strategy<Value = MemberOp> {
    prop_oneof![
        6 => (any::<usize>(), op_strategy()).prop_map(|(m, op)| MemberOp::Edit(m, op)),
        2 => (any::<usize>(), items_strategy()).prop_map(|(p, items)| MemberOp::Add(p, items)),
        2 => any::<usize>().prop_map(MemberOp::Drop),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| MemberOp::Shift(a, b)),
    ]
}

/// Item whose value changes in place and is announced as property `value`.
struct Tracked {
    id: usize,
    value: Cell<i32>,
    notifier: PropertyNotifier,
}

impl NotifyPropertyChanged for Tracked {
    fn property_notifier(&self) -> &PropertyNotifier {
        &self.notifier
    }
}

fn tracked(id: usize, value: i32) -> Rc<Tracked> {
    Rc::new(Tracked {
        id,
        value: Cell::new(value),
        notifier: PropertyNotifier::new(),
    })
}

fn tracked_selector<V: PartialEq + 'static>(f: fn(i32) -> V) -> ValueSelector<Rc<Tracked>, V> {
    ValueSelector::triggered(move |t: &Rc<Tracked>| f(t.value.get()), ["value"])
}

fn ids(items: &[Rc<Tracked>]) -> Vec<usize> {
    items.iter().map(|t| t.id).collect()
}

/// Structural edits plus in-place value changes of tracked items.
#[derive(Debug, Clone)]
enum TrackedOp {
    Structural(Op),
    Set(usize, i32),
}

fn tracked_op_strategy() -> impl Strategy<Value = TrackedOp> {
    prop_oneof![
        3 => op_strategy().prop_map(TrackedOp::Structural),
        2 => (any::<usize>(), 0i32..24).prop_map(|(i, v)| TrackedOp::Set(i, v)),
    ]
}

/// Applies `op` to a list of tracked items, minting fresh items for inserts,
/// replacements and resets.
fn apply_tracked(list: &ObservableList<Rc<Tracked>>, op: &TrackedOp, next_id: &mut usize) {
    let len = list.len();
    let mut mint = |value: i32| {
        *next_id += 1;
        tracked(*next_id, value)
    };
    match op {
        TrackedOp::Set(i, v) if len > 0 => {
            let item = list.snapshot()[i % len].clone();
            item.value.set(*v);
            item.notifier.notify("value").unwrap();
        }
        TrackedOp::Structural(Op::Insert(i, v)) => list.insert(i % (len + 1), mint(*v)).unwrap(),
        TrackedOp::Structural(Op::Remove(i)) if len > 0 => {
            list.remove(i % len).unwrap();
        }
        TrackedOp::Structural(Op::Replace(i, v)) if len > 0 => {
            list.replace(i % len, mint(*v)).unwrap();
        }
        TrackedOp::Structural(Op::Move(a, b)) if len > 0 => list.move_item(a % len, b % len).unwrap(),
        TrackedOp::Structural(Op::Reset(values)) => {
            let items = values.iter().map(|v| mint(*v)).collect();
            list.reset(items).unwrap();
        }
        _ => {}
    }
}

proptest! {
    /// The filtered view equals the source filtered from scratch.
    #[test]
    fn filter_matches_model(
        initial in items_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..40)
    ) {
        let list = ObservableList::from_vec(initial);
        let view = FilteredView::new(&list, ValueSelector::plain(|x: &i32| x % 3 != 0));
        let log = ChangeLog::attach(&view);

        for op in &ops {
            apply(&list, op);
            let expected: Vec<i32> = list.snapshot().into_iter().filter(|x| x % 3 != 0).collect();
            prop_assert_eq!(view.snapshot(), expected);
            prop_assert_eq!(log.mirror(), view.snapshot());
        }
    }

    /// The transformed view stays index-aligned with the source.
    #[test]
    fn map_matches_model(
        initial in items_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..40)
    ) {
        let list = ObservableList::from_vec(initial);
        let view = TransformedView::new(&list, ValueSelector::projection(|x: &i32| x * 10 + 1));
        let log = ChangeLog::attach(&view);

        for op in &ops {
            apply(&list, op);
            let expected: Vec<i32> = list.snapshot().iter().map(|x| x * 10 + 1).collect();
            prop_assert_eq!(view.snapshot(), expected);
            prop_assert_eq!(log.mirror(), view.snapshot());
        }
    }

    /// The sorted view equals a stable sort of the source, in both directions.
    #[test]
    fn sort_is_stable(
        initial in items_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..40)
    ) {
        let list = ObservableList::from_vec(initial);
        // Coarse keys so that ties are common.
        let ascending = SortedView::by_key(&list, |x: &i32| x / 4);
        let descending = SortedView::new(
            &list,
            ValueSelector::plain(|x: &i32| x / 4),
            KeyOrdering::descending(),
        );
        let log = ChangeLog::attach(&ascending);

        for op in &ops {
            apply(&list, op);
            let mut expected = list.snapshot();
            expected.sort_by_key(|x| x / 4);
            prop_assert_eq!(ascending.snapshot(), expected);

            let mut expected = list.snapshot();
            expected.sort_by(|a, b| (b / 4).cmp(&(a / 4)));
            prop_assert_eq!(descending.snapshot(), expected);

            prop_assert_eq!(log.mirror(), ascending.snapshot());
        }
    }

    /// Distinct holds every key of the source exactly once.
    #[test]
    fn distinct_matches_model(
        initial in items_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..40)
    ) {
        let list = ObservableList::from_vec(initial);
        let view = SetView::distinct(&list);
        let log = ChangeLog::attach(&view);

        for op in &ops {
            apply(&list, op);
            let snapshot = view.snapshot();
            prop_assert!(!has_duplicates(&snapshot));
            prop_assert_eq!(as_set(&snapshot), as_set(&list.snapshot()));
            prop_assert_eq!(log.mirror(), snapshot);
        }
    }

    /// Union, except and intersect follow the set algebra of their inputs.
    #[test]
    fn set_algebra_matches_model(
        left_items in items_strategy(),
        right_items in items_strategy(),
        ops in prop::collection::vec((any::<bool>(), op_strategy()), 0..40)
    ) {
        let left = ObservableList::from_vec(left_items);
        let right = ObservableList::from_vec(right_items);
        let union = SetView::union(&left, &right);
        let except = SetView::except(&left, &right);
        let intersect = SetView::intersect(&left, &right);
        let logs = [
            ChangeLog::attach(&union),
            ChangeLog::attach(&except),
            ChangeLog::attach(&intersect),
        ];

        for (on_left, op) in &ops {
            apply(if *on_left { &left } else { &right }, op);
            let l = as_set(&left.snapshot());
            let r = as_set(&right.snapshot());

            prop_assert_eq!(as_set(&union.snapshot()), l.union(&r).copied().collect::<BTreeSet<_>>());
            prop_assert_eq!(as_set(&except.snapshot()), l.difference(&r).copied().collect::<BTreeSet<_>>());
            prop_assert_eq!(
                as_set(&intersect.snapshot()),
                l.intersection(&r).copied().collect::<BTreeSet<_>>()
            );
            for (log, view) in logs.iter().zip([&union, &except, &intersect]) {
                prop_assert!(!has_duplicates(&view.snapshot()));
                prop_assert_eq!(log.mirror(), view.snapshot());
            }
        }
    }

    /// The ranged view always shows the requested window of the source.
    #[test]
    fn range_matches_model(
        initial in items_strategy(),
        skip in 0usize..6,
        take in prop::option::of(0usize..6),
        ops in prop::collection::vec(op_strategy(), 0..40)
    ) {
        let list = ObservableList::from_vec(initial);
        let view = RangedView::new(&list, skip, take).unwrap();
        let log = ChangeLog::attach(&view);

        for op in &ops {
            apply(&list, op);
            let expected: Vec<i32> = list
                .snapshot()
                .into_iter()
                .skip(skip)
                .take(take.unwrap_or(usize::MAX))
                .collect();
            prop_assert_eq!(view.snapshot(), expected);
            prop_assert_eq!(log.mirror(), view.snapshot());
        }
    }

    /// The composite equals its members concatenated in order, across
    /// member edits and structural changes of the member list.
    #[test]
    fn composite_matches_concatenation(
        members in prop::collection::vec(items_strategy(), 1..4),
        ops in prop::collection::vec((any::<usize>(), op_strategy()), 0..30),
        moves in prop::collection::vec((any::<usize>(), any::<usize>()), 0..4),
        threshold in 0usize..40
    ) {
        let lists: Vec<Rc<ObservableList<i32>>> = members
            .into_iter()
            .map(|items| Rc::new(ObservableList::from_vec(items)))
            .collect();
        let composite = CompositeSource::new(CompositeOptions::default().with_batch_threshold(threshold));
        for list in &lists {
            composite.push_shared(list.clone()).unwrap();
        }
        let log = ChangeLog::attach(&composite);
        let mut order: Vec<usize> = (0..lists.len()).collect();

        let concatenation = |order: &[usize]| -> Vec<i32> {
            order.iter().flat_map(|&i| lists[i].snapshot()).collect()
        };

        for (member, op) in &ops {
            apply(&lists[member % lists.len()], op);
            prop_assert_eq!(composite.snapshot(), concatenation(&order));
        }
        for (from, to) in &moves {
            let (from, to) = (from % order.len(), to % order.len());
            composite.move_collection(from, to).unwrap();
            let moved = order.remove(from);
            order.insert(to, moved);
            prop_assert_eq!(composite.snapshot(), concatenation(&order));
            prop_assert_eq!(log.mirror(), composite.snapshot());
        }
        prop_assert_eq!(log.mirror(), composite.snapshot());
    }

    /// Every group holds exactly the source items with its key, in source
    /// order, and no implicit group is empty.
    #[test]
    fn groups_partition_source(
        initial in items_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..40)
    ) {
        let list = ObservableList::from_vec(initial);
        let options = GroupingOptions::new().with_explicit_keys(vec![5]);
        let grouped = GroupedSource::new(&list, ValueSelector::plain(|x: &i32| x % 5), options).unwrap();

        for op in &ops {
            apply(&list, op);
            let source = list.snapshot();
            let groups = grouped.groups().snapshot();
            let keys: Vec<i32> = groups.iter().map(|g| *g.key()).collect();
            prop_assert!(!has_duplicates(&keys));
            prop_assert_eq!(keys[0], 5);
            prop_assert!(groups[0].is_empty());

            let mut grouped_total = 0;
            for group in &groups {
                let expected: Vec<i32> = source.iter().copied().filter(|x| x % 5 == *group.key()).collect();
                prop_assert_eq!(group.members().snapshot(), expected);
                prop_assert!(group.is_explicit() || !group.is_empty());
                grouped_total += group.len();
            }
            prop_assert_eq!(grouped_total, source.len());
        }
    }

    /// Counting aggregates agree with a recount of the source.
    #[test]
    fn count_matches_model(
        initial in items_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..40)
    ) {
        let list = ObservableList::from_vec(initial);
        let total = CountResult::count(&list);
        let evens = CountResult::count_where(&list, ValueSelector::plain(|x: &i32| x % 2 == 0));

        for op in &ops {
            apply(&list, op);
            prop_assert_eq!(total.value(), list.len());
            prop_assert_eq!(evens.value(), list.snapshot().iter().filter(|x| *x % 2 == 0).count());
        }
    }

    /// Keyed distinct only ever shows items the source currently holds, one
    /// per key, even when the item supplying a key is removed or replaced.
    #[test]
    fn distinct_by_shows_live_representatives(
        initial in items_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..40)
    ) {
        let list = ObservableList::from_vec(initial);
        let view = SetView::distinct_by(&list, |x: &i32| x / 3);
        let log = ChangeLog::attach(&view);

        for op in &ops {
            apply(&list, op);
            let source = list.snapshot();
            let snapshot = view.snapshot();
            let keys: Vec<i32> = snapshot.iter().map(|x| x / 3).collect();
            prop_assert!(!has_duplicates(&keys));
            prop_assert_eq!(as_set(&keys), source.iter().map(|x| x / 3).collect::<BTreeSet<_>>());
            for item in &snapshot {
                prop_assert!(source.contains(item));
            }
            prop_assert_eq!(log.mirror(), snapshot);
        }
    }

    /// The composite tracks inserted, removed and moved members together
    /// with edits and resets inside them, and its offset table stays equal
    /// to the running sum of member lengths.
    #[test]
    fn composite_member_edits_match_concatenation(
        members in prop::collection::vec(items_strategy(), 0..4),
        ops in prop::collection::vec(member_op_strategy(), 0..40),
        threshold in 0usize..20
    ) {
        let composite = CompositeSource::new(CompositeOptions::default().with_batch_threshold(threshold));
        let mut order: Vec<Rc<ObservableList<i32>>> = Vec::new();
        for items in members {
            let list = Rc::new(ObservableList::from_vec(items));
            composite.push_shared(list.clone()).unwrap();
            order.push(list);
        }
        let log = ChangeLog::attach(&composite);

        for op in &ops {
            match op {
                MemberOp::Edit(m, op) if !order.is_empty() => {
                    let member = order[m % order.len()].clone();
                    apply(&member, op);
                }
                MemberOp::Add(position, items) => {
                    let position = position % (order.len() + 1);
                    let list = Rc::new(ObservableList::from_vec(items.clone()));
                    composite.insert_shared(position, list.clone()).unwrap();
                    order.insert(position, list);
                }
                MemberOp::Drop(position) if !order.is_empty() => {
                    let position = position % order.len();
                    composite.remove(position).unwrap();
                    let removed = order.remove(position);
                    prop_assert_eq!(removed.subscription_count(), 0);
                }
                MemberOp::Shift(from, to) if !order.is_empty() => {
                    let (from, to) = (from % order.len(), to % order.len());
                    composite.move_collection(from, to).unwrap();
                    let moved = order.remove(from);
                    order.insert(to, moved);
                }
                _ => {}
            }

            let expected: Vec<i32> = order.iter().flat_map(|list| list.snapshot()).collect();
            prop_assert_eq!(composite.snapshot(), expected);
            prop_assert_eq!(composite.collection_count(), order.len());
            let mut base = 0;
            for (position, list) in order.iter().enumerate() {
                prop_assert_eq!(composite.offset_of(position), Some(base));
                base += list.len();
            }
            prop_assert_eq!(log.mirror(), composite.snapshot());
        }
    }

    /// Filter, sort and group keys that change in place are kept correct
    /// alongside structural edits of the source.
    #[test]
    fn tracked_values_match_model(
        initial in items_strategy(),
        ops in prop::collection::vec(tracked_op_strategy(), 0..40)
    ) {
        let items: Vec<Rc<Tracked>> = initial
            .iter()
            .enumerate()
            .map(|(id, value)| tracked(id, *value))
            .collect();
        let mut next_id = items.len();
        let list = ObservableList::from_vec(items);

        let evens = FilteredView::new(&list, tracked_selector(|v| v % 2 == 0));
        let sorted = SortedView::new(&list, tracked_selector(|v| v / 3), KeyOrdering::ascending());
        let grouped = GroupedSource::new(&list, tracked_selector(|v| v % 3), GroupingOptions::new()).unwrap();
        let filter_log = ChangeLog::attach(&evens);
        let sort_log = ChangeLog::attach(&sorted);

        for op in &ops {
            apply_tracked(&list, op, &mut next_id);
            let source = list.snapshot();

            let expected: Vec<usize> = source
                .iter()
                .filter(|t| t.value.get() % 2 == 0)
                .map(|t| t.id)
                .collect();
            prop_assert_eq!(ids(&evens.snapshot()), expected);
            prop_assert_eq!(ids(&filter_log.mirror()), ids(&evens.snapshot()));

            let mut by_key = source.clone();
            by_key.sort_by_key(|t| t.value.get() / 3);
            prop_assert_eq!(ids(&sorted.snapshot()), ids(&by_key));
            prop_assert_eq!(ids(&sort_log.mirror()), ids(&sorted.snapshot()));

            let groups = grouped.groups().snapshot();
            let keys: BTreeSet<i32> = groups.iter().map(|g| *g.key()).collect();
            prop_assert_eq!(keys.len(), groups.len());
            prop_assert_eq!(keys, source.iter().map(|t| t.value.get() % 3).collect::<BTreeSet<_>>());
            for group in &groups {
                let expected: Vec<usize> = source
                    .iter()
                    .filter(|t| t.value.get() % 3 == *group.key())
                    .map(|t| t.id)
                    .collect();
                prop_assert_eq!(ids(&group.members().snapshot()), expected);
            }
        }
    }
}
