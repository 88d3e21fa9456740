//! Fluent construction of views from any observable collection.

use crate::operators::{
    AllResult, AnyResult, ContainsResult, CountResult, FilteredView, GroupedSource, GroupingOptions,
    RangedView, SetView, SortedView, TransformedView,
};
use crate::ordering::KeyOrdering;
use core::fmt::Debug;
use core::hash::Hash;
use ripple_core::{ObservableCollection, Result};
use ripple_reactive::ValueSelector;

/// Builds derived views directly off a source.
///
/// Every method is shorthand for the matching operator constructor. A view
/// stops following its source once dropped, so keep every stage of a chain
/// alive for as long as its downstream views are in use:
///
/// ```rust
/// use ripple_core::ObservableList;
/// use ripple_incremental::CollectionExt;
///
/// let list = ObservableList::from_vec(vec![5, 2, 8, 1, 9, 4]);
/// let above_one = list.filtered(|x: &i32| *x > 1);
/// let sorted = above_one.sorted_by_key(|x: &i32| *x);
/// let top = sorted.ranged(1, Some(2)).unwrap();
/// assert_eq!(top.snapshot(), vec![4, 5]);
///
/// list.push(3).unwrap();
/// assert_eq!(top.snapshot(), vec![3, 4]);
/// ```
pub trait CollectionExt<T: Clone + 'static>: ObservableCollection<T> {
    /// Items matching an untracked predicate.
    fn filtered<F>(&self, predicate: F) -> FilteredView<T>
    where
        F: Fn(&T) -> bool + 'static,
    {
        FilteredView::new(self, ValueSelector::plain(predicate))
    }

    /// Items matching a predicate re-evaluated whenever `selector` reports
    /// the item changed.
    fn filtered_by(&self, selector: ValueSelector<T, bool>) -> FilteredView<T> {
        FilteredView::new(self, selector)
    }

    /// Every item projected through `selector`.
    fn transformed<U>(&self, selector: ValueSelector<T, U>) -> TransformedView<T, U>
    where
        U: Clone + 'static,
    {
        TransformedView::new(self, selector)
    }

    /// Every item projected through an untracked function.
    fn mapped<U, F>(&self, f: F) -> TransformedView<T, U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        TransformedView::new(self, ValueSelector::projection(f))
    }

    fn sorted_by<K>(&self, selector: ValueSelector<T, K>, ordering: KeyOrdering<K>) -> SortedView<T, K>
    where
        K: Clone + 'static,
    {
        SortedView::new(self, selector, ordering)
    }

    fn sorted_by_key<K, F>(&self, key: F) -> SortedView<T, K>
    where
        K: Clone + Ord + 'static,
        F: Fn(&T) -> K + 'static,
    {
        SortedView::by_key(self, key)
    }

    fn grouped_by<K>(&self, selector: ValueSelector<T, K>, options: GroupingOptions<K>) -> Result<GroupedSource<T, K>>
    where
        K: Clone + PartialEq + Debug + 'static,
    {
        GroupedSource::new(self, selector, options)
    }

    fn distinct(&self) -> SetView<T, T>
    where
        T: Eq + Hash,
    {
        SetView::distinct(self)
    }

    fn union_with<O>(&self, other: &O) -> SetView<T, T>
    where
        T: Eq + Hash,
        O: ObservableCollection<T> + ?Sized,
    {
        SetView::union(self, other)
    }

    fn except_with<O>(&self, other: &O) -> SetView<T, T>
    where
        T: Eq + Hash,
        O: ObservableCollection<T> + ?Sized,
    {
        SetView::except(self, other)
    }

    fn intersect_with<O>(&self, other: &O) -> SetView<T, T>
    where
        T: Eq + Hash,
        O: ObservableCollection<T> + ?Sized,
    {
        SetView::intersect(self, other)
    }

    fn ranged(&self, skip: usize, take: Option<usize>) -> Result<RangedView<T>> {
        RangedView::new(self, skip, take)
    }

    fn any_where(&self, predicate: ValueSelector<T, bool>) -> AnyResult<T> {
        AnyResult::any(self, predicate)
    }

    fn all_where(&self, predicate: ValueSelector<T, bool>) -> AllResult<T> {
        AllResult::all(self, predicate)
    }

    fn contains_item(&self, probe: T) -> ContainsResult<T>
    where
        T: PartialEq,
    {
        ContainsResult::contains(self, probe)
    }

    fn count_items(&self) -> CountResult<T> {
        CountResult::count(self)
    }

    fn count_where(&self, predicate: ValueSelector<T, bool>) -> CountResult<T> {
        CountResult::count_where(self, predicate)
    }
}

impl<T: Clone + 'static, C: ObservableCollection<T> + ?Sized> CollectionExt<T> for C {}
