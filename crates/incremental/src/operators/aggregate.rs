//! Incremental scalar aggregates.
//!
//! Each aggregate maintains a running count of the items matching a
//! predicate, updated per edit, and folds it with the total item count into
//! its published value.

use super::enter;
use crate::container::{ContainerList, ItemContainer, ValueChangedFn};
use alloc::rc::{Rc, Weak};
use core::cell::RefCell;
use ripple_core::{handler, Change, Error, ObservableCollection, Result, Subscription};
use ripple_reactive::{ValueCell, ValueChange, ValueSelector};
use tracing::{debug, warn};

fn matching<T>(containers: &ContainerList<T, bool>) -> usize {
    containers
        .iter()
        .filter(|c| c.with_value(|matched| *matched))
        .count()
}

struct AggregateState<T, R> {
    containers: ContainerList<T, bool>,
    selector: ValueSelector<T, bool>,
    on_change: ValueChangedFn<T, bool>,
    matches: usize,
    fold: fn(usize, usize) -> R,
    cell: ValueCell<R>,
}

impl<T: Clone + 'static, R> AggregateState<T, R> {
    fn result(&self) -> R {
        (self.fold)(self.matches, self.containers.len())
    }

    fn count_matches(&self) -> usize {
        matching(&self.containers)
    }

    fn adjust(&mut self, old: bool, new: bool) {
        match (old, new) {
            (false, true) => self.matches += 1,
            (true, false) => self.matches -= 1,
            _ => {}
        }
    }

    fn on_source_change(&mut self, change: &Change<T>) -> Result<()> {
        match change {
            Change::Insert { index, item } => {
                Error::check_insert_index(*index, self.containers.len())?;
                let container = ItemContainer::new(item.clone(), *index, &self.selector, &self.on_change);
                self.adjust(false, container.value());
                self.containers.insert(*index, container)?;
            }
            Change::Remove { index, .. } => {
                let container = self.containers.remove(*index)?;
                self.adjust(container.value(), false);
            }
            Change::Replace { index, new, .. } => {
                let container = self.containers.get(*index)?.clone();
                if let (_, Some((old, new))) = container.replace_item(new.clone(), &self.on_change) {
                    self.adjust(old, new);
                }
            }
            Change::Move { from, to, .. } => self.containers.move_item(*from, *to)?,
            Change::Reset { items } => {
                let fresh = ContainerList::build(items.clone(), &self.selector, &self.on_change);
                drop(self.containers.reset(fresh));
                self.matches = self.count_matches();
            }
        }
        Ok(())
    }
}

fn step<T, R, F>(weak: &Weak<RefCell<AggregateState<T, R>>>, f: F) -> Result<()>
where
    T: Clone + 'static,
    R: Clone + 'static,
    F: FnOnce(&mut AggregateState<T, R>) -> Result<()>,
{
    let Some(state) = weak.upgrade() else {
        return Ok(());
    };
    let (value, cell) = {
        let mut state = enter(&state)?;
        f(&mut state).map_err(|err| {
            warn!(operator = "aggregate", error = %err, "edit rejected");
            err
        })?;
        (state.result(), state.cell.clone())
    };
    cell.set(value).map(|_| ())
}

/// A scalar result maintained incrementally over a source.
///
/// The current value is published through a [`ValueCell`]; listeners are
/// notified only when it actually changes.
pub struct ScalarAggregate<T, R> {
    state: Rc<RefCell<AggregateState<T, R>>>,
    cell: ValueCell<R>,
    _subscription: Subscription,
}

/// True while at least one item matches.
pub type AnyResult<T> = ScalarAggregate<T, bool>;
/// True while every item matches; true for an empty source.
pub type AllResult<T> = ScalarAggregate<T, bool>;
/// True while the source contains an item equal to the probe.
pub type ContainsResult<T> = ScalarAggregate<T, bool>;
/// Number of matching items.
pub type CountResult<T> = ScalarAggregate<T, usize>;

impl<T: Clone + 'static, R: Clone + PartialEq + 'static> ScalarAggregate<T, R> {
    fn build<S>(source: &S, selector: ValueSelector<T, bool>, fold: fn(usize, usize) -> R) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        let items = source.snapshot();
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<AggregateState<T, R>>>| {
            let on_change = value_changed(weak.clone());
            let containers = ContainerList::build(items, &selector, &on_change);
            let matches = matching(&containers);
            let cell = ValueCell::new(fold(matches, containers.len()));
            RefCell::new(AggregateState {
                containers,
                selector,
                on_change,
                matches,
                fold,
                cell,
            })
        });
        let cell = state.borrow().cell.clone();

        let weak = Rc::downgrade(&state);
        let subscription = source.subscribe(handler(move |change: &Change<T>| {
            step(&weak, |state| state.on_source_change(change))
        }));
        debug!(len = source.len(), "aggregate attached");

        Self {
            state,
            cell,
            _subscription: subscription,
        }
    }

    /// Current result.
    pub fn value(&self) -> R {
        self.cell.get()
    }

    /// The cell carrying the result, for tracking it as a value stream.
    pub fn cell(&self) -> ValueCell<R> {
        self.cell.clone()
    }

    /// Registers a listener for result transitions.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&ValueChange<R>) -> Result<()> + 'static,
    {
        self.cell.subscribe(f)
    }

    /// Number of items currently matching the predicate.
    pub fn matches(&self) -> usize {
        self.state.borrow().matches
    }

    pub fn dispose(self) {
        debug!("aggregate disposed");
    }
}

impl<T: Clone + 'static> ScalarAggregate<T, bool> {
    pub fn any<S>(source: &S, predicate: ValueSelector<T, bool>) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        Self::build(source, predicate, |matches, _| matches > 0)
    }

    pub fn all<S>(source: &S, predicate: ValueSelector<T, bool>) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        Self::build(source, predicate, |matches, total| matches == total)
    }

    pub fn contains<S>(source: &S, probe: T) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
        T: PartialEq,
    {
        Self::build(source, ValueSelector::plain(move |item: &T| *item == probe), |matches, _| {
            matches > 0
        })
    }
}

impl<T: Clone + 'static> ScalarAggregate<T, usize> {
    /// Number of items in `source`.
    pub fn count<S>(source: &S) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        Self::build(source, ValueSelector::constant(true), |matches, _| matches)
    }

    /// Number of items in `source` matching `predicate`.
    pub fn count_where<S>(source: &S, predicate: ValueSelector<T, bool>) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        Self::build(source, predicate, |matches, _| matches)
    }
}

fn value_changed<T, R>(weak: Weak<RefCell<AggregateState<T, R>>>) -> ValueChangedFn<T, bool>
where
    T: Clone + 'static,
    R: Clone + 'static,
{
    Rc::new(move |container: &Rc<ItemContainer<T, bool>>, old: bool, new: bool| {
        step(&weak, |state| {
            if state.containers.holds(container) {
                state.adjust(old, new);
            }
            Ok(())
        })
    })
}
