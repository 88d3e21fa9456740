//! Incremental projection.
//!
//! A `TransformedView` keeps one projected value per source item, at the
//! same index. Projected values that own resources can be given a teardown
//! callback, which runs once per value when it leaves the view.

use super::{emit, enter};
use crate::container::{ContainerList, ItemContainer, ValueChangedFn};
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use ripple_core::{
    handler, Change, Error, Handler, ObservableCollection, ObservableList, ReadOnlyList, Result,
    Subscription,
};
use ripple_reactive::ValueSelector;
use tracing::{debug, warn};

type TeardownFn<U> = Rc<dyn Fn(&U) -> Result<()>>;

struct MapState<T, U> {
    containers: ContainerList<T, U>,
    selector: ValueSelector<T, U>,
    on_change: ValueChangedFn<T, U>,
    output: ObservableList<U>,
    teardown_on_drop: Option<TeardownFn<U>>,
}

/// Edits to emit plus the projected values that left the view.
type Step<U> = (Vec<Change<U>>, Vec<U>);

impl<T: Clone + 'static, U: Clone + 'static> MapState<T, U> {
    fn values(&self) -> Vec<U> {
        self.containers.iter().map(|c| c.value()).collect()
    }

    fn on_source_change(&mut self, change: &Change<T>) -> Result<Step<U>> {
        let mut out = Vec::new();
        let mut released = Vec::new();
        match change {
            Change::Insert { index, item } => {
                Error::check_insert_index(*index, self.containers.len())?;
                let container = ItemContainer::new(item.clone(), *index, &self.selector, &self.on_change);
                out.push(Change::insert(*index, container.value()));
                self.containers.insert(*index, container)?;
            }
            Change::Remove { index, .. } => {
                let container = self.containers.remove(*index)?;
                let value = container.value();
                out.push(Change::remove(*index, value.clone()));
                released.push(value);
            }
            Change::Replace { index, new, .. } => {
                let container = self.containers.get(*index)?.clone();
                let (_, changed) = container.replace_item(new.clone(), &self.on_change);
                if let Some((old, new)) = changed {
                    out.push(Change::replace(*index, old.clone(), new));
                    released.push(old);
                }
            }
            Change::Move { from, to, .. } => {
                Error::check_index(*to, self.containers.len())?;
                let value = self.containers.get(*from)?.value();
                self.containers.move_item(*from, *to)?;
                if from != to {
                    out.push(Change::moved(*from, *to, value));
                }
            }
            Change::Reset { items } => {
                let fresh = ContainerList::build(items.clone(), &self.selector, &self.on_change);
                let previous = self.containers.reset(fresh);
                released.extend(previous.iter().map(|c| c.value()));
                out.push(Change::reset(self.values()));
            }
        }
        Ok((out, released))
    }

    fn on_value_changed(&mut self, container: &Rc<ItemContainer<T, U>>, old: U, new: U) -> Step<U> {
        if !self.containers.holds(container) {
            return (Vec::new(), Vec::new());
        }
        (
            alloc::vec![Change::replace(container.index(), old.clone(), new)],
            alloc::vec![old],
        )
    }
}

/// A per-item projection of a source, index-for-index.
///
/// Moves in the source are forwarded as moves of the projected values;
/// projections are only recomputed when an item is inserted, replaced or
/// reports a change through a tracked selector.
pub struct TransformedView<T, U> {
    state: Rc<RefCell<MapState<T, U>>>,
    output: ObservableList<U>,
    _subscription: Subscription,
}

impl<T: Clone + 'static, U: Clone + 'static> TransformedView<T, U> {
    /// Projects every item of `source` through `selector`.
    pub fn new<S>(source: &S, selector: ValueSelector<T, U>) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        Self::build(source, selector, None)
    }

    /// Like [`new`](Self::new), running `teardown` on every projected value
    /// removed, replaced or reset out of the view, and on every value still
    /// present when the view is dropped.
    pub fn with_teardown<S, F>(source: &S, selector: ValueSelector<T, U>, teardown: F) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
        F: Fn(&U) -> Result<()> + 'static,
    {
        Self::build(source, selector, Some(Rc::new(teardown)))
    }

    fn build<S>(source: &S, selector: ValueSelector<T, U>, teardown: Option<TeardownFn<U>>) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        let items = source.snapshot();
        let teardown_for_changes = teardown.clone();
        let teardown_on_drop = teardown.clone();
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<MapState<T, U>>>| {
            let on_change = value_changed(weak.clone(), teardown_for_changes);
            let containers = ContainerList::build(items, &selector, &on_change);
            let mut state = MapState {
                containers,
                selector,
                on_change,
                output: ObservableList::new(),
                teardown_on_drop,
            };
            state.output = ObservableList::from_vec(state.values());
            RefCell::new(state)
        });
        let output = state.borrow().output.clone();

        let weak = Rc::downgrade(&state);
        let on_source = teardown.clone();
        let subscription = source.subscribe(handler(move |change: &Change<T>| {
            step(&weak, on_source.as_ref(), |state| state.on_source_change(change))
        }));
        debug!(len = output.len(), teardown = teardown.is_some(), "transformed view attached");

        Self {
            state,
            output,
            _subscription: subscription,
        }
    }

    pub fn view(&self) -> ReadOnlyList<U> {
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

    pub fn snapshot(&self) -> Vec<U> {
        self.output.snapshot()
    }

    /// Detaches from the source, tears down every remaining value and
    /// returns the first teardown error.
    pub fn dispose(self) -> Result<()> {
        let (values, teardown) = {
            let mut state = self.state.borrow_mut();
            (state.values(), state.teardown_on_drop.take())
        };
        debug!(remaining = values.len(), "transformed view disposed");
        run_teardown(teardown.as_ref(), values)
    }
}

impl<T, U: Clone + 'static> ObservableCollection<U> for TransformedView<T, U> {
    fn len(&self) -> usize {
        self.output.len()
    }

    fn get(&self, index: usize) -> Option<U> {
        self.output.get(index)
    }

    fn snapshot(&self) -> Vec<U> {
        self.output.snapshot()
    }

    fn subscribe(&self, handler: Handler<Change<U>>) -> Subscription {
        ObservableCollection::subscribe(&self.output, handler)
    }
}

impl<T, U> Drop for TransformedView<T, U> {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        if let Some(teardown) = state.teardown_on_drop.take() {
            for container in state.containers.iter() {
                if let Err(err) = container.with_value(|value| teardown(value)) {
                    warn!(error = %err, "teardown failed while dropping transformed view");
                }
            }
        }
    }
}

fn run_teardown<U>(teardown: Option<&TeardownFn<U>>, values: Vec<U>) -> Result<()> {
    let Some(teardown) = teardown else {
        return Ok(());
    };
    let mut first_error = None;
    for value in &values {
        if let Err(err) = teardown(value) {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Translates one edit, emits the result and then tears down the values
/// that left the view.
fn step<T, U, F>(weak: &Weak<RefCell<MapState<T, U>>>, teardown: Option<&TeardownFn<U>>, f: F) -> Result<()>
where
    T: Clone + 'static,
    U: Clone + 'static,
    F: FnOnce(&mut MapState<T, U>) -> Result<Step<U>>,
{
    let Some(state) = weak.upgrade() else {
        return Ok(());
    };
    let ((changes, released), output) = {
        let mut state = enter(&state)?;
        let step = f(&mut state).map_err(|err| {
            warn!(operator = "transform", error = %err, "edit rejected");
            err
        })?;
        (step, state.output.clone())
    };
    let emitted = emit(&output, changes);
    let torn_down = run_teardown(teardown, released);
    emitted.and(torn_down)
}

fn value_changed<T: Clone + 'static, U: Clone + 'static>(
    weak: Weak<RefCell<MapState<T, U>>>,
    teardown: Option<TeardownFn<U>>,
) -> ValueChangedFn<T, U> {
    Rc::new(move |container: &Rc<ItemContainer<T, U>>, old: U, new: U| {
        step(&weak, teardown.as_ref(), |state| Ok(state.on_value_changed(container, old, new)))
    })
}
