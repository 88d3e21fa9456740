//! Incremental view operators.
//!
//! Every operator subscribes to one or more sources, keeps just enough
//! bookkeeping to translate each incoming edit into the minimal edits of its
//! own output, and publishes those through an [`ObservableList`] that
//! consumers read and subscribe to:
//! - Filter: the items satisfying a predicate, in source order
//! - Map: a per-item projection, index-for-index
//! - Sort: the items ordered by a key with stable ties
//! - Set: distinct, union, except and intersect by key
//! - Group: items partitioned into groups by key
//! - Composite: several sources concatenated end to end
//! - Range: a skip/take window
//! - Aggregate: scalar any/all/contains/count results
//!
//! Edits are processed synchronously. Operator state is borrowed while an
//! edit is translated and released before the resulting edits are emitted,
//! so downstream consumers may read the operator from their handlers.

/// Implements `ObservableCollection` for a view whose `output` list
/// carries its items.
macro_rules! collection_view {
    ($view:ident<$item:ident $(, $extra:ident)*>) => {
        impl<$item: Clone + 'static $(, $extra)*> ripple_core::ObservableCollection<$item>
            for $view<$item $(, $extra)*>
        {
            fn len(&self) -> usize {
                self.output.len()
            }

            fn get(&self, index: usize) -> Option<$item> {
                self.output.get(index)
            }

            fn snapshot(&self) -> alloc::vec::Vec<$item> {
                self.output.snapshot()
            }

            fn subscribe(
                &self,
                handler: ripple_core::Handler<ripple_core::Change<$item>>,
            ) -> ripple_core::Subscription {
                ripple_core::ObservableCollection::subscribe(&self.output, handler)
            }
        }
    };
}

mod aggregate;
mod composite;
mod filter;
mod group;
mod map;
mod range;
mod set;
mod sort;

pub use aggregate::{AllResult, AnyResult, ContainsResult, CountResult, ScalarAggregate};
pub use composite::{CompositeOptions, CompositeSource};
pub use filter::FilteredView;
pub use group::{Group, GroupedSource, GroupingOptions};
pub use map::TransformedView;
pub use range::RangedView;
pub use set::{SetRule, SetView};
pub use sort::SortedView;

use alloc::rc::Weak;
use alloc::vec::Vec;
use core::cell::{RefCell, RefMut};
use ripple_core::{Change, Error, ObservableList, Result};
use tracing::{trace, warn};

/// Operator state that publishes its result through an output list.
pub(crate) trait ViewState {
    type Item: Clone + 'static;

    fn output(&self) -> &ObservableList<Self::Item>;
}

/// Mutably borrows operator state, rejecting re-entrant edits.
pub(crate) fn enter<S>(state: &RefCell<S>) -> Result<RefMut<'_, S>> {
    state.try_borrow_mut().map_err(|_| {
        warn!("operator re-entered while processing an edit");
        Error::invalid_argument("operator re-entered while processing an edit")
    })
}

/// Applies `changes` to `output` in order.
///
/// Every change is applied even if a downstream handler fails; the first
/// failure is returned.
pub(crate) fn emit<U: Clone + 'static>(output: &ObservableList<U>, changes: Vec<Change<U>>) -> Result<()> {
    let mut first_error = None;
    for change in changes {
        trace!(kind = ?change.kind(), "emit");
        if let Err(err) = output.apply(change) {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Runs `step` against live operator state and emits the edits it produced.
///
/// Does nothing once the operator has been dropped.
pub(crate) fn drive<S, F>(weak: &Weak<RefCell<S>>, what: &'static str, step: F) -> Result<()>
where
    S: ViewState,
    F: FnOnce(&mut S) -> Result<Vec<Change<S::Item>>>,
{
    let Some(state) = weak.upgrade() else {
        return Ok(());
    };
    let (changes, output) = {
        let mut state = enter(&state)?;
        let changes = step(&mut state).map_err(|err| {
            warn!(operator = what, error = %err, "edit rejected");
            err
        })?;
        (changes, state.output().clone())
    };
    emit(&output, changes)
}
