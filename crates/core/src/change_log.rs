//! Recorder for the edits a collection emits.
//!
//! A `ChangeLog` subscribes to a collection, keeps every edit it receives
//! and replays each one onto a private mirror. An edit whose indices do not
//! fit the mirror is rejected with `IndexOutOfRange`, which makes the log a
//! convenient consumer-side check of the edit contract.

use crate::change::{Change, ChangeKind};
use crate::collection::ObservableCollection;
use crate::subscription::{handler, Subscription};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

struct LogState<T> {
    changes: Vec<Change<T>>,
    mirror: Vec<T>,
}

/// Records every change of a collection and mirrors its content.
pub struct ChangeLog<T> {
    state: Rc<RefCell<LogState<T>>>,
    _subscription: Subscription,
}

impl<T: Clone + 'static> ChangeLog<T> {
    /// Starts recording `source`. The mirror starts from its current content.
    pub fn attach<S>(source: &S) -> Self
    where
        S: ObservableCollection<T> + ?Sized,
    {
        let state = Rc::new(RefCell::new(LogState {
            changes: Vec::new(),
            mirror: source.snapshot(),
        }));
        let sink = state.clone();
        let subscription = source.subscribe(handler(move |change: &Change<T>| {
            let mut state = sink.borrow_mut();
            change.apply_to(&mut state.mirror)?;
            state.changes.push(change.clone());
            Ok(())
        }));
        Self {
            state,
            _subscription: subscription,
        }
    }

    /// Returns the recorded changes.
    pub fn changes(&self) -> Vec<Change<T>> {
        self.state.borrow().changes.clone()
    }

    /// Returns the recorded changes and clears the log.
    pub fn take(&self) -> Vec<Change<T>> {
        core::mem::take(&mut self.state.borrow_mut().changes)
    }

    /// Returns the kinds of the recorded changes.
    pub fn kinds(&self) -> Vec<ChangeKind> {
        self.state.borrow().changes.iter().map(Change::kind).collect()
    }

    /// Returns the content reconstructed from the recorded changes.
    pub fn mirror(&self) -> Vec<T> {
        self.state.borrow().mirror.clone()
    }

    /// Returns the number of recorded changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.state.borrow().changes.len()
    }

    /// Returns true if nothing has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().changes.is_empty()
    }

    /// Forgets the recorded changes; the mirror is kept.
    pub fn clear(&self) {
        self.state.borrow_mut().changes.clear();
    }
}
