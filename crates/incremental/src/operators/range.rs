//! Skip/take window over a source.
//!
//! The view mirrors the whole source and publishes the half-open window
//! `[skip, skip + take)`. Edits outside the window that shift items across
//! its edges are published as the matching insert at one end and remove at
//! the other.

use super::{drive, emit, enter, ViewState};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use ripple_core::{
    handler, Change, Error, ObservableCollection, ObservableList, ReadOnlyList, Result, Subscription,
};
use tracing::debug;

struct RangeState<T> {
    items: Vec<T>,
    skip: usize,
    take: Option<usize>,
    output: ObservableList<T>,
}

impl<T: Clone + 'static> ViewState for RangeState<T> {
    type Item = T;

    fn output(&self) -> &ObservableList<T> {
        &self.output
    }
}

impl<T: Clone + 'static> RangeState<T> {
    fn window_len(&self, len: usize) -> usize {
        let available = len.saturating_sub(self.skip);
        self.take.map_or(available, |take| available.min(take))
    }

    /// True if source index `index` lies past the end of the window.
    fn beyond(&self, index: usize) -> bool {
        self.take.is_some_and(|take| index >= self.skip + take)
    }

    fn window(&self) -> Vec<T> {
        let start = self.skip.min(self.items.len());
        let end = start + self.window_len(self.items.len());
        self.items[start..end].to_vec()
    }

    fn insert_at(&mut self, index: usize, item: T, out: &mut Vec<Change<T>>) {
        let mut visible = self.window_len(self.items.len());
        self.items.insert(index, item);
        if self.beyond(index) {
            return;
        }
        if self.take == Some(0) {
            return;
        }
        if index < self.skip {
            if self.items.len() > self.skip {
                out.push(Change::insert(0, self.items[self.skip].clone()));
                visible += 1;
            }
        } else {
            out.push(Change::insert(index - self.skip, self.items[index].clone()));
            visible += 1;
        }
        if let Some(take) = self.take {
            if visible > take {
                out.push(Change::remove(take, self.items[self.skip + take].clone()));
            }
        }
    }

    fn remove_at(&mut self, index: usize, out: &mut Vec<Change<T>>) -> T {
        let mut visible = self.window_len(self.items.len());
        let item = self.items.remove(index);
        if self.beyond(index) {
            return item;
        }
        if index < self.skip {
            if visible > 0 {
                out.push(Change::remove(0, self.items[self.skip - 1].clone()));
                visible -= 1;
            }
        } else {
            out.push(Change::remove(index - self.skip, item.clone()));
            visible -= 1;
        }
        if self.window_len(self.items.len()) > visible {
            out.push(Change::insert(visible, self.items[self.skip + visible].clone()));
        }
        item
    }

    fn on_source_change(&mut self, change: &Change<T>) -> Result<Vec<Change<T>>> {
        change.validate(self.items.len())?;
        let mut out = Vec::new();
        match change {
            Change::Insert { index, item } => self.insert_at(*index, item.clone(), &mut out),
            Change::Remove { index, .. } => {
                self.remove_at(*index, &mut out);
            }
            Change::Replace { index, new, .. } => {
                let old = core::mem::replace(&mut self.items[*index], new.clone());
                let visible = self.window_len(self.items.len());
                if *index >= self.skip && *index < self.skip + visible {
                    out.push(Change::replace(*index - self.skip, old, new.clone()));
                }
            }
            Change::Move { from, to, .. } if from != to => {
                let (from, to) = (*from, *to);
                let end = self.skip + self.window_len(self.items.len());
                let inside = |i: usize| i >= self.skip && i < end;
                if inside(from) && inside(to) {
                    let item = self.items.remove(from);
                    self.items.insert(to, item.clone());
                    out.push(Change::moved(from - self.skip, to - self.skip, item));
                } else if (from < self.skip && to < self.skip) || (from >= end && to >= end) {
                    let item = self.items.remove(from);
                    self.items.insert(to, item);
                } else {
                    let item = self.remove_at(from, &mut out);
                    self.insert_at(to, item, &mut out);
                }
            }
            Change::Move { .. } => {}
            Change::Reset { items } => {
                self.items = items.clone();
                out.push(Change::reset(self.window()));
            }
        }
        Ok(out)
    }
}

fn check_window(skip: usize, take: Option<usize>) -> Result<()> {
    match take {
        Some(take) if skip.checked_add(take).is_none() => Err(Error::invalid_argument(
            "skip + take overflows the index range",
        )),
        _ => Ok(()),
    }
}

/// The items of a source at positions `[skip, skip + take)`.
///
/// `take` of `None` keeps everything after `skip`.
pub struct RangedView<T> {
    state: Rc<RefCell<RangeState<T>>>,
    output: ObservableList<T>,
    _subscription: Subscription,
}

impl<T: Clone + 'static> RangedView<T> {
    pub fn new<S>(source: &S, skip: usize, take: Option<usize>) -> Result<Self>
    where
        S: ObservableCollection<T> + ?Sized,
    {
        check_window(skip, take)?;
        let mut state = RangeState {
            items: source.snapshot(),
            skip,
            take,
            output: ObservableList::new(),
        };
        state.output = ObservableList::from_vec(state.window());
        let output = state.output.clone();
        let state = Rc::new(RefCell::new(state));

        let weak = Rc::downgrade(&state);
        let subscription = source.subscribe(handler(move |change: &Change<T>| {
            drive(&weak, "range", |state| state.on_source_change(change))
        }));
        debug!(skip, take = ?take, len = output.len(), "ranged view attached");

        Ok(Self {
            state,
            output,
            _subscription: subscription,
        })
    }

    /// Moves the window, publishing the new content as one `Reset`.
    pub fn set_window(&self, skip: usize, take: Option<usize>) -> Result<()> {
        check_window(skip, take)?;
        let window = {
            let mut state = enter(&self.state)?;
            state.skip = skip;
            state.take = take;
            state.window()
        };
        emit(&self.output, alloc::vec![Change::reset(window)])
    }

    pub fn skip(&self) -> usize {
        self.state.borrow().skip
    }

    pub fn take(&self) -> Option<usize> {
        self.state.borrow().take
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

    /// Detaches from the source.
    pub fn dispose(self) {
        debug!(skip = self.skip(), "ranged view disposed");
    }
}

collection_view!(RangedView<T>);
