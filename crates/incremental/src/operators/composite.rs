//! Concatenation of several collections.
//!
//! `CompositeSource` presents an ordered list of sub-collections as one
//! flat list. It keeps an offset table with the base offset and item count
//! of every sub-collection, so an edit inside a sub-collection is forwarded
//! at `base + index` and only the bases after it shift.

use super::{drive, enter, ViewState};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use ripple_core::{
    handler, Change, Error, ObservableCollection, ObservableList, ReadOnlyList, Result, Subscription,
};
use tracing::debug;

/// Tuning of a [`CompositeSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositeOptions {
    /// Whole sub-collection edits touching more items than this are
    /// published as a single `Reset` instead of per-item edits.
    pub batch_threshold: usize,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self { batch_threshold: 32 }
    }
}

impl CompositeOptions {
    pub fn with_batch_threshold(mut self, batch_threshold: usize) -> Self {
        self.batch_threshold = batch_threshold;
        self
    }
}

type Member<T> = Rc<dyn ObservableCollection<T>>;

struct Segment<T> {
    id: u64,
    collection: Member<T>,
    base: usize,
    count: usize,
    _subscription: Subscription,
}

struct CompositeState<T> {
    segments: Vec<Segment<T>>,
    next_id: u64,
    options: CompositeOptions,
    output: ObservableList<T>,
}

impl<T: Clone + 'static> ViewState for CompositeState<T> {
    type Item = T;

    fn output(&self) -> &ObservableList<T> {
        &self.output
    }
}

impl<T: Clone + 'static> CompositeState<T> {
    fn total(&self) -> usize {
        self.segments.last().map_or(0, |s| s.base + s.count)
    }

    fn shift_after(&mut self, position: usize, delta: isize) {
        for segment in &mut self.segments[position + 1..] {
            segment.base = segment.base.saturating_add_signed(delta);
        }
    }

    fn rebase(&mut self, start: usize) {
        let mut base = match start {
            0 => 0,
            _ => self.segments[start - 1].base + self.segments[start - 1].count,
        };
        for segment in &mut self.segments[start..] {
            segment.base = base;
            base += segment.count;
        }
    }

    fn batched(&self, touched: usize) -> bool {
        touched > self.options.batch_threshold
    }

    /// Flattened output with `range` swapped for `items`.
    fn splice(&self, range: core::ops::Range<usize>, items: Vec<T>) -> Vec<T> {
        let mut flat = self.output.snapshot();
        flat.splice(range, items);
        flat
    }

    fn on_member_change(&mut self, id: u64, change: &Change<T>) -> Result<Vec<Change<T>>> {
        let Some(position) = self.segments.iter().position(|s| s.id == id) else {
            return Ok(Vec::new());
        };
        let (base, count) = (self.segments[position].base, self.segments[position].count);
        change.validate(count)?;

        let mut out = Vec::new();
        match change {
            Change::Insert { index, item } => {
                out.push(Change::insert(base + index, item.clone()));
                self.segments[position].count += 1;
                self.shift_after(position, 1);
            }
            Change::Remove { index, item } => {
                out.push(Change::remove(base + index, item.clone()));
                self.segments[position].count -= 1;
                self.shift_after(position, -1);
            }
            Change::Replace { index, old, new } => {
                out.push(Change::replace(base + index, old.clone(), new.clone()));
            }
            Change::Move { from, to, item } => {
                if from != to {
                    out.push(Change::moved(base + from, base + to, item.clone()));
                }
            }
            Change::Reset { items } => {
                if self.batched(count + items.len()) {
                    out.push(Change::reset(self.splice(base..base + count, items.clone())));
                } else {
                    let previous = self.output.snapshot();
                    for item in previous[base..base + count].iter() {
                        out.push(Change::remove(base, item.clone()));
                    }
                    for (offset, item) in items.iter().enumerate() {
                        out.push(Change::insert(base + offset, item.clone()));
                    }
                }
                self.segments[position].count = items.len();
                self.shift_after(position, items.len() as isize - count as isize);
            }
        }
        Ok(out)
    }

    fn insert_segment(
        &mut self,
        position: usize,
        id: u64,
        collection: Member<T>,
        subscription: Subscription,
    ) -> Vec<Change<T>> {
        let items = collection.snapshot();
        let base = match self.segments.get(position) {
            Some(segment) => segment.base,
            None => self.total(),
        };
        let count = items.len();

        let out = if self.batched(count) {
            alloc::vec![Change::reset(self.splice(base..base, items))]
        } else {
            items
                .into_iter()
                .enumerate()
                .map(|(offset, item)| Change::insert(base + offset, item))
                .collect()
        };
        self.segments.insert(
            position,
            Segment {
                id,
                collection,
                base,
                count,
                _subscription: subscription,
            },
        );
        self.shift_after(position, count as isize);
        debug!(position, base, count, "collection added to composite");
        out
    }

    fn remove_segment(&mut self, position: usize) -> (Member<T>, Vec<Change<T>>) {
        let segment = self.segments.remove(position);
        let range = segment.base..segment.base + segment.count;
        let out = if self.batched(segment.count) {
            alloc::vec![Change::reset(self.splice(range, Vec::new()))]
        } else {
            let previous = self.output.snapshot();
            previous[range]
                .iter()
                .map(|item| Change::remove(segment.base, item.clone()))
                .collect()
        };
        self.rebase(position);
        debug!(position, count = segment.count, "collection removed from composite");
        (segment.collection, out)
    }

    fn move_segment(&mut self, from: usize, to: usize) -> Vec<Change<T>> {
        if from == to {
            return Vec::new();
        }
        let old_base = self.segments[from].base;
        let count = self.segments[from].count;
        let segment = self.segments.remove(from);
        self.segments.insert(to, segment);
        self.rebase(from.min(to));
        let new_base = self.segments[to].base;

        if self.batched(count) {
            let mut flat = self.output.snapshot();
            let moved: Vec<T> = flat.drain(old_base..old_base + count).collect();
            flat.splice(new_base..new_base, moved);
            return alloc::vec![Change::reset(flat)];
        }
        let previous = self.output.snapshot();
        let item = |k: usize| previous[old_base + k].clone();
        if new_base < old_base {
            (0..count)
                .map(|k| Change::moved(old_base + k, new_base + k, item(k)))
                .collect()
        } else {
            (0..count)
                .rev()
                .map(|k| Change::moved(old_base + k, new_base + k, item(k)))
                .collect()
        }
    }
}

/// Several collections presented end to end as one list.
pub struct CompositeSource<T> {
    state: Rc<RefCell<CompositeState<T>>>,
    output: ObservableList<T>,
}

impl<T: Clone + 'static> Default for CompositeSource<T> {
    fn default() -> Self {
        Self::new(CompositeOptions::default())
    }
}

impl<T: Clone + 'static> CompositeSource<T> {
    /// Creates an empty composite.
    pub fn new(options: CompositeOptions) -> Self {
        let output = ObservableList::new();
        let state = Rc::new(RefCell::new(CompositeState {
            segments: Vec::new(),
            next_id: 0,
            options,
            output: output.clone(),
        }));
        Self { state, output }
    }

    /// Creates a composite over `collections`, in order.
    pub fn from_collections<I>(collections: I, options: CompositeOptions) -> Result<Self>
    where
        I: IntoIterator<Item = Member<T>>,
    {
        let composite = Self::new(options);
        for collection in collections {
            composite.push_shared(collection)?;
        }
        Ok(composite)
    }

    /// Appends `collection` after the current last sub-collection.
    pub fn push<C>(&self, collection: C) -> Result<()>
    where
        C: ObservableCollection<T> + 'static,
    {
        self.push_shared(Rc::new(collection))
    }

    pub fn push_shared(&self, collection: Member<T>) -> Result<()> {
        let position = enter(&self.state)?.segments.len();
        self.insert_shared(position, collection)
    }

    /// Inserts `collection` so that it becomes sub-collection `position`.
    pub fn insert<C>(&self, position: usize, collection: C) -> Result<()>
    where
        C: ObservableCollection<T> + 'static,
    {
        self.insert_shared(position, Rc::new(collection))
    }

    pub fn insert_shared(&self, position: usize, collection: Member<T>) -> Result<()> {
        let id = {
            let mut state = enter(&self.state)?;
            Error::check_insert_index(position, state.segments.len())?;
            state.next_id += 1;
            state.next_id
        };
        let weak = Rc::downgrade(&self.state);
        let subscription = collection.subscribe(handler(move |change: &Change<T>| {
            drive(&weak, "composite", |state| state.on_member_change(id, change))
        }));
        let weak = Rc::downgrade(&self.state);
        drive(&weak, "composite", |state| {
            Ok(state.insert_segment(position, id, collection, subscription))
        })
    }

    /// Removes sub-collection `position` and returns it.
    pub fn remove(&self, position: usize) -> Result<Member<T>> {
        let mut removed = None;
        let weak = Rc::downgrade(&self.state);
        drive(&weak, "composite", |state| {
            Error::check_index(position, state.segments.len())?;
            let (collection, out) = state.remove_segment(position);
            removed = Some(collection);
            Ok(out)
        })?;
        removed.ok_or_else(|| Error::index_out_of_range(position, self.collection_count()))
    }

    /// Moves sub-collection `from` so that it ends up at position `to`.
    ///
    /// Published as one `Move` per item, or a single `Reset` above the
    /// batch threshold.
    pub fn move_collection(&self, from: usize, to: usize) -> Result<()> {
        let weak = Rc::downgrade(&self.state);
        drive(&weak, "composite", |state| {
            Error::check_index(from, state.segments.len())?;
            Error::check_index(to, state.segments.len())?;
            Ok(state.move_segment(from, to))
        })
    }

    /// Removes every sub-collection with a single `Reset`.
    pub fn clear(&self) -> Result<()> {
        let weak = Rc::downgrade(&self.state);
        drive(&weak, "composite", |state| {
            state.segments.clear();
            Ok(alloc::vec![Change::reset(Vec::new())])
        })
    }

    pub fn collection_count(&self) -> usize {
        self.state.borrow().segments.len()
    }

    /// Flat offset of the first item of sub-collection `position`.
    pub fn offset_of(&self, position: usize) -> Option<usize> {
        self.state.borrow().segments.get(position).map(|s| s.base)
    }

    /// Returns sub-collection `position`.
    pub fn collection(&self, position: usize) -> Option<Member<T>> {
        self.state
            .borrow()
            .segments
            .get(position)
            .map(|s| s.collection.clone())
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
}

collection_view!(CompositeSource<T>);
