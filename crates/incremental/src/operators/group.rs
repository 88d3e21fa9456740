//! Incremental grouping.
//!
//! `GroupedSource` partitions the items of a source by a key. It publishes
//! two levels of edits: the list of visible groups, and inside every group
//! the list of its members in source order.
//!
//! Explicit groups are declared up front, always listed first and never
//! removed, even when empty. Implicit groups are created on demand for keys
//! without an explicit group, appended in order of first appearance and
//! dropped again when their last member leaves. When implicit groups are
//! disabled, items whose key has no explicit group stay tracked but are not
//! visible in any group.

use super::enter;
use crate::container::{ContainerList, ItemContainer, ValueChangedFn};
use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt::Debug;
use ripple_core::{
    handler, Change, Error, ObservableCollection, ObservableList, ReadOnlyList, Result, Subscription,
};
use ripple_reactive::ValueSelector;
use tracing::{debug, warn};

type Slot<T, K> = Rc<ItemContainer<T, K>>;

/// Construction options of a [`GroupedSource`].
#[derive(Clone, Debug)]
pub struct GroupingOptions<K> {
    /// Keys of the groups that always exist, in display order.
    pub explicit_keys: Vec<K>,
    /// Whether keys without an explicit group get a group of their own.
    pub include_implicit_groups: bool,
}

impl<K> Default for GroupingOptions<K> {
    fn default() -> Self {
        Self {
            explicit_keys: Vec::new(),
            include_implicit_groups: true,
        }
    }
}

impl<K> GroupingOptions<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_explicit_keys(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.explicit_keys = keys.into_iter().collect();
        self
    }

    pub fn include_implicit_groups(mut self, include: bool) -> Self {
        self.include_implicit_groups = include;
        self
    }
}

struct GroupInner<K, T> {
    key: K,
    explicit: bool,
    members: ObservableList<T>,
}

/// One group of a [`GroupedSource`]: its key and its members.
///
/// Cloning shares the group. Two handles are equal if they refer to the
/// same group.
pub struct Group<K, T> {
    inner: Rc<GroupInner<K, T>>,
}

impl<K, T> Clone for Group<K, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, T> PartialEq for Group<K, T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K: Debug, T: Clone + 'static> Debug for Group<K, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Group")
            .field("key", &self.inner.key)
            .field("explicit", &self.inner.explicit)
            .field("len", &self.inner.members.len())
            .finish()
    }
}

impl<K, T: Clone + 'static> Group<K, T> {
    fn new(key: K, explicit: bool) -> Self {
        Self {
            inner: Rc::new(GroupInner {
                key,
                explicit,
                members: ObservableList::new(),
            }),
        }
    }

    #[inline]
    pub fn key(&self) -> &K {
        &self.inner.key
    }

    /// True for groups declared through [`GroupingOptions::explicit_keys`].
    #[inline]
    pub fn is_explicit(&self) -> bool {
        self.inner.explicit
    }

    /// Members of the group, in source order.
    pub fn members(&self) -> ReadOnlyList<T> {
        self.inner.members.view()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.members.is_empty()
    }

    fn list(&self) -> ObservableList<T> {
        self.inner.members.clone()
    }
}

/// An edit of either the group list or the member list of one group.
enum GroupEdit<K, T> {
    Groups(Change<Group<K, T>>),
    Members(ObservableList<T>, Change<T>),
}

struct GroupSlot<K, T> {
    group: Group<K, T>,
    members: Vec<Slot<T, K>>,
}

struct GroupState<T, K> {
    containers: ContainerList<T, K>,
    groups: Vec<GroupSlot<K, T>>,
    include_implicit: bool,
    selector: ValueSelector<T, K>,
    on_change: ValueChangedFn<T, K>,
    output: ObservableList<Group<K, T>>,
}

impl<T: Clone + 'static, K: Clone + PartialEq + 'static> GroupState<T, K> {
    fn group_index(&self, key: &K) -> Option<usize> {
        self.groups.iter().position(|slot| slot.group.key() == key)
    }

    /// Group and member position of `container`, filed under `key`.
    fn locate(&self, container: &Slot<T, K>, key: &K) -> Option<(usize, usize)> {
        let gi = self.group_index(key)?;
        let pos = self.groups[gi]
            .members
            .iter()
            .position(|member| Rc::ptr_eq(member, container))?;
        Some((gi, pos))
    }

    fn add_member(&mut self, container: &Slot<T, K>, out: &mut Vec<GroupEdit<K, T>>) {
        let key = container.value();
        let gi = match self.group_index(&key) {
            Some(gi) => gi,
            None if self.include_implicit => {
                let group = Group::new(key, false);
                self.groups.push(GroupSlot {
                    group: group.clone(),
                    members: Vec::new(),
                });
                out.push(GroupEdit::Groups(Change::insert(self.groups.len() - 1, group)));
                self.groups.len() - 1
            }
            None => return,
        };
        let slot = &mut self.groups[gi];
        let pos = slot
            .members
            .partition_point(|member| member.index() < container.index());
        slot.members.insert(pos, container.clone());
        out.push(GroupEdit::Members(
            slot.group.list(),
            Change::insert(pos, container.item()),
        ));
    }

    fn remove_member(&mut self, container: &Slot<T, K>, key: &K, item: T, out: &mut Vec<GroupEdit<K, T>>) {
        let Some((gi, pos)) = self.locate(container, key) else {
            return;
        };
        let slot = &mut self.groups[gi];
        slot.members.remove(pos);
        out.push(GroupEdit::Members(slot.group.list(), Change::remove(pos, item)));
        if slot.members.is_empty() && !slot.group.is_explicit() {
            let slot = self.groups.remove(gi);
            out.push(GroupEdit::Groups(Change::remove(gi, slot.group)));
        }
    }

    /// Rebuilds every group from the containers.
    ///
    /// Explicit groups and implicit groups that still have members keep
    /// their identity.
    fn regroup(&mut self) -> Vec<GroupEdit<K, T>> {
        let previous = core::mem::take(&mut self.groups);
        let mut next: Vec<GroupSlot<K, T>> = previous
            .iter()
            .filter(|slot| slot.group.is_explicit())
            .map(|slot| GroupSlot {
                group: slot.group.clone(),
                members: Vec::new(),
            })
            .collect();

        for container in self.containers.iter() {
            let key = container.value();
            let gi = match next.iter().position(|slot| *slot.group.key() == key) {
                Some(gi) => gi,
                None if self.include_implicit => {
                    let group = previous
                        .iter()
                        .find(|slot| *slot.group.key() == key)
                        .map(|slot| slot.group.clone())
                        .unwrap_or_else(|| Group::new(key, false));
                    next.push(GroupSlot {
                        group,
                        members: Vec::new(),
                    });
                    next.len() - 1
                }
                None => continue,
            };
            next[gi].members.push(container.clone());
        }

        let mut edits = Vec::with_capacity(next.len() + 1);
        edits.push(GroupEdit::Groups(Change::reset(
            next.iter().map(|slot| slot.group.clone()).collect(),
        )));
        for slot in &next {
            let items = slot.members.iter().map(|member| member.item()).collect();
            edits.push(GroupEdit::Members(slot.group.list(), Change::reset(items)));
        }
        self.groups = next;
        edits
    }

    fn on_source_change(&mut self, change: &Change<T>) -> Result<Vec<GroupEdit<K, T>>> {
        let mut out = Vec::new();
        match change {
            Change::Insert { index, item } => {
                Error::check_insert_index(*index, self.containers.len())?;
                let container = ItemContainer::new(item.clone(), *index, &self.selector, &self.on_change);
                self.containers.insert(*index, container.clone())?;
                self.add_member(&container, &mut out);
            }
            Change::Remove { index, .. } => {
                let container = self.containers.get(*index)?.clone();
                self.remove_member(&container, &container.value(), container.item(), &mut out);
                self.containers.remove(*index)?;
            }
            Change::Replace { index, new, .. } => {
                let container = self.containers.get(*index)?.clone();
                let key = container.value();
                let (old, changed) = container.replace_item(new.clone(), &self.on_change);
                match changed {
                    None => {
                        if let Some((gi, pos)) = self.locate(&container, &key) {
                            out.push(GroupEdit::Members(
                                self.groups[gi].group.list(),
                                Change::replace(pos, old, new.clone()),
                            ));
                        }
                    }
                    Some((old_key, _)) => {
                        self.remove_member(&container, &old_key, old, &mut out);
                        self.add_member(&container, &mut out);
                    }
                }
            }
            Change::Move { from, to, .. } => {
                Error::check_index(*to, self.containers.len())?;
                let container = self.containers.get(*from)?.clone();
                match self.locate(&container, &container.value()) {
                    Some((gi, before)) => {
                        self.groups[gi].members.remove(before);
                        self.containers.move_item(*from, *to)?;
                        let slot = &mut self.groups[gi];
                        let after = slot
                            .members
                            .partition_point(|member| member.index() < container.index());
                        slot.members.insert(after, container.clone());
                        if before != after {
                            out.push(GroupEdit::Members(
                                slot.group.list(),
                                Change::moved(before, after, container.item()),
                            ));
                        }
                    }
                    None => self.containers.move_item(*from, *to)?,
                }
            }
            Change::Reset { items } => {
                let fresh = ContainerList::build(items.clone(), &self.selector, &self.on_change);
                drop(self.containers.reset(fresh));
                out = self.regroup();
            }
        }
        Ok(out)
    }

    fn on_key_changed(&mut self, container: &Slot<T, K>, old: K) -> Vec<GroupEdit<K, T>> {
        let mut out = Vec::new();
        if self.containers.holds(container) {
            self.remove_member(container, &old, container.item(), &mut out);
            self.add_member(container, &mut out);
        }
        out
    }
}

fn apply_edits<K, T>(output: &ObservableList<Group<K, T>>, edits: Vec<GroupEdit<K, T>>) -> Result<()>
where
    K: 'static,
    T: Clone + 'static,
{
    let mut first_error = None;
    for edit in edits {
        let result = match edit {
            GroupEdit::Groups(change) => output.apply(change),
            GroupEdit::Members(members, change) => members.apply(change),
        };
        if let Err(err) = result {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn step<T, K, F>(weak: &Weak<RefCell<GroupState<T, K>>>, f: F) -> Result<()>
where
    T: Clone + 'static,
    K: Clone + PartialEq + 'static,
    F: FnOnce(&mut GroupState<T, K>) -> Result<Vec<GroupEdit<K, T>>>,
{
    let Some(state) = weak.upgrade() else {
        return Ok(());
    };
    let (edits, output) = {
        let mut state = enter(&state)?;
        let edits = f(&mut state).map_err(|err| {
            warn!(operator = "group", error = %err, "edit rejected");
            err
        })?;
        (edits, state.output.clone())
    };
    apply_edits(&output, edits)
}

/// The items of a source partitioned into groups by key.
pub struct GroupedSource<T, K> {
    state: Rc<RefCell<GroupState<T, K>>>,
    output: ObservableList<Group<K, T>>,
    _subscription: Subscription,
}

impl<T, K> GroupedSource<T, K>
where
    T: Clone + 'static,
    K: Clone + PartialEq + Debug + 'static,
{
    /// Groups `source` by the key `selector` derives.
    ///
    /// Returns `DuplicateKey` if an explicit key is declared twice.
    pub fn new<S>(source: &S, selector: ValueSelector<T, K>, options: GroupingOptions<K>) -> Result<Self>
    where
        S: ObservableCollection<T> + ?Sized,
    {
        for (i, key) in options.explicit_keys.iter().enumerate() {
            if options.explicit_keys[..i].contains(key) {
                warn!(key = ?key, "explicit group declared twice");
                return Err(Error::duplicate_key(format!("{key:?}")));
            }
        }

        let items = source.snapshot();
        let mut initial = Vec::new();
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<GroupState<T, K>>>| {
            let on_change = value_changed(weak.clone());
            let containers = ContainerList::build(items, &selector, &on_change);
            let groups = options
                .explicit_keys
                .into_iter()
                .map(|key| GroupSlot {
                    group: Group::new(key, true),
                    members: Vec::new(),
                })
                .collect();
            let mut state = GroupState {
                containers,
                groups,
                include_implicit: options.include_implicit_groups,
                selector,
                on_change,
                output: ObservableList::new(),
            };
            initial = state.regroup();
            RefCell::new(state)
        });
        let output = state.borrow().output.clone();
        apply_edits(&output, initial)?;

        let weak = Rc::downgrade(&state);
        let subscription = source.subscribe(handler(move |change: &Change<T>| {
            step(&weak, |state| state.on_source_change(change))
        }));
        debug!(groups = output.len(), "grouped source attached");

        Ok(Self {
            state,
            output,
            _subscription: subscription,
        })
    }

    /// Groups `source` by an untracked key with implicit groups only.
    pub fn by_key<S, F>(source: &S, key: F) -> Result<Self>
    where
        S: ObservableCollection<T> + ?Sized,
        F: Fn(&T) -> K + 'static,
    {
        Self::new(source, ValueSelector::plain(key), GroupingOptions::default())
    }
}

impl<T: Clone + 'static, K: Clone + PartialEq + 'static> GroupedSource<T, K> {
    /// The visible groups, explicit ones first.
    pub fn groups(&self) -> ReadOnlyList<Group<K, T>> {
        self.output.view()
    }

    pub fn group_count(&self) -> usize {
        self.output.len()
    }

    /// Returns the visible group for `key`.
    pub fn group(&self, key: &K) -> Option<Group<K, T>> {
        self.output
            .with_items(|groups| groups.iter().find(|group| group.key() == key).cloned())
    }

    pub fn snapshot(&self) -> Vec<Group<K, T>> {
        self.output.snapshot()
    }

    /// Number of tracked items that belong to no visible group.
    pub fn hidden_count(&self) -> usize {
        let state = self.state.borrow();
        let grouped: usize = state.groups.iter().map(|slot| slot.members.len()).sum();
        state.containers.len() - grouped
    }

    pub fn dispose(self) {
        debug!("grouped source disposed");
    }
}

fn value_changed<T, K>(weak: Weak<RefCell<GroupState<T, K>>>) -> ValueChangedFn<T, K>
where
    T: Clone + 'static,
    K: Clone + PartialEq + 'static,
{
    Rc::new(move |container: &Slot<T, K>, old: K, _new: K| {
        step(&weak, |state| Ok(state.on_key_changed(container, old)))
    })
}
