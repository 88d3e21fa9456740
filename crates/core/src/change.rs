//! Structural edits exchanged between sources and derived collections.
//!
//! A `Change` describes exactly one state transition of an ordered
//! collection. Indices are always valid against the collection state
//! immediately before the edit is applied, so consumers must apply edits
//! strictly in the order they were emitted.

use crate::error::{Error, Result};
use alloc::vec::Vec;

/// The kind of a structural edit, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Remove,
    Replace,
    Move,
    Reset,
}

/// A structural edit to an ordered collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change<T> {
    /// `item` was inserted at `index`; later items shift up by one.
    Insert { index: usize, item: T },
    /// `item` was removed from `index`; later items shift down by one.
    Remove { index: usize, item: T },
    /// The item at `index` was swapped for `new`. Count is unchanged.
    Replace { index: usize, old: T, new: T },
    /// The item at `from` was taken out and reinserted at `to`.
    ///
    /// Both indices are below the collection length. `to` is the final
    /// position of the item once the move is complete.
    Move { from: usize, to: usize, item: T },
    /// The whole content was replaced by `items`.
    Reset { items: Vec<T> },
}

impl<T> Change<T> {
    /// Creates an insertion edit.
    #[inline]
    pub fn insert(index: usize, item: T) -> Self {
        Change::Insert { index, item }
    }

    /// Creates a removal edit.
    #[inline]
    pub fn remove(index: usize, item: T) -> Self {
        Change::Remove { index, item }
    }

    /// Creates a positional replacement edit.
    #[inline]
    pub fn replace(index: usize, old: T, new: T) -> Self {
        Change::Replace { index, old, new }
    }

    /// Creates a move edit.
    #[inline]
    pub fn moved(from: usize, to: usize, item: T) -> Self {
        Change::Move { from, to, item }
    }

    /// Creates a reset edit.
    #[inline]
    pub fn reset(items: Vec<T>) -> Self {
        Change::Reset { items }
    }

    /// Returns the kind of this edit.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Insert { .. } => ChangeKind::Insert,
            Change::Remove { .. } => ChangeKind::Remove,
            Change::Replace { .. } => ChangeKind::Replace,
            Change::Move { .. } => ChangeKind::Move,
            Change::Reset { .. } => ChangeKind::Reset,
        }
    }

    /// Returns the change in collection length caused by this edit.
    ///
    /// `Reset` needs the previous length to be meaningful, so it is passed in.
    pub fn len_delta(&self, previous_len: usize) -> isize {
        match self {
            Change::Insert { .. } => 1,
            Change::Remove { .. } => -1,
            Change::Replace { .. } | Change::Move { .. } => 0,
            Change::Reset { items } => items.len() as isize - previous_len as isize,
        }
    }

    /// Maps every item carried by this edit.
    pub fn map<U, F>(self, mut f: F) -> Change<U>
    where
        F: FnMut(T) -> U,
    {
        match self {
            Change::Insert { index, item } => Change::Insert { index, item: f(item) },
            Change::Remove { index, item } => Change::Remove { index, item: f(item) },
            Change::Replace { index, old, new } => Change::Replace {
                index,
                old: f(old),
                new: f(new),
            },
            Change::Move { from, to, item } => Change::Move { from, to, item: f(item) },
            Change::Reset { items } => Change::Reset {
                items: items.into_iter().map(f).collect(),
            },
        }
    }

    /// Checks that the edit's indices are valid against a collection of
    /// length `len` (the state immediately before the edit).
    pub fn validate(&self, len: usize) -> Result<()> {
        match self {
            Change::Insert { index, .. } => Error::check_insert_index(*index, len),
            Change::Remove { index, .. } | Change::Replace { index, .. } => {
                Error::check_index(*index, len)
            }
            Change::Move { from, to, .. } => {
                Error::check_index(*from, len)?;
                Error::check_index(*to, len)
            }
            Change::Reset { .. } => Ok(()),
        }
    }
}

impl<T: Clone> Change<T> {
    /// Applies this edit to `target`, validating indices first.
    ///
    /// On error `target` is left untouched.
    pub fn apply_to(&self, target: &mut Vec<T>) -> Result<()> {
        self.validate(target.len())?;
        match self {
            Change::Insert { index, item } => target.insert(*index, item.clone()),
            Change::Remove { index, .. } => {
                target.remove(*index);
            }
            Change::Replace { index, new, .. } => target[*index] = new.clone(),
            Change::Move { from, to, .. } => {
                if from != to {
                    let moved = target.remove(*from);
                    target.insert(*to, moved);
                }
            }
            Change::Reset { items } => {
                target.clear();
                target.extend(items.iter().cloned());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_change_kind() {
        assert_eq!(Change::insert(0, 1).kind(), ChangeKind::Insert);
        assert_eq!(Change::remove(0, 1).kind(), ChangeKind::Remove);
        assert_eq!(Change::replace(0, 1, 2).kind(), ChangeKind::Replace);
        assert_eq!(Change::moved(0, 1, 1).kind(), ChangeKind::Move);
        assert_eq!(Change::<i32>::reset(vec![]).kind(), ChangeKind::Reset);
    }

    #[test]
    fn test_change_len_delta() {
        assert_eq!(Change::insert(0, 1).len_delta(3), 1);
        assert_eq!(Change::remove(0, 1).len_delta(3), -1);
        assert_eq!(Change::moved(0, 2, 1).len_delta(3), 0);
        assert_eq!(Change::reset(vec![1]).len_delta(3), -2);
    }

    #[test]
    fn test_change_map() {
        let c = Change::replace(1, 2, 3).map(|x| x * 10);
        assert_eq!(c, Change::replace(1, 20, 30));
    }

    #[test]
    fn test_apply_move_forward_and_back() {
        let mut v = vec![1, 2, 3, 4];
        Change::moved(0, 3, 1).apply_to(&mut v).unwrap();
        assert_eq!(v, vec![2, 3, 4, 1]);

        Change::moved(3, 1, 1).apply_to(&mut v).unwrap();
        assert_eq!(v, vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_apply_rejects_bad_index() {
        let mut v = vec![1, 2];
        let err = Change::remove(2, 9).apply_to(&mut v).unwrap_err();
        assert_eq!(err, Error::index_out_of_range(2, 2));
        assert_eq!(v, vec![1, 2]);

        assert!(Change::moved(0, 2, 1).apply_to(&mut v).is_err());
        assert!(Change::insert(2, 3).apply_to(&mut v).is_ok());
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn test_apply_reset() {
        let mut v = vec![1, 2];
        Change::reset(vec![7, 8, 9]).apply_to(&mut v).unwrap();
        assert_eq!(v, vec![7, 8, 9]);
    }
}
