//! Composite key orderings for sorted views.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cmp::Ordering;
use ripple_core::{Error, Result};

/// Sort direction of one ordering component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    #[inline]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

type CompareFn<K> = Rc<dyn Fn(&K, &K) -> Ordering>;

/// A total order over sort keys, built from one or more components.
///
/// ```rust
/// use ripple_incremental::{Direction, KeyOrdering};
///
/// let by_len_then_text = KeyOrdering::by(|s: &&str| s.len(), Direction::Ascending)
///     .then_by(|s: &&str| *s, Direction::Descending);
///
/// let mut words = vec!["bb", "a", "cc", "b"];
/// words.sort_by(|a, b| by_len_then_text.compare(a, b));
/// assert_eq!(words, vec!["b", "a", "cc", "bb"]);
/// ```
pub struct KeyOrdering<K> {
    compare: CompareFn<K>,
}

impl<K> Clone for KeyOrdering<K> {
    fn clone(&self) -> Self {
        Self {
            compare: self.compare.clone(),
        }
    }
}

impl<K: Ord + 'static> KeyOrdering<K> {
    /// Natural order of the key.
    pub fn ascending() -> Self {
        Self::new(|a: &K, b: &K| a.cmp(b))
    }

    /// Reverse natural order of the key.
    pub fn descending() -> Self {
        Self::new(|a: &K, b: &K| b.cmp(a))
    }
}

impl<K: 'static> KeyOrdering<K> {
    /// Ordering backed by an arbitrary comparison.
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        Self {
            compare: Rc::new(compare),
        }
    }

    /// Orders keys by a component extracted from them.
    pub fn by<P, F>(component: F, direction: Direction) -> Self
    where
        P: Ord,
        F: Fn(&K) -> P + 'static,
    {
        Self::new(move |a, b| direction.apply(component(a).cmp(&component(b))))
    }

    /// Breaks ties of `self` with another component.
    pub fn then_by<P, F>(self, component: F, direction: Direction) -> Self
    where
        P: Ord,
        F: Fn(&K) -> P + 'static,
    {
        self.then(Self::by(component, direction))
    }

    /// Breaks ties of `self` with `next`.
    pub fn then(self, next: KeyOrdering<K>) -> Self {
        let first = self.compare;
        Self::new(move |a, b| first(a, b).then_with(|| (next.compare)(a, b)))
    }

    /// Lexicographic combination of several orderings.
    ///
    /// Returns `InvalidArgument` for an empty list.
    pub fn chain(orderings: Vec<KeyOrdering<K>>) -> Result<Self> {
        let mut iter = orderings.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| Error::invalid_argument("ordering needs at least one component"))?;
        Ok(iter.fold(first, KeyOrdering::then))
    }

    /// Reverses the whole ordering.
    pub fn reversed(self) -> Self {
        let compare = self.compare;
        Self::new(move |a, b| compare(b, a))
    }
}

impl<K> KeyOrdering<K> {
    #[inline]
    pub fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.compare)(a, b)
    }
}
