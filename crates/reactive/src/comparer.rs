//! Equality comparers for tracked values.

use alloc::rc::Rc;

/// Decides whether two values are equal for change-detection purposes.
pub type EqualityComparer<V> = Rc<dyn Fn(&V, &V) -> bool>;

/// Returns a comparer backed by `PartialEq`.
pub fn default_comparer<V: PartialEq + 'static>() -> EqualityComparer<V> {
    Rc::new(|a: &V, b: &V| a == b)
}

/// Returns a comparer that never considers two values equal, so every
/// re-evaluation is reported as a change.
pub fn never_equal<V: 'static>() -> EqualityComparer<V> {
    Rc::new(|_: &V, _: &V| false)
}
