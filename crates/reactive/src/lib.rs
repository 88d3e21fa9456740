//! Ripple Reactive - per-item value tracking.
//!
//! Operators such as filters, sorts and groupings derive a value from every
//! item (a predicate result, a sort key, a group key). When items can change
//! in place, that value has to be re-evaluated and compared. This crate
//! provides the pieces for it:
//!
//! - `ValueCell`: a shared value that pushes `(old, new)` to its listeners
//! - `PropertyNotifier` / `NotifyPropertyChanged`: per-item registry of
//!   property change listeners
//! - `ValueSelector`: evaluates a value for an item and knows how to watch
//!   the item for changes (plain, triggered by property names, or streamed
//!   from a `ValueCell`)
//! - `ValueTracker`: the tracked value of one item plus its watch
//!   subscription, released deterministically on drop
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use ripple_reactive::{ValueCell, ValueSelector, ValueTracker};
//!
//! let age = ValueCell::new(17);
//! let cell = age.clone();
//! let adult = ValueSelector::stream(move |_: &()| cell.clone());
//!
//! let mut tracker = ValueTracker::attach(adult, &(), Rc::new(|| Ok(())));
//! age.set(18).unwrap();
//! assert_eq!(tracker.refresh(&()), Some((17, 18)));
//! ```

#![no_std]

extern crate alloc;

pub mod comparer;
pub mod property;
pub mod selector;
pub mod tracker;
pub mod value_cell;

pub use comparer::{default_comparer, never_equal, EqualityComparer};
pub use property::{NotifyPropertyChanged, PropertyNotifier};
pub use selector::{DirtyFn, ValueSelector};
pub use tracker::ValueTracker;
pub use value_cell::{ValueCell, ValueChange};
