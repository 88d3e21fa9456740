//! Ripple Incremental - live views maintained edit by edit.
//!
//! Every view in this crate subscribes to one or more observable sources and
//! keeps its own content equal to a query over them (filter, projection,
//! sort, set algebra, grouping, concatenation, windowing, aggregation). Each
//! source edit is translated into the minimal edits of the view, which are
//! published to the view's own subscribers in turn. Views are themselves
//! observable collections, so they compose.
//!
//! # Views
//!
//! - `FilteredView`: items matching a predicate, in source order
//! - `TransformedView`: a per-item projection with optional teardown
//! - `SortedView`: items ordered by a key with stable ties
//! - `SetView`: distinct, union, except and intersect by key
//! - `GroupedSource`: items partitioned into explicit and implicit groups
//! - `CompositeSource`: several collections concatenated end to end
//! - `RangedView`: a skip/take window
//! - `ScalarAggregate`: any, all, contains and count results
//!
//! Per-item values (predicate results, keys, projections) are derived with
//! a [`ValueSelector`](ripple_reactive::ValueSelector), which decides
//! whether and how the item is watched for in-place changes.
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{Change, ChangeLog, ObservableList};
//! use ripple_incremental::{FilteredView, SortedView};
//! use ripple_reactive::ValueSelector;
//!
//! let scores = ObservableList::from_vec(vec![40, 95, 72, 18]);
//! let passing = FilteredView::new(&scores, ValueSelector::plain(|s: &i32| *s >= 50));
//! let ranked = SortedView::by_key(&passing, |s: &i32| -s);
//! let log = ChangeLog::attach(&ranked.view());
//!
//! scores.push(88).unwrap();
//!
//! assert_eq!(ranked.snapshot(), vec![95, 88, 72]);
//! assert_eq!(log.changes(), vec![Change::insert(1, 88)]);
//! ```

#![no_std]

extern crate alloc;

mod container;
mod ext;
pub mod operators;
mod ordering;

pub use ext::CollectionExt;
pub use operators::{
    AllResult, AnyResult, CompositeOptions, CompositeSource, ContainsResult, CountResult,
    FilteredView, Group, GroupedSource, GroupingOptions, RangedView, ScalarAggregate, SetRule,
    SetView, SortedView, TransformedView,
};
pub use ordering::{Direction, KeyOrdering};
