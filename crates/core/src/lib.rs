//! Ripple Core - structural edits and observable lists.
//!
//! This crate provides the vocabulary every Ripple operator speaks:
//!
//! - `Change`: one structural edit (Insert, Remove, Replace, Move, Reset)
//! - `ObservableCollection`: the source contract (length, indexed read,
//!   edit subscription) shared by sources and derived views
//! - `ObservableList`: the mutable list users edit, and the output buffer
//!   of every derived view
//! - `Subscription`: scoped guard that detaches its handler when dropped
//! - `ChangeLog`: records and replays the edits a collection emits
//! - `Error`: error types for view construction and maintenance
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{Change, ChangeLog, ObservableList};
//!
//! let list = ObservableList::from_vec(vec![1, 2, 3]);
//! let log = ChangeLog::attach(&list);
//!
//! list.move_item(0, 2).unwrap();
//!
//! assert_eq!(list.snapshot(), vec![2, 3, 1]);
//! assert_eq!(log.changes(), vec![Change::moved(0, 2, 1)]);
//! assert_eq!(log.mirror(), list.snapshot());
//! ```

#![no_std]

extern crate alloc;

mod change;
mod change_log;
mod collection;
mod error;
mod list;
pub mod subscription;

pub use change::{Change, ChangeKind};
pub use change_log::ChangeLog;
pub use collection::ObservableCollection;
pub use error::{Error, Result};
pub use list::{ObservableList, ReadOnlyList};
pub use subscription::{handler, Handler, Subscription, SubscriptionId, SubscriptionManager};
