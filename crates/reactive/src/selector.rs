//! Value selectors: how an operator derives a value from an item and how it
//! learns that the value may have changed.

use crate::comparer::{default_comparer, never_equal, EqualityComparer};
use crate::property::NotifyPropertyChanged;
use crate::value_cell::ValueCell;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use ripple_core::{Result, Subscription};

/// Callback a watched item invokes when its value may have changed.
pub type DirtyFn = Rc<dyn Fn() -> Result<()>>;

type EvaluateFn<T, V> = Rc<dyn Fn(&T) -> V>;
type WatchFn<T> = Rc<dyn Fn(&T, DirtyFn) -> Subscription>;

/// Derives a value of type `V` from an item of type `T`.
///
/// A selector is always able to evaluate the current value. A tracked
/// selector can additionally watch an item and report when the value
/// should be re-evaluated:
///
/// - [`plain`](Self::plain): evaluated when the item enters and when it is
///   replaced, never watched.
/// - [`triggered`](Self::triggered): re-evaluated whenever the item
///   announces a change of one of the trigger properties.
/// - [`stream`](Self::stream): the item exposes a [`ValueCell`] whose value
///   is tracked directly.
pub struct ValueSelector<T, V> {
    evaluate: EvaluateFn<T, V>,
    watch: Option<WatchFn<T>>,
    comparer: EqualityComparer<V>,
}

impl<T, V> Clone for ValueSelector<T, V> {
    fn clone(&self) -> Self {
        Self {
            evaluate: self.evaluate.clone(),
            watch: self.watch.clone(),
            comparer: self.comparer.clone(),
        }
    }
}

impl<T: 'static, V: PartialEq + 'static> ValueSelector<T, V> {
    /// Selector evaluated once per item version.
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&T) -> V + 'static,
    {
        Self {
            evaluate: Rc::new(f),
            watch: None,
            comparer: default_comparer(),
        }
    }

    /// Selector that ignores the item and always yields `value`.
    pub fn constant(value: V) -> Self
    where
        V: Clone,
    {
        Self::plain(move |_| value.clone())
    }
}

impl<T, V> ValueSelector<T, V>
where
    T: NotifyPropertyChanged + 'static,
    V: PartialEq + 'static,
{
    /// Selector re-evaluated when the item announces one of `triggers`.
    ///
    /// An empty trigger list reacts to every announced property.
    pub fn triggered<F, I, S>(f: F, triggers: I) -> Self
    where
        F: Fn(&T) -> V + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let triggers: Rc<Vec<String>> = Rc::new(triggers.into_iter().map(Into::into).collect());
        let watch: WatchFn<T> = Rc::new(move |item: &T, dirty: DirtyFn| {
            let triggers = triggers.clone();
            item.property_notifier().subscribe(move |property| {
                if triggers.is_empty() || triggers.iter().any(|t| t == property) {
                    dirty()
                } else {
                    Ok(())
                }
            })
        });
        Self {
            evaluate: Rc::new(f),
            watch: Some(watch),
            comparer: default_comparer(),
        }
    }
}

impl<T: 'static, V: Clone + PartialEq + 'static> ValueSelector<T, V> {
    /// Selector tracking a [`ValueCell`] exposed by the item.
    pub fn stream<F>(f: F) -> Self
    where
        F: Fn(&T) -> ValueCell<V> + 'static,
    {
        let f = Rc::new(f);
        let cell_of = f.clone();
        let watch: WatchFn<T> = Rc::new(move |item: &T, dirty: DirtyFn| {
            cell_of(item).subscribe(move |_| dirty())
        });
        Self {
            evaluate: Rc::new(move |item: &T| f(item).get()),
            watch: Some(watch),
            comparer: default_comparer(),
        }
    }
}

impl<T: 'static, V: 'static> ValueSelector<T, V> {
    /// Untracked selector for values without an equality, such as
    /// projections. Every re-evaluation counts as a change.
    pub fn projection<F>(f: F) -> Self
    where
        F: Fn(&T) -> V + 'static,
    {
        Self {
            evaluate: Rc::new(f),
            watch: None,
            comparer: never_equal(),
        }
    }
}

impl<T, V> ValueSelector<T, V> {
    /// Replaces the equality comparer used to detect value changes.
    pub fn with_comparer(mut self, comparer: EqualityComparer<V>) -> Self {
        self.comparer = comparer;
        self
    }

    /// Evaluates the value for `item`.
    #[inline]
    pub fn evaluate(&self, item: &T) -> V {
        (self.evaluate)(item)
    }

    /// Returns true if this selector can watch items for changes.
    #[inline]
    pub fn is_tracked(&self) -> bool {
        self.watch.is_some()
    }

    /// Starts watching `item`; `dirty` is invoked whenever the value may
    /// have changed. Returns `None` for untracked selectors.
    pub fn watch(&self, item: &T, dirty: DirtyFn) -> Option<Subscription> {
        self.watch.as_ref().map(|watch| watch(item, dirty))
    }

    /// Returns true if the comparer considers `a` and `b` equal.
    #[inline]
    pub fn same(&self, a: &V, b: &V) -> bool {
        (self.comparer)(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyNotifier;
    use core::cell::Cell;

    struct Person {
        age: Cell<u32>,
        notifier: PropertyNotifier,
    }

    impl NotifyPropertyChanged for Person {
        fn property_notifier(&self) -> &PropertyNotifier {
            &self.notifier
        }
    }

    fn person(age: u32) -> Rc<Person> {
        Rc::new(Person {
            age: Cell::new(age),
            notifier: PropertyNotifier::new(),
        })
    }

    #[test]
    fn test_plain_selector_is_untracked() {
        let selector = ValueSelector::plain(|x: &i32| x * 2);
        assert_eq!(selector.evaluate(&4), 8);
        assert!(!selector.is_tracked());
        assert!(selector.watch(&4, Rc::new(|| Ok(()))).is_none());
    }

    #[test]
    fn test_triggered_selector_filters_properties() {
        let selector = ValueSelector::triggered(|p: &Rc<Person>| p.age.get(), ["Age"]);
        let p = person(30);
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let _sub = selector.watch(
            &p,
            Rc::new(move || {
                h.set(h.get() + 1);
                Ok(())
            }),
        );

        p.notifier.notify("Name").unwrap();
        assert_eq!(hits.get(), 0);
        p.age.set(31);
        p.notifier.notify("Age").unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(selector.evaluate(&p), 31);
    }

    #[test]
    fn test_triggered_selector_empty_triggers_react_to_all() {
        let selector =
            ValueSelector::triggered(|p: &Rc<Person>| p.age.get(), core::iter::empty::<&str>());
        let p = person(1);
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let _sub = selector.watch(
            &p,
            Rc::new(move || {
                h.set(h.get() + 1);
                Ok(())
            }),
        );
        p.notifier.notify("Anything").unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_stream_selector_tracks_cell() {
        let cell = ValueCell::new(5);
        let source = cell.clone();
        let selector = ValueSelector::stream(move |_: &()| source.clone());
        assert_eq!(selector.evaluate(&()), 5);

        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let sub = selector.watch(
            &(),
            Rc::new(move || {
                h.set(h.get() + 1);
                Ok(())
            }),
        );
        cell.set(6).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(selector.evaluate(&()), 6);

        drop(sub);
        assert_eq!(cell.listener_count(), 0);
    }
}
