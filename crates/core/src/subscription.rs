//! Subscription management for structural edit streams.
//!
//! `SubscriptionManager` stores the handlers registered on one observable
//! and notifies them in subscription order. `Subscription` is the scoped
//! guard handed back to the subscriber: dropping it releases the handler.

use crate::error::Result;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Handler invoked for every event `E` pushed by an observable.
pub type Handler<E> = Rc<dyn Fn(&E) -> Result<()>>;

/// Wraps a closure into a shareable [`Handler`].
///
/// Going through a generic bound lets the closure's argument lifetime be
/// inferred as higher-ranked.
pub fn handler<E, F>(f: F) -> Handler<E>
where
    E: ?Sized,
    F: Fn(&E) -> Result<()> + 'static,
{
    Rc::new(f)
}

/// Manages the handlers registered on a single observable.
pub struct SubscriptionManager<E: ?Sized> {
    /// Active handlers, keyed by id so iteration follows subscription order
    handlers: BTreeMap<SubscriptionId, Handler<E>>,
    /// Next subscription ID to assign
    next_id: SubscriptionId,
}

impl<E: ?Sized> Default for SubscriptionManager<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> SubscriptionManager<E> {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Subscribes a closure and returns its ID.
    pub fn subscribe<F>(&mut self, f: F) -> SubscriptionId
    where
        F: Fn(&E) -> Result<()> + 'static,
    {
        self.subscribe_handler(Rc::new(f))
    }

    /// Registers an already shared handler and returns its ID.
    pub fn subscribe_handler(&mut self, handler: Handler<E>) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.insert(id, handler);
        id
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.handlers.remove(&id).is_some()
    }

    /// Returns the current handlers in subscription order.
    ///
    /// Observables release their own borrow before invoking these, so a
    /// handler may read the observable or unsubscribe while it runs.
    pub fn handlers(&self) -> Vec<Handler<E>> {
        self.handlers.values().cloned().collect()
    }

    /// Returns the number of active subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

/// Invokes every handler with `event`.
///
/// All handlers run even if one fails, so every subscriber stays in sync
/// with the emitted state; the first error is returned.
pub fn notify_handlers<E: ?Sized>(handlers: &[Handler<E>], event: &E) -> Result<()> {
    let mut first_error = None;
    for handler in handlers {
        if let Err(err) = handler(event) {
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Scoped handle to a registered handler.
///
/// The handler stays registered for as long as this guard lives. Dropping
/// it, or calling [`Subscription::unsubscribe`], detaches the handler.
#[must_use = "dropping a Subscription immediately detaches its handler"]
pub struct Subscription {
    id: SubscriptionId,
    detach: Option<Box<dyn FnOnce(SubscriptionId)>>,
}

impl Subscription {
    /// Creates a guard that calls `detach` with `id` when released.
    pub fn new<F>(id: SubscriptionId, detach: F) -> Self
    where
        F: FnOnce(SubscriptionId) + 'static,
    {
        Self {
            id,
            detach: Some(Box::new(detach)),
        }
    }

    /// Creates a guard that owns nothing.
    pub fn empty() -> Self {
        Self { id: 0, detach: None }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns true while the handler is still attached.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    /// Detaches the handler now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    #[test]
    fn test_subscription_manager_subscribe() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();

        let id1 = manager.subscribe(|_| Ok(()));
        let id2 = manager.subscribe(|_| Ok(()));

        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_subscription_manager_unsubscribe() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();

        let id = manager.subscribe(|_| Ok(()));
        assert!(manager.unsubscribe(id));
        assert!(manager.is_empty());
        assert!(!manager.unsubscribe(id)); // Already removed
    }

    #[test]
    fn test_notify_in_subscription_order() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in [1, 2, 3] {
            let seen = seen.clone();
            manager.subscribe(move |e: &i32| {
                seen.borrow_mut().push((tag, *e));
                Ok(())
            });
        }

        notify_handlers(&manager.handlers(), &7).unwrap();
        assert_eq!(*seen.borrow(), vec![(1, 7), (2, 7), (3, 7)]);
    }

    #[test]
    fn test_notify_runs_all_and_returns_first_error() {
        let mut manager: SubscriptionManager<i32> = SubscriptionManager::new();
        let calls = Rc::new(Cell::new(0));

        manager.subscribe(|_| Err(Error::callback_failure("first")));
        let c = calls.clone();
        manager.subscribe(move |_| {
            c.set(c.get() + 1);
            Err(Error::callback_failure("second"))
        });

        let err = notify_handlers(&manager.handlers(), &1).unwrap_err();
        assert_eq!(err, Error::callback_failure("first"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_subscription_guard_detaches_on_drop() {
        let detached = Rc::new(Cell::new(None));
        let d = detached.clone();
        {
            let sub = Subscription::new(4, move |id| d.set(Some(id)));
            assert!(sub.is_active());
            assert_eq!(sub.id(), 4);
        }
        assert_eq!(detached.get(), Some(4));
    }

    #[test]
    fn test_subscription_unsubscribe_once() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let sub = Subscription::new(1, move |_| c.set(c.get() + 1));
        sub.unsubscribe();
        assert_eq!(count.get(), 1);
    }
}
