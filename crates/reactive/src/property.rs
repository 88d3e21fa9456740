//! Per-item property change notification.
//!
//! Items whose content can change in place embed a `PropertyNotifier` and
//! call [`PropertyNotifier::notify`] after mutating a property. Operators
//! configured with trigger property names subscribe to it for each item
//! they track and release the subscription when the item leaves them.

use alloc::rc::Rc;
use core::cell::RefCell;
use ripple_core::subscription::notify_handlers;
use ripple_core::{Result, Subscription, SubscriptionManager};

/// Registry of listeners interested in one item's property changes.
pub struct PropertyNotifier {
    listeners: Rc<RefCell<SubscriptionManager<str>>>,
}

impl Default for PropertyNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyNotifier {
    /// Creates a notifier with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(SubscriptionManager::new())),
        }
    }

    /// Registers a listener receiving the name of each changed property.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&str) -> Result<()> + 'static,
    {
        let id = self.listeners.borrow_mut().subscribe(f);
        let weak = Rc::downgrade(&self.listeners);
        Subscription::new(id, move |id| {
            if let Some(listeners) = weak.upgrade() {
                if let Ok(mut listeners) = listeners.try_borrow_mut() {
                    listeners.unsubscribe(id);
                }
            }
        })
    }

    /// Announces that `property` changed.
    ///
    /// Errors raised by listeners (for example an operator rejecting the
    /// resulting edit) are returned to the caller.
    pub fn notify(&self, property: &str) -> Result<()> {
        let handlers = self.listeners.borrow().handlers();
        notify_handlers(&handlers, property)
    }

    /// Returns the number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl core::fmt::Debug for PropertyNotifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Implemented by items that announce in-place property changes.
pub trait NotifyPropertyChanged {
    /// Returns the notifier the item raises its changes on.
    fn property_notifier(&self) -> &PropertyNotifier;
}

impl<T: NotifyPropertyChanged + ?Sized> NotifyPropertyChanged for Rc<T> {
    fn property_notifier(&self) -> &PropertyNotifier {
        (**self).property_notifier()
    }
}
