//! Single-writer observable state
//!
//! A [`StateCell`] owns a value and a subscriber list. Exactly one party holds
//! the cell and may write to it; any number of [`ReadSignal`] handles can read
//! the value and subscribe to changes.
//!
//! - Writes that don't change the value are not published
//! - Subscribers run synchronously, after the write, with no borrow held, so
//!   a subscriber may read the signal or drop its own subscription
//! - Dropping a [`Subscription`] detaches the callback
//!
//! ```rust
//! use navspy_core::reactive::StateCell;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let cell = StateCell::new(0u32);
//! let seen = Rc::new(Cell::new(0));
//!
//! let seen_clone = seen.clone();
//! let sub = cell.reader().subscribe(move |v| seen_clone.set(*v));
//!
//! cell.set(3);
//! assert_eq!(seen.get(), 3);
//!
//! drop(sub);
//! cell.set(4);
//! assert_eq!(seen.get(), 3);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Unique identifier for a subscriber
    pub struct SubscriberId;
}

type Callback<T> = Rc<dyn Fn(&T)>;

/// Internal cell storage
struct CellNode<T> {
    value: T,
    /// Version counter for change detection
    version: u64,
    subscribers: SlotMap<SubscriberId, Callback<T>>,
}

/// The writable side of an observable value
pub struct StateCell<T> {
    node: Rc<RefCell<CellNode<T>>>,
}

impl<T: Clone + PartialEq + 'static> StateCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            node: Rc::new(RefCell::new(CellNode {
                value: initial,
                version: 0,
                subscribers: SlotMap::with_key(),
            })),
        }
    }

    /// Get the current value
    pub fn get(&self) -> T {
        self.node.borrow().value.clone()
    }

    /// Publish a new value
    ///
    /// Returns `true` if the value changed and subscribers were notified.
    pub fn set(&self, value: T) -> bool {
        let (value, callbacks) = {
            let mut node = self.node.borrow_mut();
            if node.value == value {
                return false;
            }
            node.value = value;
            node.version += 1;

            let callbacks: SmallVec<[(SubscriberId, Callback<T>); 4]> = node
                .subscribers
                .iter()
                .map(|(id, callback)| (id, callback.clone()))
                .collect();
            (node.value.clone(), callbacks)
        };

        for (id, callback) in callbacks {
            // Skip subscribers detached by an earlier callback for this change
            if !self.node.borrow().subscribers.contains_key(id) {
                continue;
            }
            callback(&value);
        }
        true
    }

    /// Number of published changes so far
    pub fn version(&self) -> u64 {
        self.node.borrow().version
    }

    /// Create a read-only handle to this cell
    pub fn reader(&self) -> ReadSignal<T> {
        ReadSignal {
            node: self.node.clone(),
        }
    }

    /// Detach every subscriber
    pub fn clear_subscribers(&self) {
        self.node.borrow_mut().subscribers.clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node.borrow();
        f.debug_struct("StateCell")
            .field("value", &node.value)
            .field("version", &node.version)
            .field("subscribers", &node.subscribers.len())
            .finish()
    }
}

/// A read-only handle to a [`StateCell`] (cheap to clone)
#[derive(Clone)]
pub struct ReadSignal<T> {
    node: Rc<RefCell<CellNode<T>>>,
}

impl<T: Clone + 'static> ReadSignal<T> {
    /// Get the current value
    pub fn get(&self) -> T {
        self.node.borrow().value.clone()
    }

    pub fn version(&self) -> u64 {
        self.node.borrow().version
    }

    /// Register a callback for every published change
    ///
    /// The callback is not invoked with the current value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let id = self.node.borrow_mut().subscribers.insert(Rc::new(callback));
        let weak: Weak<RefCell<CellNode<T>>> = Rc::downgrade(&self.node);

        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(node) = weak.upgrade() {
                    node.borrow_mut().subscribers.remove(id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.node.borrow().subscribers.len()
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal")
            .field(&self.node.borrow().value)
            .finish()
    }
}

/// Handle for detaching a subscriber
///
/// The subscriber is removed when the handle is dropped.
#[must_use = "dropping a Subscription detaches the callback immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Detach the subscriber now
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the subscriber attached for the lifetime of the cell
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.cancel.is_some())
            .finish()
    }
}
