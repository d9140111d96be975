//! Subscription table
//!
//! Subscriptions are owned by the application and linked into an intrusive red-black tree
//! keyed by data specifier, so the registry itself needs no storage and lookup is
//! O(log(N)).

use core::cell::RefCell;
use core::fmt;

use intrusive_collections::rbtree::Entry as RBTreeEntry;
use intrusive_collections::{KeyAdapter, RBTree, RBTreeLink, intrusive_adapter};

use crate::core::{DataSpecifier, ServiceId, SubjectId};
use crate::time::Duration;
use crate::transfer::Transfer;

/// Default transfer-id timeout \[1; 4.1.1.7\]
pub const DEFAULT_TRANSFER_ID_TIMEOUT: Duration = Duration::from_secs(2);

/// Receiver of completed transfers
///
/// Handlers run synchronously from the node mainloop and must not block.
pub trait Handler {
    fn on_transfer(&mut self, transfer: &Transfer<'_>);
}

impl<F: FnMut(&Transfer<'_>)> Handler for F {
    fn on_transfer(&mut self, transfer: &Transfer<'_>) {
        self(transfer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistrationError {
    DataSpecifierOccupied,
    /// The subscription is already linked into a registry
    AlreadyLinked,
}

/// Interest in one data specifier
pub struct Subscription<'a> {
    link: RBTreeLink,
    data_spec: DataSpecifier,
    extent: usize,
    timeout: Duration,
    handler: RefCell<&'a mut dyn Handler>,
}

impl<'a> Subscription<'a> {
    /// `extent` is the largest payload accepted; longer transfers are rejected.
    pub fn new(
        data_spec: DataSpecifier,
        extent: usize,
        timeout: Duration,
        handler: &'a mut dyn Handler,
    ) -> Self {
        Self {
            link: RBTreeLink::new(),
            data_spec,
            extent,
            timeout,
            handler: RefCell::new(handler),
        }
    }

    pub fn message(subject: SubjectId, extent: usize, handler: &'a mut dyn Handler) -> Self {
        Self::new(
            DataSpecifier::Message(subject),
            extent,
            DEFAULT_TRANSFER_ID_TIMEOUT,
            handler,
        )
    }

    pub fn request(service: ServiceId, extent: usize, handler: &'a mut dyn Handler) -> Self {
        Self::new(
            DataSpecifier::Request(service),
            extent,
            DEFAULT_TRANSFER_ID_TIMEOUT,
            handler,
        )
    }

    pub fn data_spec(&self) -> DataSpecifier {
        self.data_spec
    }

    pub fn extent(&self) -> usize {
        self.extent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_linked()
    }
}

impl fmt::Debug for Subscription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("data_spec", &self.data_spec)
            .field("extent", &self.extent)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

intrusive_adapter!(SubscriptionAdapter<'a> = &'a Subscription<'a>: Subscription<'a> { link: RBTreeLink });

impl<'a, 'b> KeyAdapter<'a> for SubscriptionAdapter<'b> {
    type Key = DataSpecifier;
    fn get_key(&self, subscription: &'a Subscription<'b>) -> DataSpecifier {
        subscription.data_spec
    }
}

pub struct Registry<'a> {
    tree: RBTree<SubscriptionAdapter<'a>>,
    len: usize,
}

impl<'a> Registry<'a> {
    pub fn new() -> Self {
        Self {
            tree: RBTree::new(SubscriptionAdapter::new()),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn subscribe(
        &mut self,
        subscription: &'a Subscription<'a>,
    ) -> Result<(), RegistrationError> {
        if subscription.is_linked() {
            return Err(RegistrationError::AlreadyLinked);
        }
        match self.tree.entry(&subscription.data_spec) {
            RBTreeEntry::Vacant(cursor) => {
                cursor.insert(subscription);
            }
            RBTreeEntry::Occupied(_) => return Err(RegistrationError::DataSpecifierOccupied),
        }
        self.len += 1;
        info!(
            "registry: subscribed to {:?}, extent {}",
            subscription.data_spec, subscription.extent
        );
        Ok(())
    }

    /// Unlinks and returns the subscription of `data_spec`
    pub fn unsubscribe(&mut self, data_spec: DataSpecifier) -> Option<&'a Subscription<'a>> {
        let removed = self.tree.find_mut(&data_spec).remove()?;
        self.len -= 1;
        info!("registry: unsubscribed from {:?}", data_spec);
        Some(removed)
    }

    pub fn lookup(&self, data_spec: DataSpecifier) -> Option<&Subscription<'a>> {
        self.tree.find(&data_spec).get()
    }

    /// Hands a transfer to its subscription handler
    ///
    /// Returns false if nobody is subscribed, or if the handler is already running.
    pub fn dispatch(&self, transfer: &Transfer<'_>) -> bool {
        let Some(subscription) = self.lookup(transfer.meta.data_spec) else {
            return false;
        };
        match subscription.handler.try_borrow_mut() {
            Ok(mut handler) => {
                handler.on_transfer(transfer);
                true
            }
            Err(_) => {
                warn!("registry: reentrant dispatch dropped");
                false
            }
        }
    }
}

impl Default for Registry<'_> {
    fn default() -> Self {
        Self::new()
    }
}
