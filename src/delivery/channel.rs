use std::collections::{HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use anyhow::Result;
use log::{debug, error, warn};

use crate::models::{CallIdentity, ClassifiedCall};

/// Number of delivered identities remembered by the duplicate guard.
///
/// The cursor already keeps older rows from being re-read; the guard only has
/// to cover overlapping reads of the newest row.
pub const DELIVERED_GUARD_CAPACITY: usize = 256;

/// Subscriber callback. Must return quickly; hand slow work off elsewhere.
pub type CallHandler = Arc<dyn Fn(&ClassifiedCall) -> Result<()> + Send + Sync + 'static>;

/// Bounded FIFO of identities already forwarded to subscribers.
struct DeliveredSet {
    order: VecDeque<CallIdentity>,
    members: HashSet<CallIdentity>,
    capacity: usize,
}

impl DeliveredSet {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Returns false when the identity was already present.
    fn insert(&mut self, identity: CallIdentity) -> bool {
        if self.members.contains(&identity) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.members.insert(identity.clone());
        self.order.push_back(identity);
        true
    }
}

struct ChannelInner {
    handlers: Vec<(u64, CallHandler)>,
    next_id: u64,
    delivered: DeliveredSet,
}

/// At-most-once delivery of classified calls to registered handlers.
///
/// Cloning the channel yields another handle to the same registry and guard.
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<Mutex<ChannelInner>>,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::with_guard_capacity(DELIVERED_GUARD_CAPACITY)
    }
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guard_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChannelInner {
                handlers: Vec::new(),
                next_id: 0,
                delivered: DeliveredSet::new(capacity),
            })),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ClassifiedCall) -> Result<()> + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.handlers.push((id, Arc::new(handler)));

        Subscription {
            id,
            channel: Arc::downgrade(&self.inner),
        }
    }

    /// Dispatch `call` to every handler in registration order.
    ///
    /// Returns false, without invoking anyone, when the call's identity was
    /// already delivered. Handler errors and panics are logged and do not stop
    /// the remaining handlers.
    pub fn publish(&self, call: ClassifiedCall) -> bool {
        // Check and record under one lock; a failing handler never un-delivers a
        // call, so recording up front also suppresses re-entrant publishes.
        let handlers: Vec<CallHandler> = {
            let mut inner = lock(&self.inner);
            if !inner.delivered.insert(call.identity()) {
                debug!(
                    "suppressed duplicate call {} at {}",
                    call.phone_number, call.occurred_at_epoch_millis
                );
                return false;
            }
            inner.handlers.iter().map(|(_, handler)| Arc::clone(handler)).collect()
        };

        for (index, handler) in handlers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(&call))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("call handler #{index} failed: {err:?}"),
                Err(_) => error!("call handler #{index} panicked; continuing with the rest"),
            }
        }

        true
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).handlers.len()
    }
}

/// Handle returned by [`EventChannel::subscribe`].
///
/// Dropping it keeps the handler registered; call [`Subscription::unsubscribe`]
/// to remove it.
pub struct Subscription {
    id: u64,
    channel: Weak<Mutex<ChannelInner>>,
}

impl Subscription {
    /// Remove exactly this subscription's handler. Repeated calls are no-ops.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.channel.upgrade() {
            lock(&inner).handlers.retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(inner: &Mutex<ChannelInner>) -> MutexGuard<'_, ChannelInner> {
    match inner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
