//! Deduplicating fan-out of classified calls to subscribers.

mod channel;

pub use channel::{CallHandler, EventChannel, Subscription, DELIVERED_GUARD_CAPACITY};
