//! # dirhub-realtime
//!
//! Moves directory events from the store to applications: a message bus
//! abstraction with in-memory and Redis bridges, the notifier stack that
//! publishes after each mutation, and the watcher that turns a
//! subscription back into a sequence of events.

pub mod bus;
pub mod notifier;
pub mod watcher;

pub use bus::{EventBus, MemoryBus, PayloadStream, connect_bus};
pub use notifier::{
    BusNotifier, ExponentialBackoff, LoggingNotifier, NoopNotifier, Notifier, RetryNotifier,
    build_notifier,
};
pub use watcher::{BusWatcher, WatchSession, Watcher};

#[cfg(feature = "redis-pubsub")]
pub use bus::RedisBus;
