//! # dirhub-service
//!
//! Compositions over directory stores. [`NotifyingStore`] publishes an
//! event after every committed mutation; [`ScopedStore`] hands out a
//! store without root-level capabilities.

pub mod notifying;
pub mod scoped;

pub use notifying::{NotifyingStore, Unpublished};
pub use scoped::ScopedStore;
