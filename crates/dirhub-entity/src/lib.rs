//! # dirhub-entity
//!
//! Domain models shared by the directory store, the notification
//! pipeline and the application controller.

pub mod directory;
pub mod event;
pub mod projection;

pub use directory::{Directory, NewDirectory};
pub use event::{DirectoryEvent, EventType};
pub use projection::TrackedDirectory;
