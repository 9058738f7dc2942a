//! In-memory backends for single-process deployments and tests.

mod forest;
pub mod projection;
pub mod store;

pub use projection::MemoryProjectionStore;
pub use store::MemoryDirectoryStore;
