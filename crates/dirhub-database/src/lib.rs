//! # dirhub-database
//!
//! The authoritative directory store: the capability traits every backend
//! implements, the PostgreSQL backend built on recursive queries, an
//! in-memory backend, and the application-side projection stores.

pub mod connection;
pub mod memory;
pub mod mode;
pub mod repositories;
pub mod traits;

pub use connection::DatabasePool;
pub use memory::{MemoryDirectoryStore, MemoryProjectionStore};
pub use mode::{AccessMode, StoreMode};
pub use repositories::{PgDirectoryStore, PgProjectionStore};
pub use traits::{
    DirectoryAdmin, ProjectionStore, Reader, RootReader, RootWriter, Writer, require_root_reader,
    require_root_writer,
};
