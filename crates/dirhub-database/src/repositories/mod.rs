//! PostgreSQL-backed stores.

pub mod directory;
pub mod projection;

pub use directory::PgDirectoryStore;
pub use projection::PgProjectionStore;
