//! Application-side projection records.

pub mod model;

pub use model::TrackedDirectory;
