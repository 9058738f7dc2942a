//! Directory domain entities.

pub mod model;

pub use model::{Directory, NewDirectory};
