//! # dirhub-core
//!
//! Core crate for DirHub. Contains configuration schemas, typed
//! identifiers, list/get options for tree reads, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other DirHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
