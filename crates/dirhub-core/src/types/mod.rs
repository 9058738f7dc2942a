//! Core type definitions used across the DirHub workspace.

pub mod id;
pub mod options;

pub use id::DirectoryId;
pub use options::{GetOptions, ListOptions, DEFAULT_PAGE_SIZE};
