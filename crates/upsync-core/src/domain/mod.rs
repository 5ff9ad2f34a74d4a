//! Domain types and pure logic
//!
//! - Newtypes for relative paths, remote paths and folder IDs
//! - Remote root references and upload destinations
//! - Set diffing between snapshots and remote listings
//! - Domain-specific error types

pub mod diff;
pub mod errors;
pub mod newtypes;
pub mod remote;

pub use errors::DomainError;
pub use newtypes::{FolderId, PathSet, RelativePath, RemotePath};
pub use remote::{RemoteDestination, RemoteRoot};
