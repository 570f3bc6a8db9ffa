//! groundcrew core domain model
//!
//! This crate defines the desired-state model for a loan-agent demo stack:
//! the typed resource kinds, the stack specification built from CLI
//! parameters, and the deterministic naming resolver. It performs no I/O;
//! cloud access lives in `groundcrew-cloud` and its provider crates.

pub mod error;
pub mod kind;
pub mod naming;
pub mod stack;

// Re-exports
pub use error::{CoreError, Result};
pub use kind::{ConnectorKind, NameCharset, ResourceKind, UniquenessScope};
pub use naming::{NameResolver, ResolvedName, MAX_NAME_ATTEMPTS};
pub use stack::{parse_tag, DesiredResource, ModelSpec, StackSpec};
