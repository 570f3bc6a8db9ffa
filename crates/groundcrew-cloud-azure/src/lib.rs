//! Azure provider for groundcrew
//!
//! Implements the `CloudProvider` trait on top of the `az` CLI, the same
//! way the rest of the toolchain drives provider CLIs: assemble arguments,
//! ask for JSON output, classify failures from stderr.
//!
//! # Requirements
//!
//! - `az` must be installed and logged in (`az login`)
//! - The signed-in identity needs Owner (or equivalent) on the target
//!   subscription to create resources and role assignments

pub mod azcli;
pub mod error;
pub mod provider;
pub mod roles;

pub use azcli::{AzAccount, AzCli};
pub use error::{AzureError, Result};
pub use provider::AzureProvider;
pub use roles::{stack_grants, ROLE_BLOB_CONTRIBUTOR, ROLE_CONNECTION_CONTRIBUTOR, ROLE_OPENAI_USER};
