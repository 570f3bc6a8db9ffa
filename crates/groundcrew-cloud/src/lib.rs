//! groundcrew cloud abstraction
//!
//! This crate provides the cloud provider abstraction and the idempotent
//! provisioning engine: every resource is probed before it is created, so a
//! partially completed run can always be re-run without manual cleanup.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 groundcrew CLI                   │
//! │          (crew deploy / bind / settings)         │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               groundcrew-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Provider Abstraction             │   │
//! │  │  trait CloudProvider { probe, create … }  │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────────┐    │
//! │  │  Engine  │ │  Binder  │ │   Settings   │    │
//! │  └──────────┘ └──────────┘ └──────────────┘    │
//! └───────────────────────┬─────────────────────────┘
//!                         │
//!               ┌─────────▼─────────┐
//!               │   azure provider  │
//!               │     (az CLI)      │
//!               └───────────────────┘
//! ```

pub mod binder;
pub mod engine;
pub mod error;
pub mod provider;
pub mod record;
pub mod retry;
pub mod settings;

#[cfg(test)]
pub(crate) mod mock;

// Re-exports
pub use binder::{AccessBinder, ConsentStep, GrantOutcome};
pub use engine::{PlannedAction, PlannedStep, ProvisionRun, Provisioner, StackOutputs};
pub use error::{CloudError, Result};
pub use provider::{
    AuthStatus, CloudProvider, CreateRequest, Existence, ResolvedNames, ResourceHandle,
    RetryConfig, RoleAssignment, RoleGrant, Scope,
};
pub use record::{Outcome, ProvisioningRecord, RunReport};
pub use retry::retry_with_backoff;
pub use settings::{SettingsDocument, SettingsMaterializer, PLACEHOLDER, REQUIRED_KEYS};
