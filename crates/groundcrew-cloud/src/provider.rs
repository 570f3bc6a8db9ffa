//! Cloud provider trait definition

use crate::error::Result;
use async_trait::async_trait;
use groundcrew_core::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The subscription + resource group a run operates in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub subscription_id: String,
    pub resource_group: String,
}

impl Scope {
    pub fn new(subscription_id: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
        }
    }
}

/// Result of an existence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Existence {
    /// No resource with this name anywhere we can see
    NotFound,
    /// Exists inside our scope; reuse it
    FoundOwnedByUs,
    /// The name is taken outside our scope; pick another name
    FoundOwnedByOther,
}

impl std::fmt::Display for Existence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Existence::NotFound => write!(f, "not found"),
            Existence::FoundOwnedByUs => write!(f, "owned by us"),
            Existence::FoundOwnedByOther => write!(f, "owned by other"),
        }
    }
}

/// Physical names resolved so far, keyed by kind slug. Dependent creates
/// look their prerequisites up here.
#[derive(Debug, Clone, Default)]
pub struct ResolvedNames {
    names: HashMap<&'static str, String>,
}

impl ResolvedNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slug: &'static str, physical: impl Into<String>) {
        self.names.insert(slug, physical.into());
    }

    pub fn get(&self, slug: &str) -> Option<&str> {
        self.names.get(slug).map(String::as_str)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.names.contains_key(slug)
    }
}

/// A create call with everything the provider needs to issue it
#[derive(Debug, Clone)]
pub struct CreateRequest<'a> {
    pub scope: &'a Scope,
    pub kind: &'a ResourceKind,
    pub name: &'a str,
    pub location: &'a str,
    pub tags: &'a BTreeMap<String, String>,
    pub deps: &'a ResolvedNames,
}

/// What the provider reports back after creating a resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Provider resource id (used as an RBAC scope)
    pub id: String,
    /// Managed identity principal, for kinds that carry one
    pub principal_id: Option<String>,
    /// Additional attributes (endpoints, hostnames)
    pub attributes: HashMap<String, String>,
}

/// An existing role assignment as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub principal_id: String,
    pub role: String,
    pub scope_id: String,
}

/// A role grant to ensure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub principal_id: String,
    pub role: String,
    pub scope_id: String,
    /// What the grant is for, shown in output
    pub description: String,
}

impl RoleGrant {
    /// The identity triple role assignments are deduplicated on
    pub fn matches(&self, assignment: &RoleAssignment) -> bool {
        assignment.principal_id == self.principal_id
            && assignment.role == self.role
            && assignment.scope_id == self.scope_id
    }
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Retry configuration for provider operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (first try included)
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: std::time::Duration,

    /// Maximum delay between retries
    pub max_delay: std::time::Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: std::time::Duration::from_millis(500),
            max_delay: std::time::Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Cloud provider abstraction trait
///
/// The provider is an opaque CRUD backend. All idempotency logic lives in
/// the engine; the provider only answers probes and executes requests.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "azure")
    fn name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Classify whether a resource with this name exists, and who owns it.
    ///
    /// Providers that signal "not found" as an error must normalize it to
    /// `Existence::NotFound` here; the probe itself is side-effect free.
    /// Child resources (databases, model deployments, APIs) are addressed
    /// under their parent, which the probe looks up in `deps`; a child whose
    /// parent is absent is `NotFound` by definition.
    async fn probe(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        deps: &ResolvedNames,
    ) -> Result<Existence>;

    /// Create the resource described by the request
    async fn create(&self, request: &CreateRequest<'_>) -> Result<ResourceHandle>;

    /// Delete a resource by name
    async fn delete(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        deps: &ResolvedNames,
    ) -> Result<()>;

    /// Read the outputs (ids, endpoints, keys, connection strings) of an
    /// existing resource
    async fn read_outputs(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        deps: &ResolvedNames,
    ) -> Result<HashMap<String, String>>;

    /// List role assignments for a principal on a scope
    async fn list_role_assignments(
        &self,
        principal_id: &str,
        scope_id: &str,
    ) -> Result<Vec<RoleAssignment>>;

    /// Create a role assignment
    async fn create_role_assignment(&self, grant: &RoleGrant) -> Result<()>;
}
