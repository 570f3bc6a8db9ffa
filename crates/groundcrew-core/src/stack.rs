//! Stack specification
//!
//! A [`StackSpec`] captures every parameter of one provisioning run. It is
//! built once from CLI input, stays immutable for the run, and expands into
//! the ordered list of desired resources the engine walks.

use crate::error::{CoreError, Result};
use crate::kind::{ConnectorKind, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// AI model deployment parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub version: String,
    pub capacity: u32,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name: "gpt-4o".to_string(),
            version: "2024-11-20".to_string(),
            capacity: 10,
        }
    }
}

/// Everything one provisioning run needs to know, fixed at start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSpec {
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    /// Human-readable prefix for derived names
    pub prefix: String,
    /// Operator-supplied gateway to reuse instead of creating one
    pub existing_gateway: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub model: ModelSpec,
    pub database_name: String,
    pub publisher_email: String,
    pub publisher_name: String,
}

impl StackSpec {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        location: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            location: location.into(),
            prefix: prefix.into(),
            existing_gateway: None,
            tags: BTreeMap::new(),
            model: ModelSpec::default(),
            database_name: "loans".to_string(),
            publisher_email: "ops@example.com".to_string(),
            publisher_name: "groundcrew".to_string(),
        }
    }

    /// Stable seed for the naming resolver
    pub fn seed(&self) -> String {
        format!("{}-{}", self.subscription_id, self.resource_group)
    }

    /// The ordered desired-resource list. Order is the dependency order the
    /// engine must honor: group, storage, database, AI, gateway, compute,
    /// connections.
    pub fn desired_resources(&self) -> Vec<DesiredResource> {
        let mut resources = vec![
            DesiredResource::new(ResourceKind::ResourceGroup),
            DesiredResource::new(ResourceKind::StorageAccount {
                sku: "Standard_LRS".to_string(),
            }),
            DesiredResource::new(ResourceKind::SqlServer),
            DesiredResource::new(ResourceKind::SqlDatabase {
                service_objective: "GP_S_Gen5_1".to_string(),
            }),
            DesiredResource::new(ResourceKind::AiAccount {
                sku: "S0".to_string(),
            }),
            DesiredResource::new(ResourceKind::ModelDeployment {
                model: self.model.name.clone(),
                model_version: self.model.version.clone(),
                capacity: self.model.capacity,
            }),
            DesiredResource::new(ResourceKind::ApiGateway {
                publisher_email: self.publisher_email.clone(),
                publisher_name: self.publisher_name.clone(),
                sku: "Consumption".to_string(),
            }),
            DesiredResource::new(ResourceKind::MockApi),
            DesiredResource::new(ResourceKind::WorkflowApp),
        ];
        for connector in ConnectorKind::all() {
            resources.push(DesiredResource::new(ResourceKind::Connection { connector }));
        }
        resources
    }
}

/// One desired resource, immutable for the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredResource {
    pub kind: ResourceKind,
}

impl DesiredResource {
    pub fn new(kind: ResourceKind) -> Self {
        Self { kind }
    }

    pub fn slug(&self) -> &'static str {
        self.kind.slug()
    }
}

/// Parse a `key=value` tag argument
pub fn parse_tag(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(CoreError::InvalidTag(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desired_resources_follow_dependency_order() {
        let spec = StackSpec::new("sub-123", "rg-demo", "westus", "proj");
        let slugs: Vec<&str> = spec.desired_resources().iter().map(|r| r.slug()).collect();
        assert_eq!(
            slugs,
            vec![
                "rg",
                "storage",
                "sqlserver",
                "sqldb",
                "ai",
                "model",
                "apim",
                "mockapi",
                "workflow",
                "conn-forms",
                "conn-teams",
                "conn-outlook",
            ]
        );
        // Every prerequisite appears before its dependent.
        for (i, resource) in spec.desired_resources().iter().enumerate() {
            for prereq in resource.kind.prerequisites() {
                let pos = slugs.iter().position(|s| s == prereq).unwrap();
                assert!(pos < i, "{} must precede {}", prereq, resource.slug());
            }
        }
    }

    #[test]
    fn seed_concatenates_subscription_and_group() {
        let spec = StackSpec::new("sub-123", "rg-demo", "westus", "proj");
        assert_eq!(spec.seed(), "sub-123-rg-demo");
    }

    #[test]
    fn tag_parsing() {
        assert_eq!(parse_tag("env=demo").unwrap(), ("env".into(), "demo".into()));
        assert_eq!(parse_tag("note=a=b").unwrap(), ("note".into(), "a=b".into()));
        assert!(parse_tag("no-equals").is_err());
        assert!(parse_tag("=value").is_err());
    }
}
