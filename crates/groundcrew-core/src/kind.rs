//! Typed resource kinds
//!
//! Every resource the provisioner manages is one variant of [`ResourceKind`],
//! carrying its own typed parameters. Dispatch on resource type happens by
//! matching on the variant, never by comparing type strings.

use serde::{Deserialize, Serialize};

/// OAuth productivity connector behind a connection resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Form intake (loan applications)
    Forms,
    /// Chat/notification channel
    Teams,
    /// Email
    Outlook,
}

impl ConnectorKind {
    pub fn slug(&self) -> &'static str {
        match self {
            ConnectorKind::Forms => "forms",
            ConnectorKind::Teams => "teams",
            ConnectorKind::Outlook => "outlook",
        }
    }

    /// Managed API name the connection binds to
    pub fn api_name(&self) -> &'static str {
        match self {
            ConnectorKind::Forms => "microsoftforms",
            ConnectorKind::Teams => "teams",
            ConnectorKind::Outlook => "office365",
        }
    }

    pub fn all() -> [ConnectorKind; 3] {
        [ConnectorKind::Forms, ConnectorKind::Teams, ConnectorKind::Outlook]
    }
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Character set a physical name may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCharset {
    /// Lowercase letters, digits and hyphens
    LowerAlnumHyphen,
    /// Lowercase letters and digits only (storage-class names)
    LowerAlnum,
}

/// Scope within which a physical name must be unique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniquenessScope {
    /// Name is a global DNS label; taken names may belong to anyone
    Global,
    /// Name only needs to be unique inside our resource group
    ResourceGroup,
}

/// A provisionable resource type with its typed parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceKind {
    ResourceGroup,
    StorageAccount {
        sku: String,
    },
    SqlServer,
    SqlDatabase {
        service_objective: String,
    },
    AiAccount {
        sku: String,
    },
    ModelDeployment {
        model: String,
        model_version: String,
        capacity: u32,
    },
    ApiGateway {
        publisher_email: String,
        publisher_name: String,
        sku: String,
    },
    /// Static mock decision API attached to the gateway
    MockApi,
    /// Workflow (compute) app with a system-assigned identity
    WorkflowApp,
    Connection {
        connector: ConnectorKind,
    },
}

impl ResourceKind {
    /// Short stable identifier, used in resolved names and record keys
    pub fn slug(&self) -> &'static str {
        match self {
            ResourceKind::ResourceGroup => "rg",
            ResourceKind::StorageAccount { .. } => "storage",
            ResourceKind::SqlServer => "sqlserver",
            ResourceKind::SqlDatabase { .. } => "sqldb",
            ResourceKind::AiAccount { .. } => "ai",
            ResourceKind::ModelDeployment { .. } => "model",
            ResourceKind::ApiGateway { .. } => "apim",
            ResourceKind::MockApi => "mockapi",
            ResourceKind::WorkflowApp => "workflow",
            ResourceKind::Connection { connector: ConnectorKind::Forms } => "conn-forms",
            ResourceKind::Connection { connector: ConnectorKind::Teams } => "conn-teams",
            ResourceKind::Connection { connector: ConnectorKind::Outlook } => "conn-outlook",
        }
    }

    /// Human-readable type name for output
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::ResourceGroup => "resource group",
            ResourceKind::StorageAccount { .. } => "storage account",
            ResourceKind::SqlServer => "SQL server",
            ResourceKind::SqlDatabase { .. } => "SQL database",
            ResourceKind::AiAccount { .. } => "AI account",
            ResourceKind::ModelDeployment { .. } => "model deployment",
            ResourceKind::ApiGateway { .. } => "API gateway",
            ResourceKind::MockApi => "mock decision API",
            ResourceKind::WorkflowApp => "workflow app",
            ResourceKind::Connection { .. } => "connection",
        }
    }

    /// Maximum physical name length the provider accepts
    pub fn max_name_len(&self) -> usize {
        match self {
            ResourceKind::ResourceGroup => 90,
            ResourceKind::StorageAccount { .. } => 24,
            ResourceKind::SqlServer => 63,
            ResourceKind::SqlDatabase { .. } => 128,
            ResourceKind::AiAccount { .. } => 64,
            ResourceKind::ModelDeployment { .. } => 64,
            ResourceKind::ApiGateway { .. } => 50,
            ResourceKind::MockApi => 80,
            ResourceKind::WorkflowApp => 60,
            ResourceKind::Connection { .. } => 80,
        }
    }

    pub fn charset(&self) -> NameCharset {
        match self {
            ResourceKind::StorageAccount { .. } => NameCharset::LowerAlnum,
            _ => NameCharset::LowerAlnumHyphen,
        }
    }

    /// Globally unique names double as DNS labels; a taken name may be
    /// owned by a different tenant entirely.
    pub fn uniqueness(&self) -> UniquenessScope {
        match self {
            ResourceKind::StorageAccount { .. }
            | ResourceKind::SqlServer
            | ResourceKind::AiAccount { .. }
            | ResourceKind::ApiGateway { .. }
            | ResourceKind::WorkflowApp => UniquenessScope::Global,
            _ => UniquenessScope::ResourceGroup,
        }
    }

    /// Whether a failure to provision this resource aborts the run.
    /// Optional resources degrade to a warning and the run continues.
    pub fn required(&self) -> bool {
        !matches!(
            self,
            ResourceKind::ModelDeployment { .. }
                | ResourceKind::ApiGateway { .. }
                | ResourceKind::MockApi
                | ResourceKind::Connection { .. }
        )
    }

    /// Slugs of resources that must be provisioned before this one
    pub fn prerequisites(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::ResourceGroup => &[],
            ResourceKind::StorageAccount { .. } => &["rg"],
            ResourceKind::SqlServer => &["rg"],
            ResourceKind::SqlDatabase { .. } => &["sqlserver"],
            ResourceKind::AiAccount { .. } => &["rg"],
            ResourceKind::ModelDeployment { .. } => &["ai"],
            ResourceKind::ApiGateway { .. } => &["rg"],
            ResourceKind::MockApi => &["apim"],
            ResourceKind::WorkflowApp => &["storage"],
            ResourceKind::Connection { .. } => &["rg"],
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_names_drop_hyphens() {
        let kind = ResourceKind::StorageAccount { sku: "Standard_LRS".into() };
        assert_eq!(kind.charset(), NameCharset::LowerAlnum);
        assert_eq!(kind.max_name_len(), 24);
        assert_eq!(kind.uniqueness(), UniquenessScope::Global);
    }

    #[test]
    fn optional_kinds_do_not_abort_the_run() {
        let optional = [
            ResourceKind::ModelDeployment {
                model: "gpt-4o".into(),
                model_version: "2024-11-20".into(),
                capacity: 10,
            },
            ResourceKind::MockApi,
            ResourceKind::Connection { connector: ConnectorKind::Teams },
        ];
        for kind in optional {
            assert!(!kind.required(), "{} should be optional", kind.slug());
        }
        assert!(ResourceKind::SqlServer.required());
        assert!(ResourceKind::ResourceGroup.required());
    }

    #[test]
    fn prerequisites_reference_known_slugs() {
        let all = [
            ResourceKind::ResourceGroup,
            ResourceKind::StorageAccount { sku: String::new() },
            ResourceKind::SqlServer,
            ResourceKind::SqlDatabase { service_objective: String::new() },
            ResourceKind::AiAccount { sku: String::new() },
            ResourceKind::ModelDeployment {
                model: String::new(),
                model_version: String::new(),
                capacity: 1,
            },
            ResourceKind::ApiGateway {
                publisher_email: String::new(),
                publisher_name: String::new(),
                sku: String::new(),
            },
            ResourceKind::MockApi,
            ResourceKind::WorkflowApp,
            ResourceKind::Connection { connector: ConnectorKind::Forms },
        ];
        let slugs: Vec<&str> = all.iter().map(|k| k.slug()).collect();
        for kind in &all {
            for prereq in kind.prerequisites() {
                assert!(slugs.contains(prereq), "{} has unknown prerequisite {}", kind, prereq);
            }
        }
    }
}
