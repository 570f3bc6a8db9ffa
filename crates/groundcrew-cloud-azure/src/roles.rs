//! Role map for the workflow identity
//!
//! The minimum built-in roles the workflow app needs on each dependent
//! resource. Connection resources get Contributor scoped to the single
//! connection; that is the RBAC half of the two-layer model; the OAuth
//! consent half cannot be granted here.

use groundcrew_cloud::{RoleGrant, StackOutputs};
use groundcrew_core::ConnectorKind;

pub const ROLE_BLOB_CONTRIBUTOR: &str = "Storage Blob Data Contributor";
pub const ROLE_OPENAI_USER: &str = "Cognitive Services OpenAI User";
pub const ROLE_CONNECTION_CONTRIBUTOR: &str = "Contributor";

/// Build the grant list for a provisioned stack. Resources that were not
/// provisioned (no id in the outputs) simply produce no grant; re-running
/// after they appear picks them up.
pub fn stack_grants(outputs: &StackOutputs) -> Vec<RoleGrant> {
    let Some(principal_id) = outputs.principal_id() else {
        return Vec::new();
    };

    let mut grants = Vec::new();

    if let Some(scope_id) = outputs.get("storage.id") {
        grants.push(RoleGrant {
            principal_id: principal_id.to_string(),
            role: ROLE_BLOB_CONTRIBUTOR.to_string(),
            scope_id: scope_id.to_string(),
            description: "workflow identity on storage".to_string(),
        });
    }

    if let Some(scope_id) = outputs.get("ai.id") {
        grants.push(RoleGrant {
            principal_id: principal_id.to_string(),
            role: ROLE_OPENAI_USER.to_string(),
            scope_id: scope_id.to_string(),
            description: "workflow identity on the AI account".to_string(),
        });
    }

    for connector in ConnectorKind::all() {
        if let Some(scope_id) = outputs.get(&format!("conn-{}.id", connector.slug())) {
            grants.push(RoleGrant {
                principal_id: principal_id.to_string(),
                role: ROLE_CONNECTION_CONTRIBUTOR.to_string(),
                scope_id: scope_id.to_string(),
                description: format!("workflow identity on the {connector} connection"),
            });
        }
    }

    grants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(entries: &[(&str, &str)]) -> StackOutputs {
        let mut outputs = StackOutputs::new();
        for (key, value) in entries {
            outputs.values.insert((*key).to_string(), (*value).to_string());
        }
        outputs
    }

    #[test]
    fn full_stack_yields_five_grants() {
        let outputs = outputs(&[
            ("workflow.principal_id", "principal-123"),
            ("storage.id", "/subscriptions/s/rg/r/storage"),
            ("ai.id", "/subscriptions/s/rg/r/ai"),
            ("conn-forms.id", "/subscriptions/s/rg/r/forms"),
            ("conn-teams.id", "/subscriptions/s/rg/r/teams"),
            ("conn-outlook.id", "/subscriptions/s/rg/r/outlook"),
        ]);

        let grants = stack_grants(&outputs);
        assert_eq!(grants.len(), 5);
        assert!(grants.iter().all(|g| g.principal_id == "principal-123"));
        assert!(grants.iter().any(|g| g.role == ROLE_BLOB_CONTRIBUTOR));
        assert!(grants.iter().any(|g| g.role == ROLE_OPENAI_USER));
    }

    #[test]
    fn no_principal_means_no_grants() {
        let outputs = outputs(&[("storage.id", "/subscriptions/s/rg/r/storage")]);
        assert!(stack_grants(&outputs).is_empty());
    }

    #[test]
    fn skipped_resources_produce_no_grant() {
        let outputs = outputs(&[
            ("workflow.principal_id", "principal-123"),
            ("storage.id", "/subscriptions/s/rg/r/storage"),
        ]);
        let grants = stack_grants(&outputs);
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].role, ROLE_BLOB_CONTRIBUTOR);
    }
}
