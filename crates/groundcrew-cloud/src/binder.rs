//! Access binder
//!
//! Connector resources carry two independent layers: an RBAC role
//! assignment (fully automatable, handled here) and an OAuth consent on the
//! connection itself (requires a human, reported here as a manual step).
//! The two layers are separate operations so each can be verified on its
//! own; conflating them is the classic operational defect this interface
//! exists to prevent.

use crate::engine::StackOutputs;
use crate::error::Result;
use crate::provider::{CloudProvider, RetryConfig, RoleGrant};
use crate::retry::retry_with_backoff;
use groundcrew_core::ConnectorKind;
use serde::{Deserialize, Serialize};

/// Result of ensuring one RBAC grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantOutcome {
    pub grant: RoleGrant,
    /// false when the assignment already existed
    pub created: bool,
}

/// One manual OAuth consent the operator still has to perform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentStep {
    pub connector: ConnectorKind,
    pub connection_name: String,
    /// true when the connection already reports a consented status
    pub consented: bool,
}

impl ConsentStep {
    /// Remediation text printed for pending consents
    pub fn instruction(&self) -> String {
        format!(
            "open the '{}' connection in the portal and complete the {} sign-in",
            self.connection_name, self.connector
        )
    }
}

/// Grants roles to the workflow identity, idempotently
pub struct AccessBinder<'a> {
    provider: &'a dyn CloudProvider,
    retry: RetryConfig,
}

impl<'a> AccessBinder<'a> {
    pub fn new(provider: &'a dyn CloudProvider) -> Self {
        Self {
            provider,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Permission layer: create the role assignment unless the exact
    /// (principal, scope, role) triple already exists. Safe to re-run at
    /// any time, in any order relative to the OAuth layer.
    pub async fn ensure_grant(&self, grant: &RoleGrant) -> Result<GrantOutcome> {
        let existing = retry_with_backoff(&self.retry, "list role assignments", || {
            self.provider
                .list_role_assignments(&grant.principal_id, &grant.scope_id)
        })
        .await?;

        if existing.iter().any(|assignment| grant.matches(assignment)) {
            tracing::debug!(
                role = %grant.role,
                scope = %grant.scope_id,
                "role assignment already present"
            );
            return Ok(GrantOutcome { grant: grant.clone(), created: false });
        }

        retry_with_backoff(&self.retry, "create role assignment", || {
            self.provider.create_role_assignment(grant)
        })
        .await?;
        tracing::info!(role = %grant.role, scope = %grant.scope_id, "role assignment created");

        Ok(GrantOutcome { grant: grant.clone(), created: true })
    }

    /// Ensure every grant in order; a failure on one does not stop the rest
    /// (each grant is independent and individually re-runnable).
    pub async fn ensure_all(
        &self,
        grants: &[RoleGrant],
    ) -> Result<(Vec<GrantOutcome>, Vec<String>)> {
        let mut outcomes = Vec::new();
        let mut failures = Vec::new();
        for grant in grants {
            match self.ensure_grant(grant).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    tracing::warn!(role = %grant.role, "grant failed: {err}");
                    failures.push(format!("{}: {err}", grant.description));
                }
            }
        }
        Ok((outcomes, failures))
    }

    /// Authorization layer: report each connection's consent status from the
    /// collected outputs. Consent cannot be automated; pending entries carry
    /// the manual instruction.
    pub fn consent_steps(&self, names: &crate::provider::ResolvedNames, outputs: &StackOutputs) -> Vec<ConsentStep> {
        ConnectorKind::all()
            .into_iter()
            .filter_map(|connector| {
                let slug = format!("conn-{}", connector.slug());
                let connection_name = names.get(&slug)?.to_string();
                let consented = outputs
                    .get(&format!("{slug}.status"))
                    .is_some_and(|status| status.eq_ignore_ascii_case("connected"));
                Some(ConsentStep { connector, connection_name, consented })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use crate::provider::ResolvedNames;

    fn grant() -> RoleGrant {
        RoleGrant {
            principal_id: "principal-123".to_string(),
            role: "Storage Blob Data Contributor".to_string(),
            scope_id: "mock://storage/projstorage7709".to_string(),
            description: "workflow identity on storage".to_string(),
        }
    }

    #[tokio::test]
    async fn double_bind_creates_exactly_one_assignment() {
        let provider = MockProvider::new();
        let binder = AccessBinder::new(&provider);

        let first = binder.ensure_grant(&grant()).await.unwrap();
        let second = binder.ensure_grant(&grant()).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        let creates = provider
            .calls()
            .iter()
            .filter(|c| c.starts_with("assign-role"))
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn different_roles_on_same_scope_both_created() {
        let provider = MockProvider::new();
        let binder = AccessBinder::new(&provider);

        let a = grant();
        let mut b = grant();
        b.role = "Cognitive Services OpenAI User".to_string();

        assert!(binder.ensure_grant(&a).await.unwrap().created);
        assert!(binder.ensure_grant(&b).await.unwrap().created);
    }

    #[test]
    fn consent_steps_never_touch_the_provider() {
        let provider = MockProvider::new();
        let binder = AccessBinder::new(&provider);

        let mut names = ResolvedNames::new();
        names.insert("conn-forms", "proj-conn-forms-7709");
        names.insert("conn-teams", "proj-conn-teams-7709");

        let mut outputs = StackOutputs::new();
        outputs
            .values
            .insert("conn-forms.status".to_string(), "Connected".to_string());
        outputs
            .values
            .insert("conn-teams.status".to_string(), "Error".to_string());

        let steps = binder.consent_steps(&names, &outputs);
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().any(|s| s.connector == ConnectorKind::Forms && s.consented));
        assert!(steps.iter().any(|s| s.connector == ConnectorKind::Teams && !s.consented));
        assert!(provider.calls().is_empty());
    }
}
