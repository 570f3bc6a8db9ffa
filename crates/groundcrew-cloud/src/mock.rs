//! Scripted in-memory provider for engine and binder tests

use crate::error::{CloudError, Result};
use crate::provider::{
    AuthStatus, CloudProvider, CreateRequest, Existence, ResolvedNames, ResourceHandle,
    RoleAssignment, RoleGrant, Scope,
};
use async_trait::async_trait;
use groundcrew_core::ResourceKind;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Us,
    Other,
}

#[derive(Debug, Clone)]
struct FailureScript {
    transient: bool,
    remaining: u32,
    message: String,
}

#[derive(Default)]
struct MockState {
    /// "slug:name" -> owner
    resources: HashMap<String, Owner>,
    role_assignments: Vec<RoleAssignment>,
    calls: Vec<String>,
    create_failures: HashMap<&'static str, FailureScript>,
}

pub struct MockProvider {
    state: Mutex<MockState>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self { state: Mutex::new(MockState::default()) }
    }

    pub fn with_existing(self, slug: &str, name: &str, owner: Owner) -> Self {
        self.state
            .lock()
            .unwrap()
            .resources
            .insert(format!("{slug}:{name}"), owner);
        self
    }

    /// Script the next `times` create calls for `slug` to fail
    pub fn fail_create(self, slug: &'static str, transient: bool, times: u32) -> Self {
        self.state.lock().unwrap().create_failures.insert(
            slug,
            FailureScript {
                transient,
                remaining: times,
                message: if transient {
                    "simulated throttling".to_string()
                } else {
                    "simulated quota exceeded".to_string()
                },
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Drain the call log, so assertions can look at one phase at a time
    pub fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut self.state.lock().unwrap().calls)
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("create "))
            .collect()
    }

    fn default_outputs(kind: &ResourceKind, name: &str) -> HashMap<String, String> {
        let slug = kind.slug();
        let mut outputs = HashMap::new();
        outputs.insert("id".to_string(), format!("mock://{slug}/{name}"));
        match kind {
            ResourceKind::StorageAccount { .. } => {
                outputs.insert(
                    "connection_string".to_string(),
                    format!("DefaultEndpointsProtocol=https;AccountName={name}"),
                );
            }
            ResourceKind::SqlServer => {
                outputs.insert("fqdn".to_string(), format!("{name}.database.example.net"));
            }
            ResourceKind::SqlDatabase { .. } => {
                outputs.insert(
                    "connection_string".to_string(),
                    format!("Server=tcp:mock,1433;Database={name}"),
                );
            }
            ResourceKind::AiAccount { .. } => {
                outputs.insert("endpoint".to_string(), format!("https://{name}.ai.example.com/"));
                outputs.insert("key".to_string(), "mock-ai-key".to_string());
            }
            ResourceKind::ApiGateway { .. } => {
                outputs.insert(
                    "gateway_url".to_string(),
                    format!("https://{name}.gateway.example.net"),
                );
                outputs.insert("subscription_key".to_string(), "mock-apim-key".to_string());
            }
            ResourceKind::WorkflowApp => {
                outputs.insert("principal_id".to_string(), "principal-123".to_string());
                outputs.insert("hostname".to_string(), format!("{name}.workflows.example.net"));
            }
            ResourceKind::Connection { .. } => {
                outputs.insert(
                    "runtime_url".to_string(),
                    format!("https://{name}.connections.example.net"),
                );
                outputs.insert("status".to_string(), "Error".to_string());
            }
            _ => {}
        }
        outputs
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok("mock account"))
    }

    async fn probe(
        &self,
        _scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        _deps: &ResolvedNames,
    ) -> Result<Existence> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("probe {} {name}", kind.slug()));
        Ok(match state.resources.get(&format!("{}:{name}", kind.slug())) {
            Some(Owner::Us) => Existence::FoundOwnedByUs,
            Some(Owner::Other) => Existence::FoundOwnedByOther,
            None => Existence::NotFound,
        })
    }

    async fn create(&self, request: &CreateRequest<'_>) -> Result<ResourceHandle> {
        let slug = request.kind.slug();
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create {slug} {}", request.name));

        // The engine promises prerequisites resolve before dependents.
        for &prereq in request.kind.prerequisites() {
            if !request.deps.contains(prereq) {
                return Err(CloudError::Semantic(format!(
                    "create {slug} issued before prerequisite {prereq}"
                )));
            }
        }

        if let Some(script) = state.create_failures.get_mut(slug) {
            if script.remaining > 0 {
                script.remaining -= 1;
                let message = script.message.clone();
                return Err(if script.transient {
                    CloudError::Transient(message)
                } else {
                    CloudError::Semantic(message)
                });
            }
        }

        state
            .resources
            .insert(format!("{slug}:{}", request.name), Owner::Us);
        Ok(ResourceHandle {
            id: format!("mock://{slug}/{}", request.name),
            principal_id: matches!(request.kind, ResourceKind::WorkflowApp)
                .then(|| "principal-123".to_string()),
            attributes: HashMap::new(),
        })
    }

    async fn delete(
        &self,
        _scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        _deps: &ResolvedNames,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete {} {name}", kind.slug()));
        state.resources.remove(&format!("{}:{name}", kind.slug()));
        Ok(())
    }

    async fn read_outputs(
        &self,
        _scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        _deps: &ResolvedNames,
    ) -> Result<HashMap<String, String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("outputs {} {name}", kind.slug()));
        Ok(Self::default_outputs(kind, name))
    }

    async fn list_role_assignments(
        &self,
        principal_id: &str,
        scope_id: &str,
    ) -> Result<Vec<RoleAssignment>> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("list-roles {principal_id} {scope_id}"));
        Ok(state
            .role_assignments
            .iter()
            .filter(|a| a.principal_id == principal_id && a.scope_id == scope_id)
            .cloned()
            .collect())
    }

    async fn create_role_assignment(&self, grant: &RoleGrant) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("assign-role {} {}", grant.role, grant.scope_id));
        state.role_assignments.push(RoleAssignment {
            principal_id: grant.principal_id.clone(),
            role: grant.role.clone(),
            scope_id: grant.scope_id.clone(),
        });
        Ok(())
    }
}
