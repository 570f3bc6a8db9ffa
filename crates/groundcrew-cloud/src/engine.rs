//! Idempotent provisioning engine
//!
//! The engine walks the desired-resource list in dependency order and, for
//! each resource, resolves a deterministic name, probes for it, and creates
//! it only when the probe reports nothing in our scope. Every create goes
//! through the shared retry utility. Required steps abort the run on
//! failure; optional steps degrade to a warning and the walk continues, so
//! a partially completed run can always be re-run to convergence.

use crate::error::{CloudError, Result};
use crate::provider::{
    CloudProvider, CreateRequest, Existence, ResolvedNames, RetryConfig, Scope,
};
use crate::record::{Outcome, ProvisioningRecord, RunReport};
use crate::retry::retry_with_backoff;
use groundcrew_core::{CoreError, NameResolver, ResolvedName, ResourceKind, StackSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Values read back from provisioned resources, keyed `"{slug}.{output}"`
/// (e.g. `storage.connection_string`, `ai.endpoint`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackOutputs {
    pub values: HashMap<String, String>,
}

impl StackOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn principal_id(&self) -> Option<&str> {
        self.get("workflow.principal_id")
    }

    fn absorb(&mut self, slug: &str, outputs: HashMap<String, String>) {
        for (key, value) in outputs {
            self.values.insert(format!("{slug}.{key}"), value);
        }
    }
}

/// Everything a finished (or aborted) run produced
#[derive(Debug, Clone)]
pub struct ProvisionRun {
    pub report: RunReport,
    pub outputs: StackOutputs,
    pub names: ResolvedNames,
}

/// What `crew plan` would do for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    Create,
    Reuse,
    /// All deterministic name candidates are taken by other owners
    Conflict,
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlannedAction::Create => write!(f, "create"),
            PlannedAction::Reuse => write!(f, "reuse"),
            PlannedAction::Conflict => write!(f, "conflict"),
        }
    }
}

/// One row of a `crew plan` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStep {
    pub kind: String,
    pub display: String,
    pub physical_name: String,
    pub action: PlannedAction,
    /// Digest slice the name came from; >0 means collision fallback
    pub attempt: usize,
}

/// The sequential reconciler
pub struct Provisioner<'a> {
    provider: &'a dyn CloudProvider,
    spec: &'a StackSpec,
    retry: RetryConfig,
    timestamp_fallback: bool,
}

impl<'a> Provisioner<'a> {
    pub fn new(provider: &'a dyn CloudProvider, spec: &'a StackSpec) -> Self {
        Self {
            provider,
            spec,
            retry: RetryConfig::default(),
            timestamp_fallback: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Allow a wall-clock name suffix once deterministic candidates run out
    pub fn with_timestamp_fallback(mut self, enabled: bool) -> Self {
        self.timestamp_fallback = enabled;
        self
    }

    fn scope(&self) -> Scope {
        Scope::new(&self.spec.subscription_id, &self.spec.resource_group)
    }

    fn resolver(&self) -> NameResolver {
        NameResolver::new(&self.spec.seed(), &self.spec.prefix)
    }

    /// Names chosen by the operator rather than the resolver
    fn fixed_name(&self, kind: &ResourceKind) -> Option<String> {
        match kind {
            ResourceKind::ResourceGroup => Some(self.spec.resource_group.clone()),
            ResourceKind::ApiGateway { .. } => self.spec.existing_gateway.clone(),
            ResourceKind::SqlDatabase { .. } => Some(self.spec.database_name.clone()),
            ResourceKind::ModelDeployment { .. } => Some(self.spec.model.name.clone()),
            ResourceKind::MockApi => Some("loan-mock".to_string()),
            _ => None,
        }
    }

    async fn probe(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        deps: &ResolvedNames,
    ) -> Result<Existence> {
        retry_with_backoff(&self.retry, &format!("probe {}", kind.slug()), || {
            self.provider.probe(scope, kind, name, deps)
        })
        .await
    }

    /// Resolve a name the provider will accept: walk the digest slices past
    /// any candidate taken by a different owner.
    async fn resolve_free_name(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        resolver: &NameResolver,
        deps: &ResolvedNames,
    ) -> Result<(ResolvedName, Existence)> {
        let mut attempt = 0;
        loop {
            let candidate = match resolver.resolve(kind, attempt) {
                Ok(candidate) => candidate,
                Err(CoreError::NameExhausted { .. }) if self.timestamp_fallback => {
                    return Ok((resolver.resolve_with_timestamp(kind), Existence::NotFound));
                }
                Err(err) => return Err(err.into()),
            };

            match self.probe(scope, kind, &candidate.physical, deps).await? {
                Existence::FoundOwnedByOther => {
                    tracing::info!(
                        kind = kind.slug(),
                        name = %candidate.physical,
                        "name taken by another owner, trying next digest slice"
                    );
                    attempt += 1;
                }
                existence => return Ok((candidate, existence)),
            }
        }
    }

    /// Find the physical name of our already-provisioned resource, if any.
    /// Follows the same slice order the provisioning run would have used.
    async fn locate(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        resolver: &NameResolver,
        deps: &ResolvedNames,
    ) -> Result<Option<String>> {
        if let Some(name) = self.fixed_name(kind) {
            return match self.probe(scope, kind, &name, deps).await? {
                Existence::FoundOwnedByUs => Ok(Some(name)),
                _ => Ok(None),
            };
        }
        for attempt in 0..groundcrew_core::MAX_NAME_ATTEMPTS {
            let candidate = resolver.resolve(kind, attempt)?;
            match self.probe(scope, kind, &candidate.physical, deps).await? {
                Existence::FoundOwnedByUs => return Ok(Some(candidate.physical)),
                Existence::NotFound => return Ok(None),
                Existence::FoundOwnedByOther => continue,
            }
        }
        Ok(None)
    }

    /// Full provisioning run. Returns `Ok` even when a required step failed:
    /// the report carries the failure so callers can print the partial run
    /// before choosing an exit code.
    pub async fn run(&self) -> Result<ProvisionRun> {
        let auth = self.provider.check_auth().await?;
        if !auth.authenticated {
            return Err(CloudError::AuthenticationFailed(
                auth.error.unwrap_or_else(|| "provider is not authenticated".to_string()),
            ));
        }

        let started = std::time::Instant::now();
        let scope = self.scope();
        let resolver = self.resolver();
        let mut report = RunReport::new();
        let mut names = ResolvedNames::new();
        let mut outputs = StackOutputs::new();

        for resource in self.spec.desired_resources() {
            let kind = &resource.kind;

            // A skipped optional step takes its dependents with it.
            if let Some(&missing) =
                kind.prerequisites().iter().find(|&&p| !names.contains(p))
            {
                let detail = format!("prerequisite '{missing}' unavailable");
                report.warn(format!("{}: {detail}", kind.display_name()));
                report.add(ProvisioningRecord {
                    kind: kind.slug().to_string(),
                    display: kind.display_name().to_string(),
                    physical_name: String::new(),
                    existed_before: false,
                    outcome: Outcome::Skipped,
                    detail: Some(detail),
                });
                continue;
            }

            match self.provision_one(&scope, &resolver, kind, &names).await {
                Ok((record, physical)) => {
                    match retry_with_backoff(
                        &self.retry,
                        &format!("read outputs of {}", kind.slug()),
                        || self.provider.read_outputs(&scope, kind, &physical, &names),
                    )
                    .await
                    {
                        Ok(values) => outputs.absorb(kind.slug(), values),
                        Err(err) => {
                            report.warn(format!(
                                "could not read outputs of {} '{}': {err}",
                                kind.display_name(),
                                physical
                            ));
                        }
                    }
                    names.insert(kind.slug(), physical);
                    report.add(record);
                }
                Err(err) if kind.required() => {
                    tracing::error!(kind = kind.slug(), "required step failed: {err}");
                    report.add(ProvisioningRecord {
                        kind: kind.slug().to_string(),
                        display: kind.display_name().to_string(),
                        physical_name: self.fixed_name(kind).unwrap_or_default(),
                        existed_before: false,
                        outcome: Outcome::Failed,
                        detail: Some(err.to_string()),
                    });
                    report.duration_ms = started.elapsed().as_millis() as u64;
                    return Ok(ProvisionRun { report, outputs, names });
                }
                Err(err) => {
                    tracing::warn!(kind = kind.slug(), "optional step skipped: {err}");
                    report.warn(format!("{} skipped: {err}", kind.display_name()));
                    report.add(ProvisioningRecord {
                        kind: kind.slug().to_string(),
                        display: kind.display_name().to_string(),
                        physical_name: self.fixed_name(kind).unwrap_or_default(),
                        existed_before: false,
                        outcome: Outcome::Skipped,
                        detail: Some(err.to_string()),
                    });
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(ProvisionRun { report, outputs, names })
    }

    /// Reconcile one resource: resolve, probe, create-or-reuse.
    async fn provision_one(
        &self,
        scope: &Scope,
        resolver: &NameResolver,
        kind: &ResourceKind,
        names: &ResolvedNames,
    ) -> Result<(ProvisioningRecord, String)> {
        let (resolved, existence) = match self.fixed_name(kind) {
            Some(name) => {
                let existence = self.probe(scope, kind, &name, names).await?;
                if existence == Existence::FoundOwnedByOther {
                    return Err(CloudError::Semantic(format!(
                        "name '{name}' is taken outside resource group '{}'",
                        scope.resource_group
                    )));
                }
                // An operator-supplied gateway must already exist; creating
                // one under that name was not what the operator asked for.
                if matches!(kind, ResourceKind::ApiGateway { .. })
                    && self.spec.existing_gateway.is_some()
                    && existence == Existence::NotFound
                {
                    return Err(CloudError::ResourceNotFound(format!(
                        "gateway '{name}' was supplied with --gateway but does not exist"
                    )));
                }
                (
                    ResolvedName { logical: kind.slug().to_string(), physical: name, attempt: 0 },
                    existence,
                )
            }
            None => self.resolve_free_name(scope, kind, resolver, names).await?,
        };

        let physical = resolved.physical.clone();
        let (outcome, existed_before) = match existence {
            Existence::FoundOwnedByUs => {
                tracing::debug!(kind = kind.slug(), name = %physical, "already exists, reusing");
                (Outcome::Reused, true)
            }
            Existence::NotFound => {
                let request = CreateRequest {
                    scope,
                    kind,
                    name: &physical,
                    location: &self.spec.location,
                    tags: &self.spec.tags,
                    deps: names,
                };
                let handle = retry_with_backoff(
                    &self.retry,
                    &format!("create {}", kind.slug()),
                    || self.provider.create(&request),
                )
                .await?;
                tracing::info!(kind = kind.slug(), name = %physical, id = %handle.id, "created");
                (Outcome::Created, false)
            }
            Existence::FoundOwnedByOther => {
                // resolve_free_name and the fixed-name path both filter this
                return Err(CloudError::Semantic(format!(
                    "unresolvable name conflict for '{physical}'"
                )));
            }
        };

        Ok((
            ProvisioningRecord {
                kind: kind.slug().to_string(),
                display: kind.display_name().to_string(),
                physical_name: physical.clone(),
                existed_before,
                outcome,
                detail: None,
            },
            physical,
        ))
    }

    /// Read-only preview: what a run would create, reuse, or fail on.
    pub async fn plan(&self) -> Result<Vec<PlannedStep>> {
        let scope = self.scope();
        let resolver = self.resolver();
        let mut steps = Vec::new();
        let mut names = ResolvedNames::new();

        for resource in self.spec.desired_resources() {
            let kind = &resource.kind;
            let step = match self.fixed_name(kind) {
                Some(name) => {
                    let action = match self.probe(&scope, kind, &name, &names).await? {
                        Existence::FoundOwnedByUs => PlannedAction::Reuse,
                        Existence::NotFound => PlannedAction::Create,
                        Existence::FoundOwnedByOther => PlannedAction::Conflict,
                    };
                    PlannedStep {
                        kind: kind.slug().to_string(),
                        display: kind.display_name().to_string(),
                        physical_name: name,
                        action,
                        attempt: 0,
                    }
                }
                None => match self.resolve_free_name(&scope, kind, &resolver, &names).await {
                    Ok((resolved, existence)) => PlannedStep {
                        kind: kind.slug().to_string(),
                        display: kind.display_name().to_string(),
                        physical_name: resolved.physical,
                        action: match existence {
                            Existence::FoundOwnedByUs => PlannedAction::Reuse,
                            _ => PlannedAction::Create,
                        },
                        attempt: resolved.attempt,
                    },
                    Err(CloudError::Core(CoreError::NameExhausted { .. })) => PlannedStep {
                        kind: kind.slug().to_string(),
                        display: kind.display_name().to_string(),
                        physical_name: String::new(),
                        action: PlannedAction::Conflict,
                        attempt: groundcrew_core::MAX_NAME_ATTEMPTS,
                    },
                    Err(err) => return Err(err),
                },
            };
            if step.action != PlannedAction::Conflict {
                names.insert(kind.slug(), step.physical_name.clone());
            }
            steps.push(step);
        }

        Ok(steps)
    }

    /// Locate existing resources and read their outputs, without mutating
    /// anything. Used by `bind`, `settings` and `status`.
    pub async fn collect_outputs(&self) -> Result<(ResolvedNames, StackOutputs)> {
        let scope = self.scope();
        let resolver = self.resolver();
        let mut names = ResolvedNames::new();
        let mut outputs = StackOutputs::new();

        for resource in self.spec.desired_resources() {
            let kind = &resource.kind;
            if let Some(physical) = self.locate(&scope, kind, &resolver, &names).await? {
                match self.provider.read_outputs(&scope, kind, &physical, &names).await {
                    Ok(values) => outputs.absorb(kind.slug(), values),
                    Err(err) => {
                        tracing::warn!(
                            kind = kind.slug(),
                            name = %physical,
                            "could not read outputs: {err}"
                        );
                    }
                }
                names.insert(kind.slug(), physical);
            }
        }

        Ok((names, outputs))
    }

    /// Delete stack resources in reverse dependency order. The resource
    /// group itself is only removed when `delete_group` is set.
    pub async fn destroy(&self, delete_group: bool) -> Result<RunReport> {
        let started = std::time::Instant::now();
        let scope = self.scope();
        let resolver = self.resolver();
        let mut report = RunReport::new();

        // Forward pass first: child resources are addressed under their
        // parents, so every name must be known before the reverse walk.
        let mut names = ResolvedNames::new();
        for resource in self.spec.desired_resources() {
            let kind = &resource.kind;
            if let Some(physical) = self.locate(&scope, kind, &resolver, &names).await? {
                names.insert(kind.slug(), physical);
            }
        }

        let mut resources = self.spec.desired_resources();
        resources.reverse();

        for resource in resources {
            let kind = &resource.kind;
            if matches!(kind, ResourceKind::ResourceGroup) && !delete_group {
                continue;
            }
            // Reused operator gateways are not ours to delete.
            if matches!(kind, ResourceKind::ApiGateway { .. })
                && self.spec.existing_gateway.is_some()
            {
                continue;
            }

            match names.get(kind.slug()).map(str::to_string) {
                Some(physical) => {
                    let result = retry_with_backoff(
                        &self.retry,
                        &format!("delete {}", kind.slug()),
                        || self.provider.delete(&scope, kind, &physical, &names),
                    )
                    .await;
                    match result {
                        Ok(()) => {
                            tracing::info!(kind = kind.slug(), name = %physical, "deleted");
                            report.add(ProvisioningRecord {
                                kind: kind.slug().to_string(),
                                display: kind.display_name().to_string(),
                                physical_name: physical,
                                existed_before: true,
                                outcome: Outcome::Deleted,
                                detail: None,
                            });
                        }
                        Err(err) => {
                            report.warn(format!(
                                "could not delete {} '{physical}': {err}",
                                kind.display_name()
                            ));
                            report.add(ProvisioningRecord {
                                kind: kind.slug().to_string(),
                                display: kind.display_name().to_string(),
                                physical_name: physical,
                                existed_before: true,
                                outcome: Outcome::Failed,
                                detail: Some(err.to_string()),
                            });
                        }
                    }
                }
                None => {
                    report.add(ProvisioningRecord {
                        kind: kind.slug().to_string(),
                        display: kind.display_name().to_string(),
                        physical_name: String::new(),
                        existed_before: false,
                        outcome: Outcome::Skipped,
                        detail: Some("not found".to_string()),
                    });
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockProvider, Owner};
    use groundcrew_core::StackSpec;

    fn spec() -> StackSpec {
        StackSpec::new("sub-123", "rg-demo", "westus", "proj")
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(4),
            backoff_multiplier: 2.0,
        }
    }

    fn engine<'a>(provider: &'a MockProvider, spec: &'a StackSpec) -> Provisioner<'a> {
        Provisioner::new(provider, spec).with_retry(fast_retry())
    }

    #[tokio::test]
    async fn fresh_run_creates_everything_in_dependency_order() {
        let provider = MockProvider::new();
        let spec = spec();
        let run = engine(&provider, &spec).run().await.unwrap();

        assert!(run.report.is_success());
        assert_eq!(run.report.count(Outcome::Created), 12);

        let create_names: Vec<String> = provider.create_calls();
        assert_eq!(
            create_names,
            vec![
                "create rg rg-demo",
                "create storage projstorage7709",
                "create sqlserver proj-sqlserver-7709",
                "create sqldb loans",
                "create ai proj-ai-7709",
                "create model gpt-4o",
                "create apim proj-apim-7709",
                "create mockapi loan-mock",
                "create workflow proj-workflow-7709",
                "create conn-forms proj-conn-forms-7709",
                "create conn-teams proj-conn-teams-7709",
                "create conn-outlook proj-conn-outlook-7709",
            ]
        );
    }

    #[tokio::test]
    async fn second_run_reuses_every_resource() {
        let provider = MockProvider::new();
        let spec = spec();
        engine(&provider, &spec).run().await.unwrap();
        provider.take_calls();

        let second = engine(&provider, &spec).run().await.unwrap();

        assert!(second.report.is_success());
        assert_eq!(second.report.count(Outcome::Reused), 12);
        assert_eq!(second.report.count(Outcome::Created), 0);
        assert!(provider.create_calls().is_empty());
        for record in &second.report.records {
            assert!(record.existed_before, "{} should be a reuse", record.kind);
        }
    }

    #[tokio::test]
    async fn name_taken_by_other_owner_falls_back_to_next_slice() {
        let provider =
            MockProvider::new().with_existing("storage", "projstorage7709", Owner::Other);
        let spec = spec();
        let run = engine(&provider, &spec).run().await.unwrap();

        let storage = run.report.record_for("storage").unwrap();
        assert_eq!(storage.outcome, Outcome::Created);
        assert_eq!(storage.physical_name, "projstorage74cf");
    }

    #[tokio::test]
    async fn optional_step_failure_degrades_to_warning() {
        let provider = MockProvider::new().fail_create("model", false, u32::MAX);
        let spec = spec();
        let run = engine(&provider, &spec).run().await.unwrap();

        assert!(run.report.is_success());
        assert_eq!(run.report.record_for("model").unwrap().outcome, Outcome::Skipped);
        assert!(run.report.warnings.iter().any(|w| w.contains("model")));
        // The walk continued past the failure.
        assert_eq!(run.report.record_for("apim").unwrap().outcome, Outcome::Created);
        assert_eq!(run.report.records.len(), 12);
    }

    #[tokio::test]
    async fn required_step_failure_aborts_the_run() {
        let provider = MockProvider::new().fail_create("sqlserver", false, 1);
        let spec = spec();
        let run = engine(&provider, &spec).run().await.unwrap();

        assert!(!run.report.is_success());
        assert_eq!(run.report.records.len(), 3);
        assert_eq!(
            run.report.record_for("sqlserver").unwrap().outcome,
            Outcome::Failed
        );
        assert!(!provider.calls().iter().any(|c| c.starts_with("create sqldb")));
    }

    #[tokio::test]
    async fn transient_create_faults_are_retried() {
        let provider = MockProvider::new().fail_create("sqlserver", true, 2);
        let spec = spec();
        let run = engine(&provider, &spec).run().await.unwrap();

        assert!(run.report.is_success());
        assert_eq!(
            run.report.record_for("sqlserver").unwrap().outcome,
            Outcome::Created
        );
        let attempts = provider
            .create_calls()
            .iter()
            .filter(|c| c.contains("sqlserver"))
            .count();
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn operator_supplied_gateway_is_reused_not_created() {
        let provider = MockProvider::new().with_existing("apim", "corp-apim", Owner::Us);
        let mut spec = spec();
        spec.existing_gateway = Some("corp-apim".to_string());
        let run = engine(&provider, &spec).run().await.unwrap();

        let apim = run.report.record_for("apim").unwrap();
        assert_eq!(apim.outcome, Outcome::Reused);
        assert_eq!(apim.physical_name, "corp-apim");
        assert!(!provider.calls().iter().any(|c| c.starts_with("create apim")));
        // The mock API still lands on the reused gateway.
        assert_eq!(run.report.record_for("mockapi").unwrap().outcome, Outcome::Created);
    }

    #[tokio::test]
    async fn missing_operator_gateway_skips_gateway_and_dependents() {
        let provider = MockProvider::new();
        let mut spec = spec();
        spec.existing_gateway = Some("corp-apim".to_string());
        let run = engine(&provider, &spec).run().await.unwrap();

        assert!(run.report.is_success());
        assert_eq!(run.report.record_for("apim").unwrap().outcome, Outcome::Skipped);
        let mockapi = run.report.record_for("mockapi").unwrap();
        assert_eq!(mockapi.outcome, Outcome::Skipped);
        assert!(mockapi.detail.as_deref().unwrap().contains("apim"));
    }

    #[tokio::test]
    async fn exhausted_names_fail_without_timestamp_fallback() {
        let mut provider = MockProvider::new();
        let spec = spec();
        let resolver = NameResolver::new(&spec.seed(), &spec.prefix);
        let storage_kind = ResourceKind::StorageAccount { sku: "Standard_LRS".into() };
        for attempt in 0..groundcrew_core::MAX_NAME_ATTEMPTS {
            let name = resolver.resolve(&storage_kind, attempt).unwrap();
            provider = provider.with_existing("storage", &name.physical, Owner::Other);
        }

        let run = engine(&provider, &spec).run().await.unwrap();
        assert!(!run.report.is_success());
        assert_eq!(run.report.record_for("storage").unwrap().outcome, Outcome::Failed);
    }

    #[tokio::test]
    async fn exhausted_names_use_timestamp_suffix_when_allowed() {
        let mut provider = MockProvider::new();
        let spec = spec();
        let resolver = NameResolver::new(&spec.seed(), &spec.prefix);
        let storage_kind = ResourceKind::StorageAccount { sku: "Standard_LRS".into() };
        for attempt in 0..groundcrew_core::MAX_NAME_ATTEMPTS {
            let name = resolver.resolve(&storage_kind, attempt).unwrap();
            provider = provider.with_existing("storage", &name.physical, Owner::Other);
        }

        let run = engine(&provider, &spec)
            .with_timestamp_fallback(true)
            .run()
            .await
            .unwrap();

        let storage = run.report.record_for("storage").unwrap();
        assert_eq!(storage.outcome, Outcome::Created);
        assert!(storage.physical_name.starts_with("projstorage7709"));
        assert_eq!(storage.physical_name.len(), 24);
    }

    #[tokio::test]
    async fn plan_probes_without_mutating() {
        let provider = MockProvider::new().with_existing("storage", "projstorage7709", Owner::Us);
        let spec = spec();
        let steps = engine(&provider, &spec).plan().await.unwrap();

        assert_eq!(steps.len(), 12);
        let storage = steps.iter().find(|s| s.kind == "storage").unwrap();
        assert_eq!(storage.action, PlannedAction::Reuse);
        let sql = steps.iter().find(|s| s.kind == "sqlserver").unwrap();
        assert_eq!(sql.action, PlannedAction::Create);
        assert!(provider.create_calls().is_empty());
    }

    #[tokio::test]
    async fn collect_outputs_finds_the_provisioned_stack() {
        let provider = MockProvider::new();
        let spec = spec();
        engine(&provider, &spec).run().await.unwrap();

        let (names, outputs) = engine(&provider, &spec).collect_outputs().await.unwrap();

        assert_eq!(names.get("storage"), Some("projstorage7709"));
        assert_eq!(outputs.principal_id(), Some("principal-123"));
        assert!(outputs.get("storage.connection_string").is_some());
        assert!(outputs.get("apim.gateway_url").is_some());
    }

    #[tokio::test]
    async fn destroy_walks_in_reverse_and_keeps_the_group_by_default() {
        let provider = MockProvider::new();
        let spec = spec();
        engine(&provider, &spec).run().await.unwrap();
        provider.take_calls();

        let report = engine(&provider, &spec).destroy(false).await.unwrap();

        assert_eq!(report.count(Outcome::Deleted), 11);
        let deletes: Vec<String> = provider
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("delete "))
            .collect();
        assert_eq!(deletes.first().unwrap(), "delete conn-outlook proj-conn-outlook-7709");
        assert_eq!(deletes.last().unwrap(), "delete storage projstorage7709");
        assert!(!deletes.iter().any(|c| c.contains(" rg ")));
    }
}
