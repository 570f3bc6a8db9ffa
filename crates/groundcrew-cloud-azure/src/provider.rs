//! Azure provider implementation
//!
//! Maps each resource kind onto its `az` command set. Probing is a
//! two-step classification: a `show` inside our scope first, then (for
//! globally unique names) the provider's name-availability check, so a
//! taken name resolves to `FoundOwnedByOther` instead of failing later at
//! create time.

use crate::azcli::{AzCli, NameAvailability, SignedInUser};
use crate::error::{AzureError, Result};
use async_trait::async_trait;
use groundcrew_cloud::{
    AuthStatus, CloudProvider, CreateRequest, Existence, ResolvedNames, ResourceHandle,
    RoleAssignment, RoleGrant, Scope,
};
use groundcrew_core::{ResourceKind, UniquenessScope};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const APIM_API_VERSION: &str = "2022-08-01";

/// Static policy for the mock decision API: canned JSON picked by a string
/// match on the request body, no backend behind it.
const MOCK_DECISION_POLICY: &str = r#"<policies>
  <inbound>
    <base />
    <choose>
      <when condition="@(context.Request.Body.As<string>(preserveContent: true).Contains("declined"))">
        <return-response>
          <set-status code="200" reason="OK" />
          <set-header name="Content-Type" exists-action="override">
            <value>application/json</value>
          </set-header>
          <set-body>{"decision":"declined","reason":"credit score below threshold"}</set-body>
        </return-response>
      </when>
    </choose>
    <return-response>
      <set-status code="200" reason="OK" />
      <set-header name="Content-Type" exists-action="override">
        <value>application/json</value>
      </set-header>
      <set-body>{"decision":"approved","rate":6.25}</set-body>
    </return-response>
  </inbound>
</policies>"#;

#[derive(Debug, Deserialize)]
struct Created {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct IdentityAssigned {
    #[serde(rename = "principalId")]
    principal_id: String,
}

#[derive(Debug, Deserialize)]
struct ApimSecrets {
    #[serde(rename = "primaryKey")]
    primary_key: String,
}

#[derive(Debug, Deserialize)]
struct AzRoleAssignment {
    #[serde(rename = "principalId")]
    principal_id: String,
    #[serde(rename = "roleDefinitionName")]
    role: String,
    scope: String,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

fn tag_args(tags: &BTreeMap<String, String>) -> Vec<String> {
    if tags.is_empty() {
        return Vec::new();
    }
    let mut args = vec!["--tags".to_string()];
    args.extend(tags.iter().map(|(k, v)| format!("{k}={v}")));
    args
}

/// Azure provider
pub struct AzureProvider {
    cli: AzCli,
}

impl AzureProvider {
    pub fn new(subscription: Option<String>) -> Self {
        let cli = match subscription {
            Some(id) => AzCli::with_subscription(id),
            None => AzCli::new(),
        };
        Self { cli }
    }

    /// The signed-in account, used to default the subscription id
    pub async fn account(&self) -> Result<crate::azcli::AzAccount> {
        self.cli.check_auth().await
    }

    fn dep<'d>(deps: &'d ResolvedNames, slug: &str, kind: &ResourceKind) -> Result<&'d str> {
        deps.get(slug).ok_or_else(|| {
            AzureError::Semantic(format!(
                "prerequisite '{slug}' is not available for {}",
                kind.slug()
            ))
        })
    }

    /// True when a `show`-style command finds the resource in our scope
    async fn shows(&self, args: &[String]) -> Result<bool> {
        match self.cli.run_args(args).await {
            Ok(_) => Ok(true),
            Err(AzureError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn query(&self, args: &[String]) -> Result<String> {
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.cli.query_string(&refs).await
    }

    /// Like `query`, but `null` or missing values become `None`
    async fn query_opt(&self, args: &[String]) -> Result<Option<String>> {
        let output = match self.cli.run_args(args).await {
            Ok(output) => output,
            Err(AzureError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        match serde_json::from_str::<serde_json::Value>(output.trim())? {
            serde_json::Value::String(value) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    /// Show-in-scope commands per kind. Child kinds resolve their parent
    /// through `deps`; no parent means the child cannot exist.
    async fn exists_in_scope(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        deps: &ResolvedNames,
    ) -> Result<Option<bool>> {
        let rg = scope.resource_group.as_str();
        let found = match kind {
            ResourceKind::ResourceGroup => {
                let output = self.cli.run(&["group", "exists", "--name", name]).await?;
                output.trim() == "true"
            }
            ResourceKind::StorageAccount { .. } => {
                self.shows(&argv(&[
                    "storage", "account", "show", "--name", name, "--resource-group", rg,
                ]))
                .await?
            }
            ResourceKind::SqlServer => {
                self.shows(&argv(&[
                    "sql", "server", "show", "--name", name, "--resource-group", rg,
                ]))
                .await?
            }
            ResourceKind::SqlDatabase { .. } => {
                let Some(server) = deps.get("sqlserver") else {
                    return Ok(None);
                };
                self.shows(&argv(&[
                    "sql", "db", "show", "--name", name, "--server", server,
                    "--resource-group", rg,
                ]))
                .await?
            }
            ResourceKind::AiAccount { .. } => {
                self.shows(&argv(&[
                    "cognitiveservices", "account", "show", "--name", name,
                    "--resource-group", rg,
                ]))
                .await?
            }
            ResourceKind::ModelDeployment { .. } => {
                let Some(account) = deps.get("ai") else {
                    return Ok(None);
                };
                self.shows(&argv(&[
                    "cognitiveservices", "account", "deployment", "show", "--name", account,
                    "--resource-group", rg, "--deployment-name", name,
                ]))
                .await?
            }
            ResourceKind::ApiGateway { .. } => {
                self.shows(&argv(&[
                    "apim", "show", "--name", name, "--resource-group", rg,
                ]))
                .await?
            }
            ResourceKind::MockApi => {
                let Some(gateway) = deps.get("apim") else {
                    return Ok(None);
                };
                self.shows(&argv(&[
                    "apim", "api", "show", "--resource-group", rg, "--service-name", gateway,
                    "--api-id", name,
                ]))
                .await?
            }
            ResourceKind::WorkflowApp => {
                self.shows(&argv(&[
                    "logicapp", "show", "--name", name, "--resource-group", rg,
                ]))
                .await?
            }
            ResourceKind::Connection { .. } => {
                self.shows(&argv(&[
                    "resource", "show", "--resource-group", rg, "--resource-type",
                    "Microsoft.Web/connections", "--name", name,
                ]))
                .await?
            }
        };
        Ok(Some(found))
    }

    /// Global name-availability check for DNS-labeled kinds
    async fn global_name_taken(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
    ) -> Result<bool> {
        let sub = scope.subscription_id.as_str();
        let check: NameAvailability = match kind {
            ResourceKind::StorageAccount { .. } => {
                self.cli
                    .run_json(&["storage", "account", "check-name", "--name", name])
                    .await?
            }
            ResourceKind::ApiGateway { .. } => {
                self.cli.run_json(&["apim", "check-name", "--name", name]).await?
            }
            ResourceKind::SqlServer => {
                let url = format!(
                    "https://management.azure.com/subscriptions/{sub}/providers/Microsoft.Sql/checkNameAvailability?api-version=2021-11-01"
                );
                let body = serde_json::json!({
                    "name": name,
                    "type": "Microsoft.Sql/servers",
                })
                .to_string();
                self.cli
                    .run_json(&["rest", "--method", "post", "--url", &url, "--body", &body])
                    .await?
            }
            ResourceKind::AiAccount { .. } => {
                let url = format!(
                    "https://management.azure.com/subscriptions/{sub}/providers/Microsoft.CognitiveServices/checkDomainAvailability?api-version=2023-05-01"
                );
                let body = serde_json::json!({
                    "subdomainName": name,
                    "type": "Microsoft.CognitiveServices/accounts",
                })
                .to_string();
                self.cli
                    .run_json(&["rest", "--method", "post", "--url", &url, "--body", &body])
                    .await?
            }
            ResourceKind::WorkflowApp => {
                let url = format!(
                    "https://management.azure.com/subscriptions/{sub}/providers/Microsoft.Web/checknameavailability?api-version=2022-03-01"
                );
                let body = serde_json::json!({
                    "name": name,
                    "type": "Microsoft.Web/sites",
                })
                .to_string();
                self.cli
                    .run_json(&["rest", "--method", "post", "--url", &url, "--body", &body])
                    .await?
            }
            _ => return Ok(false),
        };
        Ok(!check.available)
    }

    async fn create_inner(&self, request: &CreateRequest<'_>) -> Result<ResourceHandle> {
        let scope = request.scope;
        let rg = scope.resource_group.as_str();
        let name = request.name;
        let location = request.location;

        match request.kind {
            ResourceKind::ResourceGroup => {
                let mut args = argv(&["group", "create", "--name", name, "--location", location]);
                args.extend(tag_args(request.tags));
                let created: Created = serde_json::from_str(self.cli.run_args(&args).await?.trim())?;
                Ok(ResourceHandle { id: created.id, ..Default::default() })
            }
            ResourceKind::StorageAccount { sku } => {
                let mut args = argv(&[
                    "storage", "account", "create", "--name", name, "--resource-group", rg,
                    "--location", location, "--sku", sku, "--kind", "StorageV2",
                    "--min-tls-version", "TLS1_2",
                ]);
                args.extend(tag_args(request.tags));
                let created: Created = serde_json::from_str(self.cli.run_args(&args).await?.trim())?;
                Ok(ResourceHandle { id: created.id, ..Default::default() })
            }
            ResourceKind::SqlServer => {
                // Entra-only authentication: the signed-in user becomes the
                // server admin, no SQL password is minted or stored.
                let admin: SignedInUser =
                    self.cli.run_json(&["ad", "signed-in-user", "show"]).await?;
                let args = argv(&[
                    "sql", "server", "create", "--name", name, "--resource-group", rg,
                    "--location", location, "--enable-ad-only-auth",
                    "--external-admin-principal-type", "User",
                    "--external-admin-name", &admin.user_principal_name,
                    "--external-admin-sid", &admin.id,
                ]);
                let created: Created = serde_json::from_str(self.cli.run_args(&args).await?.trim())?;

                // Workflow traffic arrives from inside the platform.
                self.cli
                    .run_args(&argv(&[
                        "sql", "server", "firewall-rule", "create", "--resource-group", rg,
                        "--server", name, "--name", "allow-azure-services",
                        "--start-ip-address", "0.0.0.0", "--end-ip-address", "0.0.0.0",
                    ]))
                    .await?;

                Ok(ResourceHandle { id: created.id, ..Default::default() })
            }
            ResourceKind::SqlDatabase { service_objective } => {
                let server = Self::dep(request.deps, "sqlserver", request.kind)?;
                let args = argv(&[
                    "sql", "db", "create", "--name", name, "--server", server,
                    "--resource-group", rg, "--service-objective", service_objective,
                ]);
                let created: Created = serde_json::from_str(self.cli.run_args(&args).await?.trim())?;
                Ok(ResourceHandle { id: created.id, ..Default::default() })
            }
            ResourceKind::AiAccount { sku } => {
                let args = argv(&[
                    "cognitiveservices", "account", "create", "--name", name,
                    "--resource-group", rg, "--location", location, "--kind", "OpenAI",
                    "--sku", sku, "--custom-domain", name, "--yes",
                ]);
                let created: Created = serde_json::from_str(self.cli.run_args(&args).await?.trim())?;
                Ok(ResourceHandle { id: created.id, ..Default::default() })
            }
            ResourceKind::ModelDeployment { model, model_version, capacity } => {
                let account = Self::dep(request.deps, "ai", request.kind)?;
                let capacity = capacity.to_string();
                let args = argv(&[
                    "cognitiveservices", "account", "deployment", "create", "--name", account,
                    "--resource-group", rg, "--deployment-name", name,
                    "--model-name", model, "--model-version", model_version,
                    "--model-format", "OpenAI", "--sku-name", "GlobalStandard",
                    "--sku-capacity", &capacity,
                ]);
                let created: Created = serde_json::from_str(self.cli.run_args(&args).await?.trim())?;
                Ok(ResourceHandle { id: created.id, ..Default::default() })
            }
            ResourceKind::ApiGateway { publisher_email, publisher_name, sku } => {
                let mut args = argv(&[
                    "apim", "create", "--name", name, "--resource-group", rg,
                    "--location", location, "--publisher-email", publisher_email,
                    "--publisher-name", publisher_name, "--sku-name", sku,
                ]);
                args.extend(tag_args(request.tags));
                let created: Created = serde_json::from_str(self.cli.run_args(&args).await?.trim())?;
                Ok(ResourceHandle { id: created.id, ..Default::default() })
            }
            ResourceKind::MockApi => {
                let gateway = Self::dep(request.deps, "apim", request.kind)?;
                let created: Created = serde_json::from_str(
                    self.cli
                        .run_args(&argv(&[
                            "apim", "api", "create", "--resource-group", rg,
                            "--service-name", gateway, "--api-id", name, "--path", "loan",
                            "--display-name", "Loan Decision (Mock)", "--protocols", "https",
                        ]))
                        .await?
                        .trim(),
                )?;
                self.cli
                    .run_args(&argv(&[
                        "apim", "api", "operation", "create", "--resource-group", rg,
                        "--service-name", gateway, "--api-id", name,
                        "--operation-id", "submit-decision",
                        "--display-name", "Submit loan decision", "--method", "POST",
                        "--url-template", "/decision",
                    ]))
                    .await?;

                // Attach the static-response policy; there is no az
                // subcommand for operation policies.
                let url = format!(
                    "https://management.azure.com/subscriptions/{}/resourceGroups/{rg}/providers/Microsoft.ApiManagement/service/{gateway}/apis/{name}/operations/submit-decision/policies/policy?api-version={APIM_API_VERSION}",
                    scope.subscription_id
                );
                let body = serde_json::json!({
                    "properties": { "format": "xml", "value": MOCK_DECISION_POLICY }
                })
                .to_string();
                self.cli
                    .run_args(&argv(&["rest", "--method", "put", "--url", &url, "--body", &body]))
                    .await?;

                Ok(ResourceHandle { id: created.id, ..Default::default() })
            }
            ResourceKind::WorkflowApp => {
                let storage = Self::dep(request.deps, "storage", request.kind)?;
                let args = argv(&[
                    "logicapp", "create", "--name", name, "--resource-group", rg,
                    "--storage-account", storage,
                ]);
                let created: Created = serde_json::from_str(self.cli.run_args(&args).await?.trim())?;

                let identity: IdentityAssigned = self
                    .cli
                    .run_json(&[
                        "logicapp", "identity", "assign", "--name", name, "--resource-group", rg,
                    ])
                    .await?;

                Ok(ResourceHandle {
                    id: created.id,
                    principal_id: Some(identity.principal_id),
                    attributes: HashMap::new(),
                })
            }
            ResourceKind::Connection { connector } => {
                let api_id = format!(
                    "/subscriptions/{}/providers/Microsoft.Web/locations/{location}/managedApis/{}",
                    scope.subscription_id,
                    connector.api_name()
                );
                let properties = serde_json::json!({
                    "displayName": name,
                    "api": { "id": api_id },
                })
                .to_string();
                let args = argv(&[
                    "resource", "create", "--resource-group", rg, "--name", name,
                    "--resource-type", "Microsoft.Web/connections", "--location", location,
                    "--properties", &properties,
                ]);
                let created: Created = serde_json::from_str(self.cli.run_args(&args).await?.trim())?;
                Ok(ResourceHandle { id: created.id, ..Default::default() })
            }
        }
    }

    async fn delete_inner(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        deps: &ResolvedNames,
    ) -> Result<()> {
        let rg = scope.resource_group.as_str();
        let result = match kind {
            ResourceKind::ResourceGroup => {
                self.cli
                    .run_args(&argv(&["group", "delete", "--name", name, "--yes"]))
                    .await
            }
            ResourceKind::StorageAccount { .. } => {
                self.cli
                    .run_args(&argv(&[
                        "storage", "account", "delete", "--name", name, "--resource-group", rg,
                        "--yes",
                    ]))
                    .await
            }
            ResourceKind::SqlServer => {
                self.cli
                    .run_args(&argv(&[
                        "sql", "server", "delete", "--name", name, "--resource-group", rg, "--yes",
                    ]))
                    .await
            }
            ResourceKind::SqlDatabase { .. } => {
                let server = Self::dep(deps, "sqlserver", kind)?;
                self.cli
                    .run_args(&argv(&[
                        "sql", "db", "delete", "--name", name, "--server", server,
                        "--resource-group", rg, "--yes",
                    ]))
                    .await
            }
            ResourceKind::AiAccount { .. } => {
                self.cli
                    .run_args(&argv(&[
                        "cognitiveservices", "account", "delete", "--name", name,
                        "--resource-group", rg,
                    ]))
                    .await
            }
            ResourceKind::ModelDeployment { .. } => {
                let account = Self::dep(deps, "ai", kind)?;
                self.cli
                    .run_args(&argv(&[
                        "cognitiveservices", "account", "deployment", "delete", "--name", account,
                        "--resource-group", rg, "--deployment-name", name,
                    ]))
                    .await
            }
            ResourceKind::ApiGateway { .. } => {
                self.cli
                    .run_args(&argv(&[
                        "apim", "delete", "--name", name, "--resource-group", rg, "--yes",
                    ]))
                    .await
            }
            ResourceKind::MockApi => {
                let gateway = Self::dep(deps, "apim", kind)?;
                self.cli
                    .run_args(&argv(&[
                        "apim", "api", "delete", "--resource-group", rg, "--service-name", gateway,
                        "--api-id", name, "--yes",
                    ]))
                    .await
            }
            ResourceKind::WorkflowApp => {
                self.cli
                    .run_args(&argv(&[
                        "logicapp", "delete", "--name", name, "--resource-group", rg, "--yes",
                    ]))
                    .await
            }
            ResourceKind::Connection { .. } => {
                self.cli
                    .run_args(&argv(&[
                        "resource", "delete", "--resource-group", rg, "--resource-type",
                        "Microsoft.Web/connections", "--name", name,
                    ]))
                    .await
            }
        };

        match result {
            Ok(_) => Ok(()),
            // A vanished resource is the state we wanted.
            Err(AzureError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn read_outputs_inner(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        deps: &ResolvedNames,
    ) -> Result<HashMap<String, String>> {
        let rg = scope.resource_group.as_str();
        let mut outputs = HashMap::new();

        match kind {
            ResourceKind::ResourceGroup => {
                let id = self
                    .query(&argv(&["group", "show", "--name", name, "--query", "id"]))
                    .await?;
                outputs.insert("id".to_string(), id);
            }
            ResourceKind::StorageAccount { .. } => {
                let id = self
                    .query(&argv(&[
                        "storage", "account", "show", "--name", name, "--resource-group", rg,
                        "--query", "id",
                    ]))
                    .await?;
                let connection_string = self
                    .query(&argv(&[
                        "storage", "account", "show-connection-string", "--name", name,
                        "--resource-group", rg, "--query", "connectionString",
                    ]))
                    .await?;
                outputs.insert("id".to_string(), id);
                outputs.insert("connection_string".to_string(), connection_string);
            }
            ResourceKind::SqlServer => {
                let id = self
                    .query(&argv(&[
                        "sql", "server", "show", "--name", name, "--resource-group", rg,
                        "--query", "id",
                    ]))
                    .await?;
                let fqdn = self
                    .query(&argv(&[
                        "sql", "server", "show", "--name", name, "--resource-group", rg,
                        "--query", "fullyQualifiedDomainName",
                    ]))
                    .await?;
                outputs.insert("id".to_string(), id);
                outputs.insert("fqdn".to_string(), fqdn);
            }
            ResourceKind::SqlDatabase { .. } => {
                let server = Self::dep(deps, "sqlserver", kind)?;
                let id = self
                    .query(&argv(&[
                        "sql", "db", "show", "--name", name, "--server", server,
                        "--resource-group", rg, "--query", "id",
                    ]))
                    .await?;
                let fqdn = self
                    .query(&argv(&[
                        "sql", "server", "show", "--name", server, "--resource-group", rg,
                        "--query", "fullyQualifiedDomainName",
                    ]))
                    .await?;
                outputs.insert("id".to_string(), id);
                outputs.insert(
                    "connection_string".to_string(),
                    format!(
                        "Server=tcp:{fqdn},1433;Initial Catalog={name};\
                         Authentication=Active Directory Managed Identity;Encrypt=True;"
                    ),
                );
            }
            ResourceKind::AiAccount { .. } => {
                let id = self
                    .query(&argv(&[
                        "cognitiveservices", "account", "show", "--name", name,
                        "--resource-group", rg, "--query", "id",
                    ]))
                    .await?;
                let endpoint = self
                    .query(&argv(&[
                        "cognitiveservices", "account", "show", "--name", name,
                        "--resource-group", rg, "--query", "properties.endpoint",
                    ]))
                    .await?;
                let key = self
                    .query(&argv(&[
                        "cognitiveservices", "account", "keys", "list", "--name", name,
                        "--resource-group", rg, "--query", "key1",
                    ]))
                    .await?;
                outputs.insert("id".to_string(), id);
                outputs.insert("endpoint".to_string(), endpoint);
                outputs.insert("key".to_string(), key);
            }
            ResourceKind::ModelDeployment { .. } => {
                let account = Self::dep(deps, "ai", kind)?;
                let id = self
                    .query(&argv(&[
                        "cognitiveservices", "account", "deployment", "show", "--name", account,
                        "--resource-group", rg, "--deployment-name", name, "--query", "id",
                    ]))
                    .await?;
                outputs.insert("id".to_string(), id);
            }
            ResourceKind::ApiGateway { .. } => {
                let id = self
                    .query(&argv(&[
                        "apim", "show", "--name", name, "--resource-group", rg, "--query", "id",
                    ]))
                    .await?;
                let gateway_url = self
                    .query(&argv(&[
                        "apim", "show", "--name", name, "--resource-group", rg,
                        "--query", "gatewayUrl",
                    ]))
                    .await?;
                // Keys of the built-in subscription; az has no subcommand.
                let url = format!("https://management.azure.com{id}/subscriptions/master/listSecrets?api-version={APIM_API_VERSION}");
                let secrets: ApimSecrets = self
                    .cli
                    .run_json(&["rest", "--method", "post", "--url", &url])
                    .await?;
                outputs.insert("id".to_string(), id);
                outputs.insert("gateway_url".to_string(), gateway_url);
                outputs.insert("subscription_key".to_string(), secrets.primary_key);
            }
            ResourceKind::MockApi => {
                let gateway = Self::dep(deps, "apim", kind)?;
                let id = self
                    .query(&argv(&[
                        "apim", "api", "show", "--resource-group", rg, "--service-name", gateway,
                        "--api-id", name, "--query", "id",
                    ]))
                    .await?;
                outputs.insert("id".to_string(), id);
            }
            ResourceKind::WorkflowApp => {
                let id = self
                    .query(&argv(&[
                        "logicapp", "show", "--name", name, "--resource-group", rg,
                        "--query", "id",
                    ]))
                    .await?;
                let hostname = self
                    .query(&argv(&[
                        "logicapp", "show", "--name", name, "--resource-group", rg,
                        "--query", "defaultHostName",
                    ]))
                    .await?;
                outputs.insert("id".to_string(), id);
                outputs.insert("hostname".to_string(), hostname);
                if let Some(principal_id) = self
                    .query_opt(&argv(&[
                        "logicapp", "identity", "show", "--name", name, "--resource-group", rg,
                        "--query", "principalId",
                    ]))
                    .await?
                {
                    outputs.insert("principal_id".to_string(), principal_id);
                }
            }
            ResourceKind::Connection { .. } => {
                let id = self
                    .query(&argv(&[
                        "resource", "show", "--resource-group", rg, "--resource-type",
                        "Microsoft.Web/connections", "--name", name, "--query", "id",
                    ]))
                    .await?;
                outputs.insert("id".to_string(), id);
                if let Some(runtime_url) = self
                    .query_opt(&argv(&[
                        "resource", "show", "--resource-group", rg, "--resource-type",
                        "Microsoft.Web/connections", "--name", name,
                        "--query", "properties.connectionRuntimeUrl",
                    ]))
                    .await?
                {
                    outputs.insert("runtime_url".to_string(), runtime_url);
                }
                if let Some(status) = self
                    .query_opt(&argv(&[
                        "resource", "show", "--resource-group", rg, "--resource-type",
                        "Microsoft.Web/connections", "--name", name,
                        "--query", "properties.statuses[0].status",
                    ]))
                    .await?
                {
                    outputs.insert("status".to_string(), status);
                }
            }
        }

        Ok(outputs)
    }
}

#[async_trait]
impl CloudProvider for AzureProvider {
    fn name(&self) -> &str {
        "azure"
    }

    async fn check_auth(&self) -> groundcrew_cloud::Result<AuthStatus> {
        match self.cli.check_auth().await {
            Ok(account) => Ok(AuthStatus::ok(format!("{} ({})", account.name, account.id))),
            Err(AzureError::AzNotFound) => {
                Ok(AuthStatus::failed("az CLI is not installed: https://aka.ms/install-azure-cli"))
            }
            Err(err) => Ok(AuthStatus::failed(err.to_string())),
        }
    }

    async fn probe(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        deps: &ResolvedNames,
    ) -> groundcrew_cloud::Result<Existence> {
        match self.exists_in_scope(scope, kind, name, deps).await? {
            // Parent missing: the child cannot exist anywhere we care about.
            None => Ok(Existence::NotFound),
            Some(true) => Ok(Existence::FoundOwnedByUs),
            Some(false) => {
                if kind.uniqueness() == UniquenessScope::Global
                    && self.global_name_taken(scope, kind, name).await?
                {
                    Ok(Existence::FoundOwnedByOther)
                } else {
                    Ok(Existence::NotFound)
                }
            }
        }
    }

    async fn create(&self, request: &CreateRequest<'_>) -> groundcrew_cloud::Result<ResourceHandle> {
        Ok(self.create_inner(request).await?)
    }

    async fn delete(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        deps: &ResolvedNames,
    ) -> groundcrew_cloud::Result<()> {
        Ok(self.delete_inner(scope, kind, name, deps).await?)
    }

    async fn read_outputs(
        &self,
        scope: &Scope,
        kind: &ResourceKind,
        name: &str,
        deps: &ResolvedNames,
    ) -> groundcrew_cloud::Result<HashMap<String, String>> {
        Ok(self.read_outputs_inner(scope, kind, name, deps).await?)
    }

    async fn list_role_assignments(
        &self,
        principal_id: &str,
        scope_id: &str,
    ) -> groundcrew_cloud::Result<Vec<RoleAssignment>> {
        let assignments: Vec<AzRoleAssignment> = self
            .cli
            .run_json(&[
                "role", "assignment", "list", "--assignee", principal_id, "--scope", scope_id,
            ])
            .await
            .map_err(groundcrew_cloud::CloudError::from)?;
        Ok(assignments
            .into_iter()
            .map(|a| RoleAssignment {
                principal_id: a.principal_id,
                role: a.role,
                scope_id: a.scope,
            })
            .collect())
    }

    async fn create_role_assignment(&self, grant: &RoleGrant) -> groundcrew_cloud::Result<()> {
        self.cli
            .run(&[
                "role", "assignment", "create", "--assignee-object-id", &grant.principal_id,
                "--assignee-principal-type", "ServicePrincipal", "--role", &grant.role,
                "--scope", &grant.scope_id,
            ])
            .await
            .map_err(groundcrew_cloud::CloudError::from)?;
        Ok(())
    }
}
