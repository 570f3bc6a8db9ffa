//! az CLI wrapper
//!
//! Wraps `az` invocations: JSON output, stderr classification into the
//! error taxonomy the engine's retry logic keys on.

use crate::error::{AzureError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// az CLI wrapper
pub struct AzCli {
    subscription: Option<String>,
}

impl AzCli {
    pub fn new() -> Self {
        Self { subscription: None }
    }

    pub fn with_subscription(subscription: impl Into<String>) -> Self {
        Self {
            subscription: Some(subscription.into()),
        }
    }

    /// Check that az is installed and a session is active
    pub async fn check_auth(&self) -> Result<AzAccount> {
        let which = Command::new("which").arg("az").output().await?;
        if !which.status.success() {
            return Err(AzureError::AzNotFound);
        }

        let output = self.run(&["account", "show"]).await.map_err(|err| match err {
            AzureError::CommandFailed(msg) | AzureError::Semantic(msg) => {
                AzureError::AuthenticationFailed(msg)
            }
            other => other,
        })?;

        let account: AzAccount = serde_json::from_str(&output)?;
        Ok(account)
    }

    /// Run an az command and return stdout. `--output json` is appended so
    /// every result parses uniformly.
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("az");
        cmd.args(args);
        if let Some(ref subscription) = self.subscription {
            // Commands without a --subscription flag ignore the global one.
            if accepts_subscription(args) {
                cmd.arg("--subscription").arg(subscription);
            }
        }
        cmd.arg("--output").arg("json");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: az {}", args.join(" "));

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_stderr(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run an owned-argument command (for builders that format values in)
    pub async fn run_args(&self, args: &[String]) -> Result<String> {
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&refs).await
    }

    /// Run and parse the JSON output
    pub async fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T> {
        let output = self.run(args).await?;
        Ok(serde_json::from_str(output.trim())?)
    }

    /// Run a query returning a single JSON string value
    pub async fn query_string(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        Ok(serde_json::from_str(output.trim())?)
    }

    /// Run, mapping provider "not found" to `None` instead of an error
    pub async fn run_optional(&self, args: &[&str]) -> Result<Option<String>> {
        match self.run(args).await {
            Ok(output) => Ok(Some(output)),
            Err(AzureError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Default for AzCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Commands that reject `--subscription` (local/account-level operations)
fn accepts_subscription(args: &[&str]) -> bool {
    !matches!(args.first(), Some(&"account") | Some(&"ad"))
}

/// Map az stderr to the error taxonomy.
///
/// Order matters: not-found markers are checked before the transient ones
/// because some "ResourceNotFound" payloads also carry a 404 status line.
pub fn classify_stderr(stderr: &str) -> AzureError {
    let lower = stderr.to_lowercase();
    let message = stderr.trim().to_string();

    const NOT_FOUND: &[&str] = &[
        "resourcenotfound",
        "resourcegroupnotfound",
        "notfound",
        "could not be found",
        "does not exist",
    ];
    const AUTH: &[&str] = &[
        "az login",
        "authorizationfailed",
        "aadsts",
        "expiredauthenticationtoken",
        "invalidauthenticationtoken",
    ];
    const TRANSIENT: &[&str] = &[
        "toomanyrequests",
        "429",
        "throttl",
        "timed out",
        "timeout",
        "serviceunavailable",
        "503",
        "internalservererror",
        "gatewaytimeout",
        "connection reset",
    ];
    const SEMANTIC: &[&str] = &[
        "invalidparameter",
        "validationerror",
        "quotaexceeded",
        "insufficientquota",
        "invalidresourcename",
        "accountnameinvalid",
        "invalidtemplate",
        "badrequest",
        "alreadyexists",
        "skunotavailable",
    ];

    if NOT_FOUND.iter().any(|marker| lower.contains(marker)) {
        AzureError::NotFound(message)
    } else if AUTH.iter().any(|marker| lower.contains(marker)) {
        AzureError::AuthenticationFailed(message)
    } else if TRANSIENT.iter().any(|marker| lower.contains(marker)) {
        AzureError::Transient(message)
    } else if SEMANTIC.iter().any(|marker| lower.contains(marker)) {
        AzureError::Semantic(message)
    } else {
        AzureError::CommandFailed(message)
    }
}

/// Signed-in account from `az account show`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzAccount {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub user: Option<AzAccountUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzAccountUser {
    pub name: String,
}

/// Signed-in directory user from `az ad signed-in-user show`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedInUser {
    pub id: String,
    #[serde(rename = "userPrincipalName")]
    pub user_principal_name: String,
}

/// Name availability response shared by the check-name style commands
#[derive(Debug, Clone, Deserialize)]
pub struct NameAvailability {
    #[serde(alias = "nameAvailable", alias = "isSubdomainAvailable")]
    pub available: bool,
    #[serde(default)]
    pub reason: Option<String>,
}
