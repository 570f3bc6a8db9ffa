//! Settings materialization
//!
//! After provisioning, every value the downstream runtime dereferences is
//! collected into one JSON document: a flat string map under the top-level
//! `"Values"` key. Keys are never omitted: anything unresolved is written
//! as the `<UPDATE_REQUIRED>` placeholder so a missing value is visible
//! instead of silent.
//!
//! Re-materializing merges into the existing document: only keys resolved
//! this run are overwritten, so manual edits (for example a consented
//! connection URL pasted in by hand) survive later runs.

use crate::engine::StackOutputs;
use crate::error::{CloudError, Result};
use groundcrew_core::StackSpec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Sentinel for settings that could not be resolved automatically
pub const PLACEHOLDER: &str = "<UPDATE_REQUIRED>";

/// Every key the downstream runtime dereferences
pub const REQUIRED_KEYS: &[&str] = &[
    "WORKFLOWS_SUBSCRIPTION_ID",
    "WORKFLOWS_RESOURCE_GROUP_NAME",
    "WORKFLOWS_LOCATION_NAME",
    "AzureWebJobsStorage",
    "AGENT_MODEL_ENDPOINT",
    "AGENT_MODEL_KEY",
    "AGENT_MODEL_DEPLOYMENT",
    "SQL_CONNECTION_STRING",
    "GATEWAY_BASE_URL",
    "GATEWAY_SUBSCRIPTION_KEY",
    "FORMS_CONNECTION_RUNTIME_URL",
    "TEAMS_CONNECTION_RUNTIME_URL",
    "OUTLOOK_CONNECTION_RUNTIME_URL",
];

/// The persisted settings document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsDocument {
    #[serde(rename = "Values")]
    pub values: BTreeMap<String, String>,
}

impl SettingsDocument {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Keys still carrying the placeholder sentinel
    pub fn unresolved(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|(_, v)| v.as_str() == PLACEHOLDER)
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// Map collected stack outputs onto the runtime's settings schema
pub fn settings_from_run(spec: &StackSpec, outputs: &StackOutputs) -> HashMap<String, String> {
    let mut resolved = HashMap::new();
    resolved.insert(
        "WORKFLOWS_SUBSCRIPTION_ID".to_string(),
        spec.subscription_id.clone(),
    );
    resolved.insert(
        "WORKFLOWS_RESOURCE_GROUP_NAME".to_string(),
        spec.resource_group.clone(),
    );
    resolved.insert("WORKFLOWS_LOCATION_NAME".to_string(), spec.location.clone());
    resolved.insert(
        "AGENT_MODEL_DEPLOYMENT".to_string(),
        spec.model.name.clone(),
    );

    let mappings = [
        ("AzureWebJobsStorage", "storage.connection_string"),
        ("AGENT_MODEL_ENDPOINT", "ai.endpoint"),
        ("AGENT_MODEL_KEY", "ai.key"),
        ("SQL_CONNECTION_STRING", "sqldb.connection_string"),
        ("GATEWAY_BASE_URL", "apim.gateway_url"),
        ("GATEWAY_SUBSCRIPTION_KEY", "apim.subscription_key"),
        ("FORMS_CONNECTION_RUNTIME_URL", "conn-forms.runtime_url"),
        ("TEAMS_CONNECTION_RUNTIME_URL", "conn-teams.runtime_url"),
        ("OUTLOOK_CONNECTION_RUNTIME_URL", "conn-outlook.runtime_url"),
    ];
    for (key, output) in mappings {
        if let Some(value) = outputs.get(output) {
            resolved.insert(key.to_string(), value.to_string());
        }
    }
    resolved
}

/// Reads, merges and writes the settings document
pub struct SettingsMaterializer {
    path: PathBuf,
}

impl SettingsMaterializer {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }

    /// Load the current document, or an empty one if none exists yet
    pub async fn load(&self) -> Result<SettingsDocument> {
        if !self.path.exists() {
            tracing::debug!("settings file not found, starting from empty document");
            return Ok(SettingsDocument::default());
        }
        let content = fs::read_to_string(&self.path).await?;
        let document: SettingsDocument = serde_json::from_str(&content).map_err(|err| {
            CloudError::SettingsError(format!(
                "could not parse {}: {err}",
                self.path.display()
            ))
        })?;
        Ok(document)
    }

    /// Merge this run's resolved values into the document and persist it.
    ///
    /// Resolved keys overwrite; required keys with no value anywhere get the
    /// placeholder; everything else in the existing file is left alone.
    pub async fn materialize(
        &self,
        resolved: &HashMap<String, String>,
    ) -> Result<SettingsDocument> {
        let mut document = self.load().await?;

        for (key, value) in resolved {
            document.values.insert(key.clone(), value.clone());
        }
        for key in REQUIRED_KEYS {
            document
                .values
                .entry((*key).to_string())
                .or_insert_with(|| PLACEHOLDER.to_string());
        }

        self.write(&document).await?;
        Ok(document)
    }

    async fn write(&self, document: &SettingsDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Keep the previous file around in case a merge went wrong.
        if self.path.exists() {
            let backup = self.backup_path();
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&self.path, &backup).await?;
        }

        let content = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, content).await?;
        tracing::debug!(
            path = %self.path.display(),
            keys = document.values.len(),
            "settings document written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundcrew_core::StackSpec;
    use tempfile::tempdir;

    fn spec() -> StackSpec {
        StackSpec::new("sub-123", "rg-demo", "westus", "proj")
    }

    #[tokio::test]
    async fn every_required_key_is_present_after_a_partial_run() {
        let dir = tempdir().unwrap();
        let materializer = SettingsMaterializer::new(dir.path().join("settings.json"));

        // Partial run: only storage resolved, everything else missing.
        let mut outputs = StackOutputs::new();
        outputs.values.insert(
            "storage.connection_string".to_string(),
            "DefaultEndpointsProtocol=https;AccountName=projstorage7709".to_string(),
        );

        let document = materializer
            .materialize(&settings_from_run(&spec(), &outputs))
            .await
            .unwrap();

        for key in REQUIRED_KEYS {
            assert!(document.values.contains_key(*key), "missing key {key}");
        }
        assert_eq!(document.get("AGENT_MODEL_KEY"), Some(PLACEHOLDER));
        assert_eq!(
            document.get("AzureWebJobsStorage"),
            Some("DefaultEndpointsProtocol=https;AccountName=projstorage7709")
        );
        assert_eq!(document.get("WORKFLOWS_SUBSCRIPTION_ID"), Some("sub-123"));
    }

    #[tokio::test]
    async fn rematerializing_preserves_manual_edits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let materializer = SettingsMaterializer::new(&path);

        materializer
            .materialize(&settings_from_run(&spec(), &StackOutputs::new()))
            .await
            .unwrap();

        // Operator pastes in the consented connection URL by hand.
        let mut document = materializer.load().await.unwrap();
        document.values.insert(
            "FORMS_CONNECTION_RUNTIME_URL".to_string(),
            "https://consented.example/forms".to_string(),
        );
        let content = serde_json::to_string_pretty(&document).unwrap();
        tokio::fs::write(&path, content).await.unwrap();

        // A later run resolves storage but not the connection.
        let mut outputs = StackOutputs::new();
        outputs
            .values
            .insert("storage.connection_string".to_string(), "conn".to_string());
        let merged = materializer
            .materialize(&settings_from_run(&spec(), &outputs))
            .await
            .unwrap();

        assert_eq!(
            merged.get("FORMS_CONNECTION_RUNTIME_URL"),
            Some("https://consented.example/forms")
        );
        assert_eq!(merged.get("AzureWebJobsStorage"), Some("conn"));
    }

    #[tokio::test]
    async fn rewriting_keeps_a_backup_of_the_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let materializer = SettingsMaterializer::new(&path);

        materializer.materialize(&HashMap::new()).await.unwrap();
        materializer.materialize(&HashMap::new()).await.unwrap();

        assert!(path.exists());
        assert!(dir.path().join("settings.json.backup").exists());
    }

    #[test]
    fn unresolved_lists_placeholder_keys() {
        let mut document = SettingsDocument::default();
        document.values.insert("A".to_string(), PLACEHOLDER.to_string());
        document.values.insert("B".to_string(), "real".to_string());
        assert_eq!(document.unresolved(), vec!["A"]);
    }
}
