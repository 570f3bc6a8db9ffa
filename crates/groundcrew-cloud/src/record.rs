//! Provisioning run records

use serde::{Deserialize, Serialize};

/// How one resource's step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Resource did not exist; we created it
    Created,
    /// Resource already existed in our scope; no call issued
    Reused,
    /// A required step failed; the run aborted here
    Failed,
    /// An optional step failed or lost its prerequisite; the run continued
    Skipped,
    /// Resource was removed (destroy runs only)
    Deleted,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Created => write!(f, "created"),
            Outcome::Reused => write!(f, "reused"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Skipped => write!(f, "skipped"),
            Outcome::Deleted => write!(f, "deleted"),
        }
    }
}

/// Record of one resource's reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningRecord {
    /// Kind slug
    pub kind: String,
    /// Human-readable type name
    pub display: String,
    pub physical_name: String,
    pub existed_before: bool,
    pub outcome: Outcome,
    /// Failure or skip reason, if any
    pub detail: Option<String>,
}

/// Accumulated results of one run, for end-of-run reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub records: Vec<ProvisioningRecord>,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: ProvisioningRecord) {
        self.records.push(record);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }

    /// A run is a success when no record failed; skipped optional steps
    /// leave warnings but do not fail the run.
    pub fn is_success(&self) -> bool {
        self.count(Outcome::Failed) == 0
    }

    pub fn record_for(&self, kind_slug: &str) -> Option<&ProvisioningRecord> {
        self.records.iter().find(|r| r.kind == kind_slug)
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} reused, {} skipped, {} failed",
            self.count(Outcome::Created),
            self.count(Outcome::Reused),
            self.count(Outcome::Skipped),
            self.count(Outcome::Failed)
        )
    }
}
