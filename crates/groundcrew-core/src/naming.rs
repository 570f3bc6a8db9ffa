//! Deterministic name resolution
//!
//! Physical names are derived from a stable seed (subscription id +
//! resource group) so that re-running the provisioner lands on the same
//! names every time. The seed is hashed once with SHA-256; each resolution
//! attempt takes the next 4-hex-character slice of that digest, so collision
//! fallback stays deterministic instead of rolling new random suffixes.

use crate::error::{CoreError, Result};
use crate::kind::{NameCharset, ResourceKind};
use sha2::{Digest, Sha256};

/// Width of one digest slice in hex characters
const SLICE_LEN: usize = 4;

/// A SHA-256 hex digest yields 64 characters, i.e. 16 deterministic slices.
pub const MAX_NAME_ATTEMPTS: usize = 64 / SLICE_LEN;

/// A resolved physical name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Logical identifier (the kind slug)
    pub logical: String,
    /// Constraint-satisfying physical name
    pub physical: String,
    /// Which digest slice produced this name (0-based)
    pub attempt: usize,
}

/// Derives physical names from a stable seed
pub struct NameResolver {
    digest_hex: String,
    prefix: String,
}

impl NameResolver {
    pub fn new(seed: &str, prefix: impl Into<String>) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        let digest_hex = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self {
            digest_hex,
            prefix: prefix.into(),
        }
    }

    /// Resolve the physical name for `kind` at the given collision attempt.
    ///
    /// Attempt 0 uses the first digest slice; each subsequent attempt takes
    /// the next slice. Returns `NameExhausted` once the digest runs out.
    pub fn resolve(&self, kind: &ResourceKind, attempt: usize) -> Result<ResolvedName> {
        if attempt >= MAX_NAME_ATTEMPTS {
            return Err(CoreError::NameExhausted {
                kind: kind.slug().to_string(),
                attempts: attempt,
            });
        }

        let slice = &self.digest_hex[attempt * SLICE_LEN..(attempt + 1) * SLICE_LEN];
        let physical = self.constrain(kind, &format!("{}-{}-{}", self.prefix, kind.slug(), slice));

        Ok(ResolvedName {
            logical: kind.slug().to_string(),
            physical,
            attempt,
        })
    }

    /// Last-resort non-deterministic name: digest slice 0 plus a wall-clock
    /// suffix. Idempotency is deliberately sacrificed, so callers must opt
    /// in and the escape is logged.
    pub fn resolve_with_timestamp(&self, kind: &ResourceKind) -> ResolvedName {
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let slice = &self.digest_hex[..SLICE_LEN];
        let physical = self.constrain(
            kind,
            &format!("{}-{}-{}-{}", self.prefix, kind.slug(), slice, stamp),
        );
        tracing::warn!(
            kind = kind.slug(),
            name = %physical,
            "deterministic names exhausted; using timestamp suffix (name will differ on re-run)"
        );
        ResolvedName {
            logical: kind.slug().to_string(),
            physical,
            attempt: MAX_NAME_ATTEMPTS,
        }
    }

    /// Apply the kind's charset and length constraints
    fn constrain(&self, kind: &ResourceKind, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        let mut name: String = match kind.charset() {
            NameCharset::LowerAlnumHyphen => lowered
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect(),
            NameCharset::LowerAlnum => {
                lowered.chars().filter(char::is_ascii_alphanumeric).collect()
            }
        };
        name.truncate(kind.max_name_len());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ConnectorKind;

    fn resolver() -> NameResolver {
        // SHA-256("sub-123-rg-demo") = 770974cf5d401327...
        NameResolver::new("sub-123-rg-demo", "proj")
    }

    #[test]
    fn resolution_is_deterministic() {
        let a = resolver().resolve(&ResourceKind::SqlServer, 0).unwrap();
        let b = resolver().resolve(&ResourceKind::SqlServer, 0).unwrap();
        assert_eq!(a.physical, b.physical);
    }

    #[test]
    fn sqlserver_name_matches_fixed_seed_contract() {
        let name = resolver().resolve(&ResourceKind::SqlServer, 0).unwrap();
        assert_eq!(name.physical, "proj-sqlserver-7709");
    }

    #[test]
    fn collision_fallback_takes_next_digest_slice() {
        let name = resolver().resolve(&ResourceKind::SqlServer, 1).unwrap();
        assert_eq!(name.physical, "proj-sqlserver-74cf");
        let third = resolver().resolve(&ResourceKind::SqlServer, 2).unwrap();
        assert_eq!(third.physical, "proj-sqlserver-5d40");
    }

    #[test]
    fn storage_names_are_hyphenless_and_short() {
        let kind = ResourceKind::StorageAccount { sku: "Standard_LRS".into() };
        let name = resolver().resolve(&kind, 0).unwrap();
        assert_eq!(name.physical, "projstorage7709");
        assert!(name.physical.len() <= 24);
        assert!(name.physical.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn long_prefixes_truncate_to_kind_limit() {
        let resolver = NameResolver::new("sub-123-rg-demo", "a-very-long-project-prefix");
        let kind = ResourceKind::StorageAccount { sku: "Standard_LRS".into() };
        let name = resolver.resolve(&kind, 0).unwrap();
        assert_eq!(name.physical.len(), 24);
    }

    #[test]
    fn exhaustion_escalates_to_caller() {
        let err = resolver()
            .resolve(&ResourceKind::SqlServer, MAX_NAME_ATTEMPTS)
            .unwrap_err();
        assert!(matches!(err, CoreError::NameExhausted { .. }));
    }

    #[test]
    fn timestamp_fallback_keeps_prefix_and_slug() {
        let kind = ResourceKind::Connection { connector: ConnectorKind::Forms };
        let name = resolver().resolve_with_timestamp(&kind);
        assert!(name.physical.starts_with("proj-conn-forms-7709-"));
        assert_eq!(name.attempt, MAX_NAME_ATTEMPTS);
    }
}
