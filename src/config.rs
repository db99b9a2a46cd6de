use serde::{Deserialize, Serialize};

/// Default per-domain ceiling on the summed serialized size of records, in bytes.
pub const DEFAULT_MAX_DOMAIN_BYTES: usize = 4096;

/// Jar configuration. Travels with the jar in persisted snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JarConfig {
    /// Maximum summed serialized size of all records for a single domain.
    /// A write that would push a domain past this ceiling is rejected.
    pub max_domain_bytes: usize,
}

impl Default for JarConfig {
    fn default() -> Self {
        Self {
            max_domain_bytes: DEFAULT_MAX_DOMAIN_BYTES,
        }
    }
}
