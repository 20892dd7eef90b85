//! Engine configuration.

use crate::error::{SyncError, SyncResult};
use crate::paths;
use serde::{Deserialize, Serialize};

/// Provider-reserved namespace prefix under which the engine is permitted
/// to operate. Application roots outside it are rejected at construction.
pub const MANAGED_PREFIX: &str = "/Applications";

/// Configuration for the sync engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Application root on the remote store. Must lie under
    /// [`MANAGED_PREFIX`]; relative operation paths resolve under it.
    pub app_base_path: String,

    /// Metadata bag field carrying the encrypted original name.
    ///
    /// Deliberately non-descriptive so a party without the passphrase
    /// cannot infer the field's meaning from the bag's shape.
    pub name_field: String,

    /// Metadata bag field carrying the encrypted original size.
    pub size_field: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            app_base_path: format!("{MANAGED_PREFIX}/veilsync"),
            name_field: "my1".to_string(),
            size_field: "my2".to_string(),
        }
    }
}

impl SyncConfig {
    /// Validates the config, returning the normalized application root.
    pub(crate) fn validate(&self) -> SyncResult<String> {
        let base = paths::normalize(&self.app_base_path);
        if base != MANAGED_PREFIX && !base.starts_with(&format!("{MANAGED_PREFIX}/")) {
            return Err(SyncError::Config(format!(
                "app_base_path '{}' must lie under '{MANAGED_PREFIX}'",
                self.app_base_path
            )));
        }
        if self.name_field.is_empty() || self.size_field.is_empty() {
            return Err(SyncError::Config(
                "metadata field names must not be empty".to_string(),
            ));
        }
        if self.name_field == self.size_field {
            return Err(SyncError::Config(
                "name and size metadata fields must differ".to_string(),
            ));
        }
        Ok(base)
    }
}
