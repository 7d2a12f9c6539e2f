use std::path::Path;

use portal_flow::PatientProfile;
use serde::{Deserialize, Serialize};

/// Externally-visible configuration document (`config.json`). The patient
/// fields live under `personal_info`, same layout the input form persists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub personal_info: PatientProfile,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Written back whenever a run starts, so edits made through the form
    /// survive the next launch.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
