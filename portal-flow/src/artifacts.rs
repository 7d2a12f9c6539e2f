use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::browser::BrowserSession;
use crate::error::Result;

/// What a diagnostic snapshot documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotKind {
    SlotFound,
    BookingConfirmed,
    Error,
}

/// Writes full-page snapshots into two output locations: a "found"
/// directory for detections and booking confirmations, and an "error"
/// directory for failure diagnostics. File names carry the event type and
/// a sortable timestamp.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    found_dir: PathBuf,
    error_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(found_dir: impl Into<PathBuf>, error_dir: impl Into<PathBuf>) -> Result<Self> {
        let found_dir = found_dir.into();
        let error_dir = error_dir.into();
        std::fs::create_dir_all(&found_dir)?;
        std::fs::create_dir_all(&error_dir)?;
        Ok(Self {
            found_dir,
            error_dir,
        })
    }

    pub fn found_dir(&self) -> &Path {
        &self.found_dir
    }

    pub fn error_dir(&self) -> &Path {
        &self.error_dir
    }

    /// Capture a full-page snapshot of the session and return its path.
    pub async fn capture(
        &self,
        session: &dyn BrowserSession,
        kind: SnapshotKind,
        portal: &str,
    ) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let (dir, prefix) = match kind {
            SnapshotKind::SlotFound => (&self.found_dir, "slot_found".to_string()),
            SnapshotKind::BookingConfirmed => (&self.found_dir, "slot_confirmed".to_string()),
            SnapshotKind::Error => (&self.error_dir, format!("{portal}_error")),
        };
        let path = dir.join(format!("{prefix}_{timestamp}.png"));
        session.screenshot(&path).await?;
        info!(portal, path = %path.display(), "snapshot saved");
        Ok(path)
    }
}
