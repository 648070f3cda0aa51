//! Single-slot persistence of the last session.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::StoreError;
use crate::export::SessionSnapshot;

const DEFAULT_SESSION_PATH: &str = ".vertiprompt/last-run.json";

/// JSON file holding the last generated or imported session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `VERTIPROMPT_SESSION_PATH`, else `.vertiprompt/last-run.json`.
    pub fn from_env() -> Self {
        let path = std::env::var("VERTIPROMPT_SESSION_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_PATH.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(snapshot)?;
        std::fs::write(&self.path, json)?;
        debug!(
            event = "session.saved",
            domain = "session",
            path = %self.path.display(),
            slices = snapshot.slices.len() as u64
        );
        Ok(())
    }

    /// The saved session, or `None` when nothing is saved.
    ///
    /// A file that does not decode is removed and treated as absent.
    pub fn load(&self) -> Result<Option<SessionSnapshot>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                warn!(
                    event = "session.corrupt_discarded",
                    domain = "session",
                    path = %self.path.display(),
                    error = %err
                );
                std::fs::remove_file(&self.path)?;
                Ok(None)
            }
        }
    }
}
