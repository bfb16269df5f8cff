use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use crate::{HrError, HrResult, Roster};

/// Persistence seam for the employee collection.
///
/// Every request loads the whole roster and saves it back after a mutation.
/// Implementations do no locking: concurrent writers race and the last save
/// wins.
pub trait EmployeeStore: Send + Sync {
    fn load(&self) -> HrResult<Roster>;
    fn save(&self, roster: &Roster) -> HrResult<()>;
}

/// Roster persisted as a pretty-printed JSON array in a single file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes an empty roster, creating parent directories as needed.
    pub fn init(&self, force: bool) -> HrResult<()> {
        if self.path.exists() && !force {
            return Err(HrError::AlreadyExists {
                path: self.path.clone(),
            });
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| HrError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.save(&Roster::default())
    }

    fn io_error(&self, source: std::io::Error) -> HrError {
        HrError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl EmployeeStore for JsonFileStore {
    fn load(&self) -> HrResult<Roster> {
        let raw = fs::read(&self.path).map_err(|err| self.io_error(err))?;
        let roster: Roster = serde_json::from_slice(&raw).map_err(|source| HrError::Parse {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), count = roster.len(), "employees loaded");
        Ok(roster)
    }

    fn save(&self, roster: &Roster) -> HrResult<()> {
        let bytes = to_pretty_json(roster)?;
        fs::write(&self.path, bytes).map_err(|err| self.io_error(err))?;
        debug!(path = %self.path.display(), count = roster.len(), "employees saved");
        Ok(())
    }
}

fn to_pretty_json(roster: &Roster) -> HrResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    roster.serialize(&mut ser).map_err(HrError::Serialize)?;
    Ok(buf)
}

/// In-process roster, mostly for tests and local experiments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    roster: Mutex<Roster>,
}

impl MemoryStore {
    pub fn new(roster: Roster) -> Self {
        Self {
            roster: Mutex::new(roster),
        }
    }

    pub fn snapshot(&self) -> Roster {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Roster> {
        self.roster
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EmployeeStore for MemoryStore {
    fn load(&self) -> HrResult<Roster> {
        Ok(self.lock().clone())
    }

    fn save(&self, roster: &Roster) -> HrResult<()> {
        *self.lock() = roster.clone();
        Ok(())
    }
}
