//! Local file backend for state storage
//!
//! Stores state in a local JSON file (default: crdform.state.json), with a
//! sibling `.lock` file guarding concurrent applies.

use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::LockInfo;
use crate::state::StateFile;

/// Local file backend
pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "crdform.state.json";

    pub fn with_path(state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
        }
    }

    /// `backend local { path = "..." }`; the path defaults to [`Self::DEFAULT_STATE_FILE`]
    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        let path = config.string("path")?.unwrap_or(Self::DEFAULT_STATE_FILE);
        Ok(Self::with_path(path))
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    fn read_lock(&self) -> BackendResult<Option<LockInfo>> {
        let content = match std::fs::read_to_string(&self.lock_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::io("read", &self.lock_path, e)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| BackendError::InvalidState(format!("lock file {}: {}", self.lock_path.display(), e)))
    }

    fn remove_lock(&self) -> BackendResult<()> {
        std::fs::remove_file(&self.lock_path)
            .map_err(|e| BackendError::io("remove", &self.lock_path, e))
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::with_path(Self::DEFAULT_STATE_FILE)
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn load(&self) -> BackendResult<Option<StateFile>> {
        let content = match std::fs::read_to_string(&self.state_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::io("read", &self.state_path, e)),
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            BackendError::InvalidState(format!("{}: {}", self.state_path.display(), e))
        })
    }

    async fn save(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(current) = self.load().await?
            && current.lineage != state.lineage
        {
            return Err(BackendError::InvalidState(format!(
                "{} belongs to lineage {}, refusing to overwrite it with {}",
                self.location(),
                current.lineage,
                state.lineage
            )));
        }

        let content = serde_json::to_string_pretty(state)?;

        // Readers never see a half-written file
        let tmp_path = self.state_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(|e| BackendError::io("write", &tmp_path, e))?;
        std::fs::rename(&tmp_path, &self.state_path)
            .map_err(|e| BackendError::io("replace", &self.state_path, e))?;

        log::debug!(
            "Wrote state serial {} to {}",
            state.serial,
            self.state_path.display()
        );
        Ok(())
    }

    async fn lock(&self, operation: &str) -> BackendResult<LockInfo> {
        if let Some(existing) = self.read_lock()? {
            if !existing.is_expired() {
                return Err(BackendError::Locked(Box::new(existing)));
            }
            log::warn!("Replacing expired lock {}", existing);
            self.remove_lock()?;
        }

        let lock = LockInfo::new(operation);
        let content = serde_json::to_string_pretty(&lock)?;

        // create_new makes two racing runs see each other
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return match self.read_lock()? {
                    Some(existing) => Err(BackendError::Locked(Box::new(existing))),
                    None => Err(BackendError::io("create", &self.lock_path, e)),
                };
            }
            Err(e) => return Err(BackendError::io("create", &self.lock_path, e)),
        };
        file.write_all(content.as_bytes())
            .map_err(|e| BackendError::io("write", &self.lock_path, e))?;

        log::debug!("Acquired lock {}", lock);
        Ok(lock)
    }

    async fn unlock(&self, lock: &LockInfo) -> BackendResult<()> {
        let existing = self
            .read_lock()?
            .ok_or_else(|| BackendError::LockNotFound(lock.id.clone()))?;

        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }

        self.remove_lock()
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        if !self.lock_path.exists() {
            return Err(BackendError::LockNotFound(lock_id.to_string()));
        }

        // An unreadable lock file can still be forced away
        if let Ok(Some(existing)) = self.read_lock()
            && existing.id != lock_id
        {
            return Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing.id,
            });
        }

        self.remove_lock()
    }

    fn location(&self) -> String {
        self.state_path.display().to_string()
    }
}
