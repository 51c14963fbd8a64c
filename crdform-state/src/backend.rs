//! Where state lives, and the errors storing it can raise

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use crdform_core::resource::Value;
use thiserror::Error;

use crate::lock::LockInfo;
use crate::state::StateFile;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("State is locked by {0}")]
    Locked(Box<LockInfo>),

    #[error("No lock with ID {0} is held")]
    LockNotFound(String),

    #[error("Lock {actual} is held, not {expected}")]
    LockMismatch { expected: String, actual: String },

    #[error("Unsupported backend type: {0}")]
    UnsupportedBackend(String),

    #[error("Invalid backend configuration: {0}")]
    Configuration(String),

    /// Unreadable file, or one that belongs to another lineage
    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// A value that has no place in a state file
    #[error("Cannot store {0}")]
    Unstorable(String),

    #[error("Could not encode state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Could not {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Storage for one configuration's state file and its lock
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// `None` before the first apply
    async fn load(&self) -> BackendResult<Option<StateFile>>;

    /// Replace the stored state; `state` should already be advanced
    async fn save(&self, state: &StateFile) -> BackendResult<()>;

    /// Take the lock for `operation`, failing while someone else holds a live one
    async fn lock(&self, operation: &str) -> BackendResult<LockInfo>;

    async fn unlock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Remove a lock by ID without being its holder
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;

    /// Where the state is kept, for messages
    fn location(&self) -> String;
}

/// The `backend <type> { ... }` block of a configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub backend_type: String,
    pub attributes: HashMap<String, Value>,
}

impl BackendConfig {
    /// Used when the configuration declares no backend
    pub fn local() -> Self {
        Self {
            backend_type: "local".to_string(),
            attributes: HashMap::new(),
        }
    }

    /// A string attribute; `Ok(None)` when absent, an error when not a string
    pub fn string(&self, key: &str) -> BackendResult<Option<&str>> {
        match self.attributes.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(BackendError::Configuration(format!(
                "'{}' must be a string",
                key
            ))),
        }
    }
}

impl From<&crdform_core::parser::BackendConfig> for BackendConfig {
    fn from(config: &crdform_core::parser::BackendConfig) -> Self {
        Self {
            backend_type: config.backend_type.clone(),
            attributes: config.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_error_shows_the_holder() {
        let lock = LockInfo::new("apply");
        let message = BackendError::Locked(Box::new(lock.clone())).to_string();
        assert!(message.starts_with("State is locked by "));
        assert!(message.contains(&lock.id));
        assert!(message.contains(&lock.owner));
    }

    #[test]
    fn io_error_names_the_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = BackendError::io("read", "state/crdform.state.json", source);
        assert_eq!(
            error.to_string(),
            "Could not read state/crdform.state.json: denied"
        );
    }

    #[test]
    fn string_attributes_are_type_checked() {
        let mut config = BackendConfig::local();
        config
            .attributes
            .insert("path".to_string(), Value::String("a.json".to_string()));
        config.attributes.insert("pretty".to_string(), Value::Bool(false));

        assert_eq!(config.string("path").unwrap(), Some("a.json"));
        assert_eq!(config.string("missing").unwrap(), None);
        assert!(matches!(
            config.string("pretty"),
            Err(BackendError::Configuration(_))
        ));
    }
}
