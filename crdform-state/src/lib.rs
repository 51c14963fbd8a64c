//! Crdform State Management
//!
//! Persists the manifests each apply renders, so that later runs can diff
//! against them and `show` can print them again.
//!
//! - [`StateFile`] holds one [`ManifestRecord`] per resource address
//! - [`StateBackend`] loads and saves it, and serializes runs with a [`LockInfo`]
//!
//! ```ignore
//! use crdform_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::local())?;
//! let lock = backend.lock("apply").await?;
//! let mut state = backend.load().await?.unwrap_or_default();
//!
//! // ... insert records ...
//!
//! state.advance();
//! backend.save(&state).await?;
//! backend.unlock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod convert;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ManifestRecord, StateFile};
