//! Advisory lock held while a run may write state

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a lock stays valid when its holder never releases it
pub const LOCK_TTL_MINUTES: i64 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: String,
    /// Command holding the lock, e.g. `apply`
    pub operation: String,
    /// `user@host`
    pub owner: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(operation: &str) -> Self {
        Self::with_ttl(operation, Duration::minutes(LOCK_TTL_MINUTES))
    }

    pub fn with_ttl(operation: &str, ttl: Duration) -> Self {
        let acquired_at = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.to_string(),
            owner: owner(),
            acquired_at,
            expires_at: acquired_at + ttl,
        }
    }

    /// An expired lock was abandoned and may be taken over
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} by {} since {})",
            self.id,
            self.operation,
            self.owner,
            self.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

fn owner() -> String {
    let user = ["USER", "USERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .unwrap_or_else(|| "unknown".to_string());
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_lock_is_held_by_someone() {
        let lock = LockInfo::new("apply");
        assert_eq!(lock.operation, "apply");
        assert!(lock.owner.contains('@'));
        assert!(!lock.is_expired());
        assert_eq!(
            lock.expires_at - lock.acquired_at,
            Duration::minutes(LOCK_TTL_MINUTES)
        );
    }

    #[test]
    fn lock_past_its_ttl_is_expired() {
        assert!(LockInfo::with_ttl("apply", Duration::seconds(-1)).is_expired());
    }

    #[test]
    fn display_names_operation_and_owner() {
        let lock = LockInfo::new("destroy");
        let shown = lock.to_string();
        assert!(shown.starts_with(&lock.id));
        assert!(shown.contains(&format!("destroy by {}", lock.owner)));
    }

    #[test]
    fn lock_survives_a_json_round_trip() {
        let lock = LockInfo::new("apply");
        let json = serde_json::to_string(&lock).unwrap();
        let decoded: LockInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, lock);
    }
}
