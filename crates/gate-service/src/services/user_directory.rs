//! Directory of application users, fed by the identity service's
//! user-created webhook.

use crate::errors::GateError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Registration entry for an identity-service user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub user_id: String,
    pub email: Option<String>,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Register a user. Idempotent: returns `false` if already registered,
    /// leaving the existing entry untouched.
    async fn register(&self, user_id: &str, email: Option<&str>) -> Result<bool, GateError>;

    async fn get(&self, user_id: &str) -> Result<Option<RegisteredUser>, GateError>;
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, RegisteredUser>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn register(&self, user_id: &str, email: Option<&str>) -> Result<bool, GateError> {
        let mut users = self.users.write().await;
        if users.contains_key(user_id) {
            return Ok(false);
        }

        users.insert(
            user_id.to_string(),
            RegisteredUser {
                user_id: user_id.to_string(),
                email: email.map(ToString::to_string),
                registered_at: chrono::Utc::now(),
            },
        );
        Ok(true)
    }

    async fn get(&self, user_id: &str) -> Result<Option<RegisteredUser>, GateError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let directory = InMemoryUserDirectory::new();

        assert!(directory.register("u1", Some("a@example.com")).await.unwrap());
        assert!(!directory.register("u1", Some("b@example.com")).await.unwrap());

        let user = directory.get("u1").await.unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
        assert!(directory.get("u2").await.unwrap().is_none());
    }
}
