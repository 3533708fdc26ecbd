//! In-process store with the same uniqueness rules as the PostgreSQL schema.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::AuthError;
use super::store::{RefreshTokenStore, UserStore};
use crate::models::auth::{NewRefreshToken, NewUser, RefreshTokenRecord, User};
use crate::uuid::uuidv7;

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    /// Keyed by token hash.
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

/// Users and refresh sessions held in memory behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(AuthError::UsernameAlreadyExists);
        }
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::EmailAlreadyExists);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            active: true,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().any(|u| u.email == email))
    }

    async fn set_active(&self, user_id: Uuid, active: bool) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::UserNotFound)?;
        user.active = active;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn add(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, AuthError> {
        let mut inner = self.inner.write().await;
        if inner.refresh_tokens.contains_key(&token.token_hash) {
            return Err(AuthError::Internal("duplicate refresh token hash".into()));
        }
        let record = RefreshTokenRecord {
            id: uuidv7(),
            user_id: token.user_id,
            token_hash: token.token_hash,
            created_at: token.created_at,
            expires_at: token.expires_at,
            device_info: token.device_info,
        };
        inner
            .refresh_tokens
            .insert(record.token_hash.clone(), record.clone());
        Ok(record)
    }

    async fn exists(&self, token_hash: &str) -> Result<bool, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.refresh_tokens.contains_key(token_hash))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        let inner = self.inner.read().await;
        let mut records: Vec<RefreshTokenRecord> = inner
            .refresh_tokens
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn remove(&self, token_hash: &str) -> Result<bool, AuthError> {
        let mut inner = self.inner.write().await;
        Ok(inner.refresh_tokens.remove(token_hash).is_some())
    }
}
