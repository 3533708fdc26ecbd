//! Persistence seams for users and refresh sessions.
//!
//! Implemented by [`PgStore`](super::queries::PgStore) for PostgreSQL and
//! [`MemoryStore`](super::memory::MemoryStore) for tests and embedding.
//! Implementations enforce uniqueness themselves and report collisions as
//! [`AuthError::UsernameAlreadyExists`] / [`AuthError::EmailAlreadyExists`].

use async_trait::async_trait;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{NewRefreshToken, NewUser, RefreshTokenRecord, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user with `active = true`.
    async fn insert(&self, user: NewUser) -> Result<User, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;

    /// Flip the active flag. Fails with `UserNotFound` for an unknown id.
    async fn set_active(&self, user_id: Uuid, active: bool) -> Result<(), AuthError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn add(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, AuthError>;

    /// Whether a record with this hash exists.
    async fn exists(&self, token_hash: &str) -> Result<bool, AuthError>;

    /// All records owned by the user, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, AuthError>;

    /// Delete the record with this hash. Returns whether one was removed.
    async fn remove(&self, token_hash: &str) -> Result<bool, AuthError>;
}
