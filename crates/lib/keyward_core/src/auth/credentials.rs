//! Username/password verification.

use std::sync::{Arc, LazyLock};

use tracing::debug;

use super::AuthError;
use super::password::{hash_password, verify_password};
use super::store::UserStore;
use crate::models::auth::User;

/// Verified against on the unknown-username path so both rejections cost one
/// bcrypt verify.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("keyward-unknown-user").ok());

/// Checks a username/password pair against the stored bcrypt hash.
#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserStore>,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Return the user when the password matches.
    ///
    /// Unknown usernames and wrong passwords both fail with
    /// [`AuthError::InvalidCredentials`].
    pub async fn validate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            if let Some(hash) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password, hash);
            }
            debug!("login rejected: unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.id, "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }
}
