//! Session lifecycle: login, refresh, logout and current-user lookup.
//!
//! A session moves from anonymous to authenticated at login (access and
//! refresh token issued, refresh hash stored), through any number of
//! refreshes (new access token, same refresh token), to terminated when the
//! client drops both tokens at logout.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::AuthError;
use super::config::AuthConfig;
use super::credentials::CredentialVerifier;
use super::jwt::{TokenCodec, TokenKind};
use super::store::{RefreshTokenStore, UserStore};
use super::users::{self, Registration};
use crate::clock::Clock;
use crate::models::auth::{DeviceInfo, NewRefreshToken, SessionInfo, TokenPair, User};

/// SHA-256 hash a refresh token for storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Orchestrates credential checks, token issuance and refresh-session storage.
pub struct SessionManager {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn RefreshTokenStore>,
    credentials: CredentialVerifier,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    revoke_on_logout: bool,
}

impl SessionManager {
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn RefreshTokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            credentials: CredentialVerifier::new(users.clone()),
            users,
            sessions,
            codec: TokenCodec::new(config)?,
            clock,
            revoke_on_logout: config.revoke_on_logout,
        })
    }

    /// Build over a single store that holds both users and refresh sessions.
    pub fn with_store<S>(
        config: &AuthConfig,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError>
    where
        S: UserStore + RefreshTokenStore + 'static,
    {
        Self::new(config, store.clone(), store, clock)
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Lifetime in seconds of tokens of the given kind.
    pub fn token_lifetime(&self, kind: TokenKind) -> i64 {
        self.codec.lifetime(kind)
    }

    /// Register a new user.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        users::register(self.users.as_ref(), registration).await
    }

    /// Verify credentials, issue a token pair and record the refresh session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        device_info: DeviceInfo,
    ) -> Result<TokenPair, AuthError> {
        let user = self.credentials.validate(username, password).await?;

        let now = self.clock.now();
        let access_token = self.codec.issue(&user.username, TokenKind::Access, now)?;
        let refresh_token = self.codec.issue(&user.username, TokenKind::Refresh, now)?;

        let record = self
            .sessions
            .add(NewRefreshToken {
                user_id: user.id,
                token_hash: hash_token(&refresh_token),
                created_at: now,
                expires_at: now + self.codec.lifetime(TokenKind::Refresh),
                device_info,
            })
            .await?;

        info!(user_id = %user.id, session_id = %record.id, "user logged in");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token is not rotated; the same token keeps working until
    /// it expires.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<String, AuthError> {
        let token = present(refresh_token)?;
        let now = self.clock.now();
        let claims = self.codec.decode(token, TokenKind::Refresh, now)?;

        if !self.sessions.exists(&hash_token(token)).await? {
            debug!(subject = %claims.sub, "refresh rejected: token not on record");
            return Err(AuthError::InvalidToken("refresh token not recognised".into()));
        }

        let access_token = self.codec.issue(&claims.sub, TokenKind::Access, now)?;
        debug!(subject = %claims.sub, "access token refreshed");
        Ok(access_token)
    }

    /// End a session.
    ///
    /// The caller discards both tokens. The stored refresh record is only
    /// deleted when `revoke_on_logout` is configured.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        if !self.revoke_on_logout {
            debug!("logout: client-side only");
            return Ok(());
        }
        if let Some(token) = refresh_token.filter(|t| !t.is_empty()) {
            let removed = self.sessions.remove(&hash_token(token)).await?;
            info!(revoked = removed, "logout: refresh session revoked");
        }
        Ok(())
    }

    /// Resolve the active user an access token was issued to.
    pub async fn current_user(&self, access_token: Option<&str>) -> Result<User, AuthError> {
        let token = present(access_token)?;
        let claims = self
            .codec
            .decode(token, TokenKind::Access, self.clock.now())?;

        let user = self
            .users
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.active {
            return Err(AuthError::UserInactive);
        }
        Ok(user)
    }

    /// Unexpired refresh sessions of the access token's owner, newest first.
    pub async fn list_sessions(
        &self,
        access_token: Option<&str>,
    ) -> Result<Vec<SessionInfo>, AuthError> {
        let user = self.current_user(access_token).await?;
        self.sessions_of(&user).await
    }

    /// Unexpired refresh sessions of `user`, newest first.
    pub async fn sessions_of(&self, user: &User) -> Result<Vec<SessionInfo>, AuthError> {
        let now = self.clock.now();
        let sessions = self
            .sessions
            .list_by_user(user.id)
            .await?
            .into_iter()
            .filter(|record| now < record.expires_at)
            .map(SessionInfo::from)
            .collect();
        Ok(sessions)
    }
}

fn present(token: Option<&str>) -> Result<&str, AuthError> {
    token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::TokenMissing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::fixtures;
    use crate::auth::memory::MemoryStore;
    use crate::clock::ManualClock;

    const T0: i64 = 1_700_000_000;

    struct Harness {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        manager: SessionManager,
    }

    fn harness_with(config: AuthConfig) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        let manager = SessionManager::with_store(&config, store.clone(), clock.clone()).unwrap();
        Harness {
            store,
            clock,
            manager,
        }
    }

    async fn harness() -> Harness {
        let h = harness_with(fixtures::config());
        h.manager
            .register(Registration {
                username: "alice".into(),
                email: "alice@x.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        h
    }

    fn device() -> DeviceInfo {
        DeviceInfo {
            user_agent: Some("Mozilla/5.0".into()),
            ip_address: Some("10.0.0.1".into()),
        }
    }

    #[test]
    fn hash_token_is_hex_sha256() {
        let hash = hash_token("pogba_token");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash_token("pogba_token"));
        assert_ne!(hash, hash_token("pogba_token2"));
    }

    #[tokio::test]
    async fn login_issues_pair_and_stores_refresh_hash() {
        let h = harness().await;
        let pair = h.manager.login("alice", "secret", device()).await.unwrap();

        let codec = h.manager.codec();
        let access = codec.decode(&pair.access_token, TokenKind::Access, T0).unwrap();
        let refresh = codec.decode(&pair.refresh_token, TokenKind::Refresh, T0).unwrap();
        assert_eq!(access.sub, "alice");
        assert_eq!(refresh.sub, "alice");

        assert!(h.store.exists(&hash_token(&pair.refresh_token)).await.unwrap());
        assert!(!h.store.exists(&pair.refresh_token).await.unwrap());

        let user = h.store.find_by_username("alice").await.unwrap().unwrap();
        let records = h.store.list_by_user(user.id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].created_at, T0);
        assert_eq!(records[0].expires_at, T0 + 30 * 86_400);
        assert_eq!(records[0].device_info, device());
    }

    #[tokio::test]
    async fn login_with_bad_credentials_stores_nothing() {
        let h = harness().await;
        for (username, password) in [("alice", "wrong"), ("nobody", "secret")] {
            let err = h.manager.login(username, password, device()).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        let user = h.store.find_by_username("alice").await.unwrap().unwrap();
        assert!(h.store.list_by_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_issues_new_access_token_for_same_subject() {
        let h = harness().await;
        let pair = h.manager.login("alice", "secret", device()).await.unwrap();

        h.clock.advance(1);
        let access = h.manager.refresh(Some(&pair.refresh_token)).await.unwrap();
        assert_ne!(access, pair.access_token);

        let claims = h.manager.codec().decode(&access, TokenKind::Access, T0 + 1).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iat, T0 + 1);

        // Not rotated: the same refresh token still works.
        assert!(h.manager.refresh(Some(&pair.refresh_token)).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_without_token_is_missing() {
        let h = harness().await;
        assert!(matches!(h.manager.refresh(None).await, Err(AuthError::TokenMissing)));
        assert!(matches!(h.manager.refresh(Some("")).await, Err(AuthError::TokenMissing)));
    }

    #[tokio::test]
    async fn refresh_with_unissued_token_is_invalid() {
        let h = harness().await;

        // Correctly signed but never recorded.
        let unrecorded = h.manager.codec().issue("alice", TokenKind::Refresh, T0).unwrap();
        let err = h.manager.refresh(Some(&unrecorded)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));

        // Signed with a foreign key.
        let forged = fixtures::rogue_codec().issue("alice", TokenKind::Refresh, T0).unwrap();
        let err = h.manager.refresh(Some(&forged)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));

        // An access token is not a refresh token.
        let pair = h.manager.login("alice", "secret", device()).await.unwrap();
        let err = h.manager.refresh(Some(&pair.access_token)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn refresh_after_expiry_is_expired() {
        let h = harness().await;
        let pair = h.manager.login("alice", "secret", device()).await.unwrap();
        let lifetime = h.manager.token_lifetime(TokenKind::Refresh);

        h.clock.set(T0 + lifetime - 1);
        assert!(h.manager.refresh(Some(&pair.refresh_token)).await.is_ok());

        h.clock.set(T0 + lifetime);
        let err = h.manager.refresh(Some(&pair.refresh_token)).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn logout_keeps_refresh_record_by_default() {
        let h = harness().await;
        let pair = h.manager.login("alice", "secret", device()).await.unwrap();

        h.manager.logout(Some(&pair.refresh_token)).await.unwrap();
        assert!(h.manager.refresh(Some(&pair.refresh_token)).await.is_ok());
    }

    #[tokio::test]
    async fn logout_revokes_when_configured() {
        let mut config = fixtures::config();
        config.revoke_on_logout = true;
        let h = harness_with(config);
        h.manager
            .register(Registration {
                username: "alice".into(),
                email: "alice@x.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        let pair = h.manager.login("alice", "secret", device()).await.unwrap();

        h.manager.logout(Some(&pair.refresh_token)).await.unwrap();
        let err = h.manager.refresh(Some(&pair.refresh_token)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));

        h.manager.logout(None).await.unwrap();
    }

    #[tokio::test]
    async fn current_user_resolves_active_subject() {
        let h = harness().await;
        let pair = h.manager.login("alice", "secret", device()).await.unwrap();

        let user = h.manager.current_user(Some(&pair.access_token)).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@x.com");
    }

    #[tokio::test]
    async fn current_user_failures() {
        let h = harness().await;
        let pair = h.manager.login("alice", "secret", device()).await.unwrap();

        assert!(matches!(h.manager.current_user(None).await, Err(AuthError::TokenMissing)));

        let err = h.manager.current_user(Some(&pair.refresh_token)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));

        let ghost = h.manager.codec().issue("ghost", TokenKind::Access, T0).unwrap();
        let err = h.manager.current_user(Some(&ghost)).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));

        let user = h.store.find_by_username("alice").await.unwrap().unwrap();
        h.store.set_active(user.id, false).await.unwrap();
        let err = h.manager.current_user(Some(&pair.access_token)).await.unwrap_err();
        assert!(matches!(err, AuthError::UserInactive));

        h.store.set_active(user.id, true).await.unwrap();
        h.clock.advance(h.manager.token_lifetime(TokenKind::Access));
        let err = h.manager.current_user(Some(&pair.access_token)).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn list_sessions_shows_unexpired_sessions_of_caller() {
        let h = harness().await;
        h.manager
            .register(Registration {
                username: "bob".into(),
                email: "bob@x.com".into(),
                password: "hunter2".into(),
            })
            .await
            .unwrap();

        h.manager.login("alice", "secret", device()).await.unwrap();
        h.clock.advance(10);
        let pair = h.manager.login("alice", "secret", DeviceInfo::default()).await.unwrap();
        h.manager.login("bob", "hunter2", device()).await.unwrap();

        let sessions = h.manager.list_sessions(Some(&pair.access_token)).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].created_at, T0 + 10);
        assert_eq!(sessions[0].user_agent, None);
        assert_eq!(sessions[1].user_agent.as_deref(), Some("Mozilla/5.0"));

        // Oldest session expires first; a fresh access token still sees the newer one.
        let refresh_lifetime = h.manager.token_lifetime(TokenKind::Refresh);
        h.clock.set(T0 + refresh_lifetime);
        let fresh = h.manager.refresh(Some(&pair.refresh_token)).await.unwrap();
        let sessions = h.manager.list_sessions(Some(&fresh)).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].created_at, T0 + 10);
    }

    #[tokio::test]
    async fn register_conflicts_surface_through_manager() {
        let h = harness().await;
        let err = h
            .manager
            .register(Registration {
                username: "alice".into(),
                email: "other@x.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameAlreadyExists));

        let err = h
            .manager
            .register(Registration {
                username: "alicia".into(),
                email: "alice@x.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailAlreadyExists));
    }
}
